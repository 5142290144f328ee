/*!
Scores and movements derived from a prediction table
*/
use super::{PredictionTable, TickerSeries, TimeFrame};
use serde_json::{Map, Value};
use statrs::statistics::Statistics;

/// Line colours, assigned to tickers in table order and reused after twelve
pub const PALETTE: [&str; 12] = [
    "#fcf6bd", "#f1f6c6", "#e6f5ce", "#dbf5d6", "#d0f4de", "#c9edea", "#c3e7f4", "#bde0fe", "#c6d8fb", "#ced0f8",
    "#d6c8f5", "#dec0f1",
];

/// The colour of the `i`-th ticker
pub fn color(i: usize) -> &'static str {
    PALETTE[i % PALETTE.len()]
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The coefficient of determination as a percentage, rounded to two places.
///
/// The first row is skipped, as are rows missing either value. `None` when no rows remain or the actual values do
/// not vary.
pub fn percent_accuracy(actual: &[Option<f64>], predicted: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = actual
        .iter()
        .zip(predicted)
        .skip(1)
        .filter_map(|(a, p)| Some(((*a)?, (*p)?)))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let n = pairs.len() as f64;
    let tss = pairs.iter().map(|(a, _)| *a).population_variance() * n;
    let rss: f64 = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum();
    if tss == 0.0 {
        return None;
    }
    Some(round2(100.0 * (1.0 - rss / tss)))
}

/// Percentage change from `from` to `to`, rounded to two places; `None` when `from` is zero
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        None
    } else {
        Some(round2((to - from) / from * 100.0))
    }
}

/// The row of a `rows`-row view holding the last actual trading day: the row just before the forecast rows
pub fn last_trading_row(rows: usize, forecast_count: usize) -> usize {
    rows.saturating_sub(forecast_count + 1)
}

/// Movement from the first valid to the last valid value of `values`
pub fn movement(values: &[Option<f64>]) -> Option<f64> {
    let first = values.iter().flatten().next()?;
    let last = values.iter().flatten().last()?;
    percent_change(*first, *last)
}

/// Movement of `series` over the rows `frame` shows, up to and including the last trading day
pub fn movement_over(series: &TickerSeries, frame: TimeFrame, forecast_count: usize) -> Option<f64> {
    let visible = frame.visible(series.actual.len());
    let actual = &series.actual[visible];
    let end = last_trading_row(actual.len(), forecast_count);
    actual.get(..=end).and_then(movement)
}

/// Projected movement from the fitted close on the last trading day to the final forecast.
///
/// A ticker without a row on the table's last trading day starts from its latest fitted close before it.
pub fn projected_movement(series: &TickerSeries, forecast_count: usize) -> Option<f64> {
    let last_day = last_trading_row(series.predicted.len(), forecast_count);
    let from = series.predicted.get(..=last_day)?.iter().rev().flatten().next()?;
    let to = series.predicted[last_day + 1..].iter().flatten().last()?;
    percent_change(*from, *to)
}

/// The forecasts of `series`, rounded to two places
pub fn predictions(series: &TickerSeries, forecast_count: usize) -> Vec<Option<f64>> {
    let start = series.predicted.len().saturating_sub(forecast_count);
    series.predicted[start..].iter().map(|p| p.map(round2)).collect()
}

/// One instrument's line in the published summary
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSummary {
    /// Ticker
    pub name: String,
    /// Chart colour
    pub color: String,
    /// Fit of the predicted against the actual closes, as a percentage
    pub accuracy: Option<f64>,
    /// The forecasts, nearest first
    pub predictions: Vec<Option<f64>>,
    /// Projected movement over the forecast rows
    pub projected_movement: Option<f64>,
    /// Historical movement per time frame
    pub movements: Vec<(TimeFrame, Option<f64>)>,
}

impl InstrumentSummary {
    /// The summary as a JSON record: `Name`, `Color`, `Prediction Accuracy`, `Prediction <n>`, `Projected Movement`
    /// and `Movement <title>` per frame
    pub fn to_json(&self) -> Value {
        let mut record = Map::new();
        record.insert("Name".into(), Value::from(self.name.clone()));
        record.insert("Color".into(), Value::from(self.color.clone()));
        record.insert("Prediction Accuracy".into(), Value::from(self.accuracy));
        for (i, prediction) in self.predictions.iter().enumerate() {
            record.insert(format!("Prediction {}", i + 1), Value::from(*prediction));
        }
        record.insert("Projected Movement".into(), Value::from(self.projected_movement));
        for (frame, movement) in &self.movements {
            record.insert(format!("Movement {}", frame.title()), Value::from(*movement));
        }
        Value::Object(record)
    }
}

/// Summarise every ticker of `table`
pub fn summarize(table: &PredictionTable, forecast_count: usize, frames: &[TimeFrame]) -> Vec<InstrumentSummary> {
    table
        .series
        .iter()
        .enumerate()
        .map(|(i, series)| InstrumentSummary {
            name: series.ticker.clone(),
            color: color(i).into(),
            accuracy: percent_accuracy(&series.actual, &series.predicted),
            predictions: predictions(series, forecast_count),
            projected_movement: projected_movement(series, forecast_count),
            movements: frames
                .iter()
                .map(|&frame| (frame, movement_over(series, frame, forecast_count)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(actual: Vec<Option<f64>>, predicted: Vec<Option<f64>>) -> TickerSeries {
        TickerSeries {
            ticker: "CL".into(),
            actual,
            predicted,
        }
    }

    #[test]
    fn accuracy_is_r_squared() {
        let actual = [Some(100.0), Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(percent_accuracy(&actual, &actual), Some(100.0));
        // mean 2, tss 2, rss 0.5
        let predicted = [None, Some(1.5), Some(2.0), Some(2.5)];
        assert_eq!(percent_accuracy(&actual, &predicted), Some(75.0));
        let gaps = [Some(0.0), Some(1.0), None, Some(3.0)];
        assert_eq!(percent_accuracy(&gaps, &actual), Some(100.0));
        assert_eq!(percent_accuracy(&[Some(1.0), Some(5.0), Some(5.0)], &[None, Some(5.0), Some(4.0)]), None);
        assert_eq!(percent_accuracy(&[Some(1.0)], &[Some(1.0)]), None);
    }

    #[test]
    fn movements() {
        assert_eq!(movement(&[None, Some(50.0), Some(60.0), None, Some(75.0)]), Some(50.0));
        assert_eq!(movement(&[None, None]), None);
        assert_eq!(movement(&[Some(0.0), Some(3.0)]), None);
        assert_eq!(percent_change(3.0, 1.0), Some(-66.67));
    }

    #[test]
    fn frame_movement_stops_at_last_trading_day() {
        // Six history rows then two forecast rows
        let s = series(
            vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0), Some(40.0), Some(99.0), Some(99.0)],
            vec![None, Some(19.0), Some(31.0), Some(39.0), Some(52.0), Some(40.0), Some(44.0), Some(50.0)],
        );
        assert_eq!(movement_over(&s, TimeFrame::Max, 2), Some(300.0));
        // The last four rows: 50, 40, then forecasts
        assert_eq!(movement_over(&s, TimeFrame::Days(4), 2), Some(-20.0));
        assert_eq!(projected_movement(&s, 2), Some(25.0));
        assert_eq!(predictions(&s, 2), vec![Some(44.0), Some(50.0)]);
    }

    #[test]
    fn projection_starts_from_latest_fitted_close() {
        // No row on the last trading day, as for an instrument on another calendar
        let s = series(
            vec![Some(10.0), Some(20.0), None, Some(99.0), Some(99.0)],
            vec![None, Some(20.0), None, Some(22.0), Some(25.0)],
        );
        assert_eq!(projected_movement(&s, 2), Some(25.0));
        let empty = series(vec![None; 3], vec![None, None, Some(5.0)]);
        assert_eq!(projected_movement(&empty, 1), None);
    }

    #[test]
    fn summary_records() {
        let table = PredictionTable {
            dates: (1..=4).map(|d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap()).collect(),
            series: vec![series(
                vec![Some(1.0), Some(2.0), Some(4.0), Some(5.0)],
                vec![None, Some(2.0), Some(4.0), Some(5.0)],
            )],
        };
        let summaries = summarize(&table, 1, &[TimeFrame::Days(7), TimeFrame::Max]);
        assert_eq!(summaries.len(), 1);
        let json = summaries[0].to_json();
        assert_eq!(json["Name"], "CL");
        assert_eq!(json["Color"], "#fcf6bd");
        assert_eq!(json["Prediction Accuracy"], 100.0);
        assert_eq!(json["Prediction 1"], 5.0);
        assert_eq!(json["Projected Movement"], 25.0);
        assert_eq!(json["Movement One Week"], 300.0);
        assert_eq!(json["Movement All Time"], 300.0);
        assert!(json.get("Prediction 2").is_none());
        assert_eq!(color(13), PALETTE[1]);
    }
}
