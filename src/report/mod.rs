/*!
Prediction tables, their scores, and the charts and summaries rendered from them.

A prediction table holds, per ticker, the actual close and the model's fitted close on every trading day, followed by
a few forecast rows (the next business days) in which both columns carry the forecast.
*/
use crate::data::store::DATE_FORMAT;
use crate::forecast::TickerForecast;
use crate::instrument::AssetClass;
use crate::util::next_business_days;
use crate::{Error, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

pub mod chart;
pub mod metrics;

/// How much history a chart shows
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeFrameRepr", into = "TimeFrameRepr")]
pub enum TimeFrame {
    /// The last `n` rows of the table
    Days(usize),
    /// The whole table
    Max,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TimeFrameRepr {
    Days(usize),
    Name(String),
}

impl TryFrom<TimeFrameRepr> for TimeFrame {
    type Error = String;

    fn try_from(repr: TimeFrameRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            TimeFrameRepr::Days(0) => Err("a time frame must span at least one day".into()),
            TimeFrameRepr::Days(days) => Ok(TimeFrame::Days(days)),
            TimeFrameRepr::Name(name) if name.eq_ignore_ascii_case("max") => Ok(TimeFrame::Max),
            TimeFrameRepr::Name(name) => Err(format!("unknown time frame {:?}", name)),
        }
    }
}

impl From<TimeFrame> for TimeFrameRepr {
    fn from(frame: TimeFrame) -> Self {
        match frame {
            TimeFrame::Days(days) => TimeFrameRepr::Days(days),
            TimeFrame::Max => TimeFrameRepr::Name("max".into()),
        }
    }
}

impl TimeFrame {
    /// One week, one month, three months, a year and all time
    pub const DEFAULTS: [TimeFrame; 5] = [
        TimeFrame::Days(7),
        TimeFrame::Days(30),
        TimeFrame::Days(90),
        TimeFrame::Days(365),
        TimeFrame::Max,
    ];

    /// The human-readable title, as used in `Movement <title>` summary fields
    pub fn title(self) -> String {
        match self {
            TimeFrame::Days(7) => "One Week".into(),
            TimeFrame::Days(30) => "One Month".into(),
            TimeFrame::Days(90) => "Three Months".into(),
            TimeFrame::Days(365) => "Year To Day".into(),
            TimeFrame::Days(days) => format!("{} Days", days),
            TimeFrame::Max => "All Time".into(),
        }
    }

    /// The suffix used in chart file names: the day count, or `max`
    pub fn key(self) -> String {
        match self {
            TimeFrame::Days(days) => days.to_string(),
            TimeFrame::Max => "max".into(),
        }
    }

    /// The rows of a `total`-row table this frame shows
    pub fn visible(self, total: usize) -> Range<usize> {
        match self {
            TimeFrame::Days(days) => total.saturating_sub(days)..total,
            TimeFrame::Max => 0..total,
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

/// One ticker's columns of a [`PredictionTable`]
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSeries {
    /// The ticker
    pub ticker: String,
    /// Actual closes, or the forecast in forecast rows
    pub actual: Vec<Option<f64>>,
    /// Fitted closes, or the forecast in forecast rows
    pub predicted: Vec<Option<f64>>,
}

/// Actual and predicted closes for a set of tickers on a shared date index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionTable {
    /// The row dates, ascending
    pub dates: Vec<NaiveDate>,
    /// One pair of columns per ticker, in modelling order
    pub series: Vec<TickerSeries>,
}

impl PredictionTable {
    /// Assemble a table from per-ticker forecasts.
    ///
    /// Rows are the union of every ticker's dates followed by the `forecast_count` business days after the latest one;
    /// a ticker without data on a row leaves both its cells empty.
    pub fn from_forecasts(forecasts: &[TickerForecast], forecast_count: usize) -> PredictionTable {
        let mut dates: Vec<NaiveDate> = forecasts
            .iter()
            .flat_map(|forecast| forecast.dates.iter().copied())
            .sorted()
            .dedup()
            .collect();
        let history = dates.len();
        if let Some(&latest) = dates.last() {
            dates.extend(next_business_days(latest, forecast_count));
        }
        let row_of: HashMap<NaiveDate, usize> = dates[..history]
            .iter()
            .enumerate()
            .map(|(row, &date)| (date, row))
            .collect();

        let series = forecasts
            .iter()
            .map(|forecast| {
                let mut actual = vec![None; dates.len()];
                let mut predicted = vec![None; dates.len()];
                for (i, date) in forecast.dates.iter().enumerate() {
                    let row = row_of[date];
                    actual[row] = forecast.actual.get(i).copied();
                    predicted[row] = forecast.fitted.get(i).copied();
                }
                for (row, value) in (history..dates.len()).zip(&forecast.forecasts) {
                    actual[row] = Some(*value);
                    predicted[row] = Some(*value);
                }
                TickerSeries {
                    ticker: forecast.ticker.clone(),
                    actual,
                    predicted,
                }
            })
            .collect();
        PredictionTable { dates, series }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Write as CSV: `Date`, then `<T> Close` and `<T> Predicted Close` per ticker; missing cells are empty
    pub fn write<W: Write>(&self, wtr: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(wtr);
        let mut header = vec!["Date".to_string()];
        for series in &self.series {
            header.push(format!("{} Close", series.ticker));
            header.push(format!("{} Predicted Close", series.ticker));
        }
        wtr.write_record(&header)?;
        let cell = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        for (row, date) in self.dates.iter().enumerate() {
            let mut record = vec![date.format(DATE_FORMAT).to_string()];
            for series in &self.series {
                record.push(cell(series.actual[row]));
                record.push(cell(series.predicted[row]));
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a table written by [`PredictionTable::write`]
    pub fn read<R: Read>(rdr: R) -> Result<PredictionTable> {
        let mut rdr = csv::Reader::from_reader(rdr);
        let headers = rdr.headers()?.clone();
        if headers.get(0).map(str::trim) != Some("Date") || headers.len() % 2 != 1 {
            return Err(Error::parse("prediction table must start with Date and pair its columns"));
        }
        let mut series = Vec::with_capacity(headers.len() / 2);
        for (close, predicted) in headers.iter().skip(1).tuples() {
            let ticker = close
                .strip_suffix(" Close")
                .filter(|ticker| predicted == format!("{} Predicted Close", ticker))
                .ok_or_else(|| Error::parse(format!("unpaired columns {:?} and {:?}", close, predicted)))?;
            series.push(TickerSeries {
                ticker: ticker.to_string(),
                actual: Vec::new(),
                predicted: Vec::new(),
            });
        }

        let mut dates = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let date = record.get(0).unwrap_or_default().trim();
            dates.push(
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .map_err(|err| Error::parse(format!("bad date {:?}: {}", date, err)))?,
            );
            for (i, series) in series.iter_mut().enumerate() {
                series.actual.push(parse_cell(record.get(2 * i + 1))?);
                series.predicted.push(parse_cell(record.get(2 * i + 2))?);
            }
        }
        Ok(PredictionTable { dates, series })
    }

    /// Save to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.write(fs::File::create(path)?)
    }

    /// Load a table saved with [`PredictionTable::save`]
    pub fn load(path: &Path) -> Result<PredictionTable> {
        PredictionTable::read(fs::File::open(path)?)
    }
}

fn parse_cell(cell: Option<&str>) -> Result<Option<f64>> {
    match cell.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|err| Error::parse(format!("bad price {:?}: {}", value, err))),
    }
}

/// Files rendered for one asset class
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFiles {
    /// One chart per time frame
    pub graphs: Vec<(TimeFrame, PathBuf)>,
    /// The JSON summary
    pub summary: PathBuf,
}

/// Local path of the chart for `class` over `frame`, under `assets_dir`
pub fn graph_path(assets_dir: &Path, class: AssetClass, frame: TimeFrame) -> PathBuf {
    assets_dir
        .join("graphs")
        .join(format!("{}Plot-{}.html", class.key_name(), frame.key()))
}

/// Local path of the JSON summary for `class`, under `assets_dir`
pub fn summary_path(assets_dir: &Path, class: AssetClass) -> PathBuf {
    assets_dir
        .join("data")
        .join(format!("{}Data.json", class.key_name()))
}

/// Render a chart per time frame and the JSON summary for `class` into `assets_dir`
pub fn write_report(
    table: &PredictionTable,
    class: AssetClass,
    frames: &[TimeFrame],
    forecast_count: usize,
    assets_dir: &Path,
) -> Result<ReportFiles> {
    let mut graphs = Vec::with_capacity(frames.len());
    for &frame in frames {
        let figure = chart::figure(table, frame, forecast_count)?;
        let path = graph_path(assets_dir, class, frame);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, chart::render_html(&figure)?)?;
        tracing::debug!(%class, frame = %frame, path = %path.display(), "rendered chart");
        graphs.push((frame, path));
    }

    let summaries = metrics::summarize(table, forecast_count, frames);
    let records: Vec<serde_json::Value> = summaries.iter().map(|summary| summary.to_json()).collect();
    let summary = summary_path(assets_dir, class);
    if let Some(parent) = summary.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&summary, serde_json::to_vec(&records)?)?;
    tracing::info!(%class, charts = graphs.len(), instruments = records.len(), "wrote report");
    Ok(ReportFiles { graphs, summary })
}
