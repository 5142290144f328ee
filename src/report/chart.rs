/*!
Standalone HTML charts of a prediction table, drawn client-side by plotly.js
*/
use super::metrics::{color, last_trading_row};
use super::{PredictionTable, TimeFrame};
use crate::data::store::DATE_FORMAT;
use crate::{Error, Result};
use serde_json::{json, Value};

/// Where the page loads plotly.js from
pub const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

const BACKGROUND: &str = "#212529";
const HOVER: &str = "<br><b>%{x|%b %d}</b><br>%{y:$,.2f}";

fn hoverlabel() -> Value {
    json!({
        "font": {"family": "monospace", "color": BACKGROUND},
        "align": "left",
        "bordercolor": "rgba(0,0,0,0)",
    })
}

fn scatter(name: &str, x: &[String], y: &[Option<f64>], mode: &str) -> Value {
    json!({
        "type": "scatter",
        "x": x,
        "y": y,
        "mode": mode,
        "name": name,
        "hovertemplate": HOVER,
        "hoverlabel": hoverlabel(),
        "showlegend": false,
    })
}

/// The plotly figure (`data`, `layout` and `config`) for the rows of `table` that `frame` shows.
///
/// Each ticker gets a solid line of actual closes up to the last trading day, a dotted line of predicted closes,
/// markers on the last actual close and on every forecast, and a label beside its final forecast.
pub fn figure(table: &PredictionTable, frame: TimeFrame, forecast_count: usize) -> Result<Value> {
    let visible = frame.visible(table.len());
    if visible.len() <= forecast_count {
        return Err(Error::InsufficientData {
            have: visible.len(),
            need: forecast_count + 1,
        });
    }
    let dates: Vec<String> = table.dates[visible.clone()]
        .iter()
        .map(|date| date.format(DATE_FORMAT).to_string())
        .collect();
    let rows = dates.len();
    let last_day = last_trading_row(rows, forecast_count);
    let forecast_start = rows - forecast_count;

    let mut traces = Vec::new();
    let mut annotations = Vec::new();
    for (i, series) in table.series.iter().enumerate() {
        let color = color(i);
        let actual = &series.actual[visible.clone()];
        let predicted = &series.predicted[visible.clone()];

        let mut line = scatter(&series.ticker, &dates[..=last_day], &actual[..=last_day], "lines");
        line["line"] = json!({"color": color});
        traces.push(line);

        let mut last_close = scatter(
            &series.ticker,
            &dates[last_day..=last_day],
            &actual[last_day..=last_day],
            "markers",
        );
        last_close["marker"] = json!({"size": 8, "color": color, "symbol": "circle"});
        traces.push(last_close);

        let mut fitted = scatter(&series.ticker, &dates, predicted, "lines");
        fitted["line"] = json!({"dash": "dot", "color": color});
        traces.push(fitted);

        let mut forecasts = scatter(
            &series.ticker,
            &dates[forecast_start..],
            &predicted[forecast_start..],
            "markers",
        );
        forecasts["marker"] = json!({"size": 8, "color": color, "symbol": "circle"});
        traces.push(forecasts);

        if let Some(Some(final_forecast)) = predicted.last() {
            annotations.push(json!({
                "x": dates[rows - 1],
                "y": final_forecast,
                "xshift": 10,
                "yshift": 0,
                "text": series.ticker,
                "showarrow": false,
                "font": {"color": color, "family": "monospace", "size": 8},
                "align": "left",
                "xanchor": "left",
            }));
        }
    }

    let last_trading_day = &dates[last_day];
    annotations.push(json!({
        "x": last_trading_day,
        "y": 1,
        "yref": "paper",
        "yanchor": "bottom",
        "text": "Last Trading Day",
        "showarrow": false,
        "font": {"color": "white", "family": "monospace", "size": 8},
    }));

    let axis = json!({
        "showline": true,
        "linewidth": 1,
        "linecolor": "white",
        "gridcolor": BACKGROUND,
    });
    let mut yaxis = axis.clone();
    yaxis["tickprefix"] = json!("$");
    yaxis["zeroline"] = json!(false);

    Ok(json!({
        "data": traces,
        "layout": {
            "dragmode": false,
            "xaxis": axis,
            "yaxis": yaxis,
            "plot_bgcolor": BACKGROUND,
            "paper_bgcolor": BACKGROUND,
            "margin": {"l": 0, "r": 0, "t": 25, "b": 0},
            "font": {"size": 10, "family": "monospace", "color": "white"},
            "shapes": [{
                "type": "line",
                "xref": "x",
                "yref": "paper",
                "x0": last_trading_day,
                "y0": 0,
                "x1": last_trading_day,
                "y1": 1,
                "line": {"color": "white", "width": 1, "dash": "dash"},
            }],
            "annotations": annotations,
        },
        "config": {"displayModeBar": false},
    }))
}

/// A self-contained HTML page drawing `figure`
pub fn render_html(figure: &Value) -> Result<String> {
    // Keep the embedded JSON from closing the script element
    let figure = serde_json::to_string(figure)?.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<script src="{plotly}" charset="utf-8"></script>
</head>
<body style="margin: 0; background-color: {background};">
<div id="chart" style="width: 100%; height: 100vh;"></div>
<script type="text/javascript">
const figure = {figure};
Plotly.newPlot("chart", figure.data, figure.layout, figure.config);
</script>
</body>
</html>
"#,
        plotly = PLOTLY_JS,
        background = BACKGROUND,
        figure = figure,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TickerSeries;
    use chrono::NaiveDate;

    fn table() -> PredictionTable {
        let dates = (3..=9).map(|d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap()).collect();
        let actual = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.5), Some(7.0)];
        let predicted = vec![Some(1.0), Some(2.1), Some(2.9), Some(4.2), Some(5.1), Some(6.5), Some(7.0)];
        PredictionTable {
            dates,
            series: vec![TickerSeries {
                ticker: "ZC</script>".into(),
                actual,
                predicted,
            }],
        }
    }

    #[test]
    fn traces_split_at_last_trading_day() {
        let fig = figure(&table(), TimeFrame::Max, 2).unwrap();
        let data = fig["data"].as_array().unwrap();
        assert_eq!(data.len(), 4);
        // Actual line runs through 2024-06-07, two forecast rows follow
        assert_eq!(data[0]["x"].as_array().unwrap().len(), 5);
        assert_eq!(data[1]["x"][0], "2024-06-07");
        assert_eq!(data[2]["line"]["dash"], "dot");
        assert_eq!(data[3]["y"], json!([6.5, 7.0]));
        assert_eq!(fig["layout"]["shapes"][0]["x0"], "2024-06-07");
        let annotations = fig["layout"]["annotations"].as_array().unwrap();
        assert_eq!(annotations[0]["y"], 7.0);
        assert_eq!(annotations[1]["text"], "Last Trading Day");
        assert_eq!(fig["config"]["displayModeBar"], false);
    }

    #[test]
    fn frames_and_short_tables() {
        let fig = figure(&table(), TimeFrame::Days(4), 2).unwrap();
        assert_eq!(fig["data"][0]["x"], json!(["2024-06-06", "2024-06-07"]));
        assert!(matches!(
            figure(&table(), TimeFrame::Days(2), 2),
            Err(Error::InsufficientData { have: 2, need: 3 })
        ));
    }

    #[test]
    fn html_embeds_escaped_figure() {
        let html = render_html(&figure(&table(), TimeFrame::Days(7), 2).unwrap()).unwrap();
        assert!(html.contains(PLOTLY_JS));
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains(r#"ZC<\/script>"#));
        assert_eq!(html.matches("</script>").count(), 2);
    }
}
