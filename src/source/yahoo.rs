/*!
Daily stock history from the Yahoo! Finance chart API
*/
use super::{Http, PriceSource};
use crate::data::Tick;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

/// The Yahoo! Finance API root
pub const YAHOO_ROOT: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Parse a chart response into daily ticks, dropping entries without a close
pub fn parse_chart(body: &str) -> Result<Vec<Tick>> {
    let response: ChartResponse = serde_json::from_str(body)?;
    if let Some(error) = response.chart.error {
        return Err(Error::parse(format!("{}: {}", error.code, error.description)));
    }
    let result = match response.chart.result.and_then(|results| results.into_iter().next()) {
        Some(result) => result,
        None => return Ok(Vec::new()),
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let mut ticks: Vec<Tick> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let t = DateTime::from_timestamp(ts, 0)?.date_naive();
            let c = at(&quote.close, i).filter(|c| c.is_finite())?;
            Some(Tick {
                t,
                o: at(&quote.open, i).unwrap_or(c),
                h: at(&quote.high, i).unwrap_or(c),
                l: at(&quote.low, i).unwrap_or(c),
                c,
                v: at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();
    ticks.sort_by_key(|tick| tick.t);
    ticks.dedup_by_key(|tick| tick.t);
    Ok(ticks)
}

/// Yahoo! Finance daily history
#[derive(Debug, Clone)]
pub struct YahooSource {
    /// HTTP client
    pub http: Http,
    /// API root, overridable for testing
    pub root: String,
}

impl YahooSource {
    /// A source using the public API root
    pub fn new(http: Http) -> YahooSource {
        YahooSource {
            http,
            root: YAHOO_ROOT.into(),
        }
    }

    /// The chart URL for `ticker` covering everything up to `end`
    pub fn chart_url(&self, ticker: &str, end: NaiveDate) -> String {
        let period2 = end
            .succ_opt()
            .unwrap_or(end)
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        format!(
            "{}/v8/finance/chart/{}?interval=1d&period1=0&period2={}&includeAdjustedClose=true",
            self.root, ticker, period2
        )
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    async fn daily_ticks(&self, ticker: &str, end: NaiveDate) -> Result<Vec<Tick>> {
        let body = self.http.get_text(&self.chart_url(ticker, end)).await?;
        let ticks: Vec<Tick> = parse_chart(&body)?
            .into_iter()
            .filter(|tick| tick.t <= end)
            .collect();
        tracing::debug!(ticker, ticks = ticks.len(), "downloaded daily history");
        Ok(ticks)
    }
}
