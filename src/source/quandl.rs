/*!
Continuous CME futures history from the Quandl (Nasdaq Data Link) `CHRIS` database
*/
use super::{Http, PriceSource};
use crate::data::{store::read_close_csv, Tick};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

/// The Quandl API root
pub const QUANDL_ROOT: &str = "https://data.nasdaq.com/api/v3";

/// Close columns, in order of preference: settlement, then last trade
pub const CLOSE_COLUMNS: &[&str] = &["Settle", "Last", "Close"];

/// The `CHRIS/CME_<code>` dataset code for a CME clearing code
pub fn dataset_code(clearing_code: &str) -> String {
    format!("CHRIS/CME_{}", clearing_code.trim())
}

/// Parse a dataset CSV into ticks, oldest first
pub fn parse_dataset(body: &str) -> Result<Vec<Tick>> {
    read_close_csv(body.as_bytes(), "Date", CLOSE_COLUMNS)
}

/// Quandl daily futures history
#[derive(Debug, Clone)]
pub struct QuandlSource {
    /// HTTP client
    pub http: Http,
    /// API key; requests fail with a configuration error without one
    pub api_key: Option<String>,
    /// API root, overridable for testing
    pub root: String,
}

impl QuandlSource {
    /// A source using the public API root
    pub fn new(http: Http, api_key: Option<String>) -> QuandlSource {
        QuandlSource {
            http,
            api_key,
            root: QUANDL_ROOT.into(),
        }
    }

    /// The dataset URL for a clearing code, covering everything up to `end`
    pub fn dataset_url(&self, clearing_code: &str, end: NaiveDate) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("missing quandl.api_key".into()))?;
        Ok(format!(
            "{}/datasets/{}.csv?order=asc&end_date={}&api_key={}",
            self.root,
            dataset_code(clearing_code),
            end,
            key
        ))
    }
}

#[async_trait]
impl PriceSource for QuandlSource {
    async fn daily_ticks(&self, ticker: &str, end: NaiveDate) -> Result<Vec<Tick>> {
        let url = self.dataset_url(ticker, end)?;
        tracing::debug!(dataset = %dataset_code(ticker), "downloading futures history");
        let body = self.http.get_text(&url).await?;
        parse_dataset(&body)
    }
}
