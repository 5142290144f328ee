/*!
External collaborators: market-data vendors, listing vendors and web pages.

Each sits behind a trait so the pipeline can run against in-memory stand-ins.
*/
use crate::config::HttpConfig;
use crate::data::Tick;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

pub mod alphavantage;
pub mod cme;
pub mod quandl;
pub mod retry;
pub mod yahoo;

pub use alphavantage::AlphaVantageSource;
pub use quandl::QuandlSource;
pub use yahoo::YahooSource;

/// A source of daily price history
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// All daily ticks for `ticker` up to and including `end`, oldest first
    async fn daily_ticks(&self, ticker: &str, end: NaiveDate) -> Result<Vec<Tick>>;
}

/// A source of instrument listings
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// The raw listing CSV
    async fn listing_csv(&self) -> Result<String>;
}

/// Something that can fetch a web page's HTML
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// The HTML at `url`
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Drop the query string from a URL, so API keys never reach logs or errors
pub fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// A shared HTTP client with retries on transient failures
#[derive(Debug, Clone)]
pub struct Http {
    client: reqwest::Client,
    max_attempts: usize,
}

impl Http {
    /// Build a client from configuration
    pub fn new(config: &HttpConfig) -> Result<Http> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Http {
            client,
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// GET `url` as text, retrying transient failures
    pub async fn get_text(&self, url: &str) -> Result<String> {
        retry::retry_with_backoff(
            || async move {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::Status {
                        status: status.as_u16(),
                        url: redact(url).to_string(),
                    });
                }
                Ok(response.text().await?)
            },
            self.max_attempts,
        )
        .await
    }

    /// PUT `body` to `url`, optionally with a bearer token, retrying transient failures
    pub async fn put_bytes(&self, url: &str, body: Vec<u8>, token: Option<&str>, content_type: &str) -> Result<()> {
        let body = &body;
        retry::retry_with_backoff(
            || async move {
                let mut request = self
                    .client
                    .put(url)
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(body.clone());
                if let Some(token) = token {
                    request = request.bearer_auth(token);
                }
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::Status {
                        status: status.as_u16(),
                        url: redact(url).to_string(),
                    });
                }
                Ok(())
            },
            self.max_attempts,
        )
        .await
    }
}

#[async_trait]
impl PageFetcher for Http {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.get_text(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_query() {
        assert_eq!(
            redact("https://www.alphavantage.co/query?function=LISTING_STATUS&apikey=SECRET"),
            "https://www.alphavantage.co/query"
        );
        assert_eq!(redact("https://example.com/a"), "https://example.com/a");
    }
}
