/*!
Stock listings from the Alpha Vantage `LISTING_STATUS` endpoint
*/
use super::{Http, ListingSource};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// The Alpha Vantage query endpoint
pub const ALPHA_VANTAGE_QUERY: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Deserialize)]
struct ListingRow {
    symbol: String,
    #[serde(rename = "assetType")]
    asset_type: String,
    status: String,
}

/// Symbols of listing rows that are active stocks (not ETFs), in listing order
pub fn parse_active_stocks(csv: &str) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_reader(csv.as_bytes());
    let mut active = Vec::new();
    for row in rdr.deserialize::<ListingRow>() {
        let row = row?;
        if row.status == "Active" && row.asset_type == "Stock" && !row.symbol.trim().is_empty() {
            active.push(row.symbol.trim().to_string())
        }
    }
    Ok(active)
}

/// Alpha Vantage listings
#[derive(Debug, Clone)]
pub struct AlphaVantageSource {
    /// HTTP client
    pub http: Http,
    /// API key; requests fail with a configuration error without one
    pub api_key: Option<String>,
    /// Query endpoint, overridable for testing
    pub endpoint: String,
}

impl AlphaVantageSource {
    /// A source using the public endpoint
    pub fn new(http: Http, api_key: Option<String>) -> AlphaVantageSource {
        AlphaVantageSource {
            http,
            api_key,
            endpoint: ALPHA_VANTAGE_QUERY.into(),
        }
    }
}

#[async_trait]
impl ListingSource for AlphaVantageSource {
    async fn listing_csv(&self) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("missing alpha_vantage.api_key".into()))?;
        let url = format!(
            "{}?function=LISTING_STATUS&apikey={}&datatype=csv",
            self.endpoint, key
        );
        self.http.get_text(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_active_stocks_only() {
        let csv = "symbol,name,exchange,assetType,ipoDate,delistingDate,status\n\
                   A,Agilent Technologies Inc,NYSE,Stock,1999-11-18,null,Active\n\
                   AAA,Listed Funds Trust,NYSE ARCA,ETF,2020-09-09,null,Active\n\
                   AAB,Old Co,NYSE,Stock,2001-01-01,2010-01-01,Delisted\n\
                   NVDA,NVIDIA Corp,NASDAQ,Stock,1999-01-22,null,Active\n";
        assert_eq!(parse_active_stocks(csv).unwrap(), vec!["A", "NVDA"]);
    }

    #[test]
    fn rejects_unexpected_payloads() {
        // The vendor answers rate-limited requests with a JSON note instead of CSV
        let body = "{\n    \"Note\": \"Thank you for using Alpha Vantage!\"\n}";
        assert!(parse_active_stocks(body).is_err());
    }
}
