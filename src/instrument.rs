/*!
Asset classes and where each one keeps its files
*/
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The CME site root, used to absolutise scraped links
pub const CME_ROOT: &str = "https://www.cmegroup.com";

/// A class of financial instrument, each running its own copy of the pipeline
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Listed equities
    Stocks,
    /// Agricultural futures
    Agriculture,
    /// Energy futures
    Energy,
    /// Foreign exchange futures
    Fx,
    /// Metal futures
    Metal,
}

impl AssetClass {
    /// Every asset class, in the order the pipeline handles them
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Stocks,
        AssetClass::Agriculture,
        AssetClass::Energy,
        AssetClass::Fx,
        AssetClass::Metal,
    ];

    /// The name used in chart titles and published keys
    pub fn display_name(self) -> &'static str {
        match self {
            AssetClass::Stocks => "Stocks",
            AssetClass::Agriculture => "Agriculture",
            AssetClass::Energy => "Energy",
            AssetClass::Fx => "Foreign Exchange",
            AssetClass::Metal => "Metal",
        }
    }

    /// The file prefix for this class, e.g. `stock_data`
    pub fn slug(self) -> &'static str {
        match self {
            AssetClass::Stocks => "stock_data",
            AssetClass::Agriculture => "agriculture_data",
            AssetClass::Energy => "energy_data",
            AssetClass::Fx => "fx_data",
            AssetClass::Metal => "metal_data",
        }
    }

    /// Lower-cased display name with spaces as underscores, used to build chart and summary keys
    pub fn key_name(self) -> String {
        self.display_name().to_lowercase().replace(' ', "_")
    }

    /// Whether this class is a futures class scraped from CME
    pub fn is_futures(self) -> bool {
        !matches!(self, AssetClass::Stocks)
    }

    /// The CME landing page listing this class's product groups
    pub fn cme_landing_page(self) -> Option<String> {
        let market = self.cme_market()?;
        Some(format!("{}/markets/{}.html#products", CME_ROOT, market))
    }

    /// The path prefixes accepted for this class's CME subpages
    pub fn cme_subpage_prefixes(self) -> Vec<String> {
        let (trading, market) = match (self.cme_trading(), self.cme_market()) {
            (Some(trading), Some(market)) => (trading, market),
            _ => return Vec::new(),
        };
        vec![
            format!("/trading/{}/", trading),
            format!("/markets/{}/", market),
        ]
    }

    fn cme_market(self) -> Option<&'static str> {
        match self {
            AssetClass::Stocks => None,
            AssetClass::Agriculture => Some("agriculture"),
            AssetClass::Energy => Some("energy"),
            AssetClass::Fx => Some("fx"),
            AssetClass::Metal => Some("metals"),
        }
    }

    fn cme_trading(self) -> Option<&'static str> {
        match self {
            AssetClass::Stocks => None,
            AssetClass::Agriculture => Some("agricultural"),
            AssetClass::Energy => Some("energy"),
            AssetClass::Fx => Some("fx"),
            AssetClass::Metal => Some("metals"),
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for AssetClass {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stocks" | "stock" => Ok(AssetClass::Stocks),
            "agriculture" | "ag" => Ok(AssetClass::Agriculture),
            "energy" => Ok(AssetClass::Energy),
            "fx" | "foreign exchange" => Ok(AssetClass::Fx),
            "metal" | "metals" => Ok(AssetClass::Metal),
            other => Err(crate::Error::Config(format!(
                "unknown asset class {:?}",
                other
            ))),
        }
    }
}

/// The files one asset class reads and writes under the data directory
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClassPaths {
    /// The asset class these paths belong to
    pub class: AssetClass,
    /// The directory holding every file of this class
    pub dir: PathBuf,
}

impl ClassPaths {
    /// Paths for `class` rooted at `data_dir`
    pub fn new(data_dir: &Path, class: AssetClass) -> ClassPaths {
        ClassPaths {
            class,
            dir: data_dir.join(class.slug()),
        }
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}-{}", self.class.slug(), suffix))
    }

    /// Vendor listing snapshot (stocks only)
    pub fn listing_status(&self) -> PathBuf {
        self.dir.join("listing_status.csv")
    }

    /// Instruments that passed the volatility filter
    pub fn volatile_tickers(&self) -> PathBuf {
        self.file("volatile_tickers.txt")
    }

    /// Instruments whose download failed
    pub fn failed_tickers(&self) -> PathBuf {
        self.file("failed_tickers.txt")
    }

    /// Scraped CME clearing codes
    pub fn clearing_tickers(&self) -> PathBuf {
        self.file("clearing_tickers-CME.txt")
    }

    /// Scraped CME Globex codes
    pub fn globex_tickers(&self) -> PathBuf {
        self.file("current_globex_tickers-CME.txt")
    }

    /// Saved daily series for one instrument
    pub fn series(&self, ticker: &str) -> PathBuf {
        self.file(&format!("{}.csv", ticker))
    }

    /// Actual and predicted closes; `custom` selects the hand-picked ticker table
    pub fn closing_predictions(&self, custom: bool) -> PathBuf {
        if custom {
            self.file("closing_predictions-custom_tickers.csv")
        } else {
            self.file("closing_predictions.csv")
        }
    }

    /// Directory for saved model weights
    pub fn models(&self) -> PathBuf {
        self.dir.join("models")
    }
}
