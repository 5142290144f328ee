/*!
Runtime configuration: a JSON file with defaults for every field, overridable from the environment
*/
use crate::{report::TimeFrame, window::LOOKBACK, Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// The full configuration for a closecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Alpha Vantage credentials, used for stock listings
    pub alpha_vantage: ApiKey,
    /// Quandl (Nasdaq Data Link) credentials, used for futures prices
    pub quandl: ApiKey,
    /// Where ticker lists, series and prediction tables live
    pub data_dir: PathBuf,
    /// Where rendered charts and summaries are written before publishing
    pub assets_dir: PathBuf,
    /// HTTP client behaviour
    pub http: HttpConfig,
    /// The volatility filter
    pub volatility: VolatilityConfig,
    /// Model hyper-parameters
    pub model: ModelConfig,
    /// Hand-picked stock tickers to model; empty means model the volatile list
    pub custom_tickers: Vec<String>,
    /// The time frames a chart is rendered for
    pub time_frames: Vec<TimeFrame>,
    /// Where rendered outputs are published
    pub publish: PublishConfig,
}

/// A vendor API key, nested the way vendor keys are stored in `config.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKey {
    /// The key itself
    pub api_key: Option<String>,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Attempts per request, including the first
    pub max_attempts: usize,
}

/// Thresholds deciding which instruments are "interesting"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Minimum scaled volatility, in percent
    pub min_volatility: f64,
    /// Minimum last close for stocks; futures ignore it
    pub min_last_close: f64,
    /// Trading periods per year
    pub annualization: f64,
    /// Exponent applied to `annualization`
    pub exponent: f64,
}

/// Hyper-parameters for windowing and the LSTM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Observations per input window
    pub lookback: usize,
    /// Forecast horizons, in steps ahead
    pub horizons: Vec<usize>,
    /// Hidden size of the first LSTM layer
    pub first_hidden: usize,
    /// Hidden size of the second LSTM layer
    pub second_hidden: usize,
    /// Width of the dense layer before the output
    pub dense: usize,
    /// Dropout probability after each LSTM layer
    pub dropout: f64,
    /// Mini-batch size
    pub batch_size: usize,
    /// Passes over the training windows
    pub epochs: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// `cpu` or `cuda`
    pub device: String,
    /// Save trained weights next to the data
    pub save_weights: bool,
}

/// Where and how outputs are published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PublishConfig {
    /// Keep outputs local
    None,
    /// Copy outputs into a directory tree
    Local {
        /// The root directory objects are copied under
        root: PathBuf,
    },
    /// PUT outputs to a static-hosting endpoint
    Http {
        /// The base URL objects are written under
        base_url: String,
        /// Optional bearer token
        #[serde(default)]
        token: Option<String>,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            alpha_vantage: ApiKey::default(),
            quandl: ApiKey::default(),
            data_dir: PathBuf::from("./financialInstrument_data"),
            assets_dir: PathBuf::from("./assets"),
            http: HttpConfig::default(),
            volatility: VolatilityConfig::default(),
            model: ModelConfig::default(),
            custom_tickers: ["NVDA", "META", "GOOG", "AMZN", "MSFT", "TSLA"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            time_frames: TimeFrame::DEFAULTS.to_vec(),
            publish: PublishConfig::None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/85.0.4183.102 Safari/537.36"
                .into(),
            max_attempts: 3,
        }
    }
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        VolatilityConfig {
            min_volatility: 5.5,
            min_last_close: 90.0,
            annualization: 252.0,
            exponent: 0.05,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            lookback: LOOKBACK,
            horizons: vec![1, 2, 3],
            first_hidden: 60,
            second_hidden: 120,
            dense: 20,
            dropout: 0.3,
            batch_size: 8,
            epochs: 80,
            learning_rate: 1e-3,
            device: "cpu".into(),
            save_weights: false,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig::None
    }
}

impl Config {
    /// Load the configuration from `path`, falling back to defaults when the file is missing,
    /// then apply `.env` and environment overrides
    pub fn load(path: &Path) -> Result<Config> {
        dotenv::dotenv().ok();
        let mut config = if path.exists() {
            let file = std::fs::File::open(path)?;
            serde_json::from_reader(std::io::BufReader::new(file))?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(key) = var("ALPHA_VANTAGE_API_KEY") {
            self.alpha_vantage.api_key = Some(key)
        }
        if let Some(key) = var("QUANDL_API_KEY") {
            self.quandl.api_key = Some(key)
        }
        if let Some(dir) = var("CLOSECAST_DATA_DIR") {
            self.data_dir = dir.into()
        }
        if let Some(dir) = var("CLOSECAST_ASSETS_DIR") {
            self.assets_dir = dir.into()
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        if model.lookback == 0 {
            return Err(Error::Config("model.lookback must be positive".into()));
        }
        if model.horizons.is_empty() || model.horizons.contains(&0) {
            return Err(Error::Config(
                "model.horizons must be a non-empty list of positive steps".into(),
            ));
        }
        if model.batch_size == 0 {
            return Err(Error::Config("model.batch_size must be positive".into()));
        }
        if !(0.0..1.0).contains(&model.dropout) {
            return Err(Error::Config("model.dropout must lie in [0, 1)".into()));
        }
        if self.http.max_attempts == 0 {
            return Err(Error::Config("http.max_attempts must be positive".into()));
        }
        Ok(())
    }

    /// The Alpha Vantage key, or a configuration error naming it
    pub fn alpha_vantage_key(&self) -> Result<&str> {
        self.alpha_vantage
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("missing alpha_vantage.api_key".into()))
    }

    /// The Quandl key, or a configuration error naming it
    pub fn quandl_key(&self) -> Result<&str> {
        self.quandl
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("missing quandl.api_key".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "alpha_vantage": {"api_key": "AV"},
                "ccxt": {"api_key": "ignored"},
                "model": {"epochs": 5},
                "time_frames": [7, "max"],
                "publish": {"kind": "local", "root": "/srv/site"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.alpha_vantage_key().unwrap(), "AV");
        assert!(config.quandl_key().is_err());
        assert_eq!(config.model.epochs, 5);
        assert_eq!(config.model.lookback, 7);
        assert_eq!(config.model.horizons, vec![1, 2, 3]);
        assert_eq!(config.time_frames, vec![TimeFrame::Days(7), TimeFrame::Max]);
        assert_eq!(
            config.publish,
            PublishConfig::Local {
                root: "/srv/site".into()
            }
        );
        config.validate().unwrap();
    }

    #[test]
    fn environment_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "QUANDL_API_KEY" => Some("Q".into()),
            "CLOSECAST_DATA_DIR" => Some("/tmp/data".into()),
            _ => None,
        });
        assert_eq!(config.quandl_key().unwrap(), "Q");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/data"));
        assert_eq!(config.assets_dir, PathBuf::from("./assets"));
    }

    #[test]
    fn invalid_models_rejected() {
        let mut config = Config::default();
        config.model.horizons = vec![1, 0];
        assert!(config.validate().is_err());
        config.model.horizons = vec![];
        assert!(config.validate().is_err());
        let mut config = Config::default();
        config.model.dropout = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.model, ModelConfig::default());
    }
}
