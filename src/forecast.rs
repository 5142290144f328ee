/*!
Forecast one ticker: scale its closes, train a model per horizon, and map the predictions back to prices
*/
use crate::data::{closes, scale::MinMaxScaler, Tick};
use crate::lstm::{Forecaster, Trainer};
use crate::window::{prepare, Windows};
use crate::{Error, GpuFloat, Result};
use chrono::NaiveDate;
use std::path::Path;

/// A ticker's history alongside the model's view of it
#[derive(Debug, Clone, PartialEq)]
pub struct TickerForecast {
    /// The ticker
    pub ticker: String,
    /// Trading days, oldest first
    pub dates: Vec<NaiveDate>,
    /// Actual closes on `dates`
    pub actual: Vec<f64>,
    /// The fitted close on each of `dates`; rows no window targets carry the actual close
    pub fitted: Vec<f64>,
    /// One out-of-sample forecast per horizon, in horizon order
    pub forecasts: Vec<f64>,
}

/// Where the weights for one ticker and horizon are saved
pub fn weights_path(dir: &Path, ticker: &str, horizon: usize) -> std::path::PathBuf {
    dir.join(format!("{}-{}.ot", ticker, horizon))
}

/// Forecast `ticker` from its daily `ticks`, training one model per entry of `horizons`.
///
/// The fitted series comes from the longest-horizon model. Weights are saved under `weights_dir` when given.
pub fn forecast_ticker(
    trainer: &dyn Trainer,
    ticker: &str,
    ticks: &[Tick],
    lookback: usize,
    horizons: &[usize],
    weights_dir: Option<&Path>,
) -> Result<TickerForecast> {
    let actual = closes(ticks);
    let scaler = MinMaxScaler::fit(&actual).ok_or_else(|| Error::NoData {
        ticker: ticker.to_string(),
    })?;
    let scaled: Vec<GpuFloat> = scaler
        .transform_all(&actual)
        .into_iter()
        .map(|v| v as GpuFloat)
        .collect();

    let mut forecasts = Vec::with_capacity(horizons.len());
    let mut longest: Option<(Windows, Box<dyn Forecaster>)> = None;
    for &horizon in horizons {
        let windows = prepare(&scaled, lookback, horizon)?;
        let model = trainer.fit(&windows)?;
        let prediction = model
            .predict(std::slice::from_ref(&windows.last_sequence))?
            .first()
            .copied()
            .ok_or_else(|| Error::parse("model returned no forecast"))?;
        let price = scaler.inverse(prediction as f64);
        tracing::debug!(ticker, horizon, price, "forecast");
        forecasts.push(price);
        if let Some(dir) = weights_dir {
            model.save(&weights_path(dir, ticker, horizon))?;
        }
        if longest.as_ref().map_or(true, |(best, _)| horizon > best.horizon) {
            longest = Some((windows, model));
        }
    }

    let mut fitted = actual.clone();
    if let Some((windows, model)) = longest {
        let predictions = model.predict(&windows.inputs)?;
        for (i, prediction) in predictions.into_iter().enumerate() {
            fitted[windows.target_index(i)] = scaler.inverse(prediction as f64);
        }
    }

    tracing::info!(ticker, forecasts = ?forecasts, "predicted upcoming closes");
    Ok(TickerForecast {
        ticker: ticker.to_string(),
        dates: ticks.iter().map(|tick| tick.t).collect(),
        actual,
        fitted,
        forecasts,
    })
}
