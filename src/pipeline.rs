/*!
Run the stages of the pipeline for each asset class.

Stages run in a fixed order: names, volatile, model, plot, retry-failed. A stage that fails is logged and skipped
over; later stages, and other classes, still run.
*/
use crate::collect::{self, ticker_progress};
use crate::config::Config;
use crate::data::{read_tickers, restrict, store::load_ticks, Tick};
use crate::forecast::{forecast_ticker, TickerForecast};
use crate::instrument::{AssetClass, ClassPaths};
use crate::lstm::Trainer;
use crate::publish::{publish_report, Publisher};
use crate::report::{write_report, PredictionTable, ReportFiles};
use crate::source::{ListingSource, PageFetcher, PriceSource};
use crate::util::minutes_seconds;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use std::time::{Duration, Instant};

/// Which stages to run
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Stages {
    /// Discover instrument names
    pub names: bool,
    /// Collect prices and filter the volatile instruments
    pub volatile: bool,
    /// Train models and write the prediction table
    pub model: bool,
    /// Render and publish charts and summaries
    pub plot: bool,
    /// Retry failed downloads
    pub retry_failed: bool,
}

impl Stages {
    /// Every stage
    pub const ALL: Stages = Stages {
        names: true,
        volatile: true,
        model: true,
        plot: true,
        retry_failed: true,
    };

    /// Modelling and plotting, what a scheduled run does
    pub const MODEL_AND_PLOT: Stages = Stages {
        names: false,
        volatile: false,
        model: true,
        plot: true,
        retry_failed: false,
    };

    /// Whether no stage is selected
    pub fn is_empty(&self) -> bool {
        *self == Stages::default()
    }
}

/// How one asset class fared
#[derive(Debug, Clone, PartialEq)]
pub struct ClassOutcome {
    /// The class
    pub class: AssetClass,
    /// Names of the stages that failed
    pub failed: Vec<&'static str>,
    /// Wall time spent on the class
    pub elapsed: Duration,
}

/// Everything a run needs, borrowed for its duration
pub struct Pipeline<'a> {
    /// Run configuration
    pub config: &'a Config,
    /// Daily stock prices
    pub stocks: &'a dyn PriceSource,
    /// Daily futures prices, keyed by clearing code
    pub futures: &'a dyn PriceSource,
    /// Stock listings
    pub listing: &'a dyn ListingSource,
    /// CME product pages
    pub pages: &'a dyn PageFetcher,
    /// Fits a model per horizon
    pub trainer: &'a dyn Trainer,
    /// Where rendered outputs go
    pub publisher: &'a dyn Publisher,
    /// First day of the screening range
    pub start: NaiveDate,
    /// Last day of every range; nothing later is used
    pub end: NaiveDate,
    /// Draw progress bars
    pub progress: bool,
}

impl<'a> Pipeline<'a> {
    /// The files of `class`
    pub fn paths(&self, class: AssetClass) -> ClassPaths {
        ClassPaths::new(&self.config.data_dir, class)
    }

    /// Whether `class` models the hand-picked tickers rather than its volatile list
    pub fn uses_custom_tickers(&self, class: AssetClass) -> bool {
        class == AssetClass::Stocks && !self.config.custom_tickers.is_empty()
    }

    fn price_source(&self, class: AssetClass) -> &'a dyn PriceSource {
        if class.is_futures() {
            self.futures
        } else {
            self.stocks
        }
    }

    /// Discover names: refresh the stock listing, or scrape CME for a futures class
    pub async fn names(&self, class: AssetClass) -> anyhow::Result<()> {
        let paths = self.paths(class);
        if class.is_futures() {
            let names = collect::discover_futures_names(self.pages, &paths)
                .await
                .with_context(|| format!("scraping {} names from CME", class))?;
            tracing::info!(%class, globex = names.globex.len(), clearing = names.clearing.len(), "discovered names");
        } else {
            let stocks = collect::find_active_stocks(self.listing, &paths)
                .await
                .context("refreshing stock listings")?;
            tracing::info!(%class, active = stocks.active.len(), "discovered names");
        }
        Ok(())
    }

    /// Collect prices over the screening range and record the volatile instruments
    pub async fn volatile(&self, class: AssetClass) -> anyhow::Result<()> {
        let paths = self.paths(class);
        let filter = &self.config.volatility;
        let screened = if class.is_futures() {
            collect::find_volatile_futures(self.futures, &paths, filter, self.start, self.end, self.progress).await
        } else {
            collect::find_volatile_stocks(
                self.listing,
                self.stocks,
                &paths,
                filter,
                self.start,
                self.end,
                self.progress,
            )
            .await
        };
        let screening = screened.with_context(|| format!("finding volatile {} instruments", class))?;
        tracing::info!(%class, volatile = ?screening.volatile, "volatile instruments");
        Ok(())
    }

    /// The tickers `class` models
    pub fn model_tickers(&self, class: AssetClass) -> anyhow::Result<Vec<String>> {
        if self.uses_custom_tickers(class) {
            return Ok(self.config.custom_tickers.clone());
        }
        let path = self.paths(class).volatile_tickers();
        read_tickers(&path).with_context(|| format!("reading {}", path.display()))
    }

    async fn history(&self, class: AssetClass, paths: &ClassPaths, ticker: &str) -> crate::Result<Vec<Tick>> {
        let saved = paths.series(ticker);
        let ticks = if class.is_futures() && saved.exists() {
            load_ticks(&saved)?
        } else {
            self.price_source(class).daily_ticks(ticker, self.end).await?
        };
        Ok(restrict(ticks, NaiveDate::MIN, self.end))
    }

    /// Forecast every ticker of `class` and save the prediction table.
    ///
    /// Tickers that cannot be downloaded or modelled are logged and left out; the stage fails only if none succeed.
    pub async fn model(&self, class: AssetClass) -> anyhow::Result<PredictionTable> {
        let paths = self.paths(class);
        let tickers = self.model_tickers(class)?;
        let model = &self.config.model;
        let weights = if model.save_weights {
            Some(paths.models())
        } else {
            None
        };

        let progress = ticker_progress(tickers.len(), self.progress);
        progress.set_prefix("Modelling");
        let mut forecasts: Vec<TickerForecast> = Vec::with_capacity(tickers.len());
        for ticker in &tickers {
            progress.set_message(ticker.clone());
            let forecast = match self.history(class, &paths, ticker).await {
                Ok(ticks) => forecast_ticker(
                    self.trainer,
                    ticker,
                    &ticks,
                    model.lookback,
                    &model.horizons,
                    weights.as_deref(),
                ),
                Err(err) => Err(err),
            };
            match forecast {
                Ok(forecast) => forecasts.push(forecast),
                Err(err) => tracing::warn!(%class, ticker = %ticker, error = %err, "could not model ticker"),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        if forecasts.is_empty() {
            bail!("none of the {} {} tickers could be modelled", tickers.len(), class);
        }

        let table = PredictionTable::from_forecasts(&forecasts, model.horizons.len());
        let path = paths.closing_predictions(self.uses_custom_tickers(class));
        table
            .save(&path)
            .with_context(|| format!("saving {}", path.display()))?;
        tracing::info!(%class, tickers = forecasts.len(), path = %path.display(), "saved predictions");
        Ok(table)
    }

    /// Render charts and the summary from the saved prediction table, then publish them
    pub async fn plot(&self, class: AssetClass) -> anyhow::Result<ReportFiles> {
        let path = self
            .paths(class)
            .closing_predictions(self.uses_custom_tickers(class));
        let table = PredictionTable::load(&path).with_context(|| format!("loading {}", path.display()))?;
        let report = write_report(
            &table,
            class,
            &self.config.time_frames,
            self.config.model.horizons.len(),
            &self.config.assets_dir,
        )
        .with_context(|| format!("rendering {} report", class))?;
        publish_report(self.publisher, class, &report)
            .await
            .with_context(|| format!("publishing {} report", class))?;
        Ok(report)
    }

    /// Retry the failed downloads of `class`
    pub async fn retry_failed(&self, class: AssetClass) -> anyhow::Result<()> {
        let recovered =
            collect::retry_failed_downloads(self.price_source(class), &self.paths(class), self.end, self.progress)
                .await
                .context("retrying failed downloads")?;
        tracing::info!(%class, recovered = ?recovered, "recovered downloads");
        Ok(())
    }

    /// Run the selected stages for one class
    pub async fn handle(&self, class: AssetClass, stages: Stages) -> ClassOutcome {
        let started = Instant::now();
        let mut failed = Vec::new();
        if stages.names {
            check(class, "names", self.names(class).await, &mut failed);
        }
        if stages.volatile {
            check(class, "volatile", self.volatile(class).await, &mut failed);
        }
        if stages.model {
            check(class, "model", self.model(class).await, &mut failed);
        }
        if stages.plot {
            check(class, "plot", self.plot(class).await, &mut failed);
        }
        if stages.retry_failed {
            check(class, "retry-failed", self.retry_failed(class).await, &mut failed);
        }
        let elapsed = started.elapsed();
        let (minutes, seconds) = minutes_seconds(elapsed);
        tracing::info!(
            %class,
            failed = failed.len(),
            "analyzed {} data in {} minutes and {:.2} seconds",
            class,
            minutes,
            seconds
        );
        ClassOutcome {
            class,
            failed,
            elapsed,
        }
    }

    /// Run the selected stages for each class in turn
    pub async fn run(&self, classes: &[AssetClass], stages: Stages) -> Vec<ClassOutcome> {
        let mut outcomes = Vec::with_capacity(classes.len());
        for &class in classes {
            outcomes.push(self.handle(class, stages).await);
        }
        outcomes
    }
}

fn check<T>(class: AssetClass, stage: &'static str, result: anyhow::Result<T>, failed: &mut Vec<&'static str>) {
    if let Err(err) = result {
        tracing::error!(%class, stage, error = %format!("{:#}", err), "stage failed");
        failed.push(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_sets() {
        assert!(Stages::default().is_empty());
        assert!(!Stages::MODEL_AND_PLOT.is_empty());
        assert!(Stages::ALL.retry_failed);
        assert!(!Stages::MODEL_AND_PLOT.names);
    }
}
