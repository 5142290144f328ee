/*!
Collect prices for discovered instruments, filter the volatile ones and keep track of failed downloads
*/
use crate::config::VolatilityConfig;
use crate::data::store::save_ticks;
use crate::data::{read_tickers, read_tickers_or_empty, restrict, write_tickers};
use crate::instrument::ClassPaths;
use crate::source::alphavantage::parse_active_stocks;
use crate::source::cme::{scrape_names, ScrapedNames};
use crate::source::{ListingSource, PageFetcher, PriceSource};
use crate::{Error, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use statrs::statistics::Statistics;
use std::collections::HashSet;
use std::fs;
use ta::Close;

/// Annualised volatility, in percent: the sample standard deviation of daily percentage returns, scaled by
/// `annualization ^ exponent`.
///
/// Returns following a zero or non-finite close are skipped; `None` with fewer than two returns.
pub fn volatility(closes: &[f64], annualization: f64, exponent: f64) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|pair| pair[0] != 0.0 && pair[0].is_finite() && pair[1].is_finite())
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();
    if returns.len() < 2 {
        return None;
    }
    Some(returns.iter().std_dev() * annualization.powf(exponent) * 100.0)
}

/// A progress bar over `len` tickers, hidden unless `show`
pub fn ticker_progress(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{prefix}: {wide_bar} {pos}/{len}: {msg}") {
        bar.set_style(style)
    }
    bar
}

/// The outcome of screening a list of tickers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screening {
    /// Tickers that passed the filter, in input order
    pub volatile: Vec<String>,
    /// Tickers whose download failed or returned nothing in range
    pub failed: Vec<String>,
}

/// Screens tickers for volatility over a date range
pub struct Screener<'a, P: ?Sized> {
    /// Where prices come from
    pub source: &'a P,
    /// The thresholds applied
    pub filter: &'a VolatilityConfig,
    /// First day of the range, inclusive
    pub start: NaiveDate,
    /// Last day of the range, inclusive
    pub end: NaiveDate,
    /// Whether the last close must exceed `filter.min_last_close`
    pub check_last_close: bool,
    /// When set, each downloaded series is saved under these paths
    pub save_series: Option<&'a ClassPaths>,
    /// Draw a progress bar
    pub progress: bool,
}

impl<'a, P: PriceSource + ?Sized> Screener<'a, P> {
    /// The volatility of `ticker` over the range if it passes the filter, `None` if it does not
    pub async fn assess(&self, ticker: &str) -> Result<Option<f64>> {
        let ticks = self.source.daily_ticks(ticker, self.end).await?;
        if let Some(paths) = self.save_series {
            if let Err(err) = save_ticks(&paths.series(ticker), &ticks) {
                tracing::warn!(ticker, error = %err, "failed to save series");
            }
        }
        let ticks = restrict(ticks, self.start, self.end);
        let last = ticks.last().ok_or_else(|| Error::NoData {
            ticker: ticker.to_string(),
        })?;
        if self.check_last_close && last.close() <= self.filter.min_last_close {
            return Ok(None);
        }
        let closes: Vec<f64> = ticks.iter().map(Close::close).collect();
        Ok(volatility(&closes, self.filter.annualization, self.filter.exponent)
            .filter(|&v| v > self.filter.min_volatility))
    }

    /// Screen every ticker, sorting each into volatile, failed, or neither
    pub async fn screen<S: AsRef<str>>(&self, tickers: &[S]) -> Screening {
        let mut screening = Screening::default();
        let progress = ticker_progress(tickers.len(), self.progress);
        progress.set_prefix("Screening");
        for ticker in tickers {
            let ticker = ticker.as_ref();
            match self.assess(ticker).await {
                Ok(Some(volatility)) => {
                    tracing::info!(ticker, volatility, "volatile");
                    progress.set_message(format!("{} added: volatility = {:.4}%", ticker, volatility));
                    screening.volatile.push(ticker.to_string());
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(ticker, error = %err, "download failed");
                    screening.failed.push(ticker.to_string());
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        tracing::info!(
            volatile = screening.volatile.len(),
            failed = screening.failed.len(),
            "screened tickers"
        );
        screening
    }
}

/// Split `tickers` into those to screen and those skipped because they failed before
pub fn skip_previous_failures(tickers: Vec<String>, previous: &[String]) -> (Vec<String>, Vec<String>) {
    let previous: HashSet<&str> = previous.iter().map(String::as_str).collect();
    tickers
        .into_iter()
        .partition(|ticker| !previous.contains(ticker.as_str()))
}

/// Persist a screening: the volatile list is replaced only when non-empty, and the failure list only when there are
/// new failures, in which case it becomes the skipped earlier failures followed by the new ones
pub fn record_screening(paths: &ClassPaths, screening: &Screening, skipped: &[String]) -> Result<()> {
    if !screening.volatile.is_empty() {
        write_tickers(&paths.volatile_tickers(), &screening.volatile)?;
        tracing::info!(class = %paths.class, count = screening.volatile.len(), "updated volatile list");
    }
    if screening.failed.is_empty() {
        tracing::info!(class = %paths.class, "no new failed downloads");
    } else {
        let failed: Vec<&String> = skipped.iter().chain(&screening.failed).collect();
        write_tickers(&paths.failed_tickers(), &failed)?;
        tracing::info!(class = %paths.class, count = failed.len(), "updated failed downloads list");
    }
    Ok(())
}

/// Active stocks from the listing vendor, minus earlier failures
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveStocks {
    /// Tickers to screen
    pub active: Vec<String>,
    /// Active tickers skipped because their download failed before
    pub skipped: Vec<String>,
}

/// Refresh the listing snapshot and read the active stocks from it.
///
/// When the vendor fails or answers with something that is not a listing, the previous snapshot is used.
pub async fn find_active_stocks<L: ListingSource + ?Sized>(listing: &L, paths: &ClassPaths) -> Result<ActiveStocks> {
    let fetched = match listing.listing_csv().await {
        Ok(csv) => parse_active_stocks(&csv).map(|active| (csv, active)),
        Err(err) => Err(err),
    };
    let active = match fetched {
        Ok((csv, active)) => {
            fs::create_dir_all(&paths.dir)?;
            fs::write(paths.listing_status(), csv)?;
            tracing::info!(count = active.len(), "updated stock listings");
            active
        }
        Err(err) => {
            tracing::warn!(error = %err, "listing refresh failed, using previous snapshot");
            parse_active_stocks(&fs::read_to_string(paths.listing_status())?)?
        }
    };
    let previous = read_tickers_or_empty(&paths.failed_tickers())?;
    let (active, skipped) = skip_previous_failures(active, &previous);
    tracing::info!(
        active = active.len(),
        skipped = skipped.len(),
        "ignored previously failed downloads"
    );
    Ok(ActiveStocks { active, skipped })
}

/// Screen the active stocks for volatility over `[start, end]` and record the outcome
pub async fn find_volatile_stocks<L, P>(
    listing: &L,
    source: &P,
    paths: &ClassPaths,
    filter: &VolatilityConfig,
    start: NaiveDate,
    end: NaiveDate,
    progress: bool,
) -> Result<Screening>
where
    L: ListingSource + ?Sized,
    P: PriceSource + ?Sized,
{
    let stocks = find_active_stocks(listing, paths).await?;
    let screener = Screener {
        source,
        filter,
        start,
        end,
        check_last_close: true,
        save_series: None,
        progress,
    };
    let screening = screener.screen(&stocks.active).await;
    record_screening(paths, &screening, &stocks.skipped)?;
    Ok(screening)
}

/// Download every scraped clearing code of a futures class, save each series, then screen and record as for stocks.
///
/// Futures carry no minimum price.
pub async fn find_volatile_futures<P: PriceSource + ?Sized>(
    source: &P,
    paths: &ClassPaths,
    filter: &VolatilityConfig,
    start: NaiveDate,
    end: NaiveDate,
    progress: bool,
) -> Result<Screening> {
    let codes = read_tickers(&paths.clearing_tickers())?;
    let previous = read_tickers_or_empty(&paths.failed_tickers())?;
    let (codes, skipped) = skip_previous_failures(codes, &previous);
    let screener = Screener {
        source,
        filter,
        start,
        end,
        check_last_close: false,
        save_series: Some(paths),
        progress,
    };
    let screening = screener.screen(&codes).await;
    record_screening(paths, &screening, &skipped)?;
    Ok(screening)
}

/// Scrape a futures class's names from CME and save the Globex and clearing lists.
///
/// An empty list leaves the previous file in place.
pub async fn discover_futures_names<F: PageFetcher + ?Sized>(fetcher: &F, paths: &ClassPaths) -> Result<ScrapedNames> {
    let names = scrape_names(fetcher, paths.class).await?;
    if !names.globex.is_empty() {
        write_tickers(&paths.globex_tickers(), &names.globex)?;
    }
    if names.clearing.is_empty() {
        tracing::warn!(class = %paths.class, "no clearing codes found, keeping previous list");
    } else {
        write_tickers(&paths.clearing_tickers(), &names.clearing)?;
    }
    Ok(names)
}

/// Retry every listed failed download, dropping the ones that now return data; returns the recovered tickers
pub async fn retry_failed_downloads<P: PriceSource + ?Sized>(
    source: &P,
    paths: &ClassPaths,
    end: NaiveDate,
    progress: bool,
) -> Result<Vec<String>> {
    let previous = read_tickers_or_empty(&paths.failed_tickers())?;
    let bar = ticker_progress(previous.len(), progress);
    bar.set_prefix("Retrying");
    let mut recovered = Vec::new();
    let mut still_failed = Vec::new();
    for ticker in previous {
        match source.daily_ticks(&ticker, end).await {
            Ok(ticks) if !ticks.is_empty() => {
                tracing::info!(ticker = %ticker, "previously failed download now responsive");
                recovered.push(ticker)
            }
            _ => still_failed.push(ticker),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    write_tickers(&paths.failed_tickers(), &still_failed)?;
    tracing::info!(
        class = %paths.class,
        recovered = recovered.len(),
        remaining = still_failed.len(),
        "retried failed downloads"
    );
    Ok(recovered)
}
