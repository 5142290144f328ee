/*!
Daily price data and ticker list IO
*/
use crate::*;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::Path;
use ta::{Close, High, Low, Open, Volume};

pub mod fake;
pub mod scale;
pub mod store;

/// Daily bar for an instrument
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Tick<D = NaiveDate, F = CpuFloat> {
    /// This tick's date
    pub t: D,
    /// The opening price of this tick
    pub o: F,
    /// The high price of this tick
    pub h: F,
    /// The low price of this tick
    pub l: F,
    /// The closing (or settlement) price of this tick
    pub c: F,
    /// The volume traded this tick
    pub v: F,
}

impl<D> Tick<D> {
    /// A tick carrying only a close; the other prices repeat it and volume is zero
    pub fn close_only(t: D, c: CpuFloat) -> Tick<D> {
        Tick {
            t,
            o: c,
            h: c,
            l: c,
            c,
            v: 0.0,
        }
    }
}

/// The closing prices of a tick series
pub fn closes<D, F: Copy>(ticks: &[Tick<D, F>]) -> Vec<F> {
    ticks.iter().map(|tick| tick.c).collect()
}

/// Keep ticks dated within `[start, end]`, inclusive
pub fn restrict<F>(ticks: Vec<Tick<NaiveDate, F>>, start: NaiveDate, end: NaiveDate) -> Vec<Tick<NaiveDate, F>> {
    ticks
        .into_iter()
        .filter(|tick| tick.t >= start && tick.t <= end)
        .collect()
}

impl<D, F> Open for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn open(&self) -> f64 {
        self.o.into()
    }
}

impl<D, F> High for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn high(&self) -> f64 {
        self.h.into()
    }
}

impl<D, F> Low for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn low(&self) -> f64 {
        self.l.into()
    }
}

impl<D, F> Close for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn close(&self) -> f64 {
        self.c.into()
    }
}

impl<D, F> Volume for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn volume(&self) -> f64 {
        self.v.into()
    }
}

/// Read a newline-delimited ticker list, trimming whitespace and dropping blank lines
pub fn read_tickers(path: &Path) -> Result<Vec<String>> {
    let file = fs::File::open(path)?;
    let mut tickers = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let ticker = line.trim();
        if !ticker.is_empty() {
            tickers.push(ticker.to_string())
        }
    }
    Ok(tickers)
}

/// Read a ticker list, treating a missing file as an empty list
pub fn read_tickers_or_empty(path: &Path) -> Result<Vec<String>> {
    match read_tickers(path) {
        Err(Error::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        result => result,
    }
}

/// Write a ticker list, one per line, creating parent directories as needed
pub fn write_tickers<S: AsRef<str>>(path: &Path, tickers: &[S]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = std::io::BufWriter::new(fs::File::create(path)?);
    for ticker in tickers {
        writeln!(file, "{}", ticker.as_ref())?;
    }
    file.flush()?;
    Ok(())
}
