/*!
CSV storage for daily tick series
*/
use super::Tick;
use crate::Result;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// The date format used by every stored series
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Deserialize tick data
pub fn deserialize_ticks<R: Read>(rdr: R) -> impl Iterator<Item = std::result::Result<Tick, csv::Error>> {
    csv::Reader::from_reader(rdr).into_deserialize()
}

/// Read tick data written by [`write_ticks`]
pub fn read_ticks<R: Read>(rdr: R) -> Result<Vec<Tick>> {
    let ticks: Vec<Tick> = deserialize_ticks(rdr).collect::<std::result::Result<_, _>>()?;
    Ok(ticks)
}

/// Read ticks from a vendor CSV with a date column and one or more close columns, skipping rows that do not parse.
///
/// Columns are matched by header name, case-insensitively. Each row takes its close from the first of
/// `close_columns` holding a finite price, so a row missing its settlement falls back to the next column.
pub fn read_close_csv<R: Read>(rdr: R, date_column: &str, close_columns: &[&str]) -> Result<Vec<Tick>> {
    let mut rdr = csv::Reader::from_reader(rdr);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    };
    let date_idx = position(date_column)
        .ok_or_else(|| crate::Error::parse(format!("missing {:?} column", date_column)))?;
    let close_idxs: Vec<usize> = close_columns.iter().filter_map(|name| position(name)).collect();
    if close_idxs.is_empty() {
        return Err(crate::Error::parse(format!("missing any of {:?} columns", close_columns)));
    }
    let mut ticks: Vec<Tick> = rdr
        .records()
        .filter_map(|record| {
            let record = record.ok()?;
            let t = NaiveDate::parse_from_str(record.get(date_idx)?.trim(), DATE_FORMAT).ok()?;
            let c = close_idxs.iter().find_map(|&idx| {
                f64::from_str(record.get(idx)?.trim())
                    .ok()
                    .filter(|c| c.is_finite())
            })?;
            Some(Tick::close_only(t, c))
        })
        .collect();
    ticks.sort_by_key(|tick| tick.t);
    Ok(ticks)
}

/// Write tick data to a Writer
/// On success, return how many ticks were written
pub fn write_ticks<W, I>(wtr: W, ticks: I) -> Result<usize>
where
    W: Write,
    I: Iterator<Item = Tick>,
{
    let mut wtr = csv::Writer::from_writer(wtr);
    let mut written = 0;
    for tick in ticks {
        wtr.serialize(tick)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

/// Save a series to `path`, creating parent directories as needed
pub fn save_ticks(path: &Path, ticks: &[Tick]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_ticks(File::create(path)?, ticks.iter().copied())
}

/// Load a series saved with [`save_ticks`]
pub fn load_ticks(path: &Path) -> Result<Vec<Tick>> {
    read_ticks(File::open(path)?)
}
