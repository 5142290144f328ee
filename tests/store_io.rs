/*!
Test series and prediction table IO
*/
use chrono::NaiveDate;
use closecast::data::{fake::*, store::*, *};
use closecast::forecast::TickerForecast;
use closecast::report::PredictionTable;
use rand::{rngs::StdRng, SeedableRng};
use std::io::{Seek, SeekFrom};
use tempfile::tempfile;

#[test]
fn fake_data_roundtrip() {
    const TEST_DATA_LENGTH: usize = 10000;
    let price_gen = PriceRandomWalk::new(StdRng::seed_from_u64(42), 40.0, 0.02).expect("sigma is valid");
    let ticks: Vec<Tick> = TickGen {
        date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        price_gen,
    }
    .take(TEST_DATA_LENGTH)
    .collect();
    let mut tmp = tempfile().expect("Tempfile creation should not fail!");
    let written = write_ticks(&mut tmp, ticks.iter().copied()).expect("Writing test data should not fail!");
    assert_eq!(written, TEST_DATA_LENGTH);
    tmp.seek(SeekFrom::Start(0)).expect("Seek should not fail");
    let read_ticks = read_ticks(&mut tmp).expect("Reading test data should not fail");
    assert_eq!(ticks, read_ticks);
}

#[test]
fn saved_series_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let ticks = ticks_from_fn(start, 20, |i| 50.0 + i as f64 * 0.25);
    let path = dir.path().join("metal_data/metal_data-GC.csv");
    assert_eq!(save_ticks(&path, &ticks).unwrap(), 20);
    let loaded = load_ticks(&path).unwrap();
    assert_eq!(closes(&loaded), closes(&ticks));

    let forecast = TickerForecast {
        ticker: "GC".into(),
        dates: loaded.iter().map(|t| t.t).collect(),
        actual: closes(&loaded),
        fitted: closes(&loaded).iter().map(|c| c - 0.125).collect(),
        forecasts: vec![55.5, 55.75, 56.0],
    };
    let table = PredictionTable::from_forecasts(&[forecast], 3);
    let table_path = dir.path().join("metal_data/metal_data-closing_predictions.csv");
    table.save(&table_path).unwrap();
    let reloaded = PredictionTable::load(&table_path).unwrap();
    assert_eq!(reloaded, table);
    assert_eq!(reloaded.len(), 23);
    assert_eq!(reloaded.series[0].actual[22], Some(56.0));
}
