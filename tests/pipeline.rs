/*!
Run the pipeline end to end against in-memory vendors, pages and models
*/
use async_trait::async_trait;
use chrono::NaiveDate;
use closecast::config::Config;
use closecast::data::{fake::ticks_from_fn, read_tickers, Tick};
use closecast::instrument::{AssetClass, ClassPaths};
use closecast::lstm::{Forecaster, Trainer};
use closecast::pipeline::{Pipeline, Stages};
use closecast::publish::{data_key, graph_key, LocalPublisher};
use closecast::report::TimeFrame;
use closecast::source::{ListingSource, PageFetcher, PriceSource};
use closecast::window::Windows;
use closecast::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

struct Prices(HashMap<String, Vec<Tick>>);

#[async_trait]
impl PriceSource for Prices {
    async fn daily_ticks(&self, ticker: &str, end: NaiveDate) -> Result<Vec<Tick>> {
        match self.0.get(ticker) {
            Some(ticks) => Ok(ticks.iter().copied().filter(|t| t.t <= end).collect()),
            None => Err(Error::Status {
                status: 404,
                url: ticker.into(),
            }),
        }
    }
}

struct Listing;

#[async_trait]
impl ListingSource for Listing {
    async fn listing_csv(&self) -> Result<String> {
        Ok("symbol,name,exchange,assetType,ipoDate,delistingDate,status\n\
            WILD,Wild Corp,NYSE,Stock,1999-11-18,null,Active\n\
            CALM,Calm Corp,NYSE,Stock,1999-11-18,null,Active\n\
            GONE,Gone Corp,NYSE,Stock,1999-11-18,null,Active\n\
            FUND,Some Fund,NYSE ARCA,ETF,2020-09-09,null,Active\n"
            .into())
    }
}

struct Pages(HashMap<String, String>);

#[async_trait]
impl PageFetcher for Pages {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.0.get(url).cloned().ok_or_else(|| Error::Status {
            status: 404,
            url: url.into(),
        })
    }
}

/// Predicts the last observation of each window
struct Persistence;

impl Forecaster for Persistence {
    fn predict(&self, inputs: &[Vec<f32>]) -> Result<Vec<f32>> {
        Ok(inputs.iter().map(|w| w[w.len() - 1]).collect())
    }
}

impl Trainer for Persistence {
    fn fit(&self, _windows: &Windows) -> Result<Box<dyn Forecaster>> {
        Ok(Box::new(Persistence))
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn prices() -> Prices {
    let start = ymd(2024, 4, 1);
    let mut map = HashMap::new();
    map.insert("WILD".to_string(), ticks_from_fn(start, 30, |i| if i % 2 == 0 { 100.0 } else { 110.0 }));
    map.insert("CALM".to_string(), ticks_from_fn(start, 30, |i| 100.0 + i as f64 * 0.01));
    map.insert("CL".to_string(), ticks_from_fn(start, 30, |i| if i % 3 == 0 { 70.0 } else { 80.0 }));
    Prices(map)
}

fn cme_pages() -> Pages {
    let pages = [
        (
            "https://www.cmegroup.com/markets/energy.html#products",
            r#"<a class="chevron-right" href="/markets/energy/crude-oil.html">Crude Oil</a>"#,
        ),
        (
            "https://www.cmegroup.com/markets/energy/crude-oil.html",
            r#"<table><tr><td class="cmeTableLeft"><a href="/markets/energy/crude-oil/light-sweet-crude.html">WTI</a></td></tr></table>"#,
        ),
        (
            "https://www.cmegroup.com/markets/energy/crude-oil/light-sweet-crude.html",
            r#"<span class="globex">CL</span>
               <div class="menu-item" data-key="contractSpecs"><a href="/markets/energy/crude-oil/light-sweet-crude.contractSpecs.html">Specs</a></div>"#,
        ),
        (
            "https://www.cmegroup.com/markets/energy/crude-oil/light-sweet-crude.contractSpecs.html",
            r#"<div class="item-container"><span>Contract Unit</span><span>1,000 barrels</span></div>
               <div class="item-container"><span>Price Quotation</span><span>U.S. dollars</span></div>
               <div class="item-container"><span>Clearing Code</span><span>CL</span></div>"#,
        ),
    ];
    Pages(pages.iter().map(|(url, html)| (url.to_string(), html.to_string())).collect())
}

fn config(root: &Path) -> Config {
    let mut config = Config::default();
    config.data_dir = root.join("data");
    config.assets_dir = root.join("assets");
    config.custom_tickers = Vec::new();
    config
}

fn records(path: &Path) -> Vec<serde_json::Value> {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn every_stage_for_stocks_and_energy() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (stocks, futures, pages) = (prices(), prices(), cme_pages());
    let publisher = LocalPublisher {
        root: dir.path().join("site"),
    };
    let pipeline = Pipeline {
        config: &config,
        stocks: &stocks,
        futures: &futures,
        listing: &Listing,
        pages: &pages,
        trainer: &Persistence,
        publisher: &publisher,
        start: ymd(2024, 4, 1),
        end: ymd(2024, 6, 28),
        progress: false,
    };
    let outcomes = pipeline
        .run(&[AssetClass::Stocks, AssetClass::Energy], Stages::ALL)
        .await;
    for outcome in &outcomes {
        assert!(outcome.failed.is_empty(), "{} failed {:?}", outcome.class, outcome.failed);
    }

    let stock_paths = ClassPaths::new(&config.data_dir, AssetClass::Stocks);
    assert!(stock_paths.listing_status().exists());
    assert_eq!(read_tickers(&stock_paths.volatile_tickers()).unwrap(), vec!["WILD"]);
    assert_eq!(read_tickers(&stock_paths.failed_tickers()).unwrap(), vec!["GONE"]);
    assert!(stock_paths.closing_predictions(false).exists());

    let energy_paths = ClassPaths::new(&config.data_dir, AssetClass::Energy);
    assert_eq!(read_tickers(&energy_paths.globex_tickers()).unwrap(), vec!["CL"]);
    assert_eq!(read_tickers(&energy_paths.clearing_tickers()).unwrap(), vec!["CL"]);
    assert!(energy_paths.series("CL").exists());
    assert_eq!(read_tickers(&energy_paths.volatile_tickers()).unwrap(), vec!["CL"]);

    let site = dir.path().join("site");
    for frame in TimeFrame::DEFAULTS {
        assert!(site.join(graph_key(AssetClass::Stocks, frame)).exists());
        assert!(site.join(graph_key(AssetClass::Energy, frame)).exists());
    }
    let stocks_summary = records(&site.join(data_key(AssetClass::Stocks)));
    assert_eq!(stocks_summary.len(), 1);
    assert_eq!(stocks_summary[0]["Name"], "WILD");
    for field in ["Prediction 1", "Prediction 2", "Prediction 3"] {
        let prediction = stocks_summary[0][field].as_f64().unwrap();
        assert!((prediction - 110.0).abs() < 0.01, "{} = {}", field, prediction);
    }
    assert!(stocks_summary[0].get("Movement All Time").is_some());
    let energy_summary = records(&site.join(data_key(AssetClass::Energy)));
    assert_eq!(energy_summary[0]["Name"], "CL");
}

#[tokio::test]
async fn failed_stages_do_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (stocks, futures, pages) = (prices(), prices(), cme_pages());
    let publisher = LocalPublisher {
        root: dir.path().join("site"),
    };
    let pipeline = Pipeline {
        config: &config,
        stocks: &stocks,
        futures: &futures,
        listing: &Listing,
        pages: &pages,
        trainer: &Persistence,
        publisher: &publisher,
        start: ymd(2024, 4, 1),
        end: ymd(2024, 6, 28),
        progress: false,
    };
    // Nothing is served for metals, so every stage but the retry has nothing to work with
    let outcomes = pipeline
        .run(&[AssetClass::Metal, AssetClass::Energy], Stages::ALL)
        .await;
    assert_eq!(outcomes[0].class, AssetClass::Metal);
    assert_eq!(outcomes[0].failed, vec!["names", "volatile", "model", "plot"]);
    assert_eq!(outcomes[1].class, AssetClass::Energy);
    assert!(outcomes[1].failed.is_empty());
}

#[tokio::test]
async fn custom_tickers_use_their_own_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.custom_tickers = vec!["CALM".into(), "MISSING".into()];
    let (stocks, futures, pages) = (prices(), prices(), cme_pages());
    let publisher = LocalPublisher {
        root: dir.path().join("site"),
    };
    let pipeline = Pipeline {
        config: &config,
        stocks: &stocks,
        futures: &futures,
        listing: &Listing,
        pages: &pages,
        trainer: &Persistence,
        publisher: &publisher,
        start: ymd(2024, 4, 1),
        end: ymd(2024, 6, 28),
        progress: false,
    };
    let table = pipeline.model(AssetClass::Stocks).await.unwrap();
    assert_eq!(table.series.len(), 1);
    assert_eq!(table.series[0].ticker, "CALM");
    let paths = ClassPaths::new(&config.data_dir, AssetClass::Stocks);
    assert!(paths.closing_predictions(true).exists());
    assert!(!paths.closing_predictions(false).exists());

    let report = pipeline.plot(AssetClass::Stocks).await.unwrap();
    assert_eq!(report.graphs.len(), TimeFrame::DEFAULTS.len());
    let html = std::fs::read_to_string(&report.graphs[0].1).unwrap();
    assert!(html.contains("Last Trading Day"));
}
