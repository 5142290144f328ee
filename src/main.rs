/*!
Discover, collect, model and chart financial instruments from the command line
*/
use anyhow::{format_err, Context};
use chrono::NaiveDate;
use clap::{Arg, ArgAction, ArgMatches, Command};
use closecast::config::Config;
use closecast::data::store::DATE_FORMAT;
use closecast::instrument::AssetClass;
use closecast::lstm::{device_from_name, CloseLSTMDesc, LstmTrainer};
use closecast::pipeline::{Pipeline, Stages};
use closecast::publish;
use closecast::source::{AlphaVantageSource, Http, QuandlSource, YahooSource};
use closecast::util::quarter_dates;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|err| format!("expected YYYY-MM-DD: {}", err))
}

fn parse_class(s: &str) -> Result<AssetClass, String> {
    s.parse::<AssetClass>().map_err(|err| err.to_string())
}

fn classes_arg() -> Arg {
    Arg::new("CLASSES")
        .help("Asset classes to handle: stocks, agriculture, energy, fx, metal. Defaults to all of them")
        .num_args(0..)
        .value_parser(parse_class)
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help).action(ArgAction::SetTrue)
}

fn cli() -> Command {
    Command::new("closecast")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Finds volatile instruments, forecasts their next closes with an LSTM and charts the results")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON configuration file")
                .default_value("config.json")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Sets the level of verbosity")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .help("Device to train on: cuda, cpu. Overrides the configuration")
                .global(true),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .help("First day of the screening range. Defaults to the start of the current quarter")
                .value_parser(parse_date)
                .global(true),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .help("Last day of data to use. Defaults to today")
                .value_parser(parse_date)
                .global(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed libtorch for reproducible training")
                .value_parser(clap::value_parser!(i64))
                .global(true),
        )
        .arg(flag("no-progress", "Do not draw progress bars").global(true))
        .subcommand(
            Command::new("run")
                .about("Run the selected stages; modelling and plotting when none are selected")
                .arg(flag("names", "Discover instrument names"))
                .arg(flag("volatile", "Collect prices and find volatile instruments"))
                .arg(flag("model", "Train models and write prediction tables"))
                .arg(flag("plot", "Render and publish charts"))
                .arg(flag("retry-failed", "Retry failed downloads"))
                .arg(flag("all", "Run every stage"))
                .arg(classes_arg()),
        )
        .subcommand(
            Command::new("names")
                .about("Discover instrument names")
                .arg(classes_arg()),
        )
        .subcommand(
            Command::new("volatile")
                .about("Collect prices and find volatile instruments")
                .arg(classes_arg()),
        )
        .subcommand(
            Command::new("model")
                .about("Train models and write prediction tables")
                .arg(classes_arg()),
        )
        .subcommand(
            Command::new("plot")
                .about("Render and publish charts")
                .arg(classes_arg()),
        )
        .subcommand(
            Command::new("retry")
                .about("Retry failed downloads")
                .arg(classes_arg()),
        )
}

fn selected_stages(command: &str, matches: &ArgMatches) -> Stages {
    let only = Stages::default();
    match command {
        "names" => Stages { names: true, ..only },
        "volatile" => Stages {
            volatile: true,
            ..only
        },
        "model" => Stages { model: true, ..only },
        "plot" => Stages { plot: true, ..only },
        "retry" => Stages {
            retry_failed: true,
            ..only
        },
        _ if matches.get_flag("all") => Stages::ALL,
        _ => {
            let selected = Stages {
                names: matches.get_flag("names"),
                volatile: matches.get_flag("volatile"),
                model: matches.get_flag("model"),
                plot: matches.get_flag("plot"),
                retry_failed: matches.get_flag("retry-failed"),
            };
            if selected.is_empty() {
                Stages::MODEL_AND_PLOT
            } else {
                selected
            }
        }
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let (command, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| format_err!("a command is required"))?;
    dotenv::dotenv().ok();
    init_tracing(sub_matches.get_count("verbose"));

    let config_path = sub_matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    if let Some(device) = sub_matches.get_one::<String>("device") {
        config.model.device = device.clone();
    }

    let (quarter_start, today) = quarter_dates(chrono::Local::now().date_naive());
    let start = sub_matches.get_one::<NaiveDate>("start").copied().unwrap_or(quarter_start);
    let end = sub_matches.get_one::<NaiveDate>("end").copied().unwrap_or(today);
    if start > end {
        return Err(format_err!("start date {} is after end date {}", start, end));
    }
    let progress = !sub_matches.get_flag("no-progress");

    let classes: Vec<AssetClass> = match sub_matches.get_many::<AssetClass>("CLASSES") {
        Some(classes) => classes.copied().collect(),
        None => AssetClass::ALL.to_vec(),
    };
    let stages = selected_stages(command, sub_matches);
    tracing::info!(?stages, ?classes, %start, %end, "starting run");

    let http = Http::new(&config.http)?;
    let yahoo = YahooSource::new(http.clone());
    let quandl = QuandlSource::new(http.clone(), config.quandl.api_key.clone());
    let alpha_vantage = AlphaVantageSource::new(http.clone(), config.alpha_vantage.api_key.clone());
    let publisher = publish::from_config(&config.publish, &http);

    let model = &config.model;
    let trainer = LstmTrainer {
        desc: CloseLSTMDesc {
            inputs: 1,
            first_hidden: model.first_hidden,
            second_hidden: model.second_hidden,
            dense: model.dense,
            dropout: model.dropout,
        },
        device: device_from_name(&model.device)?,
        epochs: model.epochs,
        batch_size: model.batch_size,
        learning_rate: model.learning_rate,
        seed: sub_matches.get_one::<i64>("seed").copied(),
        progress,
    };

    let pipeline = Pipeline {
        config: &config,
        stocks: &yahoo,
        futures: &quandl,
        listing: &alpha_vantage,
        pages: &http,
        trainer: &trainer,
        publisher: &*publisher,
        start,
        end,
        progress,
    };
    let outcomes = pipeline.run(&classes, stages).await;

    let failures: Vec<String> = outcomes
        .iter()
        .filter(|outcome| !outcome.failed.is_empty())
        .map(|outcome| format!("{} ({})", outcome.class, outcome.failed.join(", ")))
        .collect();
    if failures.is_empty() {
        tracing::info!("all stages completed");
    } else {
        tracing::warn!(failures = %failures.join("; "), "some stages failed");
    }
    Ok(())
}
