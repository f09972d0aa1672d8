//! CLI entry point for the rail advisory tool.
//!
//! Provides subcommands for one-shot recommendation runs, model training,
//! weather lookups, and a long-running watch mode with periodic retraining.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rail_advisor::loader::{load_snapshot, load_timetable};
use rail_advisor::output::{RecommendationRecord, append_record};
use rail_advisor::service::{AdvisoryService, spawn_retraining};
use rail_advisor::store::JsonFileStore;
use rail_advisor::types::NetworkSnapshot;
use rail_advisor::weather::{DEFAULT_CACHE_TTL, OpenWeatherClient, WeatherService};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rail_advisor")]
#[command(about = "Traffic optimization advisor for rail networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Input files and model directory shared by every subcommand.
#[derive(Args, Clone)]
struct DataArgs {
    /// JSON file with the live train feed
    #[arg(long, default_value = "data/trains.json")]
    trains: String,

    /// JSON file with station reference data
    #[arg(long, default_value = "data/stations.json")]
    stations: String,

    /// JSON file with the static timetable
    #[arg(long, default_value = "data/timetable.json")]
    timetable: String,

    /// Directory holding trained model state
    #[arg(long, default_value = "models")]
    models: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate ranked recommendations from the current network state
    Recommend {
        #[command(flatten)]
        data: DataArgs,

        /// CSV file to append recommendation summaries to
        #[arg(short, long, default_value = "recommendations.csv")]
        output: String,
    },
    /// Train both models on the current network state
    Train {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Assess a single train: predicted delay, congestion, optimal speed
    PredictDelay {
        #[command(flatten)]
        data: DataArgs,

        /// Train identifier from the live feed
        train_id: String,
    },
    /// Show the weather reading for one station, or for all of them
    Weather {
        #[command(flatten)]
        data: DataArgs,

        /// Station name or code; omit to list every station
        station: Option<String>,
    },
    /// Run continuously: retrain and regenerate recommendations on a schedule
    Watch {
        #[command(flatten)]
        data: DataArgs,

        /// Seconds between runs
        #[arg(short, long, default_value_t = 1800)]
        interval: u64,

        /// CSV file to append recommendation summaries to
        #[arg(short, long, default_value = "recommendations.csv")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/rail_advisor.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rail_advisor.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Recommend { data, output } => {
            let service = build_service(&data)?;
            let snapshot = load_snapshot(&data.trains, &data.stations)?;
            run_recommendations(&service, &snapshot, &output).await?;
        }
        Commands::Train { data } => {
            let service = build_service(&data)?;
            let snapshot = load_snapshot(&data.trains, &data.stations)?;
            let outcome = service.train_models(&snapshot).await;
            if outcome.success {
                println!("{}", serde_json::to_string_pretty(&outcome.metrics)?);
            } else {
                warn!("training did not complete; previous models unchanged");
            }
        }
        Commands::PredictDelay { data, train_id } => {
            let service = build_service(&data)?;
            let snapshot = load_snapshot(&data.trains, &data.stations)?;
            match service.assess_train(&snapshot, &train_id).await {
                Some(assessment) => {
                    println!("{}", serde_json::to_string_pretty(&assessment)?);
                }
                None => error!(train = %train_id, "train not found or not predictable"),
            }
        }
        Commands::Weather { data, station } => {
            let service = build_service(&data)?;
            let snapshot = load_snapshot(&data.trains, &data.stations)?;
            match station {
                Some(key) => match service.weather_for_station(&snapshot.stations, &key).await {
                    Some(reading) => println!("{}", serde_json::to_string_pretty(&reading)?),
                    None => error!(station = %key, "no such station"),
                },
                None => {
                    let readings = service.weather_for_all_stations(&snapshot.stations).await;
                    println!("{}", serde_json::to_string_pretty(&readings)?);
                }
            }
        }
        Commands::Watch {
            data,
            interval,
            output,
        } => {
            watch(data, interval, output).await?;
        }
    }

    Ok(())
}

/// Wires the weather client, model store, and timetable into a service.
fn build_service(data: &DataArgs) -> Result<AdvisoryService> {
    let api_key =
        std::env::var("OPENWEATHER_API_KEY").unwrap_or_else(|_| "demo".to_string());
    if api_key == "demo" {
        warn!("OPENWEATHER_API_KEY not set; weather lookups will fall back to defaults");
    }

    let weather = WeatherService::new(
        Box::new(OpenWeatherClient::new(api_key)?),
        DEFAULT_CACHE_TTL,
    );
    let store = JsonFileStore::new(&data.models)?;
    let timetable = load_timetable(&data.timetable)?;

    Ok(AdvisoryService::new(timetable, weather, Box::new(store)))
}

/// One full synthesis pass: print the ranked set and append the CSV log.
async fn run_recommendations(
    service: &AdvisoryService,
    snapshot: &NetworkSnapshot,
    output: &str,
) -> Result<()> {
    let (recommendations, metrics) = service.generate_recommendations(snapshot).await;

    for rec in &recommendations {
        append_record(output, &RecommendationRecord::from_recommendation(rec))?;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "recommendations": recommendations,
            "metrics": metrics,
        }))?
    );
    Ok(())
}

/// Long-running mode: retraining runs on its own schedule in the
/// background while the foreground loop regenerates recommendations.
async fn watch(data: DataArgs, interval: u64, output: String) -> Result<()> {
    let service = Arc::new(build_service(&data)?);
    let period = Duration::from_secs(interval);

    let trains = data.trains.clone();
    let stations = data.stations.clone();
    let trainer = spawn_retraining(service.clone(), period, move || {
        load_snapshot(&trains, &stations)
    });

    info!(interval, "watch mode started");
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        match load_snapshot(&data.trains, &data.stations) {
            Ok(snapshot) => {
                if let Err(e) = run_recommendations(&service, &snapshot, &output).await {
                    error!(error = %e, "recommendation run failed");
                }
            }
            Err(e) => {
                error!(error = %e, "could not load network snapshot");
            }
        }

        if trainer.is_finished() {
            error!("retraining task stopped unexpectedly");
            break;
        }
    }

    Ok(())
}
