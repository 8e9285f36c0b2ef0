use crate::infra::{evaluation_time, ForecastStores, MemoryForecastService};
use chrono::NaiveDate;
use clap::Args;
use seat_forecast::config::{AppConfig, ConfigError};
use seat_forecast::error::AppError;
use seat_forecast::forecast::import::{parse_facilities, parse_population, parse_snapshots};
use seat_forecast::forecast::{FacilityId, ImportedInventory, PredictionView};
use seat_forecast::telemetry;
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// JSON array of facility profiles
    #[arg(long)]
    pub(crate) facilities: PathBuf,
    /// Occupancy snapshot CSV export
    #[arg(long)]
    pub(crate) snapshots: PathBuf,
    /// Optional regional population CSV
    #[arg(long)]
    pub(crate) population: Option<PathBuf>,
    /// Only forecast this facility
    #[arg(long)]
    pub(crate) facility_id: Option<String>,
    /// Evaluation date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) at: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BatchArgs {
    /// Directory holding facilities.json, snapshots.csv and population.csv.
    /// Defaults to FORECAST_DATA_DIR.
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) at: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionEntry {
    pub(crate) facility_id: FacilityId,
    pub(crate) prediction: Option<PredictionView>,
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let PredictArgs {
        facilities,
        snapshots,
        population,
        facility_id,
        at,
    } = args;

    let inventory = ImportedInventory {
        facilities: parse_facilities(File::open(facilities)?)?,
        snapshots: parse_snapshots(File::open(snapshots)?)?,
        population: match population {
            Some(path) => parse_population(File::open(path)?)?,
            None => Vec::new(),
        },
    };
    let targets: Vec<FacilityId> = match facility_id {
        Some(id) => vec![FacilityId::new(id)],
        None => inventory
            .facilities
            .iter()
            .map(|profile| profile.id.clone())
            .collect(),
    };

    let service = ForecastStores::from_inventory(inventory)?
        .into_service(config.forecast, config.service);
    let entries = predict_all(&service, &targets, evaluation_time(at))?;
    print_json(&entries)
}

pub(crate) fn predict_all(
    service: &MemoryForecastService,
    targets: &[FacilityId],
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<PredictionEntry>, AppError> {
    targets
        .iter()
        .map(|facility_id| {
            let prediction = service.predict(facility_id, now)?;
            Ok(PredictionEntry {
                facility_id: facility_id.clone(),
                prediction: prediction.map(|record| record.view()),
            })
        })
        .collect()
}

pub(crate) async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let data_dir = args
        .data_dir
        .or(config.data_dir)
        .ok_or(ConfigError::MissingValue {
            key: "FORECAST_DATA_DIR",
        })?;
    let now = evaluation_time(args.at);

    let service = Arc::new(
        ForecastStores::load_dir(&data_dir)?.into_service(config.forecast, config.service),
    );
    let shutdown = service.shutdown_signal();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping batch after the current facility");
            shutdown.store(true, Ordering::Release);
        }
    });

    let worker = service.clone();
    let stats = tokio::task::spawn_blocking(move || worker.run_batch(now))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;
    watcher.abort();

    info!(data_dir = %data_dir.display(), "batch command finished");
    print_json(&stats)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");
    Ok(())
}
