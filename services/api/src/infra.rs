use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use seat_forecast::error::AppError;
use seat_forecast::forecast::{
    ForecastConfig, ForecastService, ImportedInventory, InMemoryDemographics,
    InMemoryFacilityStore, InMemoryPredictionCache, ServiceSettings,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type MemoryForecastService =
    ForecastService<InMemoryFacilityStore, InMemoryDemographics, InMemoryPredictionCache>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-process stores backing the service and the CLI commands.
#[derive(Default, Clone)]
pub(crate) struct ForecastStores {
    pub(crate) facilities: InMemoryFacilityStore,
    pub(crate) demographics: InMemoryDemographics,
    pub(crate) cache: InMemoryPredictionCache,
}

impl ForecastStores {
    pub(crate) fn from_inventory(inventory: ImportedInventory) -> Result<Self, AppError> {
        let stores = Self::default();
        let facilities = inventory.facilities.len();
        let snapshots = inventory.snapshots.len();
        inventory.seed(&stores.facilities, &stores.demographics)?;
        info!(facilities, snapshots, "forecast inventory loaded");
        Ok(stores)
    }

    pub(crate) fn load_dir(dir: &Path) -> Result<Self, AppError> {
        Self::from_inventory(ImportedInventory::load_dir(dir)?)
    }

    pub(crate) fn into_service(
        self,
        forecast: ForecastConfig,
        settings: ServiceSettings,
    ) -> MemoryForecastService {
        ForecastService::new(
            Arc::new(self.facilities),
            Arc::new(self.demographics),
            Arc::new(self.cache),
            forecast,
            settings,
        )
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Evaluation instant for a command: midnight UTC of `date`, or now.
pub(crate) fn evaluation_time(date: Option<NaiveDate>) -> DateTime<Utc> {
    date.and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}
