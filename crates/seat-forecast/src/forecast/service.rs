use chrono::{DateTime, Datelike, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::composer::PredictionEngine;
use super::config::ForecastConfig;
use super::domain::{
    FacilityId, FacilityProfile, OccupancySnapshot, ProfileError, RegionalDemand,
};
use super::prediction::VacancyPrediction;
use super::repository::{DemographicSource, FacilityStore, PredictionCache, RepositoryError};

pub const DEFAULT_VALIDITY_DAYS: i64 = 7;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 30;

/// Orchestration knobs that sit around the pure engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// How long a stored prediction is served before it is recomputed.
    pub validity_window: Duration,
    /// Facilities fetched per cursor page during batch runs.
    pub batch_size: usize,
    /// Most recent snapshots read per facility.
    pub snapshot_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            validity_window: Duration::days(DEFAULT_VALIDITY_DAYS),
            batch_size: DEFAULT_BATCH_SIZE,
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
        }
    }
}

/// Service composing the facility store, demographic source, prediction cache and engine.
pub struct ForecastService<F, D, C> {
    pub(crate) facilities: Arc<F>,
    pub(crate) demographics: Arc<D>,
    pub(crate) cache: Arc<C>,
    pub(crate) engine: Arc<PredictionEngine>,
    pub(crate) settings: ServiceSettings,
    pub(crate) shutdown: Arc<AtomicBool>,
}

impl<F, D, C> ForecastService<F, D, C>
where
    F: FacilityStore + 'static,
    D: DemographicSource + 'static,
    C: PredictionCache + 'static,
{
    pub fn new(
        facilities: Arc<F>,
        demographics: Arc<D>,
        cache: Arc<C>,
        config: ForecastConfig,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            facilities,
            demographics,
            cache,
            engine: Arc::new(PredictionEngine::new(config)),
            settings,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Flag checked between facilities by batch runs; set it to stop early.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Cached-or-computed forecast for one facility.
    ///
    /// `Ok(None)` means no forecast can be made: the facility is unknown or its history is too
    /// short. Storage failures are returned as errors.
    pub fn predict(
        &self,
        facility_id: &FacilityId,
        now: DateTime<Utc>,
    ) -> Result<Option<VacancyPrediction>, ForecastServiceError> {
        if let Some(cached) = self.cache.get(facility_id, now)? {
            debug!(%facility_id, "serving cached vacancy prediction");
            return Ok(Some(cached));
        }

        let Some(profile) = self.facilities.fetch(facility_id)? else {
            debug!(%facility_id, "facility not found");
            return Ok(None);
        };

        let snapshots = self
            .facilities
            .recent_snapshots(facility_id, self.settings.snapshot_limit)?;
        if !self.has_enough_history(&snapshots) {
            info!(
                %facility_id,
                snapshots = snapshots.len(),
                "not enough snapshot history for a prediction"
            );
            return Ok(None);
        }
        profile.validate()?;

        let demand = self.resolve_regional_demand(&profile, now.year());
        let record = self.build_record(&profile, &snapshots, now, demand.as_ref());
        let stored = self.cache.put(record)?;
        Ok(Some(stored))
    }

    pub(crate) fn has_enough_history(&self, snapshots: &[OccupancySnapshot]) -> bool {
        snapshots.len() >= self.engine.config().min_snapshots_required
    }

    pub(crate) fn build_record(
        &self,
        profile: &FacilityProfile,
        snapshots: &[OccupancySnapshot],
        now: DateTime<Utc>,
        demand: Option<&RegionalDemand>,
    ) -> VacancyPrediction {
        let outcome = self.engine.compose(profile, snapshots, now, demand);
        VacancyPrediction::from_outcome(
            profile.id.clone(),
            outcome,
            snapshots.len(),
            now,
            self.settings.validity_window,
        )
    }

    /// Demographic lookups are best effort: failures degrade to neutral demand.
    fn resolve_regional_demand(
        &self,
        profile: &FacilityProfile,
        year: i32,
    ) -> Option<RegionalDemand> {
        let region = profile.region.as_deref()?;
        match self.lookup_regional_demand(region, year) {
            Ok(demand) => demand,
            Err(err) => {
                warn!(
                    facility_id = %profile.id,
                    region,
                    error = %err,
                    "regional demand unavailable, using neutral demand"
                );
                None
            }
        }
    }

    fn lookup_regional_demand(
        &self,
        region: &str,
        year: i32,
    ) -> Result<Option<RegionalDemand>, RepositoryError> {
        let records = self.demographics.population_for_region(region, year)?;
        if records.is_empty() {
            return Ok(None);
        }

        let child_population = records.iter().map(|record| record.population).sum::<u64>();
        let facility_count = self.facilities.count_in_region(region)?;
        Ok(Some(RegionalDemand {
            child_population,
            facility_count,
        }))
    }
}

/// Error raised by the forecast service.
#[derive(Debug, thiserror::Error)]
pub enum ForecastServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("invalid facility profile: {0}")]
    InvalidProfile(#[from] ProfileError),
}
