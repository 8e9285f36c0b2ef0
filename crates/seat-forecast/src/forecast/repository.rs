use chrono::{DateTime, Utc};

use super::domain::{
    FacilityId, FacilityProfile, OccupancySnapshot, PopulationRecord, RegionFacilityCount,
};
use super::prediction::VacancyPrediction;

/// Read access to the facility inventory and its occupancy history.
pub trait FacilityStore: Send + Sync {
    fn fetch(&self, id: &FacilityId) -> Result<Option<FacilityProfile>, RepositoryError>;

    /// Up to `limit` snapshots for the facility, newest first.
    fn recent_snapshots(
        &self,
        id: &FacilityId,
        limit: usize,
    ) -> Result<Vec<OccupancySnapshot>, RepositoryError>;

    fn count_in_region(&self, region_code: &str) -> Result<u64, RepositoryError>;

    fn count_by_region(&self) -> Result<Vec<RegionFacilityCount>, RepositoryError>;

    /// Opens a paging cursor over every facility. Callers must close it when done.
    fn open_cursor(
        &self,
        page_size: usize,
    ) -> Result<Box<dyn FacilityCursor + '_>, RepositoryError>;
}

/// Bounded-memory iteration over the facility inventory.
pub trait FacilityCursor {
    /// Next page of facilities; an empty page means the cursor is exhausted.
    fn next_page(&mut self) -> Result<Vec<FacilityProfile>, RepositoryError>;

    fn close(&mut self) -> Result<(), RepositoryError>;
}

/// Regional child-population figures from the demographic data provider.
pub trait DemographicSource: Send + Sync {
    fn population_for_region(
        &self,
        region_code: &str,
        year: i32,
    ) -> Result<Vec<PopulationRecord>, RepositoryError>;

    fn population_for_year(&self, year: i32) -> Result<Vec<PopulationRecord>, RepositoryError>;
}

/// Keyed, time-bounded store of computed predictions.
pub trait PredictionCache: Send + Sync {
    /// Live record for the facility, ignoring anything whose `valid_until` is not after `now`.
    fn get(
        &self,
        facility_id: &FacilityId,
        now: DateTime<Utc>,
    ) -> Result<Option<VacancyPrediction>, RepositoryError>;

    /// Atomic upsert keyed by facility id, returning the record that ends up stored.
    fn put(&self, record: VacancyPrediction) -> Result<VacancyPrediction, RepositoryError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("cursor already closed")]
    CursorClosed,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
