//! In-process storage adapters used by the CLI, the HTTP service and tests.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::domain::{
    FacilityId, FacilityProfile, OccupancySnapshot, PopulationRecord, RegionFacilityCount,
};
use super::prediction::VacancyPrediction;
use super::repository::{
    DemographicSource, FacilityCursor, FacilityStore, PredictionCache, RepositoryError,
};

fn poisoned(what: &str) -> RepositoryError {
    RepositoryError::Unavailable(format!("{what} lock poisoned"))
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryFacilityStore {
    facilities: Arc<RwLock<BTreeMap<FacilityId, FacilityProfile>>>,
    snapshots: Arc<RwLock<HashMap<FacilityId, Vec<OccupancySnapshot>>>>,
    open_cursors: Arc<AtomicUsize>,
}

impl InMemoryFacilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a facility profile.
    pub fn insert(&self, profile: FacilityProfile) -> Result<(), RepositoryError> {
        let mut guard = self.facilities.write().map_err(|_| poisoned("facility"))?;
        guard.insert(profile.id.clone(), profile);
        Ok(())
    }

    pub fn append_snapshot(
        &self,
        id: &FacilityId,
        snapshot: OccupancySnapshot,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.snapshots.write().map_err(|_| poisoned("snapshot"))?;
        guard.entry(id.clone()).or_default().push(snapshot);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        let guard = self.facilities.read().map_err(|_| poisoned("facility"))?;
        Ok(guard.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }

    /// Cursors opened but not yet closed.
    pub fn open_cursor_count(&self) -> usize {
        self.open_cursors.load(Ordering::Acquire)
    }

    fn page_after(
        &self,
        after: Option<&FacilityId>,
        page_size: usize,
    ) -> Result<Vec<FacilityProfile>, RepositoryError> {
        let guard = self.facilities.read().map_err(|_| poisoned("facility"))?;
        let lower = match after {
            Some(id) => Bound::Excluded(id.clone()),
            None => Bound::Unbounded,
        };
        Ok(guard
            .range((lower, Bound::Unbounded))
            .take(page_size)
            .map(|(_, profile)| profile.clone())
            .collect())
    }
}

impl FacilityStore for InMemoryFacilityStore {
    fn fetch(&self, id: &FacilityId) -> Result<Option<FacilityProfile>, RepositoryError> {
        let guard = self.facilities.read().map_err(|_| poisoned("facility"))?;
        Ok(guard.get(id).cloned())
    }

    fn recent_snapshots(
        &self,
        id: &FacilityId,
        limit: usize,
    ) -> Result<Vec<OccupancySnapshot>, RepositoryError> {
        let guard = self.snapshots.read().map_err(|_| poisoned("snapshot"))?;
        let mut history = guard.get(id).cloned().unwrap_or_default();
        history.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        history.truncate(limit);
        Ok(history)
    }

    fn count_in_region(&self, region_code: &str) -> Result<u64, RepositoryError> {
        let guard = self.facilities.read().map_err(|_| poisoned("facility"))?;
        Ok(guard
            .values()
            .filter(|profile| profile.region.as_deref() == Some(region_code))
            .count() as u64)
    }

    fn count_by_region(&self) -> Result<Vec<RegionFacilityCount>, RepositoryError> {
        let guard = self.facilities.read().map_err(|_| poisoned("facility"))?;
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for region in guard.values().filter_map(|profile| profile.region.as_deref()) {
            *counts.entry(region).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(region_code, count)| RegionFacilityCount {
                region_code: region_code.to_string(),
                count,
            })
            .collect())
    }

    fn open_cursor(
        &self,
        page_size: usize,
    ) -> Result<Box<dyn FacilityCursor + '_>, RepositoryError> {
        self.open_cursors.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(InMemoryCursor {
            store: self,
            page_size: page_size.max(1),
            last_seen: None,
            closed: false,
        }))
    }
}

/// Keyset cursor: each page resumes after the last facility id it returned.
struct InMemoryCursor<'a> {
    store: &'a InMemoryFacilityStore,
    page_size: usize,
    last_seen: Option<FacilityId>,
    closed: bool,
}

impl FacilityCursor for InMemoryCursor<'_> {
    fn next_page(&mut self) -> Result<Vec<FacilityProfile>, RepositoryError> {
        if self.closed {
            return Err(RepositoryError::CursorClosed);
        }
        let page = self
            .store
            .page_after(self.last_seen.as_ref(), self.page_size)?;
        if let Some(last) = page.last() {
            self.last_seen = Some(last.id.clone());
        }
        Ok(page)
    }

    fn close(&mut self) -> Result<(), RepositoryError> {
        if self.closed {
            return Err(RepositoryError::CursorClosed);
        }
        self.closed = true;
        self.store.open_cursors.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDemographics {
    records: Arc<RwLock<Vec<PopulationRecord>>>,
}

impl InMemoryDemographics {
    pub fn new(records: Vec<PopulationRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub fn extend(
        &self,
        records: impl IntoIterator<Item = PopulationRecord>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.write().map_err(|_| poisoned("population"))?;
        guard.extend(records);
        Ok(())
    }

    fn matching(
        &self,
        predicate: impl Fn(&PopulationRecord) -> bool,
    ) -> Result<Vec<PopulationRecord>, RepositoryError> {
        let guard = self.records.read().map_err(|_| poisoned("population"))?;
        Ok(guard.iter().filter(|record| predicate(record)).cloned().collect())
    }
}

impl DemographicSource for InMemoryDemographics {
    fn population_for_region(
        &self,
        region_code: &str,
        year: i32,
    ) -> Result<Vec<PopulationRecord>, RepositoryError> {
        self.matching(|record| record.region_code == region_code && record.year == year)
    }

    fn population_for_year(&self, year: i32) -> Result<Vec<PopulationRecord>, RepositoryError> {
        self.matching(|record| record.year == year)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryPredictionCache {
    records: Arc<Mutex<HashMap<FacilityId, VacancyPrediction>>>,
}

impl InMemoryPredictionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored record regardless of expiry.
    pub fn stored(
        &self,
        facility_id: &FacilityId,
    ) -> Result<Option<VacancyPrediction>, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned("prediction"))?;
        Ok(guard.get(facility_id).cloned())
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned("prediction"))?;
        Ok(guard.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }
}

impl PredictionCache for InMemoryPredictionCache {
    fn get(
        &self,
        facility_id: &FacilityId,
        now: DateTime<Utc>,
    ) -> Result<Option<VacancyPrediction>, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned("prediction"))?;
        Ok(guard
            .get(facility_id)
            .filter(|record| record.is_live(now))
            .cloned())
    }

    /// A concurrent writer with a newer `calculated_at` wins; the older record is discarded.
    fn put(&self, record: VacancyPrediction) -> Result<VacancyPrediction, RepositoryError> {
        let mut guard = self.records.lock().map_err(|_| poisoned("prediction"))?;
        match guard.get(&record.facility_id) {
            Some(existing) if existing.calculated_at > record.calculated_at => Ok(existing.clone()),
            _ => {
                guard.insert(record.facility_id.clone(), record.clone());
                Ok(record)
            }
        }
    }
}
