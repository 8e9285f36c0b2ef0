use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

use super::domain::{FacilityProfile, PopulationRecord, RegionFacilityCount, RegionalDemand};
use super::repository::{
    DemographicSource, FacilityCursor, FacilityStore, PredictionCache, RepositoryError,
};
use super::service::{ForecastService, ForecastServiceError};

/// Tally returned by a whole-inventory recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Set when the run stopped early on a shutdown request.
    #[serde(default)]
    pub cancelled: bool,
}

/// Region code to demand figures, built once per batch so facilities need no demand queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionalDemandIndex {
    regions: HashMap<String, RegionalDemand>,
}

impl RegionalDemandIndex {
    /// Groups population rows and facility counts by region. Regions without any facility are
    /// left out, as are facility counts with no population figures.
    pub fn build(population: &[PopulationRecord], facility_counts: &[RegionFacilityCount]) -> Self {
        let mut children: HashMap<&str, u64> = HashMap::new();
        for record in population {
            *children.entry(record.region_code.as_str()).or_default() += record.population;
        }

        let mut facilities: HashMap<&str, u64> = HashMap::new();
        for entry in facility_counts {
            *facilities.entry(entry.region_code.as_str()).or_default() += entry.count;
        }

        let regions = children
            .into_iter()
            .filter_map(|(region, child_population)| {
                let facility_count = facilities.get(region).copied().unwrap_or(0);
                (facility_count > 0).then(|| {
                    (
                        region.to_string(),
                        RegionalDemand {
                            child_population,
                            facility_count,
                        },
                    )
                })
            })
            .collect();

        Self { regions }
    }

    pub fn get(&self, region_code: Option<&str>) -> Option<&RegionalDemand> {
        region_code.and_then(|code| self.regions.get(code))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

enum FacilityOutcome {
    Processed,
    Skipped,
}

/// Owns an open cursor and closes it on every exit path.
struct CursorGuard<'a> {
    cursor: Option<Box<dyn FacilityCursor + 'a>>,
}

impl<'a> CursorGuard<'a> {
    fn new(cursor: Box<dyn FacilityCursor + 'a>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    fn next_page(&mut self) -> Result<Vec<FacilityProfile>, RepositoryError> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.next_page(),
            None => Err(RepositoryError::CursorClosed),
        }
    }

    fn close(mut self) -> Result<(), RepositoryError> {
        match self.cursor.take() {
            Some(mut cursor) => cursor.close(),
            None => Ok(()),
        }
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(err) = cursor.close() {
                warn!(error = %err, "failed to close facility cursor");
            }
        }
    }
}

impl<F, D, C> ForecastService<F, D, C>
where
    F: FacilityStore + 'static,
    D: DemographicSource + 'static,
    C: PredictionCache + 'static,
{
    /// Recomputes and stores predictions for every facility in the inventory.
    ///
    /// Facilities with too little history are skipped; a failure on one facility is logged and
    /// counted without stopping the run. The shutdown flag is checked between facilities.
    pub fn run_batch(&self, now: DateTime<Utc>) -> Result<BatchStats, ForecastServiceError> {
        let demand_index = self.prepare_demand_index(now.year());
        let mut stats = BatchStats::default();

        let mut cursor = CursorGuard::new(self.facilities.open_cursor(self.settings.batch_size)?);
        'pages: loop {
            let page = cursor.next_page()?;
            if page.is_empty() {
                break;
            }

            for profile in page {
                if self.shutdown.load(Ordering::Acquire) {
                    stats.cancelled = true;
                    break 'pages;
                }

                match self.process_facility(&profile, now, &demand_index) {
                    Ok(FacilityOutcome::Processed) => stats.processed += 1,
                    Ok(FacilityOutcome::Skipped) => stats.skipped += 1,
                    Err(err) => {
                        stats.errors += 1;
                        error!(
                            facility_id = %profile.id,
                            error = %err,
                            "vacancy prediction failed"
                        );
                    }
                }
            }
        }
        cursor.close()?;

        info!(
            processed = stats.processed,
            skipped = stats.skipped,
            errors = stats.errors,
            cancelled = stats.cancelled,
            "vacancy prediction batch finished"
        );
        Ok(stats)
    }

    /// Pre-aggregates regional demand; on failure every facility falls back to neutral demand.
    pub fn prepare_demand_index(&self, year: i32) -> RegionalDemandIndex {
        let aggregate = || -> Result<RegionalDemandIndex, RepositoryError> {
            let population = self.demographics.population_for_year(year)?;
            let counts = self.facilities.count_by_region()?;
            Ok(RegionalDemandIndex::build(&population, &counts))
        };

        match aggregate() {
            Ok(index) => index,
            Err(err) => {
                warn!(year, error = %err, "regional demand pre-aggregation failed");
                RegionalDemandIndex::default()
            }
        }
    }

    fn process_facility(
        &self,
        profile: &FacilityProfile,
        now: DateTime<Utc>,
        demand_index: &RegionalDemandIndex,
    ) -> Result<FacilityOutcome, ForecastServiceError> {
        let snapshots = self
            .facilities
            .recent_snapshots(&profile.id, self.settings.snapshot_limit)?;
        if !self.has_enough_history(&snapshots) {
            return Ok(FacilityOutcome::Skipped);
        }
        profile.validate()?;

        let demand = demand_index.get(profile.region.as_deref());
        let record = self.build_record(profile, &snapshots, now, demand);
        self.cache.put(record)?;
        Ok(FacilityOutcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(region: &str, population: u64) -> PopulationRecord {
        PopulationRecord {
            region_code: region.to_string(),
            year: 2026,
            population,
        }
    }

    fn count(region: &str, count: u64) -> RegionFacilityCount {
        RegionFacilityCount {
            region_code: region.to_string(),
            count,
        }
    }

    #[test]
    fn index_sums_population_per_region() {
        let index = RegionalDemandIndex::build(
            &[
                population("seoul", 1_200),
                population("seoul", 800),
                population("busan", 500),
            ],
            &[count("seoul", 10), count("busan", 5)],
        );

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get(Some("seoul")),
            Some(&RegionalDemand {
                child_population: 2_000,
                facility_count: 10,
            })
        );
        assert_eq!(index.get(None), None);
        assert_eq!(index.get(Some("jeju")), None);
    }

    #[test]
    fn index_skips_regions_without_facilities() {
        let index = RegionalDemandIndex::build(
            &[population("seoul", 1_200), population("ulsan", 300)],
            &[count("seoul", 4), count("ulsan", 0), count("daegu", 7)],
        );

        assert_eq!(index.len(), 1);
        assert!(index.get(Some("ulsan")).is_none());
        assert!(index.get(Some("daegu")).is_none());
    }

    #[test]
    fn empty_inputs_build_empty_index() {
        assert!(RegionalDemandIndex::build(&[], &[]).is_empty());
    }
}
