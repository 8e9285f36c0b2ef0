//! File-based inventory loading: facility profiles as JSON, snapshots and population as CSV.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::domain::{
    CapacityCounts, FacilityId, FacilityProfile, OccupancySnapshot, PopulationRecord,
    ProfileError,
};
use super::memory::{InMemoryDemographics, InMemoryFacilityStore};
use super::repository::RepositoryError;

pub const FACILITIES_FILE: &str = "facilities.json";
pub const SNAPSHOTS_FILE: &str = "snapshots.csv";
pub const POPULATION_FILE: &str = "population.csv";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed facility json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("row {row}: unrecognised timestamp {value:?}")]
    InvalidTimestamp { row: usize, value: String },
    #[error("row {row}: invalid seat count {value:?}")]
    InvalidCount { row: usize, value: String },
    #[error("facility {facility_id}: {source}")]
    InvalidProfile {
        facility_id: String,
        #[source]
        source: ProfileError,
    },
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    facility_id: String,
    observed_at: String,
    capacity_total: u32,
    capacity_current: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    capacity_waiting: Option<String>,
}

/// Reads `facility_id,observed_at,capacity_total,capacity_current,capacity_waiting` rows.
pub fn parse_snapshots<R: Read>(
    reader: R,
) -> Result<Vec<(FacilityId, OccupancySnapshot)>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut snapshots = Vec::new();

    for (index, record) in csv_reader.deserialize::<SnapshotRow>().enumerate() {
        let row = record?;
        let row_number = index + 1;
        let observed_at =
            parse_datetime(&row.observed_at).ok_or_else(|| ImportError::InvalidTimestamp {
                row: row_number,
                value: row.observed_at.clone(),
            })?;
        let waiting = match row.capacity_waiting.as_deref() {
            Some(value) => value.parse::<u32>().map_err(|_| ImportError::InvalidCount {
                row: row_number,
                value: value.to_string(),
            })?,
            None => 0,
        };

        snapshots.push((
            FacilityId::new(row.facility_id),
            OccupancySnapshot::new(
                CapacityCounts::new(row.capacity_total, row.capacity_current, waiting),
                observed_at,
            ),
        ));
    }

    Ok(snapshots)
}

/// Reads `region_code,year,population` rows.
pub fn parse_population<R: Read>(reader: R) -> Result<Vec<PopulationRecord>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for record in csv_reader.deserialize::<PopulationRecord>() {
        records.push(record?);
    }
    Ok(records)
}

/// Reads a JSON array of facility profiles, rejecting any that fail validation.
pub fn parse_facilities<R: Read>(reader: R) -> Result<Vec<FacilityProfile>, ImportError> {
    let profiles: Vec<FacilityProfile> = serde_json::from_reader(reader)?;
    for profile in &profiles {
        profile
            .validate()
            .map_err(|source| ImportError::InvalidProfile {
                facility_id: profile.id.to_string(),
                source,
            })?;
    }
    Ok(profiles)
}

/// Everything read from a data directory, ready to seed the in-memory stores.
#[derive(Debug, Clone, Default)]
pub struct ImportedInventory {
    pub facilities: Vec<FacilityProfile>,
    pub snapshots: Vec<(FacilityId, OccupancySnapshot)>,
    pub population: Vec<PopulationRecord>,
}

impl ImportedInventory {
    /// Loads `facilities.json` and `snapshots.csv`, plus `population.csv` when present.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ImportError> {
        let dir = dir.as_ref();
        let facilities = parse_facilities(open(&dir.join(FACILITIES_FILE))?)?;
        let snapshots = parse_snapshots(open(&dir.join(SNAPSHOTS_FILE))?)?;

        let population_path = dir.join(POPULATION_FILE);
        let population = if population_path.exists() {
            parse_population(open(&population_path)?)?
        } else {
            Vec::new()
        };

        Ok(Self {
            facilities,
            snapshots,
            population,
        })
    }

    pub fn seed(
        self,
        store: &InMemoryFacilityStore,
        demographics: &InMemoryDemographics,
    ) -> Result<(), ImportError> {
        for profile in self.facilities {
            store.insert(profile)?;
        }
        for (facility_id, snapshot) in self.snapshots {
            store.append_snapshot(&facility_id, snapshot)?;
        }
        demographics.extend(self.population)?;
        Ok(())
    }
}

fn open(path: &Path) -> Result<File, ImportError> {
    File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
