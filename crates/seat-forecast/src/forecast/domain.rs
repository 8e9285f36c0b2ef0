use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::signals::graduation::parse_age_from_class_name;

/// Stable identifier of a facility in the upstream inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(pub String);

impl FacilityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seat counts observed for a facility (or a single snapshot of it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityCounts {
    pub total: u32,
    pub current: u32,
    #[serde(default)]
    pub waiting: u32,
}

impl CapacityCounts {
    pub const fn new(total: u32, current: u32, waiting: u32) -> Self {
        Self {
            total,
            current,
            waiting,
        }
    }

    /// Signed vacancy; negative when a facility is over-enrolled.
    pub fn vacancy(&self) -> i64 {
        i64::from(self.total) - i64::from(self.current)
    }

    pub fn open_seats(&self) -> u32 {
        self.total.saturating_sub(self.current)
    }
}

/// One historical observation of a facility's occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub capacity: CapacityCounts,
    pub observed_at: DateTime<Utc>,
}

impl OccupancySnapshot {
    pub fn new(capacity: CapacityCounts, observed_at: DateTime<Utc>) -> Self {
        Self {
            capacity,
            observed_at,
        }
    }

    pub fn vacancy(&self) -> i64 {
        self.capacity.vacancy()
    }
}

/// Enrollment grouping of a facility by child age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeCohortClass {
    pub class_name: String,
    pub capacity: u32,
    pub current: u32,
    #[serde(default)]
    pub waiting: u32,
}

impl AgeCohortClass {
    pub fn new(class_name: impl Into<String>, capacity: u32, current: u32) -> Self {
        Self {
            class_name: class_name.into(),
            capacity,
            current,
            waiting: 0,
        }
    }

    /// Age embedded in the class label, or `-1` when the label carries none.
    pub fn age(&self) -> i32 {
        parse_age_from_class_name(&self.class_name)
    }

    pub fn vacancy(&self) -> u32 {
        self.capacity.saturating_sub(self.current)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityCategory {
    #[default]
    Daycare,
    Kindergarten,
}

/// External accreditation grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationGrade {
    A,
    B,
    C,
    D,
}

impl EvaluationGrade {
    pub const fn score(self) -> f64 {
        match self {
            Self::A => 1.0,
            Self::B => 0.75,
            Self::C => 0.5,
            Self::D => 0.25,
        }
    }
}

/// Scoring subject handed to the engine. Owned by the facility-management side; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityProfile {
    pub id: FacilityId,
    #[serde(default)]
    pub name: String,
    pub capacity: CapacityCounts,
    #[serde(default)]
    pub age_cohorts: Vec<AgeCohortClass>,
    #[serde(default)]
    pub category: FacilityCategory,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub evaluation_grade: Option<EvaluationGrade>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub teacher_count: Option<u32>,
    #[serde(default)]
    pub region: Option<String>,
}

impl FacilityProfile {
    /// Bare profile with every optional attribute at its neutral value.
    pub fn new(id: FacilityId, capacity: CapacityCounts) -> Self {
        Self {
            id,
            name: String::new(),
            capacity,
            age_cohorts: Vec::new(),
            category: FacilityCategory::default(),
            rating: 0.0,
            review_count: 0,
            evaluation_grade: None,
            is_premium: false,
            features: Vec::new(),
            teacher_count: None,
            region: None,
        }
    }

    pub fn current_vacancy(&self) -> u32 {
        self.capacity.open_seats()
    }

    pub fn has_age_cohorts(&self) -> bool {
        !self.age_cohorts.is_empty()
    }

    /// Boundary check run before a profile reaches the scoring code.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ProfileError::MissingId);
        }

        if !self.rating.is_finite() || !(0.0..=5.0).contains(&self.rating) {
            return Err(ProfileError::RatingOutOfRange(self.rating));
        }

        if let Some(index) = self
            .age_cohorts
            .iter()
            .position(|cohort| cohort.class_name.trim().is_empty())
        {
            return Err(ProfileError::UnnamedCohort { index });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("facility id must not be empty")]
    MissingId,
    #[error("rating {0} is outside 0..=5")]
    RatingOutOfRange(f64),
    #[error("age cohort at position {index} has no class name")]
    UnnamedCohort { index: usize },
}

/// Region-level supply/demand figures for the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalDemand {
    pub child_population: u64,
    pub facility_count: u64,
}

/// Raw demographic row as published by the population source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub region_code: String,
    pub year: i32,
    pub population: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFacilityCount {
    pub region_code: String,
    pub count: u64,
}

/// Evidence level behind a prediction. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}
