use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Confidence, FacilityId};

/// Named contributor to a forecast, kept for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    WeeklyTrend,
    Seasonal,
    Graduation,
    RegionalDemand,
    WaitingList,
}

impl FactorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::WeeklyTrend => "Weekly trend",
            Self::Seasonal => "Seasonal adjustment",
            Self::Graduation => "Graduation",
            Self::RegionalDemand => "Regional demand",
            Self::WaitingList => "Waiting list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionFactor {
    pub name: FactorKind,
    /// Signed seat impact over the forecast horizon.
    pub impact: i32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeClassPrediction {
    pub class_name: String,
    pub current_vacancy: u32,
    pub predicted_vacancy: u32,
    pub confidence: Confidence,
}

/// Output of the composer before it is stamped for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub overall_score: u8,
    pub predicted_vacancies: u32,
    pub confidence: Confidence,
    pub by_age_class: Vec<AgeClassPrediction>,
    pub factors: Vec<PredictionFactor>,
}

/// Persisted forecast for one facility. At most one live record exists per facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyPrediction {
    pub facility_id: FacilityId,
    pub overall_score: u8,
    pub predicted_vacancies: u32,
    pub confidence: Confidence,
    pub by_age_class: Vec<AgeClassPrediction>,
    pub factors: Vec<PredictionFactor>,
    pub snapshot_count: usize,
    pub calculated_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl VacancyPrediction {
    /// Stamps an outcome with its calculation time and validity window.
    ///
    /// Non-positive windows are widened to one second so `valid_until > calculated_at` holds.
    pub fn from_outcome(
        facility_id: FacilityId,
        outcome: PredictionOutcome,
        snapshot_count: usize,
        calculated_at: DateTime<Utc>,
        validity: Duration,
    ) -> Self {
        let validity = validity.max(Duration::seconds(1));
        let PredictionOutcome {
            overall_score,
            predicted_vacancies,
            confidence,
            by_age_class,
            factors,
        } = outcome;

        Self {
            facility_id,
            overall_score,
            predicted_vacancies,
            confidence,
            by_age_class,
            factors,
            snapshot_count,
            calculated_at,
            valid_until: calculated_at + validity,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_until
    }

    pub fn view(&self) -> PredictionView {
        PredictionView {
            facility_id: self.facility_id.clone(),
            overall_score: self.overall_score,
            predicted_vacancies: self.predicted_vacancies,
            confidence: self.confidence.label(),
            factors: self
                .factors
                .iter()
                .map(|factor| FactorView {
                    name: factor.name,
                    label: factor.name.label(),
                    impact: factor.impact,
                    description: factor.description.clone(),
                })
                .collect(),
            by_age_class: self.by_age_class.clone(),
            snapshot_count: self.snapshot_count,
            calculated_at: self.calculated_at,
            valid_until: self.valid_until,
        }
    }
}

/// Response shape exposed to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub facility_id: FacilityId,
    pub overall_score: u8,
    pub predicted_vacancies: u32,
    pub confidence: &'static str,
    pub factors: Vec<FactorView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub by_age_class: Vec<AgeClassPrediction>,
    pub snapshot_count: usize,
    pub calculated_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorView {
    pub name: FactorKind,
    pub label: &'static str,
    pub impact: i32,
    pub description: String,
}
