//! Seat-vacancy forecasting: scoring signals, the prediction composer, and the cache/batch
//! orchestration around it.

pub mod batch;
pub mod composer;
pub mod config;
pub mod domain;
pub mod import;
pub mod memory;
pub mod prediction;
pub mod repository;
pub mod router;
pub mod service;
pub mod signals;

pub use batch::{BatchStats, RegionalDemandIndex};
pub use composer::{compose_prediction, PredictionEngine};
pub use config::{
    AttractivenessConfig, AttractivenessWeights, DemandBounds, ForecastConfig,
    ForecastConfigError, GraduationSchedule, SeasonalCalendar,
};
pub use domain::{
    AgeCohortClass, CapacityCounts, Confidence, EvaluationGrade, FacilityCategory, FacilityId,
    FacilityProfile, OccupancySnapshot, PopulationRecord, ProfileError, RegionFacilityCount,
    RegionalDemand,
};
pub use import::{ImportError, ImportedInventory};
pub use memory::{InMemoryDemographics, InMemoryFacilityStore, InMemoryPredictionCache};
pub use prediction::{
    AgeClassPrediction, FactorKind, PredictionFactor, PredictionOutcome, PredictionView,
    VacancyPrediction,
};
pub use repository::{
    DemographicSource, FacilityCursor, FacilityStore, PredictionCache, RepositoryError,
};
pub use router::forecast_router;
pub use service::{ForecastService, ForecastServiceError, ServiceSettings};
