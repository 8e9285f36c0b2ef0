//! The independent scoring signals combined by the prediction composer.
//!
//! Each signal is a pure function over plain inputs and its slice of [`ForecastConfig`].
//!
//! [`ForecastConfig`]: super::config::ForecastConfig

pub mod attractiveness;
pub mod confidence;
pub mod demand;
pub mod graduation;
pub mod seasonal;
pub mod trend;

pub use attractiveness::calculate_attractiveness;
pub use confidence::{determine_confidence, EvidenceFlags};
pub use demand::calculate_demand_factor;
pub use graduation::{calculate_graduation, oldest_cohort, parse_age_from_class_name, UNKNOWN_AGE};
pub use seasonal::seasonal_adjustment;
pub use trend::calculate_trend;

/// Rounds half-way values toward positive infinity, so `-2.5` becomes `-2`.
pub(crate) fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Saturating conversion of a rounded figure into a seat count.
pub(crate) fn seat_count(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
