//! Vacancy forecasting for childcare facilities.
//!
//! The [`forecast`] module holds the pure scoring engine together with the cache-aware
//! orchestration that persists predictions; [`config`], [`error`] and [`telemetry`] carry the
//! ambient service plumbing shared with the API binary.

pub mod config;
pub mod error;
pub mod forecast;
pub mod telemetry;
