use chrono::{DateTime, Datelike, Utc};
use std::cmp::Reverse;

use super::config::ForecastConfig;
use super::domain::{Confidence, FacilityProfile, OccupancySnapshot, RegionalDemand};
use super::prediction::{AgeClassPrediction, FactorKind, PredictionFactor, PredictionOutcome};
use super::signals::{
    calculate_attractiveness, calculate_demand_factor, calculate_graduation, calculate_trend,
    determine_confidence, oldest_cohort, round_half_up, seasonal_adjustment, seat_count,
    EvidenceFlags,
};

/// Stateless forecaster that applies a [`ForecastConfig`] to facility inputs.
#[derive(Debug, Clone, Default)]
pub struct PredictionEngine {
    config: ForecastConfig,
}

impl PredictionEngine {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn compose(
        &self,
        profile: &FacilityProfile,
        snapshots: &[OccupancySnapshot],
        now: DateTime<Utc>,
        demand: Option<&RegionalDemand>,
    ) -> PredictionOutcome {
        compose_prediction(&self.config, profile, snapshots, now, demand)
    }
}

/// Per-signal readings for one facility at one point in time.
struct Signals {
    month: u32,
    current_vacancy: u32,
    trend: f64,
    seasonal: i32,
    graduation: u32,
    demand_pressure: i64,
    /// Full now and full at every observation.
    saturated: bool,
}

/// Forecasts seat openings over the configured horizon.
///
/// Pure: the result depends only on the arguments, so this is safe to call from any thread.
pub fn compose_prediction(
    config: &ForecastConfig,
    profile: &FacilityProfile,
    snapshots: &[OccupancySnapshot],
    now: DateTime<Utc>,
    demand: Option<&RegionalDemand>,
) -> PredictionOutcome {
    let signals = read_signals(config, profile, snapshots, now, demand);
    let horizon = f64::from(config.horizon_weeks);

    let projected = f64::from(signals.current_vacancy)
        + signals.trend * horizon
        + f64::from(signals.seasonal)
        + f64::from(signals.graduation)
        - signals.demand_pressure as f64;
    let predicted_vacancies = seat_count(round_half_up(projected));

    let capacity = profile.capacity.total.max(1);
    let overall_score = round_half_up(f64::from(predicted_vacancies) / f64::from(capacity) * 100.0)
        .clamp(0, 100) as u8;

    let confidence = determine_confidence(
        snapshots.len(),
        EvidenceFlags {
            has_regional_data: demand.is_some(),
            has_age_cohorts: profile.has_age_cohorts(),
        },
        config.min_snapshots_required,
    );

    let factors = explain(config, profile, &signals, predicted_vacancies);
    let by_age_class = project_age_classes(config, profile, &signals, confidence);

    PredictionOutcome {
        overall_score,
        predicted_vacancies,
        confidence,
        by_age_class,
        factors,
    }
}

fn read_signals(
    config: &ForecastConfig,
    profile: &FacilityProfile,
    snapshots: &[OccupancySnapshot],
    now: DateTime<Utc>,
    demand: Option<&RegionalDemand>,
) -> Signals {
    let month = now.month();
    let current_vacancy = profile.current_vacancy();

    if is_saturated(profile, snapshots) {
        return Signals {
            month,
            current_vacancy,
            trend: 0.0,
            seasonal: 0,
            graduation: 0,
            demand_pressure: 0,
            saturated: true,
        };
    }

    let attractiveness = calculate_attractiveness(profile, &config.attractiveness);
    let demand_factor = calculate_demand_factor(demand, profile.capacity.total, &config.demand);
    // Desirable facilities in undersupplied regions lose more of their apparent vacancy.
    let demand_pressure =
        round_half_up((demand_factor - 1.0) * attractiveness * f64::from(current_vacancy));

    Signals {
        month,
        current_vacancy,
        trend: calculate_trend(snapshots),
        seasonal: seasonal_adjustment(month, &config.seasonal),
        graduation: calculate_graduation(&profile.age_cohorts, month, &config.graduation),
        demand_pressure,
        saturated: false,
    }
}

/// No seat is forecast for a facility that has never had one open, regardless of the calendar.
fn is_saturated(profile: &FacilityProfile, snapshots: &[OccupancySnapshot]) -> bool {
    profile.current_vacancy() == 0 && snapshots.iter().all(|snapshot| snapshot.vacancy() <= 0)
}

fn explain(
    config: &ForecastConfig,
    profile: &FacilityProfile,
    signals: &Signals,
    predicted_vacancies: u32,
) -> Vec<PredictionFactor> {
    let mut factors = Vec::new();

    let trend_impact = round_half_up(signals.trend * f64::from(config.horizon_weeks));
    if trend_impact != 0 {
        factors.push(PredictionFactor {
            name: FactorKind::WeeklyTrend,
            impact: clamp_impact(trend_impact),
            description: if trend_impact > 0 {
                "vacancies have been growing week over week".to_string()
            } else {
                "vacancies have been shrinking week over week".to_string()
            },
        });
    }

    if signals.seasonal != 0 {
        factors.push(PredictionFactor {
            name: FactorKind::Seasonal,
            impact: signals.seasonal,
            description: if signals.seasonal > 0 {
                "graduation or top-up enrollment season usually frees seats".to_string()
            } else {
                "mid-year stable period with little turnover".to_string()
            },
        });
    }

    if signals.graduation > 0 {
        factors.push(PredictionFactor {
            name: FactorKind::Graduation,
            impact: clamp_impact(i64::from(signals.graduation)),
            description: "oldest cohort is graduating or moving up".to_string(),
        });
    }

    if signals.demand_pressure != 0 {
        factors.push(PredictionFactor {
            name: FactorKind::RegionalDemand,
            impact: clamp_impact(-signals.demand_pressure),
            description: if signals.demand_pressure > 0 {
                "high regional demand is likely to absorb open seats".to_string()
            } else {
                "low regional demand leaves more seats open".to_string()
            },
        });
    }

    let waiting = profile.capacity.waiting;
    let waiting_drag = waiting.min(predicted_vacancies);
    if waiting_drag > 0 {
        factors.push(PredictionFactor {
            name: FactorKind::WaitingList,
            impact: clamp_impact(-i64::from(waiting_drag)),
            description: format!("{waiting} children currently on the waiting list"),
        });
    }

    // Stable sort keeps emission order among equal magnitudes.
    factors.sort_by_key(|factor| Reverse(factor.impact.unsigned_abs()));
    factors
}

/// Per-class projection. Trend and seasonal apply unscaled here, unlike the facility-level
/// figure which projects the trend across the full horizon.
fn project_age_classes(
    config: &ForecastConfig,
    profile: &FacilityProfile,
    signals: &Signals,
    confidence: Confidence,
) -> Vec<AgeClassPrediction> {
    if signals.saturated {
        return profile
            .age_cohorts
            .iter()
            .map(|cohort| AgeClassPrediction {
                class_name: cohort.class_name.clone(),
                current_vacancy: cohort.vacancy(),
                predicted_vacancy: 0,
                confidence,
            })
            .collect();
    }

    let multiplier = config.graduation.multiplier(signals.month);
    let graduating_age = oldest_cohort(&profile.age_cohorts).map(|(_, age)| age);

    profile
        .age_cohorts
        .iter()
        .map(|cohort| {
            let vacancy = cohort.vacancy();
            let graduation_boost = match graduating_age {
                Some(age) if multiplier > 0.0 && cohort.age() == age => {
                    round_half_up(f64::from(cohort.current) * multiplier)
                }
                _ => 0,
            };
            let predicted = round_half_up(
                f64::from(vacancy)
                    + signals.trend
                    + f64::from(signals.seasonal)
                    + graduation_boost as f64,
            );

            AgeClassPrediction {
                class_name: cohort.class_name.clone(),
                current_vacancy: vacancy,
                predicted_vacancy: seat_count(predicted),
                confidence,
            }
        })
        .collect()
}

fn clamp_impact(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
