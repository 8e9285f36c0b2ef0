use serde::{Deserialize, Serialize};

/// Number of weeks the weekly trend is projected across.
pub const DEFAULT_HORIZON_WEEKS: u32 = 4;

/// Snapshots needed before a facility is forecast at all; also anchors confidence thresholds.
pub const DEFAULT_MIN_SNAPSHOTS: usize = 3;

/// Absence of an evaluation grade or staffing data is treated as average, not poor.
pub const NEUTRAL_ATTRACTIVENESS: f64 = 0.5;

/// Missing regional data leaves the forecast unadjusted.
pub const NEUTRAL_DEMAND_FACTOR: f64 = 1.0;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Every tunable of the scoring engine. Defaults reproduce the reference enrollment cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon_weeks: u32,
    pub min_snapshots_required: usize,
    pub seasonal: SeasonalCalendar,
    pub graduation: GraduationSchedule,
    pub attractiveness: AttractivenessConfig,
    pub demand: DemandBounds,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_weeks: DEFAULT_HORIZON_WEEKS,
            min_snapshots_required: DEFAULT_MIN_SNAPSHOTS,
            seasonal: SeasonalCalendar::default(),
            graduation: GraduationSchedule::default(),
            attractiveness: AttractivenessConfig::default(),
            demand: DemandBounds::default(),
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), ForecastConfigError> {
        if self.horizon_weeks == 0 {
            return Err(ForecastConfigError::ZeroHorizon);
        }
        if self.min_snapshots_required == 0 {
            return Err(ForecastConfigError::ZeroMinimumSnapshots);
        }

        let seasonal = &self.seasonal;
        let graduation = &self.graduation;
        let months = [seasonal.graduation_month, seasonal.enrollment_month]
            .into_iter()
            .chain(seasonal.stable_months.iter().copied())
            .chain(graduation.proximity_months.iter().copied())
            .chain(graduation.decay_months.iter().copied());
        for month in months {
            if !(1..=12).contains(&month) {
                return Err(ForecastConfigError::InvalidMonth(month));
            }
        }

        if !(0.0..=1.0).contains(&graduation.decay_factor) {
            return Err(ForecastConfigError::InvalidDecayFactor(
                graduation.decay_factor,
            ));
        }

        let weights = &self.attractiveness.weights;
        let sum = weights.sum();
        if weights.as_array().iter().any(|weight| *weight < 0.0)
            || (sum - 1.0).abs() > WEIGHT_TOLERANCE
        {
            return Err(ForecastConfigError::WeightsDoNotSumToOne(sum));
        }

        let attractiveness = &self.attractiveness;
        if attractiveness.review_cap == 0 || attractiveness.feature_cap == 0 {
            return Err(ForecastConfigError::ZeroCap);
        }
        if attractiveness.ideal_staff_ratio.is_nan() || attractiveness.ideal_staff_ratio <= 0.0 {
            return Err(ForecastConfigError::InvalidStaffRatio(
                attractiveness.ideal_staff_ratio,
            ));
        }
        if !(0.0..=1.0).contains(&attractiveness.neutral_score) {
            return Err(ForecastConfigError::InvalidNeutralScore(
                attractiveness.neutral_score,
            ));
        }

        let demand = &self.demand;
        let ordered = demand.min_factor > 0.0 && demand.min_factor <= demand.max_factor;
        if !ordered {
            return Err(ForecastConfigError::InvalidDemandBounds {
                min: demand.min_factor,
                max: demand.max_factor,
            });
        }

        Ok(())
    }
}

/// Month-keyed additive adjustments for the yearly enrollment cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalCalendar {
    pub graduation_month: u32,
    pub graduation_adjustment: i32,
    pub enrollment_month: u32,
    pub enrollment_adjustment: i32,
    pub stable_months: Vec<u32>,
    pub stable_adjustment: i32,
}

impl Default for SeasonalCalendar {
    fn default() -> Self {
        Self {
            graduation_month: 3,
            graduation_adjustment: 3,
            enrollment_month: 9,
            enrollment_adjustment: 1,
            stable_months: vec![4, 5, 6],
            stable_adjustment: -1,
        }
    }
}

/// When graduating seats are expected to open, and how the signal fades afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraduationSchedule {
    pub proximity_months: Vec<u32>,
    pub decay_months: Vec<u32>,
    pub decay_factor: f64,
}

impl Default for GraduationSchedule {
    fn default() -> Self {
        Self {
            proximity_months: vec![1, 2, 3, 4],
            decay_months: vec![5, 6],
            decay_factor: 0.3,
        }
    }
}

impl GraduationSchedule {
    /// Share of the graduating cohort expected to vacate in `month`.
    pub fn multiplier(&self, month: u32) -> f64 {
        if self.proximity_months.contains(&month) {
            1.0
        } else if self.decay_months.contains(&month) {
            self.decay_factor
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractivenessWeights {
    pub rating: f64,
    pub reviews: f64,
    pub evaluation: f64,
    pub premium: f64,
    pub features: f64,
    pub staffing: f64,
}

impl Default for AttractivenessWeights {
    fn default() -> Self {
        Self {
            rating: 0.30,
            reviews: 0.15,
            evaluation: 0.25,
            premium: 0.10,
            features: 0.10,
            staffing: 0.10,
        }
    }
}

impl AttractivenessWeights {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.rating,
            self.reviews,
            self.evaluation,
            self.premium,
            self.features,
            self.staffing,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttractivenessConfig {
    pub weights: AttractivenessWeights,
    /// Review count past which popularity stops adding score.
    pub review_cap: u32,
    pub feature_cap: u32,
    /// Teachers per enrolled child that earns a full staffing score.
    pub ideal_staff_ratio: f64,
    pub neutral_score: f64,
}

impl Default for AttractivenessConfig {
    fn default() -> Self {
        Self {
            weights: AttractivenessWeights::default(),
            review_cap: 50,
            feature_cap: 10,
            ideal_staff_ratio: 0.25,
            neutral_score: NEUTRAL_ATTRACTIVENESS,
        }
    }
}

/// Clamp range for the regional demand multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandBounds {
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for DemandBounds {
    fn default() -> Self {
        Self {
            min_factor: 0.5,
            max_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastConfigError {
    #[error("forecast horizon must be at least one week")]
    ZeroHorizon,
    #[error("minimum snapshot count must be at least one")]
    ZeroMinimumSnapshots,
    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u32),
    #[error("graduation decay factor {0} is outside 0..=1")]
    InvalidDecayFactor(f64),
    #[error("attractiveness weights must be non-negative and sum to 1.0 (got {0})")]
    WeightsDoNotSumToOne(f64),
    #[error("review and feature caps must be positive")]
    ZeroCap,
    #[error("ideal staff ratio {0} must be positive")]
    InvalidStaffRatio(f64),
    #[error("neutral attractiveness score {0} is outside 0..=1")]
    InvalidNeutralScore(f64),
    #[error("demand bounds {min}..{max} are not an ordered positive range")]
    InvalidDemandBounds { min: f64, max: f64 },
}
