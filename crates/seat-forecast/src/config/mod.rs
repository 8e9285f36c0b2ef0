use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

use crate::forecast::{ForecastConfig, ForecastConfigError, ServiceSettings};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub forecast: ForecastConfig,
    pub service: ServiceSettings,
    /// Directory holding `facilities.json`, `snapshots.csv` and `population.csv`.
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let data_dir = env::var("FORECAST_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let forecast = load_forecast_config()?;
        forecast.validate().map_err(ConfigError::InvalidForecast)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            forecast,
            service: load_service_settings()?,
            data_dir,
        })
    }
}

fn load_forecast_config() -> Result<ForecastConfig, ConfigError> {
    let mut config = ForecastConfig::default();

    config.horizon_weeks = parse_var("FORECAST_HORIZON_WEEKS", config.horizon_weeks)?;
    config.min_snapshots_required =
        parse_var("FORECAST_MIN_SNAPSHOTS", config.min_snapshots_required)?;

    let seasonal = &mut config.seasonal;
    seasonal.graduation_month = parse_var("FORECAST_GRADUATION_MONTH", seasonal.graduation_month)?;
    seasonal.enrollment_month = parse_var("FORECAST_ENROLLMENT_MONTH", seasonal.enrollment_month)?;
    if let Some(months) = parse_list("FORECAST_STABLE_MONTHS")? {
        seasonal.stable_months = months;
    }
    seasonal.graduation_adjustment = parse_var(
        "FORECAST_GRADUATION_ADJUSTMENT",
        seasonal.graduation_adjustment,
    )?;
    seasonal.enrollment_adjustment = parse_var(
        "FORECAST_ENROLLMENT_ADJUSTMENT",
        seasonal.enrollment_adjustment,
    )?;
    seasonal.stable_adjustment =
        parse_var("FORECAST_STABLE_ADJUSTMENT", seasonal.stable_adjustment)?;

    let graduation = &mut config.graduation;
    if let Some(months) = parse_list("FORECAST_PROXIMITY_MONTHS")? {
        graduation.proximity_months = months;
    }
    if let Some(months) = parse_list("FORECAST_DECAY_MONTHS")? {
        graduation.decay_months = months;
    }
    graduation.decay_factor = parse_var("FORECAST_DECAY_FACTOR", graduation.decay_factor)?;

    let attractiveness = &mut config.attractiveness;
    let weights = &mut attractiveness.weights;
    weights.rating = parse_var("FORECAST_WEIGHT_RATING", weights.rating)?;
    weights.reviews = parse_var("FORECAST_WEIGHT_REVIEWS", weights.reviews)?;
    weights.evaluation = parse_var("FORECAST_WEIGHT_EVALUATION", weights.evaluation)?;
    weights.premium = parse_var("FORECAST_WEIGHT_PREMIUM", weights.premium)?;
    weights.features = parse_var("FORECAST_WEIGHT_FEATURES", weights.features)?;
    weights.staffing = parse_var("FORECAST_WEIGHT_STAFFING", weights.staffing)?;
    attractiveness.review_cap = parse_var("FORECAST_REVIEW_CAP", attractiveness.review_cap)?;
    attractiveness.feature_cap = parse_var("FORECAST_FEATURE_CAP", attractiveness.feature_cap)?;
    attractiveness.ideal_staff_ratio =
        parse_var("FORECAST_IDEAL_STAFF_RATIO", attractiveness.ideal_staff_ratio)?;
    attractiveness.neutral_score =
        parse_var("FORECAST_NEUTRAL_SCORE", attractiveness.neutral_score)?;

    config.demand.min_factor = parse_var("FORECAST_DEMAND_MIN", config.demand.min_factor)?;
    config.demand.max_factor = parse_var("FORECAST_DEMAND_MAX", config.demand.max_factor)?;

    Ok(config)
}

fn load_service_settings() -> Result<ServiceSettings, ConfigError> {
    let defaults = ServiceSettings::default();
    let validity_days = parse_var("FORECAST_VALIDITY_DAYS", defaults.validity_window.num_days())?;
    if validity_days <= 0 {
        return Err(ConfigError::InvalidValue {
            key: "FORECAST_VALIDITY_DAYS",
            value: validity_days.to_string(),
        });
    }

    Ok(ServiceSettings {
        validity_window: Duration::days(validity_days),
        batch_size: parse_var("FORECAST_BATCH_SIZE", defaults.batch_size)?.max(1),
        snapshot_limit: parse_var("FORECAST_SNAPSHOT_LIMIT", defaults.snapshot_limit)?,
    })
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        _ => Ok(default),
    }
}

/// Comma-separated month list; `None` when the variable is unset.
fn parse_list(key: &'static str) -> Result<Option<Vec<u32>>, ConfigError> {
    let Ok(value) = env::var(key) else {
        return Ok(None);
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key,
                value: value.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    MissingValue { key: &'static str },
    InvalidForecast(ForecastConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
            ConfigError::MissingValue { key } => write!(f, "{key} must be set"),
            ConfigError::InvalidForecast(err) => write!(f, "invalid forecast settings: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::MissingValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidForecast(err) => Some(err),
        }
    }
}
