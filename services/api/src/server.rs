use crate::cli::ServeArgs;
use crate::infra::{AppState, ForecastStores};
use crate::routes::with_forecast_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use seat_forecast::config::AppConfig;
use seat_forecast::error::AppError;
use seat_forecast::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let stores = match config.data_dir.as_deref() {
        Some(dir) => ForecastStores::load_dir(dir)?,
        None => {
            warn!("FORECAST_DATA_DIR not set, serving an empty facility inventory");
            ForecastStores::default()
        }
    };
    let service = Arc::new(stores.into_service(config.forecast.clone(), config.service.clone()));
    let shutdown = service.shutdown_signal();

    let app = with_forecast_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "vacancy forecast service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
            readiness_flag.store(false, Ordering::Release);
            shutdown.store(true, Ordering::Release);
        })
        .await?;
    Ok(())
}
