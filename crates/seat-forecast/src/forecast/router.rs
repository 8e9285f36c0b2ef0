use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use super::domain::FacilityId;
use super::repository::{DemographicSource, FacilityStore, PredictionCache};
use super::service::{ForecastService, ForecastServiceError};

/// Router builder exposing the prediction lookup and the batch trigger.
pub fn forecast_router<F, D, C>(service: Arc<ForecastService<F, D, C>>) -> Router
where
    F: FacilityStore + 'static,
    D: DemographicSource + 'static,
    C: PredictionCache + 'static,
{
    Router::new()
        .route(
            "/api/v1/facilities/:facility_id/prediction",
            get(prediction_handler::<F, D, C>),
        )
        .route("/api/v1/predictions/batch", post(batch_handler::<F, D, C>))
        .with_state(service)
}

pub(crate) async fn prediction_handler<F, D, C>(
    State(service): State<Arc<ForecastService<F, D, C>>>,
    Path(facility_id): Path<String>,
) -> Response
where
    F: FacilityStore + 'static,
    D: DemographicSource + 'static,
    C: PredictionCache + 'static,
{
    let id = FacilityId(facility_id);
    match service.predict(&id, Utc::now()) {
        Ok(Some(record)) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Ok(None) => {
            let payload = json!({
                "facility_id": id.0,
                "prediction": serde_json::Value::Null,
                "reason": "facility unknown or snapshot history too short",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(ForecastServiceError::InvalidProfile(err)) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            error!(facility_id = %id, error = %other, "prediction lookup failed");
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn batch_handler<F, D, C>(
    State(service): State<Arc<ForecastService<F, D, C>>>,
) -> Response
where
    F: FacilityStore + 'static,
    D: DemographicSource + 'static,
    C: PredictionCache + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.run_batch(Utc::now())).await;
    match outcome {
        Ok(Ok(stats)) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Ok(Err(err)) => {
            error!(error = %err, "prediction batch failed");
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
        Err(join_error) => {
            error!(error = %join_error, "prediction batch task aborted");
            let payload = json!({
                "error": "batch task aborted",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::config::ForecastConfig;
    use crate::forecast::domain::{CapacityCounts, FacilityProfile, OccupancySnapshot};
    use crate::forecast::memory::{
        InMemoryDemographics, InMemoryFacilityStore, InMemoryPredictionCache,
    };
    use crate::forecast::service::ServiceSettings;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use serde_json::Value;
    use tower::ServiceExt;

    type MemoryService =
        ForecastService<InMemoryFacilityStore, InMemoryDemographics, InMemoryPredictionCache>;

    fn service_with(store: InMemoryFacilityStore) -> Arc<MemoryService> {
        Arc::new(ForecastService::new(
            Arc::new(store),
            Arc::new(InMemoryDemographics::default()),
            Arc::new(InMemoryPredictionCache::new()),
            ForecastConfig::default(),
            ServiceSettings::default(),
        ))
    }

    fn seeded_store(id: &str, snapshots: usize) -> InMemoryFacilityStore {
        let store = InMemoryFacilityStore::new();
        let facility_id = FacilityId::new(id);
        store
            .insert(FacilityProfile::new(
                facility_id.clone(),
                CapacityCounts::new(40, 30, 0),
            ))
            .unwrap();
        let start = Utc::now() - Duration::weeks(snapshots as i64);
        for week in 0..snapshots {
            store
                .append_snapshot(
                    &facility_id,
                    OccupancySnapshot::new(
                        CapacityCounts::new(40, 30, 0),
                        start + Duration::weeks(week as i64),
                    ),
                )
                .unwrap();
        }
        store
    }

    async fn read_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn prediction_route_returns_view() {
        let app = forecast_router(service_with(seeded_store("fac-1", 4)));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/facilities/fac-1/prediction")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["facility_id"], "fac-1");
        assert_eq!(json["snapshot_count"], 4);
        assert!(json["overall_score"].as_u64().unwrap() <= 100);
    }

    #[tokio::test]
    async fn short_history_yields_null_prediction() {
        let app = forecast_router(service_with(seeded_store("fac-1", 2)));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/facilities/fac-1/prediction")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["facility_id"], "fac-1");
        assert!(json["prediction"].is_null());
        assert!(json["reason"].is_string());
    }

    #[tokio::test]
    async fn invalid_profile_is_unprocessable() {
        let store = seeded_store("fac-1", 4);
        let mut profile =
            FacilityProfile::new(FacilityId::new("fac-1"), CapacityCounts::new(40, 30, 0));
        profile.rating = 12.0;
        store.insert(profile).unwrap();

        let app = forecast_router(service_with(store));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/facilities/fac-1/prediction")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn batch_route_reports_stats() {
        let store = seeded_store("fac-1", 4);
        store
            .insert(FacilityProfile::new(
                FacilityId::new("fac-2"),
                CapacityCounts::new(20, 20, 0),
            ))
            .unwrap();

        let app = forecast_router(service_with(store));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/predictions/batch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["processed"], 1);
        assert_eq!(json["skipped"], 1);
        assert_eq!(json["errors"], 0);
        assert_eq!(json["cancelled"], false);
    }
}
