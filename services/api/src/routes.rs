use crate::infra::{AppService, AppState, InMemoryProfileStore};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Extension, Json};
use nutrilens::compatibility::{compatibility_router, normalize_profile, RawProfileInput, UserId};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes(service: Arc<AppService>) -> axum::Router {
    compatibility_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/users/:user_id/profile", put(profile_upsert_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Stores the normalized profile so the report route can find it.
pub(crate) async fn profile_upsert_endpoint(
    Extension(profiles): Extension<InMemoryProfileStore>,
    Path(user_id): Path<String>,
    Json(raw): Json<RawProfileInput>,
) -> impl IntoResponse {
    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "user id is required" })),
        );
    }

    let mut profile = normalize_profile(raw);
    profile.user_id = Some(UserId(user_id.clone()));
    profiles.upsert(UserId(user_id), profile.clone());

    (StatusCode::OK, Json(json!({ "profile": profile })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_service;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use nutrilens::config::EngineSettings;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> (axum::Router, InMemoryProfileStore) {
        let profiles = InMemoryProfileStore::default();
        let service =
            Arc::new(build_service(&EngineSettings::default(), profiles.clone()).expect("service"));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_service_routes(service)
            .layer(Extension(profiles.clone()))
            .layer(Extension(state));
        (router, profiles)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let (router, _) = app(false);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let (router, _) = app(true);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn profile_upsert_normalizes_and_stores() {
        let (router, profiles) = app(true);
        let request = Request::put("/api/v1/users/u-9/profile")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"allergies": "Milk, Tree Nuts", "height_cm": 180, "weight_kg": 81}"#,
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["profile"]["allergies"], json!(["milk", "tree_nuts"]));
        assert_eq!(body["profile"]["bmi"], json!(25.0));

        use nutrilens::compatibility::ProfileStore;
        let stored = profiles
            .get(&UserId("u-9".to_string()))
            .await
            .expect("store")
            .expect("profile stored");
        assert!(stored.allergies.contains("milk"));
    }

    #[tokio::test]
    async fn report_for_unknown_user_is_not_found() {
        let (router, _) = app(true);
        let response = router
            .oneshot(
                Request::get("/api/v1/users/ghost/products/1001/report")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
