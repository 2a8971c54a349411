use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ProductCode, ProductRecord, UserId};
use super::error::CompatibilityError;
use super::profile::{normalize_profile, RawProfileInput};
use super::repository::{ProductCatalog, ProfileStore};
use super::service::CompatibilityService;

const DEFAULT_ALTERNATIVES: usize = 5;
const MAX_ALTERNATIVES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub product: ProductRecord,
    #[serde(default)]
    pub profile: RawProfileInput,
}

#[derive(Debug, Deserialize)]
pub struct AlternativesRequest {
    pub product: ProductRecord,
    #[serde(default)]
    pub profile: RawProfileInput,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub min_score: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub limit: Option<usize>,
}

/// HTTP endpoints over the compatibility service.
pub fn compatibility_router<C, P>(service: Arc<CompatibilityService<C, P>>) -> Router
where
    C: ProductCatalog + 'static,
    P: ProfileStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/compatibility/analyze",
            post(analyze_handler::<C, P>),
        )
        .route(
            "/api/v1/compatibility/quick-check",
            post(quick_check_handler::<C, P>),
        )
        .route(
            "/api/v1/compatibility/learned-score",
            post(learned_score_handler::<C, P>),
        )
        .route(
            "/api/v1/compatibility/alternatives",
            post(alternatives_handler::<C, P>),
        )
        .route(
            "/api/v1/users/:user_id/products/:code/report",
            get(report_handler::<C, P>),
        )
        .with_state(service)
}

pub(crate) async fn analyze_handler<C, P>(
    State(service): State<Arc<CompatibilityService<C, P>>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response
where
    C: ProductCatalog + 'static,
    P: ProfileStore + 'static,
{
    let profile = normalize_profile(request.profile);
    let result = service.analyze(&request.product, &profile);
    (StatusCode::OK, Json(result)).into_response()
}

pub(crate) async fn quick_check_handler<C, P>(
    State(service): State<Arc<CompatibilityService<C, P>>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response
where
    C: ProductCatalog + 'static,
    P: ProfileStore + 'static,
{
    let profile = normalize_profile(request.profile);
    let verdict = service.quick_verdict(&request.product, &profile);
    (StatusCode::OK, Json(verdict)).into_response()
}

pub(crate) async fn learned_score_handler<C, P>(
    State(service): State<Arc<CompatibilityService<C, P>>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response
where
    C: ProductCatalog + 'static,
    P: ProfileStore + 'static,
{
    let profile = normalize_profile(request.profile);
    let score = service.estimate_learned_score(&request.product, &profile);
    (StatusCode::OK, Json(score)).into_response()
}

pub(crate) async fn alternatives_handler<C, P>(
    State(service): State<Arc<CompatibilityService<C, P>>>,
    Json(request): Json<AlternativesRequest>,
) -> Response
where
    C: ProductCatalog + 'static,
    P: ProfileStore + 'static,
{
    let profile = normalize_profile(request.profile);
    let limit = request
        .limit
        .unwrap_or(DEFAULT_ALTERNATIVES)
        .min(MAX_ALTERNATIVES);
    let alternatives = service
        .find_alternatives(&request.product, &profile, limit, request.min_score)
        .await;
    let payload = json!({
        "product_code": request.product.code,
        "alternatives": alternatives,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn report_handler<C, P>(
    State(service): State<Arc<CompatibilityService<C, P>>>,
    Path((user_id, code)): Path<(String, String)>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    C: ProductCatalog + 'static,
    P: ProfileStore + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ALTERNATIVES)
        .min(MAX_ALTERNATIVES);
    match service
        .report_for(&UserId(user_id), &ProductCode(code), limit)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(&error),
    }
}

fn error_response(error: &CompatibilityError) -> Response {
    let status = match error {
        CompatibilityError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CompatibilityError::NotFound { .. } => StatusCode::NOT_FOUND,
        CompatibilityError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        CompatibilityError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
        "retryable": error.is_retryable(),
    });
    (status, Json(payload)).into_response()
}
