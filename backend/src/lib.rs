pub mod analysis;
pub mod config;
pub mod downsample;
pub mod error;
pub mod models;
pub mod projection;
pub mod provider;
pub mod recommend;
pub mod route_id;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::RecommendError;
use crate::models::{ApiError, Coordinate, RecommendRequest, RecommendResponse};
use crate::recommend::Recommender;

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/recommend", post(recommend_handler))
        .route("/routes/recommend", get(recommend_query_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

async fn recommend_handler(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> ApiResult<Json<RecommendResponse>> {
    let Json(mut req) = payload.map_err(|rejection| bad_request(&rejection.body_text()))?;
    validate(&req)?;
    req.banned_route_ids.retain(|id| !id.is_empty());
    run(&state, &req).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendQuery {
    time: f64,
    lat: f64,
    lng: f64,
    user_id: Option<String>,
}

async fn recommend_query_handler(
    State(state): State<AppState>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
) -> ApiResult<Json<RecommendResponse>> {
    let Query(query) = query.map_err(|rejection| bad_request(&rejection.body_text()))?;
    let req = RecommendRequest {
        start: Coordinate::new(query.lat, query.lng),
        minutes: query.time,
        user_id: query.user_id,
        banned_route_ids: Vec::new(),
    };
    validate(&req)?;
    run(&state, &req).await
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn run(state: &AppState, req: &RecommendRequest) -> ApiResult<Json<RecommendResponse>> {
    let routes = state
        .recommender
        .recommend(req)
        .await
        .map_err(recommend_error)?;
    Ok(Json(RecommendResponse { routes }))
}

fn validate(req: &RecommendRequest) -> ApiResult<()> {
    if !req.start.is_finite() {
        return Err(bad_request("start.lat and start.lng must be finite numbers"));
    }
    if !req.minutes.is_finite() || req.minutes <= 0.0 {
        return Err(bad_request("minutes must be a positive number"));
    }
    Ok(())
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            message: message.to_string(),
        }),
    )
}

fn recommend_error(err: RecommendError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        RecommendError::NoRoutesFound { .. } => StatusCode::NOT_FOUND,
    };
    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
