//! HTTP routes and handlers.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use binwatch_core::{
    AccessLevel, BinId, BinStatus, Coordinate, DEFAULT_GRANT_TTL_MINUTES, RouteRequest,
    RouteResult,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/bins", get(list_bins))
        .route("/api/bins/{id}/readings", post(record_reading))
        .route("/api/route", post(plan_route))
        .route("/api/realtime/token", post(realtime_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the dashboard origins. Unparseable origins are skipped.
#[must_use]
pub fn cors(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(AllowOrigin::list(
            origins.iter().filter_map(|origin| origin.parse().ok()),
        ))
        .max_age(Duration::from_secs(3600))
}

// =============================================================================
// Request / response bodies
// =============================================================================

/// Bin identifiers arrive as strings or as plain integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBinId {
    Text(String),
    Number(i64),
}

impl From<RawBinId> for BinId {
    fn from(raw: RawBinId) -> Self {
        match raw {
            RawBinId::Text(text) => BinId(text),
            RawBinId::Number(number) => BinId(number.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    bin_ids: Vec<RawBinId>,
    origin: Coordinate,
}

#[derive(Debug, Deserialize)]
struct ReadingBody {
    distance: f64,
    #[serde(default)]
    recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GrantBody {
    user_id: String,
    access: String,
    #[serde(default)]
    ttl: Option<u32>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct BinsResponse {
    success: bool,
    bins: Vec<BinStatus>,
}

#[derive(Debug, Serialize)]
struct BinResponse {
    success: bool,
    bin: BinStatus,
}

#[derive(Debug, Serialize)]
struct RouteResponse {
    success: bool,
    route: RouteResult,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    success: bool,
    token: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/bins
async fn list_bins(State(state): State<AppState>) -> Result<Json<BinsResponse>, ApiError> {
    let bins = state.service.bin_statuses().await?;
    Ok(Json(BinsResponse {
        success: true,
        bins,
    }))
}

/// POST /api/bins/{id}/readings
async fn record_reading(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ReadingBody>, JsonRejection>,
) -> Result<(StatusCode, Json<BinResponse>), ApiError> {
    let Json(body) = payload?;
    let bin = state
        .service
        .record_reading(&BinId(id), body.distance, body.recorded_at)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BinResponse { success: true, bin }),
    ))
}

/// POST /api/route
async fn plan_route(
    State(state): State<AppState>,
    payload: Result<Json<RouteBody>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Json(body) = payload?;

    if !body.origin.is_valid() {
        return Err(ApiError::BadRequest(format!(
            "Invalid origin coordinate: {}",
            body.origin
        )));
    }

    let request = RouteRequest {
        bin_ids: body.bin_ids.into_iter().map(BinId::from).collect(),
        origin: body.origin,
    };
    let route = state.service.plan_route(&request).await?;

    Ok(Json(RouteResponse {
        success: true,
        route,
    }))
}

/// POST /api/realtime/token
async fn realtime_token(
    State(state): State<AppState>,
    payload: Result<Json<GrantBody>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(body) = payload?;
    let access = body
        .access
        .parse::<AccessLevel>()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let token = state
        .service
        .grant_realtime_access(
            &body.user_id,
            access,
            body.ttl.unwrap_or(DEFAULT_GRANT_TTL_MINUTES),
        )
        .await?;

    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}
