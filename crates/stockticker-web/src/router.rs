//! HTTP routes.

use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use stockticker_core::{ClosingPriceReport, QuoteAggregator};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

pub const CLOSING_PRICE_PATH: &str = "/api/v1/stock-closing-price-info";
pub const HEALTH_PATH: &str = "/api/health";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: QuoteAggregator,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route(CLOSING_PRICE_PATH, get(closing_price_info))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// GET /api/v1/stock-closing-price-info
async fn closing_price_info(
    State(state): State<AppState>,
) -> Result<Json<ClosingPriceReport>, ApiError> {
    let report = state.aggregator.closing_price_report().await?;
    Ok(Json(report))
}

/// GET /api/health
async fn health() -> Json<&'static str> {
    Json("OK")
}
