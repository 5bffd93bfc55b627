//! HTTP surface over the ticker's read path
//!
//! Handlers only read the published snapshot; none of them touch the network.

use crate::{
    ticker::Ticker,
    types::{Freshness, HealthStatus},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Serialize)]
struct PriceBody {
    pair: String,
    value: f64,
    observed_at: DateTime<Utc>,
    source: String,
    source_time: Option<DateTime<Utc>>,
    freshness: Freshness,
    age_secs: f64,
}

async fn get_price(State(ticker): State<Arc<Ticker>>) -> Response {
    let now = Utc::now();
    match ticker.current_at(now) {
        Some((reading, freshness)) => Json(PriceBody {
            pair: reading.pair().to_string(),
            value: reading.value(),
            observed_at: reading.observed_at(),
            source: reading.source().to_string(),
            source_time: reading.source_time(),
            freshness,
            age_secs: reading.age_at(now).as_secs_f64(),
        })
        .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "unavailable" })),
        )
            .into_response(),
    }
}

async fn get_health(State(ticker): State<Arc<Ticker>>) -> Response {
    let health = ticker.health_check().await;
    let status = match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (status, Json(health)).into_response()
}

async fn get_metrics(State(ticker): State<Arc<Ticker>>) -> Response {
    Json(ticker.fetch_metrics().await).into_response()
}

pub fn router(ticker: Arc<Ticker>) -> Router {
    Router::new()
        .route("/price", get(get_price))
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(ticker)
}

/// Serves the router until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    ticker: Arc<Ticker>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }
    axum::serve(listener, router(ticker))
        .with_graceful_shutdown(shutdown)
        .await
}
