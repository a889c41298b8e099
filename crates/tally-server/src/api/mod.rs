//! HTTP surface
//!
//! Top-level probes plus the feature routes under `/api/v1`, wrapped in the
//! middleware stack. The correlation layer sits outermost so every span and
//! every log line below it carries the request's correlation ID.

pub mod response;

use crate::config::CorsConfig;
use crate::correlation::CorrelationLayer;
use crate::db;
use crate::features::{self, FeatureState};
use crate::metrics::OperationMetrics;
use crate::middleware;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

#[derive(Clone)]
struct RootState {
    metrics: Arc<OperationMetrics>,
    db: Option<PgPool>,
}

/// Build the full application router
///
/// `db` is checked by `/health` when present; in-memory runs pass `None`.
pub fn create_router(state: FeatureState, cors: &CorsConfig, db: Option<PgPool>) -> Router {
    let root = RootState {
        metrics: Arc::clone(state.dispatcher.metrics()),
        db,
    };

    Router::new()
        .route("/", get(root_info))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(root)
        .nest("/api/v1", features::router(state))
        // Layers run outermost last
        .layer(CompressionLayer::new())
        .layer(middleware::cors_layer(cors))
        .layer(middleware::tracing_layer())
        .layer(CorrelationLayer::new())
}

async fn root_info() -> impl IntoResponse {
    Json(json!({
        "name": "Tally Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health(State(state): State<RootState>) -> Response {
    let Some(pool) = &state.db else {
        return (StatusCode::OK, Json(json!({ "status": "healthy", "database": "in-memory" })))
            .into_response();
    };

    match db::health_check(pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy", "database": "connected" })))
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "unreachable" })),
            )
                .into_response()
        },
    }
}

async fn metrics(State(state): State<RootState>) -> Response {
    match state.metrics.render() {
        Ok((body, content_type)) => {
            let content_type = HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("text/plain; version=0.0.4"));
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}
