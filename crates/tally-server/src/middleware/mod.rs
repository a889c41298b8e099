//! HTTP middleware
//!
//! - CORS from configuration
//! - Access logging with the correlation ID on every span

use axum::http::{header, HeaderName, Method, Request};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::{Level, Span};

use crate::config::CorsConfig;
use crate::correlation::{RequestContext, CORRELATION_HEADER};
use crate::features::USER_ID_HEADER;

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(CORRELATION_HEADER),
        ])
        .expose_headers([HeaderName::from_static(CORRELATION_HEADER)])
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);

        // Credentials cannot be combined with a wildcard origin
        if config.allow_credentials {
            cors = cors.allow_credentials(true);
        }
    }

    cors
}

/// Span factory that tags access logs with the correlation ID
///
/// Must run inside [`crate::correlation::CorrelationLayer`] so the context
/// is already attached; otherwise the span records `-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelatedMakeSpan;

impl<B> MakeSpan<B> for CorrelatedMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let correlation_id = request
            .extensions()
            .get::<RequestContext>()
            .map(|context| context.correlation_id.as_str())
            .unwrap_or("-");

        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %request.uri(),
            correlation_id = %correlation_id,
        )
    }
}

/// Create tracing/logging layer
pub fn tracing_layer(
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, CorrelatedMakeSpan> {
    TraceLayer::new_for_http()
        .make_span_with(CorrelatedMakeSpan)
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_with_specific_origins() {
        let config = CorsConfig {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "https://example.com".to_string(),
            ],
            allow_credentials: true,
        };

        let _layer = cors_layer(&config);
    }

    #[test]
    fn test_cors_layer_with_wildcard_and_credentials() {
        let config = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
        };

        let _layer = cors_layer(&config);
    }

    #[test]
    fn test_make_span_without_context() {
        let request = Request::builder().uri("/health").body(()).unwrap();
        let _span = CorrelatedMakeSpan.make_span(&request);
    }
}
