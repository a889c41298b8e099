//! Tower layer that resolves and echoes the correlation ID

use super::{RequestContext, CORRELATION_HEADER};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderValue},
    response::Response,
};
use std::{
    convert::Infallible,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_util::sync::CancellationToken;
use tower::{Layer, Service};
use tracing::Instrument;

/// Cancellation signal for the current request
///
/// Cancelled when the request future is dropped before it produced a
/// response, e.g. because the client disconnected.
#[derive(Debug, Clone, Default)]
pub struct RequestCancellation(pub CancellationToken);

impl RequestCancellation {
    pub fn token(&self) -> &CancellationToken {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestCancellation>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Correlation layer
///
/// Applying the layer twice is harmless: the inner instance finds the
/// context the outer one attached and keeps its ID.
#[derive(Debug, Clone, Default)]
pub struct CorrelationLayer;

impl CorrelationLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationMiddleware { inner }
    }
}

/// Correlation middleware service
#[derive(Debug, Clone)]
pub struct CorrelationMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let mut inner = self.inner.clone();

        let context = match request.extensions().get::<RequestContext>() {
            Some(existing) => existing.clone(),
            None => {
                let context = RequestContext::from_request_head(
                    request.method(),
                    request.uri(),
                    request.headers(),
                    request.extensions(),
                );
                request.extensions_mut().insert(context.clone());
                context
            },
        };

        let cancellation = match request.extensions().get::<RequestCancellation>() {
            Some(existing) => existing.clone(),
            None => {
                let cancellation = RequestCancellation::default();
                request.extensions_mut().insert(cancellation.clone());
                cancellation
            },
        };

        let span = tracing::info_span!(
            "request",
            correlation_id = %context.correlation_id,
            method = context.http_method.as_deref().unwrap_or_default(),
            path = context.request_path.as_deref().unwrap_or_default(),
        );

        Box::pin(
            async move {
                let guard = cancellation.0.clone().drop_guard();
                let result = inner.call(request).await;
                let _ = guard.disarm();

                let mut response = result?;
                match HeaderValue::from_str(&context.correlation_id) {
                    Ok(value) => {
                        response.headers_mut().insert(CORRELATION_HEADER, value);
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "Correlation ID is not a valid header value");
                    },
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    async fn echo_context(context: RequestContext) -> String {
        context.correlation_id
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(echo_context))
            .layer(CorrelationLayer::new())
    }

    #[tokio::test]
    async fn test_header_is_echoed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(CORRELATION_HEADER, "trace-me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[CORRELATION_HEADER], "trace-me");
    }

    #[tokio::test]
    async fn test_minted_id_is_echoed() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()[CORRELATION_HEADER].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_double_layer_keeps_one_id() {
        let app = Router::new()
            .route("/", get(echo_context))
            .layer(CorrelationLayer::new())
            .layer(CorrelationLayer::new());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let echoed = response.headers()[CORRELATION_HEADER].to_str().unwrap().to_string();

        use http_body_util::BodyExt;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), echoed);
    }
}
