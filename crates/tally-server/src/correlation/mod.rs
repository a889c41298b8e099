//! Request correlation
//!
//! Every inbound request gets exactly one correlation ID: the first
//! non-blank `X-Correlation-ID` header value if the caller sent one, a fresh
//! UUID otherwise. [`CorrelationLayer`] resolves it once, stores the
//! [`RequestContext`] in the request extensions and echoes the ID back on
//! the response. Handlers receive the context as an extractor and pass it
//! explicitly to anything that writes logs or records.

mod layer;

pub use layer::{CorrelationLayer, CorrelationMiddleware, RequestCancellation};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap, Method, Uri},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use uuid::Uuid;

/// Correlation header, read on requests and written on responses
pub const CORRELATION_HEADER: &str = "x-correlation-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Per-request metadata copied onto every audit record and security event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub correlation_id: String,
    pub http_method: Option<String>,
    pub request_path: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Context with only a correlation ID
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            http_method: None,
            request_path: None,
            client_ip: None,
            user_agent: None,
        }
    }

    /// Fresh context for work that does not originate from a request
    pub fn background() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Build a context from the parts of an inbound request
    pub fn from_request_head(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        extensions: &Extensions,
    ) -> Self {
        Self {
            correlation_id: resolve(headers, extensions.get::<RequestContext>()),
            http_method: Some(method.to_string()),
            request_path: Some(uri.path().to_string()),
            client_ip: client_ip(headers, extensions),
            user_agent: header_str(headers, axum::http::header::USER_AGENT.as_str()),
        }
    }
}

/// Pick the correlation ID for a request
///
/// A context already attached to the request wins, so resolving twice
/// yields the same ID. Otherwise the first header value is adopted verbatim
/// unless it is blank or not valid text, in which case a UUID v4 is minted.
pub fn resolve(headers: &HeaderMap, prior: Option<&RequestContext>) -> String {
    if let Some(prior) = prior {
        return prior.correlation_id.clone();
    }

    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let forwarded = header_str(headers, FORWARDED_FOR_HEADER).and_then(|value| {
        value
            .split(',')
            .map(str::trim)
            .find(|part| !part.is_empty())
            .map(str::to_string)
    });

    forwarded.or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<RequestContext>() {
            return Ok(context.clone());
        }

        let context =
            RequestContext::from_request_head(&parts.method, &parts.uri, &parts.headers, &parts.extensions);
        parts.extensions.insert(context.clone());
        Ok(context)
    }
}
