//! Security event log read side
//!
//! - `GET /api/v1/security-events` - filtered listing
//!
//! # Query Parameters
//!
//! - `eventType`, `outcome`, `userId`, `startDate`, `endDate`
//! - `page`, `pageSize`, `sortBy`, `sortDesc`
//!
//! Results are limited to events attributed to the caller; a `userId` naming
//! anyone else is answered with `403 Forbidden`.

use crate::api::response::ApiResponse;
use crate::correlation::{RequestCancellation, RequestContext};
use crate::cqrs::{self, Operation, Trackable};
use crate::error::{ApiResult, AppError};
use crate::features::shared::access::scope_to_caller;
use crate::features::{CurrentUser, FeatureState};
use crate::query::{PageRequest, PageResult};
use crate::security::{SecurityEvent, SecurityEventQuery, SecurityEventQueryParams};
use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};

#[derive(Debug, Clone)]
pub struct QuerySecurityEventsQuery {
    pub filter: SecurityEventQuery,
    pub page: PageRequest,
}

impl Trackable for QuerySecurityEventsQuery {
    fn operation_name(&self) -> &'static str {
        "QuerySecurityEvents"
    }
}

impl Operation for QuerySecurityEventsQuery {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl cqrs::Query for QuerySecurityEventsQuery {}

#[tracing::instrument(skip(state))]
pub async fn handle(
    state: &FeatureState,
    query: &QuerySecurityEventsQuery,
) -> Result<PageResult<SecurityEvent>, AppError> {
    Ok(state.security.store().query(&query.filter, &query.page).await?)
}

pub fn security_event_routes() -> Router<FeatureState> {
    Router::new().route("/", get(list_security_events))
}

async fn list_security_events(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    context: RequestContext,
    cancellation: RequestCancellation,
    Query(page): Query<PageRequest>,
    Query(params): Query<SecurityEventQueryParams>,
) -> ApiResult<ApiResponse<PageResult<SecurityEvent>>> {
    let mut filter = SecurityEventQuery::try_from(params)?;
    filter.user_id =
        Some(scope_to_caller(&state, user_id, filter.user_id, "security events", &context).await?);
    let query = QuerySecurityEventsQuery { filter, page };

    state
        .dispatcher
        .query(&query, cancellation.token(), handle(&state, &query))
        .await
        .map(ApiResponse::success)
}
