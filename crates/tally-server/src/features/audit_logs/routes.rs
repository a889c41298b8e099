//! Audit log API routes
//!
//! - `GET /api/v1/audit-logs` - filtered listing
//! - `GET /api/v1/audit-logs/:entity_name/:entity_id` - timeline of one entity
//! - `GET /api/v1/audit-logs/export?format=csv|xlsx|pdf` - download
//!
//! Every read is scoped to records attributed to the caller.

use super::queries::{
    self, ExportAuditLogsQuery, GetAuditTimelineQuery, QueryAuditLogsQuery,
};
use crate::api::response::ApiResponse;
use crate::audit::{AuditQuery, AuditQueryParams, AuditRecord};
use crate::correlation::{RequestCancellation, RequestContext};
use crate::error::{ApiResult, AppError};
use crate::export::ExportFormat;
use crate::features::shared::access::scope_to_caller;
use crate::features::{CurrentUser, FeatureState};
use crate::models::EntityName;
use crate::query::{PageRequest, PageResult};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

// ============================================================================
// Router Configuration
// ============================================================================

/// Audit routes; `/export` is mounted only when a renderer is configured
pub fn audit_log_routes(with_export: bool) -> Router<FeatureState> {
    let router = Router::new()
        .route("/", get(list_audit_logs))
        .route("/:entity_name/:entity_id", get(get_timeline));

    if with_export {
        router.route("/export", get(export_audit_logs))
    } else {
        tracing::info!("No export renderer configured, audit export not mounted");
        router
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List audit records
///
/// # Query Parameters
///
/// - `entityName`, `entityId`, `action`, `userId`, `startDate`, `endDate`
/// - `page`, `pageSize`, `sortBy`, `sortDesc`
///
/// # Response
///
/// - `200 OK` - one page of the caller's records, newest first by default
/// - `400 Bad Request` - unknown entity name or action, inverted date range
/// - `403 Forbidden` - `userId` names another user
async fn list_audit_logs(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    context: RequestContext,
    cancellation: RequestCancellation,
    Query(page): Query<PageRequest>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<ApiResponse<PageResult<AuditRecord>>> {
    let mut filter = AuditQuery::try_from(params)?;
    filter.user_id =
        Some(scope_to_caller(&state, user_id, filter.user_id, "audit logs", &context).await?);
    let query = QueryAuditLogsQuery { filter, page };

    state
        .dispatcher
        .query(&query, cancellation.token(), queries::handle_query(&state, &query))
        .await
        .map(ApiResponse::success)
}

/// Timeline of one entity
///
/// # Response
///
/// - `200 OK` - the caller's records for the entity, oldest first by default
/// - `400 Bad Request` - unknown entity name
async fn get_timeline(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    cancellation: RequestCancellation,
    Path((entity_name, entity_id)): Path<(String, Uuid)>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<PageResult<AuditRecord>>> {
    let entity_name = entity_name
        .parse::<EntityName>()
        .map_err(AppError::Validation)?;
    let query = GetAuditTimelineQuery::new(entity_name, entity_id, user_id, page);

    state
        .dispatcher
        .query(&query, cancellation.token(), queries::handle_timeline(&state, &query))
        .await
        .map(ApiResponse::success)
}

/// Export audit records
///
/// Accepts the listing filters plus a required `format`.
///
/// # Response
///
/// - `200 OK` - the rendered file as an attachment
/// - `400 Bad Request` - missing or unsupported format, bad filters
/// - `403 Forbidden` - `userId` names another user
async fn export_audit_logs(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    context: RequestContext,
    cancellation: RequestCancellation,
    Query(export): Query<ExportParams>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<Response> {
    let format = export
        .format
        .ok_or_else(|| AppError::Validation("Query parameter 'format' is required".to_string()))?
        .parse::<ExportFormat>()?;
    let mut filter = AuditQuery::try_from(params)?;
    filter.user_id =
        Some(scope_to_caller(&state, user_id, filter.user_id, "audit logs", &context).await?);
    let query = ExportAuditLogsQuery { format, filter };

    let rendered = state
        .dispatcher
        .query(&query, cancellation.token(), queries::handle_export(&state, &query))
        .await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        rendered.file_name
    ))
    .map_err(|e| AppError::Internal(format!("Invalid export file name: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.bytes,
    )
        .into_response())
}
