use crate::audit::{AuditQuery, AuditRecord};
use crate::cqrs::{Operation, Query, Trackable};
use crate::error::AppError;
use crate::export::{ExportFormat, RenderedExport};
use crate::features::FeatureState;
use crate::models::EntityName;
use crate::query::{PageRequest, PageResult, MAX_PAGE_SIZE};
use uuid::Uuid;

/// Upper bound on rows collected for a single export
pub const EXPORT_ROW_LIMIT: usize = 10_000;

// ============================================================================
// Filtered listing
// ============================================================================

#[derive(Debug, Clone)]
pub struct QueryAuditLogsQuery {
    pub filter: AuditQuery,
    pub page: PageRequest,
}

impl Trackable for QueryAuditLogsQuery {
    fn operation_name(&self) -> &'static str {
        "QueryAuditLogs"
    }
}

impl Operation for QueryAuditLogsQuery {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl Query for QueryAuditLogsQuery {}

#[tracing::instrument(skip(state))]
pub async fn handle_query(
    state: &FeatureState,
    query: &QueryAuditLogsQuery,
) -> Result<PageResult<AuditRecord>, AppError> {
    Ok(state.audit.store().query(&query.filter, &query.page).await?)
}

// ============================================================================
// Entity timeline
// ============================================================================

/// Audit records of one entity attributed to `user_id`, oldest first unless
/// a sort is given
#[derive(Debug, Clone)]
pub struct GetAuditTimelineQuery {
    pub entity_name: EntityName,
    pub entity_id: Uuid,
    pub user_id: Uuid,
    pub page: PageRequest,
}

impl GetAuditTimelineQuery {
    pub fn new(entity_name: EntityName, entity_id: Uuid, user_id: Uuid, page: PageRequest) -> Self {
        let page = if page.sort_field().is_none() {
            page.sorted_by("createdAt", false)
        } else {
            page
        };
        Self {
            entity_name,
            entity_id,
            user_id,
            page,
        }
    }
}

impl Trackable for GetAuditTimelineQuery {
    fn operation_name(&self) -> &'static str {
        "GetAuditTimeline"
    }
}

impl Operation for GetAuditTimelineQuery {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl Query for GetAuditTimelineQuery {}

#[tracing::instrument(skip(state))]
pub async fn handle_timeline(
    state: &FeatureState,
    query: &GetAuditTimelineQuery,
) -> Result<PageResult<AuditRecord>, AppError> {
    let filter = AuditQuery {
        user_id: Some(query.user_id),
        ..AuditQuery::for_entity(query.entity_name, query.entity_id)
    };
    Ok(state.audit.store().query(&filter, &query.page).await?)
}

// ============================================================================
// Export
// ============================================================================

#[derive(Debug, Clone)]
pub struct ExportAuditLogsQuery {
    pub format: ExportFormat,
    pub filter: AuditQuery,
}

impl Trackable for ExportAuditLogsQuery {
    fn operation_name(&self) -> &'static str {
        "ExportAuditLogs"
    }
}

impl Operation for ExportAuditLogsQuery {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl Query for ExportAuditLogsQuery {}

#[tracing::instrument(skip(state), fields(format = %query.format))]
pub async fn handle_export(
    state: &FeatureState,
    query: &ExportAuditLogsQuery,
) -> Result<RenderedExport, AppError> {
    let renderer = state
        .exporter
        .as_ref()
        .ok_or_else(|| AppError::Internal("No export renderer configured".to_string()))?;

    let records = collect_rows(state, &query.filter).await?;
    tracing::info!(rows = records.len(), "Rendering audit export");

    Ok(renderer.render(query.format, &records)?)
}

/// Walk the pages of a filtered listing until exhausted or the export cap
async fn collect_rows(state: &FeatureState, filter: &AuditQuery) -> Result<Vec<AuditRecord>, AppError> {
    let mut rows = Vec::new();
    let mut page_number = 1;

    loop {
        let request = PageRequest::new(Some(page_number), Some(MAX_PAGE_SIZE));
        let page = state.audit.store().query(filter, &request).await?;
        let has_next = page.has_next();
        rows.extend(page.items);

        if rows.len() >= EXPORT_ROW_LIMIT {
            tracing::warn!(limit = EXPORT_ROW_LIMIT, "Audit export truncated");
            rows.truncate(EXPORT_ROW_LIMIT);
            break;
        }
        if !has_next {
            break;
        }
        page_number += 1;
    }

    Ok(rows)
}
