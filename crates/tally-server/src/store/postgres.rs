//! PostgreSQL stores
//!
//! Queries are built at runtime with `QueryBuilder`. Sort columns only ever
//! come from a type's sort registry, never from the request.

use super::{AuditStore, EntityStore, SecurityEventStore, StoreError, StoreResult};
use crate::audit::{AuditQuery, AuditRecord};
use crate::models::{Budget, Category, Expense, Scope, SoftDeletable, SoftDeleteState};
use crate::query::{DayRange, PageRequest, PageResult, Sortable};
use crate::security::{SecurityEvent, SecurityEventQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

/// `ORDER BY` clause for a page request, falling back to `default`
fn order_by<T: Sortable>(page: &PageRequest, default: &str) -> String {
    let registered = page
        .sort_field()
        .and_then(|name| T::sort_registry().lookup(name));

    match registered {
        Some(field) => {
            // Matches the in-memory ordering: nulls lowest
            let direction = if page.sort_desc {
                "DESC NULLS LAST"
            } else {
                "ASC NULLS FIRST"
            };
            format!(" ORDER BY {} {}, {}, id", field.column, direction, default)
        },
        None => format!(" ORDER BY {}, id", default),
    }
}

fn push_range(builder: &mut QueryBuilder<'_, Postgres>, column: &str, range: &DayRange) {
    if let Some(from) = range.from {
        builder.push(format!(" AND {} >= ", column)).push_bind(from);
    }
    if let Some(until) = range.until {
        builder.push(format!(" AND {} < ", column)).push_bind(until);
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: &PageRequest) {
    builder
        .push(" LIMIT ")
        .push_bind(page.page_size())
        .push(" OFFSET ")
        .push_bind(page.offset());
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, FromRow)]
struct AuditRow {
    id: Uuid,
    entity_name: String,
    entity_id: Uuid,
    action: String,
    old_values: Option<String>,
    new_values: Option<String>,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    correlation_id: String,
    http_method: Option<String>,
    request_path: Option<String>,
    client_ip: Option<String>,
    user_agent: Option<String>,
    integrity_hash: String,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditRecord {
            id: row.id,
            entity_name: row.entity_name.parse().map_err(StoreError::Corrupt)?,
            entity_id: row.entity_id,
            action: row.action.parse().map_err(StoreError::Corrupt)?,
            old_values: row.old_values,
            new_values: row.new_values,
            user_id: row.user_id,
            created_at: row.created_at,
            correlation_id: row.correlation_id,
            http_method: row.http_method,
            request_path: row.request_path,
            client_ip: row.client_ip,
            user_agent: row.user_agent,
            integrity_hash: row.integrity_hash,
        })
    }
}

const AUDIT_COLUMNS: &str = "id, entity_name, entity_id, action, old_values, new_values, \
     user_id, created_at, correlation_id, http_method, request_path, client_ip, user_agent, \
     integrity_hash";

fn push_audit_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AuditQuery) {
    if let Some(entity_name) = query.entity_name {
        builder.push(" AND entity_name = ").push_bind(entity_name.as_str());
    }
    if let Some(entity_id) = query.entity_id {
        builder.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(action) = query.action {
        builder.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(user_id) = query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    push_range(builder, "created_at", &query.range);
}

#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_records (
                id, entity_name, entity_id, action, old_values, new_values,
                user_id, created_at, correlation_id, http_method, request_path,
                client_ip, user_agent, integrity_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(record.id)
        .bind(record.entity_name.as_str())
        .bind(record.entity_id)
        .bind(record.action.as_str())
        .bind(&record.old_values)
        .bind(&record.new_values)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(&record.correlation_id)
        .bind(&record.http_method)
        .bind(&record.request_path)
        .bind(&record.client_ip)
        .bind(&record.user_agent)
        .bind(&record.integrity_hash)
        .execute(&self.pool)
        .await?;

        debug!(audit_id = %record.id, action = %record.action, "Inserted audit record");
        Ok(())
    }

    async fn query(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> StoreResult<PageResult<AuditRecord>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM audit_records WHERE 1=1");
        push_audit_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!(
            "SELECT {} FROM audit_records WHERE 1=1",
            AUDIT_COLUMNS
        ));
        push_audit_filters(&mut select, query);
        select.push(order_by::<AuditRecord>(page, "created_at DESC"));
        push_page(&mut select, page);

        let rows: Vec<AuditRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(AuditRecord::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(count = items.len(), total, "Queried audit records");
        Ok(PageResult::new(items, total, page.page(), page.page_size()))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM audit_records WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Security events
// ============================================================================

#[derive(Debug, FromRow)]
struct SecurityEventRow {
    id: Uuid,
    event_type: String,
    user_id: Option<Uuid>,
    user_email: Option<String>,
    outcome: String,
    detail: Option<String>,
    timestamp: DateTime<Utc>,
    correlation_id: String,
    http_method: Option<String>,
    request_path: Option<String>,
    client_ip: Option<String>,
    user_agent: Option<String>,
}

impl TryFrom<SecurityEventRow> for SecurityEvent {
    type Error = StoreError;

    fn try_from(row: SecurityEventRow) -> Result<Self, Self::Error> {
        Ok(SecurityEvent {
            id: row.id,
            event_type: row.event_type.parse().map_err(StoreError::Corrupt)?,
            user_id: row.user_id,
            user_email: row.user_email,
            outcome: row.outcome.parse().map_err(StoreError::Corrupt)?,
            detail: row.detail,
            timestamp: row.timestamp,
            correlation_id: row.correlation_id,
            http_method: row.http_method,
            request_path: row.request_path,
            client_ip: row.client_ip,
            user_agent: row.user_agent,
        })
    }
}

const SECURITY_EVENT_COLUMNS: &str = "id, event_type, user_id, user_email, outcome, detail, \
     timestamp, correlation_id, http_method, request_path, client_ip, user_agent";

fn push_security_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &SecurityEventQuery) {
    if let Some(event_type) = query.event_type {
        builder.push(" AND event_type = ").push_bind(event_type.as_str());
    }
    if let Some(outcome) = query.outcome {
        builder.push(" AND outcome = ").push_bind(outcome.as_str());
    }
    if let Some(user_id) = query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    push_range(builder, "timestamp", &query.range);
}

#[derive(Debug, Clone)]
pub struct PgSecurityEventStore {
    pool: PgPool,
}

impl PgSecurityEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityEventStore for PgSecurityEventStore {
    async fn append(&self, event: &SecurityEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_events (
                id, event_type, user_id, user_email, outcome, detail, timestamp,
                correlation_id, http_method, request_path, client_ip, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.id)
        .bind(event.event_type.as_str())
        .bind(event.user_id)
        .bind(&event.user_email)
        .bind(event.outcome.as_str())
        .bind(&event.detail)
        .bind(event.timestamp)
        .bind(&event.correlation_id)
        .bind(&event.http_method)
        .bind(&event.request_path)
        .bind(&event.client_ip)
        .bind(&event.user_agent)
        .execute(&self.pool)
        .await?;

        debug!(event_id = %event.id, event_type = %event.event_type, "Inserted security event");
        Ok(())
    }

    async fn query(
        &self,
        query: &SecurityEventQuery,
        page: &PageRequest,
    ) -> StoreResult<PageResult<SecurityEvent>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM security_events WHERE 1=1");
        push_security_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!(
            "SELECT {} FROM security_events WHERE 1=1",
            SECURITY_EVENT_COLUMNS
        ));
        push_security_filters(&mut select, query);
        select.push(order_by::<SecurityEvent>(page, "timestamp DESC"));
        push_page(&mut select, page);

        let rows: Vec<SecurityEventRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(SecurityEvent::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(PageResult::new(items, total, page.page(), page.page_size()))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM security_events WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Soft-deletable entity backed by a table
pub trait PgEntity: SoftDeletable + for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
}

impl PgEntity for Category {
    const TABLE: &'static str = "categories";
}

impl PgEntity for Budget {
    const TABLE: &'static str = "budgets";
}

impl PgEntity for Expense {
    const TABLE: &'static str = "expenses";
}

pub struct PgEntityStore<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> PgEntityStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for PgEntityStore<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[async_trait]
impl<E: PgEntity> EntityStore<E> for PgEntityStore<E> {
    async fn find(&self, id: Uuid) -> StoreResult<Option<E>> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, user_id: Uuid, scope: Scope) -> StoreResult<Vec<E>> {
        let predicate = match scope {
            Scope::Active => "is_deleted = false AND (user_id = $1 OR user_id IS NULL)",
            Scope::Deleted => "is_deleted = true AND user_id = $1",
        };
        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY created_at, id",
            E::TABLE,
            predicate
        );
        let rows = sqlx::query_as::<_, E>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn set_deletion(
        &self,
        id: Uuid,
        expected_deleted: bool,
        state: &SoftDeleteState,
    ) -> StoreResult<bool> {
        let sql = format!(
            "UPDATE {} SET is_deleted = $3, deleted_at = $4, deleted_by = $5 \
             WHERE id = $1 AND is_deleted = $2",
            E::TABLE
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(expected_deleted)
            .bind(state.is_deleted)
            .bind(state.deleted_at)
            .bind(state.deleted_by)
            .execute(&self.pool)
            .await?;

        debug!(
            table = E::TABLE,
            entity_id = %id,
            is_deleted = state.is_deleted,
            applied = result.rows_affected() > 0,
            "Updated deletion state"
        );
        Ok(result.rows_affected() > 0)
    }
}
