//! Persistence seams
//!
//! Every store is a trait object so the HTTP layer and services can run
//! against PostgreSQL in production and against the in-memory stores in
//! tests and local runs.

pub mod memory;
pub mod postgres;

use crate::audit::{AuditQuery, AuditRecord};
use crate::models::{Budget, Category, Expense, Scope, SoftDeletable, SoftDeleteState};
use crate::query::{PageRequest, PageResult};
use crate::security::{SecurityEvent, SecurityEventQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use memory::{MemoryAuditStore, MemoryEntityStore, MemorySecurityEventStore};
pub use postgres::{PgAuditStore, PgEntityStore, PgSecurityEventStore};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Append-only audit trail storage
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> StoreResult<()>;

    async fn query(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> StoreResult<PageResult<AuditRecord>>;

    /// Retention sweep; returns the number of rows removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// Append-only security event storage
#[async_trait]
pub trait SecurityEventStore: Send + Sync {
    async fn append(&self, event: &SecurityEvent) -> StoreResult<()>;

    async fn query(
        &self,
        query: &SecurityEventQuery,
        page: &PageRequest,
    ) -> StoreResult<PageResult<SecurityEvent>>;

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// Soft-deletable entity storage
#[async_trait]
pub trait EntityStore<E: SoftDeletable>: Send + Sync {
    /// Look up by id regardless of deletion state or owner
    async fn find(&self, id: Uuid) -> StoreResult<Option<E>>;

    /// Rows visible to `user_id` in `scope`, oldest first
    async fn list(&self, user_id: Uuid, scope: Scope) -> StoreResult<Vec<E>>;

    /// Write the deletion fields in one step
    ///
    /// Applies only while the stored row's `is_deleted` still equals
    /// `expected_deleted`; returns whether the row was updated.
    async fn set_deletion(
        &self,
        id: Uuid,
        expected_deleted: bool,
        state: &SoftDeleteState,
    ) -> StoreResult<bool>;
}

/// Every store the server needs, behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub audit: Arc<dyn AuditStore>,
    pub security: Arc<dyn SecurityEventStore>,
    pub categories: Arc<dyn EntityStore<Category>>,
    pub budgets: Arc<dyn EntityStore<Budget>>,
    pub expenses: Arc<dyn EntityStore<Expense>>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            audit: Arc::new(MemoryAuditStore::new()),
            security: Arc::new(MemorySecurityEventStore::new()),
            categories: Arc::new(MemoryEntityStore::<Category>::new()),
            budgets: Arc::new(MemoryEntityStore::<Budget>::new()),
            expenses: Arc::new(MemoryEntityStore::<Expense>::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            audit: Arc::new(PgAuditStore::new(pool.clone())),
            security: Arc::new(PgSecurityEventStore::new(pool.clone())),
            categories: Arc::new(PgEntityStore::<Category>::new(pool.clone())),
            budgets: Arc::new(PgEntityStore::<Budget>::new(pool.clone())),
            expenses: Arc::new(PgEntityStore::<Expense>::new(pool)),
        }
    }
}
