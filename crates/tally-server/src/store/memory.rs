//! In-memory stores
//!
//! Backed by tokio `RwLock`s and used by the test suite and by
//! `serve --in-memory`. Each store can be switched off to simulate an
//! outage.

use super::{AuditStore, EntityStore, SecurityEventStore, StoreError, StoreResult};
use crate::audit::{AuditQuery, AuditRecord};
use crate::models::{Scope, SoftDeletable, SoftDeleteState};
use crate::query::{self, PageRequest, PageResult};
use crate::security::{SecurityEvent, SecurityEventQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct Availability(AtomicBool);

impl Default for Availability {
    fn default() -> Self {
        Self(AtomicBool::new(true))
    }
}

impl Availability {
    fn set(&self, available: bool) {
        self.0.store(available, Ordering::SeqCst);
    }

    fn check(&self, store: &str) -> StoreResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable(format!("{} store is offline", store)))
        }
    }
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
    availability: Availability,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }

    /// All records in insertion order
    pub async fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
        self.availability.check("audit")?;
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn query(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> StoreResult<PageResult<AuditRecord>> {
        self.availability.check("audit")?;
        let newest_first: Vec<_> = self.records.read().await.iter().rev().cloned().collect();
        Ok(query::run(newest_first, &query.to_filter(), page))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.availability.check("audit")?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

// ============================================================================
// Security events
// ============================================================================

#[derive(Debug, Default)]
pub struct MemorySecurityEventStore {
    events: RwLock<Vec<SecurityEvent>>,
    availability: Availability,
}

impl MemorySecurityEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }

    pub async fn snapshot(&self) -> Vec<SecurityEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl SecurityEventStore for MemorySecurityEventStore {
    async fn append(&self, event: &SecurityEvent) -> StoreResult<()> {
        self.availability.check("security event")?;
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn query(
        &self,
        query: &SecurityEventQuery,
        page: &PageRequest,
    ) -> StoreResult<PageResult<SecurityEvent>> {
        self.availability.check("security event")?;
        let newest_first: Vec<_> = self.events.read().await.iter().rev().cloned().collect();
        Ok(query::run(newest_first, &query.to_filter(), page))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.availability.check("security event")?;
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.timestamp >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug)]
pub struct MemoryEntityStore<E> {
    rows: RwLock<Vec<E>>,
    availability: Availability,
}

impl<E> Default for MemoryEntityStore<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            availability: Availability::default(),
        }
    }
}

impl<E: SoftDeletable> MemoryEntityStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<E>) -> Self {
        Self {
            rows: RwLock::new(rows),
            availability: Availability::default(),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.availability.set(available);
    }

    pub async fn insert(&self, entity: E) {
        self.rows.write().await.push(entity);
    }
}

#[async_trait]
impl<E: SoftDeletable> EntityStore<E> for MemoryEntityStore<E> {
    async fn find(&self, id: Uuid) -> StoreResult<Option<E>> {
        self.availability.check(E::ENTITY.as_str())?;
        Ok(self.rows.read().await.iter().find(|e| e.id() == id).cloned())
    }

    async fn list(&self, user_id: Uuid, scope: Scope) -> StoreResult<Vec<E>> {
        self.availability.check(E::ENTITY.as_str())?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|e| scope.admits(*e, user_id))
            .cloned()
            .collect())
    }

    async fn set_deletion(
        &self,
        id: Uuid,
        expected_deleted: bool,
        state: &SoftDeleteState,
    ) -> StoreResult<bool> {
        self.availability.check(E::ENTITY.as_str())?;
        let mut rows = self.rows.write().await;
        match rows
            .iter_mut()
            .find(|e| e.id() == id && e.deletion().is_deleted == expected_deleted)
        {
            Some(row) => {
                *row.deletion_mut() = state.clone();
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::RequestContext;
    use crate::models::Expense;
    use chrono::{Duration, NaiveDate};

    fn expense(user: Uuid) -> Expense {
        Expense::new(user, Uuid::new_v4(), "Lunch", 1200, NaiveDate::from_ymd_opt(2026, 5, 4).unwrap())
    }

    #[tokio::test]
    async fn test_set_deletion_is_conditional() {
        let owner = Uuid::new_v4();
        let row = expense(owner);
        let store = MemoryEntityStore::with_rows(vec![row.clone()]);

        let mut deleted = SoftDeleteState::default();
        deleted.mark_deleted(owner, Utc::now());

        assert!(store.set_deletion(row.id, false, &deleted).await.unwrap());
        assert!(!store.set_deletion(row.id, false, &deleted).await.unwrap());
        assert!(store.find(row.id).await.unwrap().unwrap().deletion.is_deleted);
    }

    #[tokio::test]
    async fn test_list_respects_scope() {
        let owner = Uuid::new_v4();
        let active = expense(owner);
        let mut gone = expense(owner);
        gone.deletion.mark_deleted(owner, Utc::now());
        let store = MemoryEntityStore::with_rows(vec![active.clone(), gone.clone()]);

        assert_eq!(store.list(owner, Scope::Active).await.unwrap(), vec![active]);
        assert_eq!(store.list(owner, Scope::Deleted).await.unwrap(), vec![gone]);
        assert!(store.list(Uuid::new_v4(), Scope::Deleted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_store_errors() {
        let store = MemorySecurityEventStore::new();
        store.set_available(false);
        let event = SecurityEvent::new(
            crate::security::SecurityEventType::Logout,
            crate::security::SecurityOutcome::Success,
            &RequestContext::new("x"),
        );
        assert!(matches!(store.append(&event).await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_audit_delete_older_than() {
        let store = MemoryAuditStore::new();
        let factory = crate::audit::AuditRecordFactory::default();
        let context = RequestContext::new("sweep");
        let mut old = factory.create(
            crate::models::EntityName::Expense,
            Uuid::new_v4(),
            crate::audit::AuditAction::Created,
            None,
            None,
            None,
            &context,
        );
        old.created_at = Utc::now() - Duration::days(120);
        let fresh = factory.create(
            crate::models::EntityName::Expense,
            Uuid::new_v4(),
            crate::audit::AuditAction::Created,
            None,
            None,
            None,
            &context,
        );
        store.append(&old).await.unwrap();
        store.append(&fresh).await.unwrap();

        let removed = store.delete_older_than(Utc::now() - Duration::days(90)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.snapshot().await, vec![fresh]);
    }
}
