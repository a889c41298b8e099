//! Best-effort persistence of audit records

use super::factory::AuditRecordFactory;
use super::models::{AuditAction, AuditRecord};
use crate::best_effort::BestEffort;
use crate::correlation::RequestContext;
use crate::models::EntityName;
use crate::store::AuditStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Builds audit records and writes them without ever failing the caller
///
/// Each write runs on its own task. Once started it completes even if the
/// request that triggered it is dropped.
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
    factory: AuditRecordFactory,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>, factory: AuditRecordFactory) -> Self {
        Self { store, factory }
    }

    pub fn factory(&self) -> &AuditRecordFactory {
        &self.factory
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Build and persist a record for one state change
    #[allow(clippy::too_many_arguments)]
    pub async fn capture(
        &self,
        entity_name: EntityName,
        entity_id: Uuid,
        action: AuditAction,
        old_values: Option<&Value>,
        new_values: Option<&Value>,
        user_id: Option<Uuid>,
        context: &RequestContext,
    ) -> BestEffort {
        let record = self.factory.create(
            entity_name,
            entity_id,
            action,
            old_values,
            new_values,
            user_id,
            context,
        );
        self.record(record).await
    }

    /// Persist an already built record
    pub async fn record(&self, record: AuditRecord) -> BestEffort {
        let store = Arc::clone(&self.store);
        let span = tracing::info_span!(
            "audit_write",
            correlation_id = %record.correlation_id,
            entity_name = %record.entity_name,
            entity_id = %record.entity_id,
            action = %record.action,
        );

        let write = tokio::spawn(
            async move {
                let result = store.append(&record).await;
                if result.is_ok() {
                    tracing::debug!("Audit record written");
                }
                result
            }
            .instrument(span),
        );

        match write.await {
            Ok(result) => BestEffort::from_store("audit", result),
            Err(e) => {
                tracing::error!(error = %e, "Audit write task failed");
                BestEffort::dropped(e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditQuery;
    use crate::query::PageRequest;
    use crate::audit::REDACTION_MARKER;
    use crate::store::{MemoryAuditStore, StoreResult};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds every append until released
    struct GatedAuditStore {
        inner: MemoryAuditStore,
        started: Notify,
        release: Notify,
    }

    impl GatedAuditStore {
        fn new() -> Self {
            Self {
                inner: MemoryAuditStore::new(),
                started: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl AuditStore for GatedAuditStore {
        async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
            self.started.notify_one();
            self.release.notified().await;
            self.inner.append(record).await
        }

        async fn query(
            &self,
            query: &AuditQuery,
            page: &PageRequest,
        ) -> StoreResult<crate::query::PageResult<AuditRecord>> {
            self.inner.query(query, page).await
        }

        async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
            self.inner.delete_older_than(cutoff).await
        }
    }

    #[tokio::test]
    async fn test_capture_persists_record() {
        let store = Arc::new(MemoryAuditStore::new());
        let trail = AuditTrail::new(store.clone(), AuditRecordFactory::default());
        let entity_id = Uuid::new_v4();

        let outcome = trail
            .capture(
                EntityName::Expense,
                entity_id,
                AuditAction::Created,
                None,
                Some(&json!({"amount": 10})),
                None,
                &RequestContext::new("abc"),
            )
            .await;
        assert!(outcome.is_written());

        let page = store
            .query(&AuditQuery::for_entity(EntityName::Expense, entity_id), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].correlation_id, "abc");
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = Arc::new(MemoryAuditStore::new());
        store.set_available(false);
        let trail = AuditTrail::new(store, AuditRecordFactory::default());

        let outcome = trail
            .capture(
                EntityName::Budget,
                Uuid::new_v4(),
                AuditAction::Deleted,
                None,
                None,
                None,
                &RequestContext::new("abc"),
            )
            .await;
        assert!(matches!(outcome, BestEffort::Dropped { .. }));
    }

    #[tokio::test]
    async fn test_started_write_survives_dropped_request() {
        let store = Arc::new(GatedAuditStore::new());
        let trail = AuditTrail::new(store.clone(), AuditRecordFactory::default());
        let entity_id = Uuid::new_v4();

        let request = tokio::spawn(async move {
            let context = RequestContext::new("dropped");
            trail
                .capture(
                    EntityName::Expense,
                    entity_id,
                    AuditAction::Deleted,
                    Some(&json!({"amount": 5})),
                    None,
                    None,
                    &context,
                )
                .await
        });

        store.started.notified().await;
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());

        store.release.notify_one();
        for _ in 0..100 {
            if !store.inner.snapshot().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let records = store.inner.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_id, entity_id);
        assert_eq!(records[0].correlation_id, "dropped");
    }

    #[tokio::test]
    async fn test_sensitive_fields_are_masked_in_stored_record() {
        let store = Arc::new(MemoryAuditStore::new());
        let trail = AuditTrail::new(store.clone(), AuditRecordFactory::default());

        let outcome = trail
            .capture(
                EntityName::Category,
                Uuid::new_v4(),
                AuditAction::Updated,
                Some(&json!({"name": "Food", "password": "old-secret"})),
                Some(&json!({"name": "Groceries", "password": "new-secret", "apiKey": "k-1"})),
                None,
                &RequestContext::new("mask"),
            )
            .await;
        assert!(outcome.is_written());

        let records = store.snapshot().await;
        let stored = &records[0];
        let old: Value = serde_json::from_str(stored.old_values.as_deref().unwrap()).unwrap();
        let new: Value = serde_json::from_str(stored.new_values.as_deref().unwrap()).unwrap();

        assert_eq!(old["password"], json!(REDACTION_MARKER));
        assert_eq!(old["name"], json!("Food"));
        assert_eq!(new["password"], json!(REDACTION_MARKER));
        assert_eq!(new["apiKey"], json!(REDACTION_MARKER));
        assert_eq!(new["name"], json!("Groceries"));
        assert!(!stored.new_values.as_deref().unwrap().contains("new-secret"));
    }
}
