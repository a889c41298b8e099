//! Soft-delete lifecycle
//!
//! Delete marks an entity as deleted instead of removing it; restore clears
//! the marker. Only the owner may do either, and every successful
//! transition leaves a before/after record in the audit trail.

use crate::audit::{AuditAction, AuditTrail};
use crate::correlation::RequestContext;
use crate::error::AppError;
use crate::models::{EntityName, Scope, SoftDeletable};
use crate::store::{EntityStore, StoreError};
use chrono::{SubsecRound, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityName, id: Uuid },

    #[error("{entity} {id} is not owned by the requesting user")]
    Forbidden { entity: EntityName, id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound { .. } => AppError::NotFound(err.to_string()),
            LifecycleError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
            LifecycleError::Store(e) => e.into(),
        }
    }
}

pub struct SoftDeleteLifecycle<E: SoftDeletable> {
    store: Arc<dyn EntityStore<E>>,
    audit: AuditTrail,
}

impl<E: SoftDeletable> Clone for SoftDeleteLifecycle<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            audit: self.audit.clone(),
        }
    }
}

impl<E: SoftDeletable> SoftDeleteLifecycle<E> {
    pub fn new(store: Arc<dyn EntityStore<E>>, audit: AuditTrail) -> Self {
        Self { store, audit }
    }

    /// Rows visible to `user_id` on one side of the deletion boundary
    pub async fn list(&self, user_id: Uuid, scope: Scope) -> Result<Vec<E>, LifecycleError> {
        Ok(self.store.list(user_id, scope).await?)
    }

    /// Soft-delete an active entity owned by `actor`
    #[tracing::instrument(skip(self, context), fields(entity = %E::ENTITY, correlation_id = %context.correlation_id))]
    pub async fn delete(
        &self,
        id: Uuid,
        actor: Uuid,
        context: &RequestContext,
    ) -> Result<E, LifecycleError> {
        let not_found = || LifecycleError::NotFound {
            entity: E::ENTITY,
            id,
        };

        let before = self
            .store
            .find(id)
            .await?
            .filter(|e| !e.deletion().is_deleted)
            .ok_or_else(not_found)?;

        if before.owner_id() != Some(actor) {
            warn!(%id, %actor, "Delete rejected: not the owner");
            return Err(LifecycleError::Forbidden {
                entity: E::ENTITY,
                id,
            });
        }

        let mut after = before.clone();
        after.deletion_mut().mark_deleted(actor, Utc::now().trunc_subsecs(6));

        if !self.store.set_deletion(id, false, after.deletion()).await? {
            return Err(not_found());
        }

        info!(%id, %actor, "Entity soft-deleted");
        self.record(AuditAction::Deleted, &before, &after, actor, context).await;
        Ok(after)
    }

    /// Restore a deleted entity; only its owner may do this
    #[tracing::instrument(skip(self, context), fields(entity = %E::ENTITY, correlation_id = %context.correlation_id))]
    pub async fn restore(
        &self,
        id: Uuid,
        requesting_user: Uuid,
        context: &RequestContext,
    ) -> Result<E, LifecycleError> {
        let not_found = || LifecycleError::NotFound {
            entity: E::ENTITY,
            id,
        };

        let before = self
            .store
            .find(id)
            .await?
            .filter(|e| e.deletion().is_deleted)
            .ok_or_else(not_found)?;

        if before.owner_id() != Some(requesting_user) {
            warn!(%id, %requesting_user, "Restore rejected: not the owner");
            return Err(LifecycleError::Forbidden {
                entity: E::ENTITY,
                id,
            });
        }

        let mut after = before.clone();
        after.deletion_mut().clear();

        if !self.store.set_deletion(id, true, after.deletion()).await? {
            return Err(not_found());
        }

        info!(%id, %requesting_user, "Entity restored");
        self.record(AuditAction::Restored, &before, &after, requesting_user, context)
            .await;
        Ok(after)
    }

    async fn record(
        &self,
        action: AuditAction,
        before: &E,
        after: &E,
        user_id: Uuid,
        context: &RequestContext,
    ) {
        // The state change is already persisted; the audit write is best effort
        let (old_values, new_values) = match (serde_json::to_value(before), serde_json::to_value(after)) {
            (Ok(old_values), Ok(new_values)) => (old_values, new_values),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Could not snapshot entity for the audit trail");
                return;
            },
        };

        let _ = self
            .audit
            .capture(
                E::ENTITY,
                after.id(),
                action,
                Some(&old_values),
                Some(&new_values),
                Some(user_id),
                context,
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditRecordFactory;
    use crate::models::{Category, Expense};
    use crate::store::{MemoryAuditStore, MemoryEntityStore};
    use chrono::NaiveDate;

    struct Fixture {
        lifecycle: SoftDeleteLifecycle<Expense>,
        entities: Arc<MemoryEntityStore<Expense>>,
        audit: Arc<MemoryAuditStore>,
        owner: Uuid,
        expense: Expense,
    }

    fn fixture() -> Fixture {
        let owner = Uuid::new_v4();
        let expense = Expense::new(
            owner,
            Uuid::new_v4(),
            "Train ticket",
            3_450,
            NaiveDate::from_ymd_opt(2026, 6, 12).unwrap(),
        );
        let entities = Arc::new(MemoryEntityStore::with_rows(vec![expense.clone()]));
        let audit = Arc::new(MemoryAuditStore::new());
        let trail = AuditTrail::new(audit.clone(), AuditRecordFactory::default());

        Fixture {
            lifecycle: SoftDeleteLifecycle::new(entities.clone(), trail),
            entities,
            audit,
            owner,
            expense,
        }
    }

    #[tokio::test]
    async fn test_delete_then_restore_round_trip() {
        let f = fixture();
        let context = RequestContext::new("round-trip");

        let deleted = f.lifecycle.delete(f.expense.id, f.owner, &context).await.unwrap();
        assert!(deleted.deletion.is_deleted);
        assert_eq!(deleted.deletion.deleted_by, Some(f.owner));
        assert!(f.lifecycle.list(f.owner, Scope::Active).await.unwrap().is_empty());
        assert_eq!(f.lifecycle.list(f.owner, Scope::Deleted).await.unwrap().len(), 1);

        let restored = f.lifecycle.restore(f.expense.id, f.owner, &context).await.unwrap();
        assert_eq!(restored, f.expense);
        assert_eq!(f.entities.find(f.expense.id).await.unwrap().unwrap(), f.expense);

        let records = f.audit.snapshot().await;
        let actions: Vec<_> = records.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![AuditAction::Deleted, AuditAction::Restored]);
        assert!(records.iter().all(|r| r.correlation_id == "round-trip"));
        assert!(records.iter().all(|r| r.verify_integrity().is_ok()));
    }

    #[tokio::test]
    async fn test_non_owner_restore_is_forbidden_and_unrecorded() {
        let f = fixture();
        let context = RequestContext::new("deny");
        f.lifecycle.delete(f.expense.id, f.owner, &context).await.unwrap();

        let result = f.lifecycle.restore(f.expense.id, Uuid::new_v4(), &context).await;
        assert!(matches!(result, Err(LifecycleError::Forbidden { .. })));

        let stored = f.entities.find(f.expense.id).await.unwrap().unwrap();
        assert!(stored.deletion.is_deleted);

        let records = f.audit.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Deleted);
    }

    #[tokio::test]
    async fn test_restore_of_active_entity_is_not_found() {
        let f = fixture();
        let result = f
            .lifecycle
            .restore(f.expense.id, f.owner, &RequestContext::new("x"))
            .await;
        assert!(matches!(result, Err(LifecycleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_double_delete_is_not_found() {
        let f = fixture();
        let context = RequestContext::new("x");
        f.lifecycle.delete(f.expense.id, f.owner, &context).await.unwrap();
        let again = f.lifecycle.delete(f.expense.id, f.owner, &context).await;
        assert!(matches!(again, Err(LifecycleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let f = fixture();
        let result = f
            .lifecycle
            .delete(Uuid::new_v4(), f.owner, &RequestContext::new("x"))
            .await;
        assert!(matches!(result, Err(LifecycleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_audit_outage_does_not_fail_delete() {
        let f = fixture();
        f.audit.set_available(false);
        let deleted = f
            .lifecycle
            .delete(f.expense.id, f.owner, &RequestContext::new("x"))
            .await
            .unwrap();
        assert!(deleted.deletion.is_deleted);
    }

    #[tokio::test]
    async fn test_system_category_cannot_be_deleted() {
        let category = Category::new(None, "Utilities");
        let store = Arc::new(MemoryEntityStore::with_rows(vec![category.clone()]));
        let trail = AuditTrail::new(Arc::new(MemoryAuditStore::new()), AuditRecordFactory::default());
        let lifecycle = SoftDeleteLifecycle::new(store, trail);

        let result = lifecycle
            .delete(category.id, Uuid::new_v4(), &RequestContext::new("x"))
            .await;
        assert!(matches!(result, Err(LifecycleError::Forbidden { .. })));
    }
}
