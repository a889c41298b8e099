//! Builds masked, hashed audit records

use super::masking::SensitiveFieldMasker;
use super::models::{AuditAction, AuditRecord};
use crate::correlation::RequestContext;
use crate::models::EntityName;
use chrono::{SubsecRound, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Creates [`AuditRecord`]s; performs no I/O
#[derive(Debug, Clone, Default)]
pub struct AuditRecordFactory {
    masker: Arc<SensitiveFieldMasker>,
}

impl AuditRecordFactory {
    pub fn new(masker: SensitiveFieldMasker) -> Self {
        Self {
            masker: Arc::new(masker),
        }
    }

    pub fn masker(&self) -> &SensitiveFieldMasker {
        &self.masker
    }

    /// Build a record for one state change
    ///
    /// Both snapshots are masked independently. The timestamp is truncated
    /// to microseconds so the hash survives a round trip through PostgreSQL.
    pub fn create(
        &self,
        entity_name: EntityName,
        entity_id: Uuid,
        action: AuditAction,
        old_values: Option<&Value>,
        new_values: Option<&Value>,
        user_id: Option<Uuid>,
        context: &RequestContext,
    ) -> AuditRecord {
        let mut record = AuditRecord {
            id: Uuid::new_v4(),
            entity_name,
            entity_id,
            action,
            old_values: old_values.map(|v| self.masker.mask(v).to_string()),
            new_values: new_values.map(|v| self.masker.mask(v).to_string()),
            user_id,
            created_at: Utc::now().trunc_subsecs(6),
            correlation_id: String::new(),
            http_method: None,
            request_path: None,
            client_ip: None,
            user_agent: None,
            integrity_hash: String::new(),
        };
        record.stamp_context(context);
        record.integrity_hash = record.compute_integrity_hash();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::masking::REDACTION_MARKER;
    use serde_json::json;

    fn context() -> RequestContext {
        RequestContext {
            correlation_id: "corr-42".into(),
            http_method: Some("DELETE".into()),
            request_path: Some("/api/v1/expenses/1".into()),
            client_ip: Some("10.0.0.7".into()),
            user_agent: Some("curl/8.0".into()),
        }
    }

    #[test]
    fn test_create_masks_both_snapshots() {
        let factory = AuditRecordFactory::default();
        let old = json!({"name": "a", "apiKey": "k1"});
        let new = json!({"name": "b", "apiKey": "k2"});

        let record = factory.create(
            EntityName::User,
            Uuid::new_v4(),
            AuditAction::Updated,
            Some(&old),
            Some(&new),
            None,
            &context(),
        );

        let old_masked: Value = serde_json::from_str(record.old_values.as_deref().unwrap()).unwrap();
        let new_masked: Value = serde_json::from_str(record.new_values.as_deref().unwrap()).unwrap();
        assert_eq!(old_masked["apiKey"], REDACTION_MARKER);
        assert_eq!(new_masked["apiKey"], REDACTION_MARKER);
        assert_eq!(new_masked["name"], "b");
    }

    #[test]
    fn test_create_copies_correlation_metadata() {
        let factory = AuditRecordFactory::default();
        let record = factory.create(
            EntityName::Expense,
            Uuid::new_v4(),
            AuditAction::Created,
            None,
            Some(&json!({"amount": 5})),
            Some(Uuid::new_v4()),
            &context(),
        );

        assert_eq!(record.correlation_id, "corr-42");
        assert_eq!(record.http_method.as_deref(), Some("DELETE"));
        assert_eq!(record.client_ip.as_deref(), Some("10.0.0.7"));
        assert!(record.old_values.is_none());
    }

    #[test]
    fn test_integrity_hash_detects_tampering() {
        let factory = AuditRecordFactory::default();
        let mut record = factory.create(
            EntityName::Budget,
            Uuid::new_v4(),
            AuditAction::Deleted,
            Some(&json!({"limit_amount": 1000})),
            None,
            None,
            &context(),
        );
        assert!(record.verify_integrity().is_ok());

        record.old_values = Some(r#"{"limit_amount":1}"#.into());
        assert!(record.verify_integrity().is_err());
    }
}
