//! Audit trail
//!
//! State changes on domain entities are captured as immutable before/after
//! records. Snapshots pass through [`SensitiveFieldMasker`] before they are
//! serialized, every record carries the correlation metadata of the request
//! that produced it, and a SHA-256 integrity hash makes later edits
//! detectable.

pub mod factory;
pub mod masking;
pub mod models;
pub mod trail;

pub use factory::AuditRecordFactory;
pub use masking::{SensitiveFieldMasker, DEFAULT_SENSITIVE_FIELDS, REDACTION_MARKER};
pub use models::{AuditAction, AuditQuery, AuditQueryParams, AuditRecord};
pub use trail::AuditTrail;
