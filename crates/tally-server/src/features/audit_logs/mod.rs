//! Audit trail read side
//!
//! Filtered listings, per-entity timelines and exports of the audit trail.
//! Exports hand the already masked rows to the configured
//! [`ExportRenderer`](crate::export::ExportRenderer).

pub mod queries;
pub mod routes;

pub use queries::{ExportAuditLogsQuery, GetAuditTimelineQuery, QueryAuditLogsQuery};
pub use routes::audit_log_routes;
