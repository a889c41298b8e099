//! Security event log
//!
//! Authentication and authorization outcomes (logins, token issuance,
//! access denials) are written to a dedicated append-only log, tagged with
//! the correlation metadata of the request.

pub mod models;
pub mod recorder;

pub use models::{
    SecurityEvent, SecurityEventQuery, SecurityEventQueryParams, SecurityEventType, SecurityOutcome,
};
pub use recorder::SecurityEventRecorder;
