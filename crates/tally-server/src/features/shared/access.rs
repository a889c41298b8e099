//! Caller scoping for the audit and security read side
//!
//! A reader only ever sees rows attributed to them. Naming another user in
//! a `userId` filter is refused and recorded as an access denial.

use crate::correlation::RequestContext;
use crate::error::AppError;
use crate::features::FeatureState;
use crate::security::{SecurityEvent, SecurityEventType, SecurityOutcome};
use uuid::Uuid;

/// Resolve the user a read is scoped to
///
/// Returns the caller's id when `requested` is absent or names the caller.
pub async fn scope_to_caller(
    state: &FeatureState,
    caller: Uuid,
    requested: Option<Uuid>,
    resource: &str,
    context: &RequestContext,
) -> Result<Uuid, AppError> {
    match requested {
        Some(other) if other != caller => {
            tracing::warn!(%caller, requested = %other, resource, "Refused cross-user read");
            let event =
                SecurityEvent::new(SecurityEventType::AccessDenied, SecurityOutcome::Denied, context)
                    .with_user(caller)
                    .with_detail(format!("read {} of user {}", resource, other));
            let _ = state.security.record(event).await;
            Err(AppError::Forbidden(format!("Cannot read {} of another user", resource)))
        },
        _ => Ok(caller),
    }
}
