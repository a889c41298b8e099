//! Best-effort security event persistence

use super::models::SecurityEvent;
use crate::best_effort::BestEffort;
use crate::store::SecurityEventStore;
use std::sync::Arc;
use tracing::Instrument;

/// Records security events without letting a storage failure reach the caller
///
/// Writes are awaited, so two events recorded one after the other are
/// persisted in that order. Each write runs on its own task and completes
/// even if the originating request goes away.
#[derive(Clone)]
pub struct SecurityEventRecorder {
    store: Arc<dyn SecurityEventStore>,
}

impl SecurityEventRecorder {
    pub fn new(store: Arc<dyn SecurityEventStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SecurityEventStore> {
        &self.store
    }

    pub async fn record(&self, event: SecurityEvent) -> BestEffort {
        let store = Arc::clone(&self.store);
        let span = tracing::info_span!(
            "security_event",
            correlation_id = %event.correlation_id,
            event_type = %event.event_type,
            outcome = %event.outcome,
        );

        let write = tokio::spawn(async move { store.append(&event).await }.instrument(span));

        match write.await {
            Ok(result) => BestEffort::from_store("security_event", result),
            Err(e) => {
                tracing::error!(error = %e, "Security event write task failed");
                BestEffort::dropped(e.to_string())
            },
        }
    }
}
