//! Retention sweep for audit records and security events
//!
//! Rows older than the retention window are deleted by age. New rows are
//! always younger than the cutoff, so the sweep can run alongside writers.

use crate::store::{AuditStore, SecurityEventStore};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub audit_records: u64,
    pub security_events: u64,
}

#[derive(Clone)]
pub struct RetentionSweeper {
    audit: Arc<dyn AuditStore>,
    security: Arc<dyn SecurityEventStore>,
    retention: ChronoDuration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        audit: Arc<dyn AuditStore>,
        security: Arc<dyn SecurityEventStore>,
        retention_days: i64,
        interval: Duration,
    ) -> Self {
        Self {
            audit,
            security,
            retention: ChronoDuration::try_days(retention_days).unwrap_or(ChronoDuration::MAX),
            interval,
        }
    }

    /// Oldest instant still retained, clamped to the earliest representable time
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.retention).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Delete everything older than the retention window
    ///
    /// A failure on one store is logged and does not stop the other.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let cutoff = self.cutoff(now);
        let mut report = SweepReport::default();

        match self.audit.delete_older_than(cutoff).await {
            Ok(count) => report.audit_records = count,
            Err(e) => error!(error = %e, "Audit retention sweep failed"),
        }

        match self.security.delete_older_than(cutoff).await {
            Ok(count) => report.security_events = count,
            Err(e) => error!(error = %e, "Security event retention sweep failed"),
        }

        info!(
            %cutoff,
            audit_records = report.audit_records,
            security_events = report.security_events,
            "Retention sweep finished"
        );
        report
    }

    /// Run the sweep on a fixed interval until `shutdown` is cancelled
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Starting retention sweeper");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Retention sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep_once(Utc::now()).await;
                    }
                }
            }
        })
    }
}
