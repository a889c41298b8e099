//! Capability traits and the metrics decorator

use crate::error::AppError;
use crate::metrics::OperationMetrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Opt-in capability: the operation wants latency and outcome metrics
pub trait Trackable {
    /// Metric label; stable across releases
    fn operation_name(&self) -> &'static str;
}

/// Anything the dispatcher can run
pub trait Operation: Send + Sync {
    /// Returns `Some(self)` for operations that implement [`Trackable`]
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        None
    }
}

/// Operation that changes state
pub trait Command: Operation {}

/// Operation that only reads
pub trait Query: Operation {}

/// Times trackable operations
///
/// Untracked operations run untouched. For tracked ones a duration sample
/// is recorded whether the work succeeds or fails, and the success counter
/// moves only on `Ok`. If the request was cancelled while the work ran, no
/// sample is recorded at all.
#[derive(Debug, Clone)]
pub struct MetricsDecorator {
    metrics: Arc<OperationMetrics>,
}

impl MetricsDecorator {
    pub fn new(metrics: Arc<OperationMetrics>) -> Self {
        Self { metrics }
    }

    pub async fn execute<O, F, T, E>(
        &self,
        operation: &O,
        cancellation: &CancellationToken,
        work: F,
    ) -> Result<T, E>
    where
        O: Operation + ?Sized,
        F: Future<Output = Result<T, E>>,
    {
        let Some(name) = operation.as_trackable().map(|t| t.operation_name()) else {
            return work.await;
        };

        let started = Instant::now();
        let result = work.await;

        if cancellation.is_cancelled() {
            tracing::debug!(operation = name, "Request cancelled; metric sample suppressed");
            return result;
        }

        self.metrics.observe_duration(name, started.elapsed());
        if result.is_ok() {
            self.metrics.record_success(name);
        }
        result
    }
}

/// Runs operations through the metrics decorator
///
/// Failures of tracked operations are counted here, tagged with the
/// [`AppError::kind`] of the error.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    decorator: MetricsDecorator,
    metrics: Arc<OperationMetrics>,
}

impl Dispatcher {
    pub fn new(metrics: Arc<OperationMetrics>) -> Self {
        Self {
            decorator: MetricsDecorator::new(Arc::clone(&metrics)),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<OperationMetrics> {
        &self.metrics
    }

    pub async fn send<C, F, T>(
        &self,
        command: &C,
        cancellation: &CancellationToken,
        work: F,
    ) -> Result<T, AppError>
    where
        C: Command,
        F: Future<Output = Result<T, AppError>>,
    {
        self.dispatch(command, cancellation, work).await
    }

    pub async fn query<Q, F, T>(
        &self,
        query: &Q,
        cancellation: &CancellationToken,
        work: F,
    ) -> Result<T, AppError>
    where
        Q: Query,
        F: Future<Output = Result<T, AppError>>,
    {
        self.dispatch(query, cancellation, work).await
    }

    async fn dispatch<O, F, T>(
        &self,
        operation: &O,
        cancellation: &CancellationToken,
        work: F,
    ) -> Result<T, AppError>
    where
        O: Operation,
        F: Future<Output = Result<T, AppError>>,
    {
        let result = self.decorator.execute(operation, cancellation, work).await;

        if let Err(err) = &result {
            if let Some(tracked) = operation.as_trackable() {
                if !cancellation.is_cancelled() {
                    self.metrics.record_failure(tracked.operation_name(), err.kind());
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tracked;

    impl Trackable for Tracked {
        fn operation_name(&self) -> &'static str {
            "Tracked"
        }
    }

    impl Operation for Tracked {
        fn as_trackable(&self) -> Option<&dyn Trackable> {
            Some(self)
        }
    }

    impl Query for Tracked {}

    struct Untracked;

    impl Operation for Untracked {}

    impl Command for Untracked {}

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(OperationMetrics::new().unwrap()))
    }

    #[tokio::test]
    async fn test_success_records_duration_and_count() {
        let dispatcher = dispatcher();
        let token = CancellationToken::new();

        let value = dispatcher.query(&Tracked, &token, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.duration_samples("Tracked"), 1);
        assert_eq!(metrics.success_count("Tracked"), 1);
    }

    #[tokio::test]
    async fn test_failure_records_duration_and_failure_kind() {
        let dispatcher = dispatcher();
        let token = CancellationToken::new();

        let result: Result<(), _> = dispatcher
            .query(&Tracked, &token, async { Err(AppError::Forbidden("no".into())) })
            .await;
        assert!(result.is_err());

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.duration_samples("Tracked"), 1);
        assert_eq!(metrics.success_count("Tracked"), 0);
        assert_eq!(metrics.failure_count("Tracked", "forbidden"), 1);
    }

    #[tokio::test]
    async fn test_untracked_operation_passes_through() {
        let dispatcher = dispatcher();
        let token = CancellationToken::new();

        let result: Result<(), _> = dispatcher
            .send(&Untracked, &token, async { Err(AppError::Internal("boom".into())) })
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        let (body, _) = dispatcher.metrics().render().unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(!text.contains("operation=\""));
    }

    #[tokio::test]
    async fn test_cancellation_suppresses_sample() {
        let dispatcher = dispatcher();
        let token = CancellationToken::new();
        let cancel = token.clone();

        let result = dispatcher
            .query(&Tracked, &token, async move {
                cancel.cancel();
                Ok::<_, AppError>(())
            })
            .await;
        assert!(result.is_ok());

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.duration_samples("Tracked"), 0);
        assert_eq!(metrics.success_count("Tracked"), 0);
    }
}
