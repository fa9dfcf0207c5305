//! The batch executor — runs operations one at a time against the ledger.
//!
//! For each operation, in submission order:
//!
//! 1. stop (skipping everything left) if cancellation was requested;
//! 2. validate, recording a validation failure without calling out;
//! 3. execute, retrying per the run's [`RetryScheduler`] until success,
//!    a non-retryable failure, or exhaustion;
//! 4. pause per [`Pacing`] unless it was the last operation.
//!
//! Operations are independent: a failure is recorded and the loop moves on.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::ProcessOptions;
use crate::classifier::ErrorClassifier;
use crate::operation::{Command, Operation, OperationKind, OperationStatus};
use crate::policy::{Pacing, RetryScheduler};
use crate::report::{ExecutionReport, ReportBuilder};
use crate::types::RawFailure;
use crate::validator;

/// One call to the execution collaborator.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub operation_id: &'a str,
    pub command: &'a Command,
    /// 1-based attempt number for this operation.
    pub attempt: u32,
}

/// The boundary to the actual ledger call (mint / transfer / burn).
///
/// Implementations must be `Send + Sync`. The executor owns no resources on
/// their behalf; connection handling and signing belong to the implementor.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    /// Submit one operation; `Ok` carries the ledger's result payload.
    async fn execute(&self, request: ExecutionRequest<'_>) -> Result<Value, RawFailure>;
}

#[async_trait]
impl<T: OperationExecutor + ?Sized> OperationExecutor for Arc<T> {
    async fn execute(&self, request: ExecutionRequest<'_>) -> Result<Value, RawFailure> {
        (**self).execute(request).await
    }
}

/// Progress emitted by the executor for observability.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    OperationStarted {
        index: usize,
        id: String,
    },
    RetryScheduled {
        id: String,
        attempt: u32,
        delay_ms: u64,
        code: String,
    },
    OperationFinished {
        index: usize,
        id: String,
        status: OperationStatus,
        attempts: u32,
    },
    Cancelled {
        skipped: usize,
    },
}

type EventCallback = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Sequential batch executor.
pub struct BatchExecutor<E: OperationExecutor> {
    executor: E,
    classifier: ErrorClassifier,
    on_event: Option<EventCallback>,
}

impl<E: OperationExecutor> BatchExecutor<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            classifier: ErrorClassifier::new(),
            on_event: None,
        }
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Register a callback that receives every [`ExecutionEvent`].
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(f));
        self
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Run every operation and return the report. Never fails: per-operation
    /// problems are recorded on the operations themselves.
    pub async fn run(&self, mut operations: Vec<Operation>, options: &ProcessOptions) -> ExecutionReport {
        let builder = ReportBuilder::start();
        let pacing = Pacing::new(options.inter_op_delay);
        let scheduler = RetryScheduler::new(options.retry.clone());
        let max_attempts = options.max_retries.max(1);
        let total = operations.len();

        info!(total, max_attempts, "starting batch");

        for index in 0..total {
            if is_cancelled(options.cancel.as_ref()) {
                let skipped = operations[index..]
                    .iter_mut()
                    .map(Operation::mark_skipped)
                    .filter(|&skipped| skipped)
                    .count();
                warn!(at = index, skipped, "batch cancelled; skipping remaining operations");
                self.emit(ExecutionEvent::Cancelled { skipped });
                break;
            }

            let op = &mut operations[index];
            if op.is_terminal() {
                debug!(id = %op.id, status = %op.status, "operation already terminal");
                continue;
            }

            self.emit(ExecutionEvent::OperationStarted {
                index,
                id: op.id.clone(),
            });
            self.run_operation(op, &scheduler, max_attempts).await;
            self.emit(ExecutionEvent::OperationFinished {
                index,
                id: op.id.clone(),
                status: op.status,
                attempts: op.attempts,
            });

            if index + 1 < total {
                let delay = pacing.delay_after(OperationKind::parse(&op.kind));
                pause(delay, options.cancel.as_ref()).await;
            }
        }

        let report = builder.finish(operations);
        info!(
            total = report.total(),
            successful = report.successful(),
            failed = report.failed(),
            skipped = report.skipped(),
            elapsed_ms = report.execution_time_ms(),
            "batch complete"
        );
        report
    }

    async fn run_operation(&self, op: &mut Operation, scheduler: &RetryScheduler, max_attempts: u32) {
        let command = match validator::validate(op) {
            Ok(command) => command,
            Err(err) => {
                warn!(id = %op.id, reason = %err, "operation failed validation");
                op.attempts = 1;
                op.mark_failed(err.classification());
                return;
            }
        };

        loop {
            op.attempts += 1;
            let attempt = op.attempts;
            debug!(id = %op.id, %command, attempt, "executing operation");

            let outcome = self
                .executor
                .execute(ExecutionRequest {
                    operation_id: &op.id,
                    command: &command,
                    attempt,
                })
                .await;

            let raw = match outcome {
                Ok(result) => {
                    info!(id = %op.id, attempt, "operation succeeded");
                    op.mark_success(result);
                    return;
                }
                Err(raw) => raw,
            };

            let classification = self.classifier.classify(&raw);
            let decision = scheduler.decide(&classification, attempt, max_attempts);
            if !decision.should_retry {
                warn!(
                    id = %op.id,
                    attempt,
                    code = %classification.code,
                    category = %classification.category,
                    recoverable = classification.recoverable,
                    "operation failed"
                );
                op.mark_failed(classification);
                return;
            }

            warn!(
                id = %op.id,
                attempt,
                code = %classification.code,
                delay_ms = decision.delay_ms,
                raw = %raw,
                "operation failed; retrying"
            );
            self.emit(ExecutionEvent::RetryScheduled {
                id: op.id.clone(),
                attempt,
                delay_ms: decision.delay_ms,
                code: classification.code,
            });
            tokio::time::sleep(decision.delay()).await;
        }
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(cb) = &self.on_event {
            cb(&event);
        }
    }
}

fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.map_or(false, CancellationToken::is_cancelled)
}

/// Rate-limit pause. Wakes early on cancellation; the skip itself still
/// happens at the next operation boundary.
async fn pause(delay: Duration, cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => {}
            }
        }
        None => tokio::time::sleep(delay).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Parameters;
    use crate::policy::RetryConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails the first `failures` calls with `raw`, then succeeds.
    struct Flaky {
        failures: u32,
        raw: RawFailure,
        calls: AtomicU32,
    }

    #[async_trait]
    impl OperationExecutor for Flaky {
        async fn execute(&self, request: ExecutionRequest<'_>) -> Result<Value, RawFailure> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.raw.clone())
            } else {
                Ok(json!({ "id": request.operation_id, "attempt": request.attempt }))
            }
        }
    }

    fn flaky(failures: u32, raw: RawFailure) -> Flaky {
        Flaky {
            failures,
            raw,
            calls: AtomicU32::new(0),
        }
    }

    fn mint(id: &str) -> Operation {
        Operation::new(id, "mint", Parameters::new()).with_param("tier", 1)
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let exec = BatchExecutor::new(flaky(1, RawFailure::Code(501)));
        let report = exec.run(vec![mint("a")], &ProcessOptions::default()).await;
        let op = &report.operations()[0];
        assert_eq!(op.status, OperationStatus::Success);
        assert_eq!(op.attempts, 2);
        assert_eq!(op.result.as_ref().unwrap()["attempt"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_recoverable_failure_is_attempted_once() {
        let backend = Arc::new(flaky(u32::MAX, RawFailure::Code(300)));
        let exec = BatchExecutor::new(backend.clone());
        let options = ProcessOptions {
            max_retries: 10,
            ..Default::default()
        };
        let report = exec.run(vec![mint("a")], &options).await;
        let op = &report.operations()[0];
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.attempts, 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(op.error.as_ref().unwrap().code, "ERR_TOKEN_NOT_FOUND");
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_skips_executor() {
        let backend = Arc::new(flaky(0, RawFailure::Code(0)));
        let exec = BatchExecutor::new(backend.clone());
        let bad = Operation::new("bad", "burn", Parameters::new());
        let report = exec.run(vec![bad, mint("b")], &ProcessOptions::default()).await;
        let ops = report.operations();
        assert_eq!(ops[0].status, OperationStatus::Failed);
        assert_eq!(ops[0].attempts, 1);
        assert_eq!(ops[0].error.as_ref().unwrap().code, validator::VALIDATION_ERROR);
        assert_eq!(ops[1].status, OperationStatus::Success);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_emitted_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let exec = BatchExecutor::new(flaky(1, RawFailure::message("connection refused")))
            .on_event(move |e| sink.lock().unwrap().push(e.clone()));
        exec.run(vec![mint("a")], &ProcessOptions::default()).await;

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                ExecutionEvent::OperationStarted {
                    index: 0,
                    id: "a".into()
                },
                ExecutionEvent::RetryScheduled {
                    id: "a".into(),
                    attempt: 1,
                    delay_ms: 2_000,
                    code: "NETWORK_ERROR".into()
                },
                ExecutionEvent::OperationFinished {
                    index: 0,
                    id: "a".into(),
                    status: OperationStatus::Success,
                    attempts: 2
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_batch_skips_everything() {
        let token = CancellationToken::new();
        token.cancel();
        let backend = Arc::new(flaky(0, RawFailure::Code(0)));
        let exec = BatchExecutor::new(backend.clone());
        let options = ProcessOptions {
            cancel: Some(token),
            ..Default::default()
        };
        let report = exec.run(vec![mint("a"), mint("b")], &options).await;
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.operations()[0].attempts, 0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn already_terminal_operations_are_untouched() {
        let mut done = mint("done");
        done.attempts = 1;
        done.mark_success(json!("earlier"));
        let backend = Arc::new(flaky(0, RawFailure::Code(0)));
        let exec = BatchExecutor::new(backend.clone());
        let report = exec.run(vec![done, mint("next")], &ProcessOptions::default()).await;
        assert_eq!(report.operations()[0].result, Some(json!("earlier")));
        assert_eq!(report.successful(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_pause_between_operations_only() {
        let exec = BatchExecutor::new(flaky(0, RawFailure::Code(0)));
        let options = ProcessOptions {
            inter_op_delay: Some(Duration::from_millis(1_000)),
            ..Default::default()
        };
        let start = tokio::time::Instant::now();
        exec.run(vec![mint("a"), mint("b"), mint("c")], &options).await;
        // two gaps for three operations
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2_000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2_100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wakes_the_rate_limit_pause() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let backend = Arc::new(flaky(0, RawFailure::Code(0)));
        let exec = BatchExecutor::new(backend.clone()).on_event(move |e| {
            if matches!(e, ExecutionEvent::OperationFinished { index: 0, .. }) {
                trigger.cancel();
            }
        });
        let options = ProcessOptions::default()
            .inter_op_delay(Duration::from_secs(60))
            .cancel_token(token);

        let start = tokio::time::Instant::now();
        let report = exec.run(vec![mint("a"), mint("b"), mint("c")], &options).await;
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?}");
        let ops = report.operations();
        assert_eq!(ops[0].status, OperationStatus::Success);
        assert_eq!(ops[1].status, OperationStatus::Skipped);
        assert_eq!(ops[2].status, OperationStatus::Skipped);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_config_comes_from_options() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let exec = BatchExecutor::new(flaky(2, RawFailure::Code(501)))
            .on_event(move |e| sink.lock().unwrap().push(e.clone()));
        let options = ProcessOptions::default().retry_config(RetryConfig {
            base_delay_ms: 250,
            ..Default::default()
        });
        exec.run(vec![mint("a")], &options).await;

        let delays: Vec<u64> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::RetryScheduled { delay_ms, .. } => Some(*delay_ms),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![250, 500]);
    }
}
