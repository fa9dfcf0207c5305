//! The top-level entry point: parse → execute → report.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{BatchError, ParseError};
use crate::executor::{BatchExecutor, OperationExecutor};
use crate::operation::Operation;
use crate::parser::{self, BatchInput};
use crate::policy::pacing::MAX_INTER_OP_DELAY;
use crate::policy::RetryConfig;
use crate::report::ExecutionReport;

/// Default attempt budget per operation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Options for a single batch run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Maximum attempts per operation, counting the first one.
    pub max_retries: u32,
    /// Fixed pause between operations; `None` uses the per-family defaults.
    /// Always clamped to the pacing floor.
    pub inter_op_delay: Option<Duration>,
    /// Backoff parameters for retryable failures.
    pub retry: RetryConfig,
    /// Cooperative cancellation, checked between operations.
    pub cancel: Option<CancellationToken>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            inter_op_delay: None,
            retry: RetryConfig::default(),
            cancel: None,
        }
    }
}

impl ProcessOptions {
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn inter_op_delay(mut self, delay: Duration) -> Self {
        self.inter_op_delay = Some(delay);
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Reject options that can never describe a sensible run.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.max_retries == 0 {
            return Err(BatchError::InvalidOptions(
                "max_retries must be at least 1".into(),
            ));
        }
        if let Some(delay) = self.inter_op_delay {
            if delay > MAX_INTER_OP_DELAY {
                return Err(BatchError::InvalidOptions(format!(
                    "inter-operation delay {}ms exceeds the {}ms maximum",
                    delay.as_millis(),
                    MAX_INTER_OP_DELAY.as_millis()
                )));
            }
        }
        Ok(())
    }
}

/// An ordered, non-atomic set of operations submitted together.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    operations: Vec<Operation>,
}

impl BatchRequest {
    /// Parse a batch source. Fails as a whole; never yields a partial list.
    pub fn parse(input: &BatchInput) -> Result<Self, ParseError> {
        Ok(Self {
            operations: parser::parse(input)?,
        })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

/// Parse `input`, run every operation through `executor`, and report.
///
/// Only malformed input or invalid options produce an `Err`; individual
/// operation failures are recorded in the report.
pub async fn process_batch<E: OperationExecutor>(
    input: &BatchInput,
    executor: E,
    options: &ProcessOptions,
) -> Result<ExecutionReport, BatchError> {
    options.validate()?;
    let request = BatchRequest::parse(input)?;
    let report = BatchExecutor::new(executor)
        .run(request.into_operations(), options)
        .await;
    Ok(report)
}
