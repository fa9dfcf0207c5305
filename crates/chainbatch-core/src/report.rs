//! Result aggregation — the externally visible [`ExecutionReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::BatchError;
use crate::operation::{Operation, OperationStatus};

/// Counts and timing for a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub execution_time_ms: u64,
    /// `successful / total`, `0.0` for an empty batch.
    pub success_rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// The durable outcome of one batch run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    summary: ReportSummary,
    operations: Vec<Operation>,
}

impl ExecutionReport {
    /// Fold terminal operations into a report.
    ///
    /// Any operation still pending is recorded as skipped so that
    /// `total == successful + failed + skipped` always holds.
    pub fn from_operations(mut operations: Vec<Operation>, elapsed: Duration) -> Self {
        let (mut successful, mut failed, mut skipped) = (0, 0, 0);
        for op in &mut operations {
            if !op.is_terminal() {
                tracing::warn!(id = %op.id, "operation left pending; recording as skipped");
                op.mark_skipped();
            }
            match op.status {
                OperationStatus::Success => successful += 1,
                OperationStatus::Failed => failed += 1,
                OperationStatus::Skipped | OperationStatus::Pending => skipped += 1,
            }
        }

        let total = operations.len();
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64
        };

        Self {
            summary: ReportSummary {
                total,
                successful,
                failed,
                skipped,
                execution_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                success_rate,
                timestamp: Utc::now(),
            },
            operations,
        }
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn total(&self) -> usize {
        self.summary.total
    }

    pub fn successful(&self) -> usize {
        self.summary.successful
    }

    pub fn failed(&self) -> usize {
        self.summary.failed
    }

    pub fn skipped(&self) -> usize {
        self.summary.skipped
    }

    pub fn success_rate(&self) -> f64 {
        self.summary.success_rate
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.summary.execution_time_ms
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    pub fn failed_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| op.status == OperationStatus::Failed)
    }

    pub fn to_json_pretty(&self) -> Result<String, BatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), BatchError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// Measures a batch from the moment the executor starts.
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder {
    started: Instant,
}

impl ReportBuilder {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finish(self, operations: Vec<Operation>) -> ExecutionReport {
        ExecutionReport::from_operations(operations, self.elapsed())
    }
}
