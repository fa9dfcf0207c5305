//! chainbatch-core — sequential batch execution of ledger operations.
//!
//! # Overview
//!
//! A batch of mint / transfer / burn operations is parsed, then executed one
//! operation at a time against an unreliable remote collaborator. Failures
//! are classified, retried when transient, and recorded; the batch always
//! runs to completion and yields an [`ExecutionReport`].
//!
//! - [`parser`] — records / tabular input → pending [`Operation`]s
//! - [`validator`] — per-operation checks producing a typed [`Command`]
//! - [`classifier`] — raw failures → [`ErrorClassification`]
//! - [`policy`] — retry scheduling and inter-operation pacing
//! - [`executor`] — the [`BatchExecutor`] loop and [`OperationExecutor`] trait
//! - [`report`] — the aggregated [`ExecutionReport`]
//!
//! ```no_run
//! use chainbatch_core::{process_batch, BatchInput, ProcessOptions};
//!
//! # async fn demo(ledger: impl chainbatch_core::OperationExecutor) -> Result<(), chainbatch_core::BatchError> {
//! let input = BatchInput::from_path("drop.csv")?;
//! let report = process_batch(&input, ledger, &ProcessOptions::default()).await?;
//! println!("{}/{} succeeded", report.successful(), report.total());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod operation;
pub mod parser;
pub mod policy;
pub mod report;
pub mod types;
pub mod validator;

pub use batch::{process_batch, BatchRequest, ProcessOptions};
pub use classifier::{classify, ErrorClassifier};
pub use config::{BatchConfig, LogConfig};
pub use error::{BatchError, ParseError};
pub use executor::{BatchExecutor, ExecutionEvent, ExecutionRequest, OperationExecutor};
pub use operation::{Command, Operation, OperationKind, OperationStatus, Parameters};
pub use parser::{BatchInput, BatchSource};
pub use policy::{Pacing, RetryConfig, RetryDecision, RetryScheduler};
pub use report::{ExecutionReport, ReportBuilder, ReportSummary};
pub use types::{ErrorCategory, ErrorClassification, RawFailure};
pub use validator::{validate, ValidationError};
