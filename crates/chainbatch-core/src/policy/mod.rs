//! Execution policies: how often to call the ledger and when to try again.
//!
//! ```text
//! Operation → [execute] → failure → [RetryScheduler] → backoff → [execute] …
//! Operation done → [Pacing] → next Operation
//! ```

pub mod pacing;
pub mod retry;

pub use pacing::{Pacing, MIN_INTER_OP_DELAY};
pub use retry::{RetryConfig, RetryDecision, RetryScheduler};
