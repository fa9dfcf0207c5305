//! Inter-operation pacing.
//!
//! A fixed pause between consecutive operations keeps the downstream
//! ledger node from being flooded. Each operation family has its own
//! default; an explicit override applies to all of them. Every delay is
//! clamped to [`MIN_INTER_OP_DELAY`].

use std::time::Duration;

use crate::operation::OperationKind;

/// No pause between operations is ever shorter than this.
pub const MIN_INTER_OP_DELAY: Duration = Duration::from_millis(100);

/// Upper bound accepted for a configured delay.
pub const MAX_INTER_OP_DELAY: Duration = Duration::from_secs(600);

/// Default pause after an operation of the given family.
pub fn default_delay(kind: Option<OperationKind>) -> Duration {
    match kind {
        Some(OperationKind::Mint) => Duration::from_millis(500),
        Some(OperationKind::Transfer) | Some(OperationKind::Burn) => Duration::from_millis(300),
        None => MIN_INTER_OP_DELAY,
    }
}

/// Computes the pause after each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pacing {
    /// Overrides the per-family defaults when set.
    pub fixed: Option<Duration>,
}

impl Pacing {
    pub fn new(fixed: Option<Duration>) -> Self {
        Self { fixed }
    }

    /// The pause to take after an operation whose kind parsed as `kind`.
    pub fn delay_after(&self, kind: Option<OperationKind>) -> Duration {
        self.fixed
            .unwrap_or_else(|| default_delay(kind))
            .max(MIN_INTER_OP_DELAY)
    }
}
