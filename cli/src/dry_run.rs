//! A stand-in ledger that never leaves the machine.

use async_trait::async_trait;
use chainbatch_core::{ExecutionRequest, OperationExecutor, OperationKind, RawFailure};
use serde_json::{json, Value};

/// Echoes each command back as its result. Operations of `fail_kind`, if
/// set, fail with ledger code 307 so reports can be exercised end to end.
#[derive(Debug, Default)]
pub struct DryRunLedger {
    pub fail_kind: Option<OperationKind>,
}

#[async_trait]
impl OperationExecutor for DryRunLedger {
    async fn execute(&self, request: ExecutionRequest<'_>) -> Result<Value, RawFailure> {
        if self.fail_kind == Some(request.command.kind()) {
            return Err(RawFailure::Coded {
                error: 307,
                message: Some(format!(
                    "dry run: simulated insufficient balance for {}",
                    request.command
                )),
            });
        }
        Ok(json!({
            "dryRun": true,
            "operation": request.operation_id,
            "attempt": request.attempt,
            "command": request.command,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbatch_core::Command;

    #[tokio::test]
    async fn echoes_command() {
        let ledger = DryRunLedger::default();
        let cmd = Command::Burn { token_id: 9 };
        let out = ledger
            .execute(ExecutionRequest {
                operation_id: "op-1",
                command: &cmd,
                attempt: 1,
            })
            .await
            .unwrap();
        assert_eq!(out["dryRun"], true);
        assert_eq!(out["command"]["token-id"], 9);
    }

    #[tokio::test]
    async fn fails_selected_kind() {
        let ledger = DryRunLedger {
            fail_kind: Some(OperationKind::Mint),
        };
        let cmd = Command::Mint { tier: 1 };
        let err = ledger
            .execute(ExecutionRequest {
                operation_id: "op-1",
                command: &cmd,
                attempt: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RawFailure::Coded { error: 307, .. }));
    }
}
