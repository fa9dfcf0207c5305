//! Per-operation validation.
//!
//! [`validate`] is pure and idempotent. It is invoked by the executor right
//! before an operation runs, so one invalid operation never blocks the
//! ones ahead of it.

use serde_json::Value;
use thiserror::Error;

use crate::operation::{Command, Operation, OperationKind};
use crate::types::{ErrorCategory, ErrorClassification};

/// Stable code for every validator rejection.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";

/// Why an operation was rejected before execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown operation kind '{kind}' (expected one of: mint, transfer, burn)")]
    UnknownKind { kind: String },

    #[error("{kind} requires '{field}'")]
    MissingField { kind: OperationKind, field: &'static str },

    #[error("{kind}: '{field}' {reason}")]
    InvalidField {
        kind: OperationKind,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// The classification recorded on an operation that failed validation.
    pub fn classification(&self) -> ErrorClassification {
        let hint = match self {
            Self::UnknownKind { .. } => {
                "Use one of the supported operation kinds: mint, transfer, burn.".to_string()
            }
            Self::MissingField { kind, .. } | Self::InvalidField { kind, .. } => format!(
                "Provide {} for every {kind} operation.",
                kind.required_fields()
                    .iter()
                    .map(|f| format!("'{f}'"))
                    .collect::<Vec<_>>()
                    .join(" and ")
            ),
        };
        ErrorClassification::new(
            VALIDATION_ERROR,
            self.to_string(),
            ErrorCategory::Validation,
            false,
        )
        .with_suggestions([hint, "Fix the batch input and resubmit this operation.".into()])
    }
}

impl From<ValidationError> for ErrorClassification {
    fn from(err: ValidationError) -> Self {
        err.classification()
    }
}

/// Check an operation and build its typed [`Command`].
pub fn validate(op: &Operation) -> Result<Command, ValidationError> {
    let kind = OperationKind::parse(&op.kind).ok_or_else(|| ValidationError::UnknownKind {
        kind: op.kind.clone(),
    })?;

    for &field in kind.required_fields() {
        if op.param(field).map_or(true, is_blank) {
            return Err(ValidationError::MissingField { kind, field });
        }
    }

    match kind {
        OperationKind::Mint => {
            let tier = integer_field(op, kind, "tier")?;
            if tier == 0 {
                return Err(invalid(kind, "tier", "must be a positive integer"));
            }
            let tier = u32::try_from(tier)
                .map_err(|_| invalid(kind, "tier", "is out of range"))?;
            Ok(Command::Mint { tier })
        }
        OperationKind::Transfer => Ok(Command::Transfer {
            token_id: integer_field(op, kind, "token-id")?,
            recipient: text_field(op, kind, "recipient")?,
        }),
        OperationKind::Burn => Ok(Command::Burn {
            token_id: integer_field(op, kind, "token-id")?,
        }),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn invalid(kind: OperationKind, field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        kind,
        field,
        reason: reason.to_string(),
    }
}

/// Non-negative integer given as a JSON number or a numeric string.
fn integer_field(
    op: &Operation,
    kind: OperationKind,
    field: &'static str,
) -> Result<u64, ValidationError> {
    let parsed = match op.param(field) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(kind, field, "must be a non-negative integer"))
}

fn text_field(
    op: &Operation,
    kind: OperationKind,
    field: &'static str,
) -> Result<String, ValidationError> {
    match op.param(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(invalid(kind, field, "must be a non-empty string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Parameters;
    use serde_json::json;

    fn op(kind: &str) -> Operation {
        Operation::new("op-1", kind, Parameters::new())
    }

    #[test]
    fn mint_from_string_tier() {
        let cmd = validate(&op("mint").with_param("tier", "3")).unwrap();
        assert_eq!(cmd, Command::Mint { tier: 3 });
    }

    #[test]
    fn transfer_requires_both_fields() {
        let err = validate(&op("transfer").with_param("token-id", 5)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                kind: OperationKind::Transfer,
                field: "recipient"
            }
        );
        assert_eq!(err.to_string(), "transfer requires 'recipient'");
    }

    #[test]
    fn burn_requires_token_id() {
        let err = validate(&op("burn")).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "token-id", .. }));
    }

    #[test]
    fn unknown_kind() {
        let err = validate(&op("swap")).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownKind { .. }));
    }

    #[test]
    fn zero_tier_rejected() {
        let err = validate(&op("mint").with_param("tier", 0)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "tier", .. }));
    }

    #[test]
    fn negative_token_id_rejected() {
        let err = validate(&op("burn").with_param("token-id", json!(-4))).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "token-id", .. }));
    }

    #[test]
    fn blank_field_counts_as_missing() {
        let err = validate(&op("mint").with_param("tier", " ")).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn validation_is_idempotent() {
        let o = op("transfer")
            .with_param("token-id", "7")
            .with_param("recipient", " SP9 ");
        assert_eq!(validate(&o), validate(&o));
        assert_eq!(
            validate(&o).unwrap(),
            Command::Transfer {
                token_id: 7,
                recipient: "SP9".into()
            }
        );
    }

    #[test]
    fn classification_is_non_recoverable_validation() {
        let c = validate(&op("burn")).unwrap_err().classification();
        assert_eq!(c.code, VALIDATION_ERROR);
        assert_eq!(c.category, ErrorCategory::Validation);
        assert!(!c.recoverable);
        assert!(!c.suggestions.is_empty());
    }
}
