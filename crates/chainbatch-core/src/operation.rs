//! Operation records and their typed command form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::ErrorClassification;

/// Named operation fields as parsed from the batch source.
pub type Parameters = BTreeMap<String, Value>;

// ─── OperationStatus ──────────────────────────────────────────────────────────

/// Lifecycle of an operation: `Pending` → `Success` | `Failed` | `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

// ─── OperationKind ────────────────────────────────────────────────────────────

/// The recognised operation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Mint,
    Transfer,
    Burn,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [Self::Mint, Self::Transfer, Self::Burn];

    /// Case-insensitive lookup; `None` for anything unrecognised.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mint" => Some(Self::Mint),
            "transfer" => Some(Self::Transfer),
            "burn" => Some(Self::Burn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::Transfer => "transfer",
            Self::Burn => "burn",
        }
    }

    /// Fields the validator insists on for this kind.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Mint => &["tier"],
            Self::Transfer => &["token-id", "recipient"],
            Self::Burn => &["token-id"],
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Command ──────────────────────────────────────────────────────────────────

/// A validated operation with every kind-specific field present and typed.
///
/// Only [`crate::validator::validate`] builds these from batch input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Command {
    Mint {
        tier: u32,
    },
    Transfer {
        #[serde(rename = "token-id")]
        token_id: u64,
        recipient: String,
    },
    Burn {
        #[serde(rename = "token-id")]
        token_id: u64,
    },
}

impl Command {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Mint { .. } => OperationKind::Mint,
            Self::Transfer { .. } => OperationKind::Transfer,
            Self::Burn { .. } => OperationKind::Burn,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mint { tier } => write!(f, "mint(tier={tier})"),
            Self::Transfer {
                token_id,
                recipient,
            } => write!(f, "transfer(token-id={token_id}, recipient={recipient})"),
            Self::Burn { token_id } => write!(f, "burn(token-id={token_id})"),
        }
    }
}

// ─── Operation ────────────────────────────────────────────────────────────────

/// One unit of work in a batch, together with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    /// Kind exactly as submitted; recognition is the validator's job.
    pub kind: String,
    #[serde(default)]
    pub parameters: Parameters,
    pub status: OperationStatus,
    #[serde(default)]
    pub attempts: u32,
    /// Present exactly when `status` is `Success`; `null` is a valid result.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorClassification>,
}

/// A field that is present deserializes to `Some`, even when it is `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Operation {
    /// A fresh `Pending` operation.
    pub fn new(id: impl Into<String>, kind: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            parameters,
            status: OperationStatus::Pending,
            attempts: 0,
            result: None,
            error: None,
        }
    }

    /// Builder-style parameter insertion (mostly for tests and callers
    /// assembling batches in code).
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record a successful execution. Returns `false` (and changes nothing)
    /// if the operation already reached a terminal state.
    pub fn mark_success(&mut self, result: Value) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = OperationStatus::Success;
        self.result = Some(result);
        self.error = None;
        true
    }

    /// Record a terminal failure. Returns `false` if already terminal.
    pub fn mark_failed(&mut self, error: ErrorClassification) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = OperationStatus::Failed;
        self.error = Some(error);
        self.result = None;
        true
    }

    /// Record that the operation never ran. Returns `false` if already terminal.
    pub fn mark_skipped(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = OperationStatus::Skipped;
        true
    }
}
