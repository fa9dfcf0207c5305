//! Core types for the failure taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ─── ErrorCategory ────────────────────────────────────────────────────────────

/// Broad family a classified failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The operation itself is malformed.
    Validation,
    /// Signing key, authorization or account funding problems.
    Wallet,
    /// Transport-level trouble reaching the ledger.
    Network,
    /// The ledger contract rejected the call.
    Contract,
    /// Node, service or resource-limit failures.
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Wallet => write!(f, "wallet"),
            Self::Network => write!(f, "network"),
            Self::Contract => write!(f, "contract"),
            Self::System => write!(f, "system"),
        }
    }
}

// ─── ErrorClassification ──────────────────────────────────────────────────────

/// The typed, recoverability-annotated diagnosis of a raw failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
    /// Stable identifier, e.g. `"ERR_INSUFFICIENT_BALANCE"`.
    pub code: String,
    pub message: String,
    pub category: ErrorCategory,
    /// Remediation hints, most useful first.
    pub suggestions: Vec<String>,
    /// The failure *may* succeed if retried. Whether a retry actually
    /// happens is up to the retry scheduler.
    pub recoverable: bool,
}

impl ErrorClassification {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        category: ErrorCategory,
        recoverable: bool,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            category,
            suggestions: Vec::new(),
            recoverable,
        }
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category, self.code, self.message)?;
        if let Some(hint) = self.suggestions.first() {
            write!(f, " — hint: {hint}")?;
        }
        Ok(())
    }
}

// ─── RawFailure ───────────────────────────────────────────────────────────────

/// A failure exactly as the execution collaborator reported it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFailure {
    /// A bare numeric ledger code.
    Code(i64),
    /// An error object carrying a numeric `error` field.
    Coded { error: i64, message: Option<String> },
    /// An error object (or plain error) exposing only a message.
    Message(String),
    /// Anything else the collaborator produced.
    Other(Value),
}

impl RawFailure {
    pub fn code(code: i64) -> Self {
        Self::Code(code)
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Interpret a JSON failure payload: a number is a bare code, an object
    /// with a numeric `error` is a coded error, an object with a `message`
    /// string (or a bare string) is a message.
    pub fn from_value(value: Value) -> Self {
        if let Some(code) = value.as_i64() {
            return Self::Code(code);
        }
        if let Some(text) = value.as_str() {
            return Self::Message(text.to_string());
        }
        if let Some(obj) = value.as_object() {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(code) = obj.get("error").and_then(Value::as_i64) {
                return Self::Coded { error: code, message };
            }
            if let Some(message) = message {
                return Self::Message(message);
            }
        }
        Self::Other(value)
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "code {code}"),
            Self::Coded { error, message: Some(m) } => write!(f, "code {error}: {m}"),
            Self::Coded { error, message: None } => write!(f, "code {error}"),
            Self::Message(m) => write!(f, "{m}"),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for RawFailure {
    fn from(code: i64) -> Self {
        Self::Code(code)
    }
}

impl From<&str> for RawFailure {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for RawFailure {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
