//! Error classification — maps raw collaborator failures to
//! [`ErrorClassification`]s.
//!
//! Input shapes are tried in order:
//!
//! 1. a bare numeric code, looked up in the code table;
//! 2. an object with a numeric `error` field, same lookup;
//! 3. an object with a `message`, matched against keyword patterns.
//!
//! Codes are partitioned into contiguous ranges:
//!
//! ```text
//! 100–199  validation       → validation
//! 200–299  authorization    → wallet
//! 300–399  business logic   → contract
//! 400–499  resource limits  → system
//! 500–599  system           → system
//! ```
//!
//! Classification holds no hidden state: the same input always yields the
//! same output.

use std::collections::BTreeMap;

use crate::types::{ErrorCategory, ErrorClassification, RawFailure};

pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";
pub const WALLET_ERROR: &str = "WALLET_ERROR";
pub const INSUFFICIENT_FUNDS: &str = "INSUFFICIENT_FUNDS";

// ─── Code ranges ──────────────────────────────────────────────────────────────

/// The contiguous bands of the ledger code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRange {
    Validation,
    Authorization,
    BusinessLogic,
    ResourceLimit,
    System,
}

impl CodeRange {
    /// The band `code` falls into, if any.
    pub fn of(code: i64) -> Option<Self> {
        match code {
            100..=199 => Some(Self::Validation),
            200..=299 => Some(Self::Authorization),
            300..=399 => Some(Self::BusinessLogic),
            400..=499 => Some(Self::ResourceLimit),
            500..=599 => Some(Self::System),
            _ => None,
        }
    }

    pub fn category(self) -> ErrorCategory {
        match self {
            Self::Validation => ErrorCategory::Validation,
            Self::Authorization => ErrorCategory::Wallet,
            Self::BusinessLogic => ErrorCategory::Contract,
            Self::ResourceLimit | Self::System => ErrorCategory::System,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Validation => "invalid request parameters",
            Self::Authorization => "authorization failure",
            Self::BusinessLogic => "contract rejected the operation",
            Self::ResourceLimit => "resource limit reached",
            Self::System => "ledger node error",
        }
    }

    fn suggestions(self) -> &'static [&'static str] {
        match self {
            Self::Validation => &["Check the operation parameters against the contract interface."],
            Self::Authorization => &[
                "Verify the signing key is allowed to perform this operation.",
                "Check token ownership before transferring or burning.",
            ],
            Self::BusinessLogic => &["Inspect the contract state; the operation may not be allowed right now."],
            Self::ResourceLimit => &["Wait and retry, or reduce the batch rate."],
            Self::System => &["Retry later; the ledger node may be degraded."],
        }
    }
}

// ─── Code table ───────────────────────────────────────────────────────────────

struct CodeEntry {
    code: i64,
    id: &'static str,
    message: &'static str,
    recoverable: bool,
    suggestions: &'static [&'static str],
}

const CODE_TABLE: &[CodeEntry] = &[
    // validation
    CodeEntry {
        code: 100,
        id: "ERR_INVALID_PARAMETERS",
        message: "Invalid operation parameters",
        recoverable: false,
        suggestions: &["Check the operation parameters against the contract interface."],
    },
    CodeEntry {
        code: 101,
        id: "ERR_INVALID_TIER",
        message: "Invalid mint tier",
        recoverable: false,
        suggestions: &["Use a tier defined by the contract."],
    },
    CodeEntry {
        code: 102,
        id: "ERR_INVALID_RECIPIENT",
        message: "Invalid recipient address",
        recoverable: false,
        suggestions: &["Check the recipient principal for typos and network prefix."],
    },
    CodeEntry {
        code: 103,
        id: "ERR_INVALID_TOKEN_ID",
        message: "Invalid token id",
        recoverable: false,
        suggestions: &["Token ids are non-negative integers issued at mint time."],
    },
    // authorization
    CodeEntry {
        code: 200,
        id: "ERR_UNAUTHORIZED",
        message: "Sender is not authorized for this operation",
        recoverable: false,
        suggestions: &[
            "Sign with the contract owner or an approved operator key.",
            "Check the contract's access-control configuration.",
        ],
    },
    CodeEntry {
        code: 201,
        id: "ERR_NOT_TOKEN_OWNER",
        message: "Sender does not own this token",
        recoverable: false,
        suggestions: &["Look up the current owner of the token before transferring or burning."],
    },
    CodeEntry {
        code: 202,
        id: "ERR_INVALID_SIGNATURE",
        message: "Transaction signature could not be verified",
        recoverable: false,
        suggestions: &["Check that the private key matches the sender address."],
    },
    // business logic
    CodeEntry {
        code: 300,
        id: "ERR_TOKEN_NOT_FOUND",
        message: "Token does not exist",
        recoverable: false,
        suggestions: &["Check the token id; it may have been burned."],
    },
    CodeEntry {
        code: 301,
        id: "ERR_TOKEN_ALREADY_EXISTS",
        message: "Token already exists",
        recoverable: false,
        suggestions: &["The mint may already have gone through; check before resubmitting."],
    },
    CodeEntry {
        code: 302,
        id: "ERR_TIER_SOLD_OUT",
        message: "Mint tier is sold out",
        recoverable: false,
        suggestions: &["Choose a tier with remaining supply."],
    },
    CodeEntry {
        code: 303,
        id: "ERR_CONTRACT_PAUSED",
        message: "Contract is paused",
        recoverable: true,
        suggestions: &["Wait for the contract owner to unpause, then resubmit."],
    },
    CodeEntry {
        code: 304,
        id: "ERR_SEQUENCE_MISMATCH",
        message: "Account sequence number is out of date",
        recoverable: true,
        suggestions: &[
            "Refresh the account nonce and resubmit.",
            "Avoid submitting from the same account in parallel.",
        ],
    },
    CodeEntry {
        code: 307,
        id: "ERR_INSUFFICIENT_BALANCE",
        message: "Insufficient balance to complete the operation",
        recoverable: true,
        suggestions: &[
            "Fund the sender account and retry.",
            "Check the fee estimate for this operation.",
        ],
    },
    // resource limits
    CodeEntry {
        code: 400,
        id: "ERR_RATE_LIMITED",
        message: "Request rate limit exceeded",
        recoverable: true,
        suggestions: &["Increase the delay between operations."],
    },
    CodeEntry {
        code: 401,
        id: "ERR_MAX_SUPPLY_REACHED",
        message: "Maximum token supply reached",
        recoverable: false,
        suggestions: &["No more tokens can be minted from this contract."],
    },
    CodeEntry {
        code: 402,
        id: "ERR_MEMPOOL_FULL",
        message: "Node mempool is full",
        recoverable: true,
        suggestions: &["Retry after pending transactions confirm."],
    },
    // system
    CodeEntry {
        code: 500,
        id: "ERR_INTERNAL",
        message: "Internal ledger error",
        recoverable: true,
        suggestions: &["Retry later; report the error if it persists."],
    },
    CodeEntry {
        code: 501,
        id: "ERR_SERVICE_UNAVAILABLE",
        message: "Ledger service unavailable",
        recoverable: true,
        suggestions: &["Retry later or switch to another node."],
    },
    CodeEntry {
        code: 502,
        id: "ERR_NODE_SYNCING",
        message: "Ledger node is still syncing",
        recoverable: true,
        suggestions: &["Wait for the node to reach the chain tip."],
    },
];

// ─── Message patterns ─────────────────────────────────────────────────────────

struct MessagePattern {
    keywords: &'static [&'static str],
    code: &'static str,
    message: &'static str,
    category: ErrorCategory,
    suggestions: &'static [&'static str],
}

/// Checked in order; the first pattern with a matching keyword wins.
const MESSAGE_PATTERNS: &[MessagePattern] = &[
    MessagePattern {
        keywords: &["network", "connection"],
        code: NETWORK_ERROR,
        message: "Network error while contacting the ledger",
        category: ErrorCategory::Network,
        suggestions: &[
            "Check connectivity to the ledger node.",
            "Retry; the failure is usually transient.",
        ],
    },
    MessagePattern {
        keywords: &["timeout"],
        code: TIMEOUT_ERROR,
        message: "Request to the ledger timed out",
        category: ErrorCategory::Network,
        suggestions: &["Retry; consider a node with lower latency."],
    },
    MessagePattern {
        keywords: &["private key", "key"],
        code: WALLET_ERROR,
        message: "Wallet key error",
        category: ErrorCategory::Wallet,
        suggestions: &["Check the private key configuration for the sender account."],
    },
    MessagePattern {
        keywords: &["insufficient funds", "balance"],
        code: INSUFFICIENT_FUNDS,
        message: "Insufficient funds for the operation",
        category: ErrorCategory::Wallet,
        suggestions: &["Fund the sender account and retry."],
    },
];

// ─── ErrorClassifier ──────────────────────────────────────────────────────────

/// Classifies raw failures against a code table.
///
/// Construct one per run and hand it to the executor; additional
/// deployment-specific codes can be registered on top of the built-in table.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    codes: BTreeMap<i64, ErrorClassification>,
}

impl CodeEntry {
    fn classification(&self) -> ErrorClassification {
        let category = CodeRange::of(self.code)
            .map(CodeRange::category)
            .unwrap_or(ErrorCategory::System);
        ErrorClassification::new(self.id, self.message, category, self.recoverable)
            .with_suggestions(self.suggestions.iter().copied())
    }
}

impl ErrorClassifier {
    /// A classifier loaded with the built-in ledger code table.
    pub fn new() -> Self {
        let codes = CODE_TABLE
            .iter()
            .map(|e| (e.code, e.classification()))
            .collect();
        Self { codes }
    }

    /// Register (or replace) the classification for a numeric code.
    pub fn register(&mut self, code: i64, classification: ErrorClassification) {
        self.codes.insert(code, classification);
    }

    /// Number of explicitly mapped codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn classify(&self, raw: &RawFailure) -> ErrorClassification {
        classify_raw(raw, |code| self.codes.get(&code).cloned())
    }

    /// Table lookup with per-range fallback.
    pub fn classify_code(&self, code: i64) -> ErrorClassification {
        self.codes
            .get(&code)
            .cloned()
            .unwrap_or_else(|| range_fallback(code))
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify with the built-in table.
pub fn classify(raw: &RawFailure) -> ErrorClassification {
    classify_raw(raw, builtin)
}

fn builtin(code: i64) -> Option<ErrorClassification> {
    CODE_TABLE
        .iter()
        .find(|e| e.code == code)
        .map(CodeEntry::classification)
}

fn classify_raw<F>(raw: &RawFailure, lookup: F) -> ErrorClassification
where
    F: Fn(i64) -> Option<ErrorClassification>,
{
    let by_code = |code: i64| lookup(code).unwrap_or_else(|| range_fallback(code));
    match raw {
        RawFailure::Code(code) => by_code(*code),
        RawFailure::Coded { error, message } => {
            let mut c = by_code(*error);
            if let Some(m) = message.as_deref().filter(|m| !m.trim().is_empty()) {
                c.message = m.to_string();
            }
            c
        }
        RawFailure::Message(message) => classify_message(message),
        RawFailure::Other(value) => unknown(&value.to_string()),
    }
}

fn range_fallback(code: i64) -> ErrorClassification {
    match CodeRange::of(code) {
        Some(range) => ErrorClassification::new(
            format!("ERR_{code}"),
            format!("Ledger error {code} ({})", range.description()),
            range.category(),
            true,
        )
        .with_suggestions(range.suggestions().iter().copied()),
        None => unknown(&format!("Unknown ledger error code {code}")),
    }
}

/// Keyword classification of a free-text failure message.
pub fn classify_message(message: &str) -> ErrorClassification {
    let lowered = message.to_lowercase();
    MESSAGE_PATTERNS
        .iter()
        .find(|p| p.keywords.iter().any(|k| lowered.contains(k)))
        .map(|p| {
            ErrorClassification::new(p.code, p.message, p.category, true)
                .with_suggestions(p.suggestions.iter().copied())
        })
        .unwrap_or_else(|| unknown(message))
}

fn unknown(message: &str) -> ErrorClassification {
    let message = if message.trim().is_empty() {
        "Unknown error"
    } else {
        message
    };
    ErrorClassification::new(UNKNOWN_ERROR, message, ErrorCategory::System, true)
        .with_suggestions(["Retry the operation; if it keeps failing, inspect the ledger logs."])
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn range_boundaries() {
        let cases: &[(i64, Option<CodeRange>)] = &[
            (99, None),
            (100, Some(CodeRange::Validation)),
            (199, Some(CodeRange::Validation)),
            (200, Some(CodeRange::Authorization)),
            (299, Some(CodeRange::Authorization)),
            (300, Some(CodeRange::BusinessLogic)),
            (399, Some(CodeRange::BusinessLogic)),
            (400, Some(CodeRange::ResourceLimit)),
            (499, Some(CodeRange::ResourceLimit)),
            (500, Some(CodeRange::System)),
            (599, Some(CodeRange::System)),
            (600, None),
            (-1, None),
        ];
        for (code, expected) in cases {
            assert_eq!(CodeRange::of(*code), *expected, "code {code}");
        }
    }

    #[test]
    fn unmapped_codes_fall_back_per_range() {
        let classifier = ErrorClassifier::new();
        let cases: &[(i64, ErrorCategory)] = &[
            (150, ErrorCategory::Validation),
            (199, ErrorCategory::Validation),
            (250, ErrorCategory::Wallet),
            (299, ErrorCategory::Wallet),
            (399, ErrorCategory::Contract),
            (450, ErrorCategory::System),
            (599, ErrorCategory::System),
        ];
        for (code, category) in cases {
            let c = classifier.classify_code(*code);
            assert_eq!(c.code, format!("ERR_{code}"));
            assert_eq!(c.category, *category, "code {code}");
            assert!(c.recoverable);
            assert!(!c.suggestions.is_empty());
        }
    }

    #[test]
    fn codes_outside_ranges_are_unknown() {
        for code in [0, 42, 99, 600, 1000, -307] {
            let c = classify(&RawFailure::Code(code));
            assert_eq!(c.code, UNKNOWN_ERROR, "code {code}");
            assert_eq!(c.category, ErrorCategory::System);
            assert!(c.recoverable);
        }
    }

    #[test]
    fn mapped_codes() {
        let cases: &[(i64, &str, ErrorCategory, bool)] = &[
            (100, "ERR_INVALID_PARAMETERS", ErrorCategory::Validation, false),
            (201, "ERR_NOT_TOKEN_OWNER", ErrorCategory::Wallet, false),
            (302, "ERR_TIER_SOLD_OUT", ErrorCategory::Contract, false),
            (304, "ERR_SEQUENCE_MISMATCH", ErrorCategory::Contract, true),
            (307, "ERR_INSUFFICIENT_BALANCE", ErrorCategory::Contract, true),
            (400, "ERR_RATE_LIMITED", ErrorCategory::System, true),
            (401, "ERR_MAX_SUPPLY_REACHED", ErrorCategory::System, false),
            (501, "ERR_SERVICE_UNAVAILABLE", ErrorCategory::System, true),
        ];
        for (code, id, category, recoverable) in cases {
            let c = classify(&RawFailure::Code(*code));
            assert_eq!(c.code, *id);
            assert_eq!(c.category, *category, "{id}");
            assert_eq!(c.recoverable, *recoverable, "{id}");
        }
    }

    #[test]
    fn coded_object_uses_table_with_own_message() {
        let raw = RawFailure::from_value(json!({ "error": 307, "message": "balance 0 < fee 180" }));
        let c = classify(&raw);
        assert_eq!(c.code, "ERR_INSUFFICIENT_BALANCE");
        assert_eq!(c.message, "balance 0 < fee 180");
        assert!(c.recoverable);
    }

    #[test]
    fn coded_object_without_message_keeps_table_message() {
        let c = classify(&RawFailure::Coded {
            error: 300,
            message: None,
        });
        assert_eq!(c.message, "Token does not exist");
    }

    #[test]
    fn message_keywords() {
        let cases: &[(&str, &str, ErrorCategory)] = &[
            ("Network unreachable", NETWORK_ERROR, ErrorCategory::Network),
            ("CONNECTION reset by peer", NETWORK_ERROR, ErrorCategory::Network),
            ("request timeout", TIMEOUT_ERROR, ErrorCategory::Network),
            ("invalid private key", WALLET_ERROR, ErrorCategory::Wallet),
            ("missing key", WALLET_ERROR, ErrorCategory::Wallet),
            ("Insufficient funds for fee", INSUFFICIENT_FUNDS, ErrorCategory::Wallet),
            ("balance too low", INSUFFICIENT_FUNDS, ErrorCategory::Wallet),
            ("something odd happened", UNKNOWN_ERROR, ErrorCategory::System),
        ];
        for (message, code, category) in cases {
            let c = classify(&RawFailure::message(*message));
            assert_eq!(c.code, *code, "message {message:?}");
            assert_eq!(c.category, *category, "message {message:?}");
            assert!(c.recoverable);
        }
    }

    #[test]
    fn first_matching_pattern_wins() {
        // "network" is checked before "timeout"
        let c = classify_message("network timeout");
        assert_eq!(c.code, NETWORK_ERROR);
        // "key" is checked before "balance"
        let c = classify_message("key has no balance");
        assert_eq!(c.code, WALLET_ERROR);
    }

    #[test]
    fn classification_is_deterministic() {
        let inputs = [
            RawFailure::Code(307),
            RawFailure::Code(450),
            RawFailure::message("request timeout"),
            RawFailure::Other(json!(null)),
        ];
        let classifier = ErrorClassifier::new();
        for raw in &inputs {
            assert_eq!(classifier.classify(raw), classifier.classify(raw));
            assert_eq!(classifier.classify(raw), classify(raw));
        }
    }

    #[test]
    fn registered_codes_override_fallback() {
        let mut classifier = ErrorClassifier::new();
        let before = classifier.len();
        classifier.register(
            350,
            ErrorClassification::new("ERR_ROYALTY_UNPAID", "Royalty unpaid", ErrorCategory::Contract, false),
        );
        assert_eq!(classifier.len(), before + 1);
        let c = classifier.classify(&RawFailure::Code(350));
        assert_eq!(c.code, "ERR_ROYALTY_UNPAID");
        assert!(!c.recoverable);
    }

    #[test]
    fn unrecognised_shape_is_unknown() {
        let c = classify(&RawFailure::Other(json!([1, 2, 3])));
        assert_eq!(c.code, UNKNOWN_ERROR);
        assert_eq!(c.category, ErrorCategory::System);
    }

    #[test]
    fn free_classify_matches_builtin_table() {
        let classifier = ErrorClassifier::new();
        for entry in CODE_TABLE {
            assert_eq!(classify(&RawFailure::Code(entry.code)), classifier.classify_code(entry.code));
        }
        assert_eq!(classify(&RawFailure::Code(350)).code, "ERR_350");
        assert_eq!(classify(&RawFailure::Code(-1)).code, UNKNOWN_ERROR);
    }
}
