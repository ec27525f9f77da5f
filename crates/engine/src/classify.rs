//! Raw failure text to user-facing messages.
//!
//! Provider and contract errors arrive as free-form strings. A data table
//! of known substrings maps them onto short, actionable messages; the raw
//! text is kept for logs but never shown verbatim. Matching is
//! case-insensitive and the first matching row wins, so more specific
//! patterns sit above generic ones.

/// A classified failure: the message to show and the raw text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub message: String,
    pub raw: String,
}

impl core::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Known failure patterns, most specific first. Extending the table never
/// requires touching callers.
const CLASSIFICATIONS: &[(&[&str], &str)] = &[
    (
        &["insufficient collateral", "undercollateralized", "health factor"],
        "Insufficient collateral to support this borrow.",
    ),
    (
        &["insufficient liquidity", "exceeds available liquidity", "not enough liquidity"],
        "The reserve does not have enough liquidity for this amount right now.",
    ),
    (
        &["stale price", "price too old", "price is stale", "no fresh price"],
        "Price data is out of date. Refresh prices and try again.",
    ),
    (
        &["paused"],
        "This market is temporarily paused.",
    ),
    (
        &["reentran"],
        "The contract rejected a re-entrant call. Please retry.",
    ),
    (
        &["exceeds allowance", "insufficient allowance", "allowance too low"],
        "Token approval is missing or too small. Approve the token and retry.",
    ),
    (
        &["insufficient funds"],
        "Not enough balance to cover the transaction and gas.",
    ),
    (
        &["nonce too low", "nonce too high", "invalid nonce"],
        "Transaction ordering conflict. Please retry.",
    ),
    (
        &["replacement transaction underpriced", "already known"],
        "A conflicting pending transaction exists. Wait for it to settle and retry.",
    ),
    (
        &["user rejected", "user denied", "rejected the request"],
        "The request was rejected in the wallet.",
    ),
    (
        &["cannot estimate gas", "gas required exceeds", "unpredictable_gas_limit"],
        "Gas estimation failed; the transaction would not succeed as submitted.",
    ),
    (
        &["timed out", "timeout", "connection refused", "connection reset", "network"],
        "Network error while talking to the chain. Check connectivity and retry.",
    ),
    (
        &["execution reverted", "revert"],
        "The contract rejected this transaction.",
    ),
];

const FALLBACK: &str = "Transaction failed. Please try again.";

/// Maps raw failure text onto a stable user-facing message.
pub fn classify(raw: &str) -> ClassifiedError {
    let needle = raw.to_lowercase();
    let message = CLASSIFICATIONS
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| needle.contains(p)))
        .map(|(_, message)| *message)
        .unwrap_or(FALLBACK);

    ClassifiedError {
        message: message.to_string(),
        raw: raw.to_string(),
    }
}
