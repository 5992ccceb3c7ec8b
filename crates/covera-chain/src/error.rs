//! Error types for the chain adapter boundary.
//!
//! Every adapter operation resolves to a tagged result: either a value or one
//! of these named conditions. Nothing here is fatal to the process; callers
//! decide whether to retry, re-connect, or surface the message.

use thiserror::Error;

use covera_core::amount::Amount;
use covera_core::domain::PolicyId;

/// Result type alias using [`ChainError`].
pub type Result<T> = std::result::Result<T, ChainError>;

/// Failure conditions surfaced by the chain adapter and its backends.
#[derive(Debug, Error)]
pub enum ChainError {
    /// No wallet provider, or the provider exposes no accounts.
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The operation requires an active session.
    #[error("Wallet not connected")]
    NotConnected,

    /// Admin-only operation attempted by a non-admin session.
    #[error("Admin privileges required")]
    Unauthorized,

    /// The session balance cannot cover the required amount.
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Amount, required: Amount },

    /// Claims may only be filed against a policy the session owns.
    #[error("Address {owner} does not hold policy {policy_id}")]
    PolicyNotOwned { owner: String, policy_id: PolicyId },

    /// Claims must request a positive amount.
    #[error("Claim amount must be greater than zero")]
    ZeroClaimAmount,

    /// Claims may not request more than the policy's coverage.
    #[error("Requested amount {requested} exceeds policy coverage {coverage}")]
    ExceedsCoverage { requested: Amount, coverage: Amount },

    /// Admin draft failed validation (e.g. zero-day duration).
    #[error("Invalid policy draft: {0}")]
    InvalidPolicy(String),

    /// The external ledger reverted a settlement call.
    #[error("Transaction rejected by ledger: {0}")]
    TransactionRejected(String),

    /// JSON-RPC error object on a non-settlement call.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// HTTP-level transport failure.
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response did not match the expected JSON-RPC shape.
    #[error("Malformed RPC response: {0}")]
    Protocol(String),

    /// Store-level failure (not found, already owned, not pending, ...).
    #[error(transparent)]
    Store(#[from] covera_core::Error),
}

impl ChainError {
    /// Reinterpret an RPC error object as a ledger revert.
    ///
    /// Settlement calls route through this so reverts surface as
    /// [`ChainError::TransactionRejected`]; read calls keep the raw
    /// [`ChainError::Rpc`] form.
    pub(crate) fn into_rejected(self) -> Self {
        match self {
            Self::Rpc { code, message } => {
                Self::TransactionRejected(format!("{message} (code {code})"))
            }
            other => other,
        }
    }
}
