//! Error types for the Covera core library.

use thiserror::Error;

use crate::domain::{ClaimId, PolicyId};

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for store and domain operations.
///
/// Expected store-level failures (missing policy, repeat purchase, claim in
/// the wrong state) are values of this enum, never panics; authorization and
/// funds checks live one layer up in the chain adapter.
#[derive(Debug, Error)]
pub enum Error {
    /// A decimal amount string could not be parsed, or arithmetic overflowed.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// No active policy with the given id.
    #[error("No active policy with id {0}")]
    PolicyNotFound(PolicyId),

    /// No claim with the given id.
    #[error("No claim with id {0}")]
    ClaimNotFound(ClaimId),

    /// The (owner, policy) pair already exists; repeat purchases are rejected.
    #[error("Address {owner} already holds policy {policy_id}")]
    AlreadyOwned { owner: String, policy_id: PolicyId },

    /// The claim has already been processed; only Pending claims transition.
    #[error("Claim {0} is not pending")]
    ClaimNotPending(ClaimId),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
