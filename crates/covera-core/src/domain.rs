//! Domain records for the policy marketplace.
//!
//! Plain data, no behavior beyond derived lookups: policies are product
//! templates, a [`UserPolicy`] is an owned instance with a purchase/expiry
//! window, a [`Claim`] is a payout request against an owned policy, and a
//! [`User`] is the wallet identity for one session.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Policy identifier, assigned by the store's monotonic counter.
pub type PolicyId = u64;

/// Claim identifier, assigned by the store's monotonic counter.
pub type ClaimId = u64;

/// Milliseconds per day; policy durations are whole days.
pub const MS_PER_DAY: u64 = 86_400_000;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// A wallet address, normalized to lowercase.
///
/// Addresses are the identity key for users and owners; providers report
/// them in mixed case, so normalization happens at construction and every
/// comparison is case-insensitive for free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Construct a normalized address.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_lowercase())
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An insurance product template offered for purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique id, assigned by the store.
    pub id: PolicyId,
    pub name: String,
    pub description: String,
    /// One-time purchase price.
    pub premium: Amount,
    /// Maximum total payout a claim may request.
    pub coverage_amount: Amount,
    /// Ownership window length in days (>= 1).
    pub duration_days: u32,
    /// Inactive policies are hidden from listings and cannot be purchased.
    pub active: bool,
    /// Creation timestamp, epoch millis.
    pub created_at: u64,
}

/// Admin input for a new policy; the store assigns id and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDraft {
    pub name: String,
    pub description: String,
    pub premium: Amount,
    pub coverage_amount: Amount,
    pub duration_days: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// An owned instance of a policy.
///
/// Immutable once created. "Expired" is derived from the clock at read time,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPolicy {
    #[serde(flatten)]
    pub policy: Policy,
    pub owner: Address,
    /// Purchase timestamp, epoch millis.
    pub purchased_at: u64,
    /// `purchased_at + duration_days * MS_PER_DAY`.
    pub expires_at: u64,
}

impl UserPolicy {
    /// Whether the ownership window has lapsed at `now` (epoch millis).
    pub const fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Claim lifecycle state. Pending is initial; Approved and Rejected are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    /// Whether the claim can still transition.
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Approved => f.write_str("Approved"),
            Self::Rejected => f.write_str("Rejected"),
        }
    }
}

/// An admin decision on a pending claim.
///
/// Separate from [`ClaimStatus`] so the only expressible transition is
/// Pending to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimVerdict {
    Approved,
    Rejected,
}

impl From<ClaimVerdict> for ClaimStatus {
    fn from(verdict: ClaimVerdict) -> Self {
        match verdict {
            ClaimVerdict::Approved => Self::Approved,
            ClaimVerdict::Rejected => Self::Rejected,
        }
    }
}

/// A payout request against an owned policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub policy_id: PolicyId,
    pub claimant: Address,
    pub reason: String,
    pub description: String,
    pub requested_amount: Amount,
    pub status: ClaimStatus,
    /// Submission timestamp, epoch millis.
    pub submitted_at: u64,
    /// Set exactly once, when an admin processes the claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

/// The wallet identity for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub address: Address,
    /// Admin privilege: may add policies and resolve claims.
    pub is_owner: bool,
    pub balance: Amount,
}
