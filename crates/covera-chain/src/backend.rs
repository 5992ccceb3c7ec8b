//! Settlement backends.
//!
//! One backend is selected when the adapter is built and used for the whole
//! session; there is no per-call mock-vs-ledger branching. The backend owns
//! settlement (where value moves and transaction references come from) and
//! admin-identity discovery. Reads the ledger can serve come back as
//! `Some(..)` from the `fetch_*` methods; `None` means the local store is
//! authoritative.

use std::sync::Arc;

use async_trait::async_trait;

use covera_core::amount::Amount;
use covera_core::domain::{Address, Claim, ClaimVerdict, Policy, PolicyDraft, PolicyId};

use crate::error::Result;
use crate::ledger::RpcLedger;
use crate::provider::DevProvider;

/// A synthetic transaction reference for locally settled operations.
fn synthetic_tx_ref() -> String {
    format!("0x{}", hex::encode(uuid::Uuid::new_v4().as_bytes()))
}

/// Settlement and admin-discovery capability behind the adapter.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The privileged owner address, when one is known.
    async fn owner_address(&self) -> Result<Option<Address>>;

    /// Settle a policy purchase; value moves from `buyer`.
    async fn settle_purchase(&self, buyer: &Address, policy: &Policy) -> Result<String>;

    /// Settle a claim submission (no value moves).
    async fn settle_claim_submission(
        &self,
        claimant: &Address,
        policy_id: PolicyId,
        reason: &str,
        description: &str,
        requested_amount: Amount,
    ) -> Result<String>;

    /// Settle an admin policy registration.
    async fn settle_policy_add(&self, draft: &PolicyDraft) -> Result<String>;

    /// Settle a claim verdict; on approval the payout moves from `admin`.
    async fn settle_claim_processing(
        &self,
        admin: &Address,
        claim: &Claim,
        verdict: ClaimVerdict,
        notes: &str,
    ) -> Result<String>;

    /// Active policies as the ledger sees them; `None` on the mock path.
    async fn fetch_active_policies(&self) -> Result<Option<Vec<Policy>>>;

    /// One user's claims as the ledger sees them; `None` on the mock path.
    async fn fetch_user_claims(&self, claimant: &Address) -> Result<Option<Vec<Claim>>>;

    /// Pending claims as the ledger sees them; `None` on the mock path.
    async fn fetch_pending_claims(&self) -> Result<Option<Vec<Claim>>>;
}

/// Local settlement against the in-process dev wallet.
///
/// Debits write through to the [`DevProvider`] so that balance re-queries
/// agree with what settlements consumed.
pub struct MockBackend {
    wallet: Arc<DevProvider>,
    owner: Option<Address>,
}

impl MockBackend {
    /// Build a mock backend; `owner` designates the admin identity.
    pub const fn new(wallet: Arc<DevProvider>, owner: Option<Address>) -> Self {
        Self { wallet, owner }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn owner_address(&self) -> Result<Option<Address>> {
        Ok(self.owner.clone())
    }

    async fn settle_purchase(&self, buyer: &Address, policy: &Policy) -> Result<String> {
        self.wallet.debit(buyer, policy.premium).await?;
        Ok(synthetic_tx_ref())
    }

    async fn settle_claim_submission(
        &self,
        _claimant: &Address,
        _policy_id: PolicyId,
        _reason: &str,
        _description: &str,
        _requested_amount: Amount,
    ) -> Result<String> {
        Ok(synthetic_tx_ref())
    }

    async fn settle_policy_add(&self, _draft: &PolicyDraft) -> Result<String> {
        Ok(synthetic_tx_ref())
    }

    async fn settle_claim_processing(
        &self,
        admin: &Address,
        claim: &Claim,
        verdict: ClaimVerdict,
        _notes: &str,
    ) -> Result<String> {
        if verdict == ClaimVerdict::Approved {
            // Payout: funds leave the admin and reach the claimant.
            self.wallet.debit(admin, claim.requested_amount).await?;
            self.wallet.credit(&claim.claimant, claim.requested_amount).await;
        }
        Ok(synthetic_tx_ref())
    }

    async fn fetch_active_policies(&self) -> Result<Option<Vec<Policy>>> {
        Ok(None)
    }

    async fn fetch_user_claims(&self, _claimant: &Address) -> Result<Option<Vec<Claim>>> {
        Ok(None)
    }

    async fn fetch_pending_claims(&self) -> Result<Option<Vec<Claim>>> {
        Ok(None)
    }
}

/// Settlement against an external ledger node.
pub struct LedgerBackend {
    ledger: RpcLedger,
    /// Config override; when unset the ledger's `owner` is authoritative.
    owner_override: Option<Address>,
}

impl LedgerBackend {
    /// Build a ledger backend over an [`RpcLedger`] client.
    pub const fn new(ledger: RpcLedger, owner_override: Option<Address>) -> Self {
        Self {
            ledger,
            owner_override,
        }
    }
}

#[async_trait]
impl Backend for LedgerBackend {
    async fn owner_address(&self) -> Result<Option<Address>> {
        if let Some(owner) = &self.owner_override {
            return Ok(Some(owner.clone()));
        }
        self.ledger.owner().await.map(Some)
    }

    async fn settle_purchase(&self, _buyer: &Address, policy: &Policy) -> Result<String> {
        self.ledger.buy_policy(policy.id, policy.premium).await
    }

    async fn settle_claim_submission(
        &self,
        _claimant: &Address,
        policy_id: PolicyId,
        reason: &str,
        description: &str,
        requested_amount: Amount,
    ) -> Result<String> {
        self.ledger
            .submit_claim(policy_id, reason, description, requested_amount)
            .await
    }

    async fn settle_policy_add(&self, draft: &PolicyDraft) -> Result<String> {
        self.ledger.add_policy(draft).await
    }

    async fn settle_claim_processing(
        &self,
        _admin: &Address,
        claim: &Claim,
        verdict: ClaimVerdict,
        notes: &str,
    ) -> Result<String> {
        self.ledger.process_claim(claim.id, verdict, notes).await
    }

    async fn fetch_active_policies(&self) -> Result<Option<Vec<Policy>>> {
        self.ledger.get_all_active_policies().await.map(Some)
    }

    async fn fetch_user_claims(&self, claimant: &Address) -> Result<Option<Vec<Claim>>> {
        self.ledger.get_user_claims(claimant).await.map(Some)
    }

    async fn fetch_pending_claims(&self) -> Result<Option<Vec<Claim>>> {
        self.ledger.get_all_pending_claims().await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_refs_are_well_formed_and_unique() {
        let a = synthetic_tx_ref();
        let b = synthetic_tx_ref();
        assert!(a.starts_with("0x"));
        assert_eq!(a.len(), 2 + 32);
        assert_ne!(a, b);
    }
}
