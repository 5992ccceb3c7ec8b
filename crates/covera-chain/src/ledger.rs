//! Ledger boundary.
//!
//! The external ledger exposes a contract-shaped capability set; this client
//! maps it 1:1 onto namespaced JSON-RPC methods (`cover_*`). Settlement
//! calls return a transaction reference; reverts arrive as JSON-RPC error
//! objects and surface as [`ChainError::TransactionRejected`].

use serde_json::json;

use covera_core::amount::Amount;
use covera_core::domain::{Address, Claim, ClaimId, ClaimVerdict, Policy, PolicyDraft, PolicyId};

use crate::error::Result;
use crate::rpc::RpcClient;

/// Ledger-side claim status codes: 0 Pending, 1 Approved, 2 Rejected.
const fn verdict_code(verdict: ClaimVerdict) -> u8 {
    match verdict {
        ClaimVerdict::Approved => 1,
        ClaimVerdict::Rejected => 2,
    }
}

/// JSON-RPC client for the ledger's contract surface.
#[derive(Debug)]
pub struct RpcLedger {
    rpc: RpcClient,
}

impl RpcLedger {
    /// Wrap an [`RpcClient`] pointing at a ledger node.
    pub const fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    /// The privileged owner address of the deployed marketplace.
    pub async fn owner(&self) -> Result<Address> {
        let raw: String = self.rpc.call("cover_owner", json!([])).await?;
        Ok(Address::new(raw))
    }

    /// Register a new policy; admin-only on the ledger side.
    pub async fn add_policy(&self, draft: &PolicyDraft) -> Result<String> {
        self.rpc
            .call(
                "cover_addPolicy",
                json!([
                    draft.name,
                    draft.description,
                    draft.premium,
                    draft.coverage_amount,
                    draft.duration_days,
                ]),
            )
            .await
            .map_err(crate::error::ChainError::into_rejected)
    }

    /// Purchase `policy_id`, attaching the premium as the transfer value.
    pub async fn buy_policy(&self, policy_id: PolicyId, value: Amount) -> Result<String> {
        self.rpc
            .call("cover_buyPolicy", json!([policy_id, value]))
            .await
            .map_err(crate::error::ChainError::into_rejected)
    }

    /// File a claim against an owned policy.
    pub async fn submit_claim(
        &self,
        policy_id: PolicyId,
        reason: &str,
        description: &str,
        requested_amount: Amount,
    ) -> Result<String> {
        self.rpc
            .call(
                "cover_submitClaim",
                json!([policy_id, reason, description, requested_amount]),
            )
            .await
            .map_err(crate::error::ChainError::into_rejected)
    }

    /// Resolve a pending claim; admin-only on the ledger side.
    pub async fn process_claim(
        &self,
        claim_id: ClaimId,
        verdict: ClaimVerdict,
        notes: &str,
    ) -> Result<String> {
        self.rpc
            .call(
                "cover_processClaim",
                json!([claim_id, verdict_code(verdict), notes]),
            )
            .await
            .map_err(crate::error::ChainError::into_rejected)
    }

    /// All currently active policies.
    pub async fn get_all_active_policies(&self) -> Result<Vec<Policy>> {
        self.rpc.call("cover_getAllActivePolicies", json!([])).await
    }

    /// Claims submitted by `user`.
    pub async fn get_user_claims(&self, user: &Address) -> Result<Vec<Claim>> {
        self.rpc
            .call("cover_getUserClaims", json!([user.as_str()]))
            .await
    }

    /// Claims still awaiting a verdict.
    pub async fn get_all_pending_claims(&self) -> Result<Vec<Claim>> {
        self.rpc.call("cover_getAllPendingClaims", json!([])).await
    }
}
