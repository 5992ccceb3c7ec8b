//! The chain adapter.
//!
//! Owns the single current-session user record and translates marketplace
//! intent into settlement plus store bookkeeping. Callers never see whether
//! an operation settled against an external ledger or locally; they get a
//! tagged result either way. Authorization, funds checks, and claim-amount
//! validation all happen here, before the store is touched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use covera_core::amount::Amount;
use covera_core::domain::{
    Address, Claim, ClaimId, ClaimVerdict, Policy, PolicyDraft, PolicyId, User, UserPolicy,
};
use covera_core::store::{MarketStats, Store};
use covera_core::Error as StoreError;

use crate::backend::Backend;
use crate::error::{ChainError, Result};
use crate::provider::{ProviderEvent, WalletProvider};

/// Outcome of a settled operation: the transaction reference, synthetic on
/// the mock path, ledger-provided otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub tx_ref: String,
}

/// Input for filing a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub policy_id: PolicyId,
    pub reason: String,
    pub description: String,
    pub requested_amount: Amount,
}

/// Session + settlement bridge over one wallet provider and one backend,
/// both fixed at construction time.
pub struct ChainAdapter {
    provider: Arc<dyn WalletProvider>,
    backend: Arc<dyn Backend>,
    store: Arc<Mutex<Store>>,
    session: Option<User>,
}

impl ChainAdapter {
    /// Build an adapter; no session exists until [`connect`](Self::connect).
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        backend: Arc<dyn Backend>,
        store: Arc<Mutex<Store>>,
    ) -> Self {
        Self {
            provider,
            backend,
            store,
            session: None,
        }
    }

    /// The current session user, if connected.
    pub const fn current_user(&self) -> Option<&User> {
        self.session.as_ref()
    }

    /// Whether a session is active.
    pub const fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn require_session(&self) -> Result<&User> {
        self.session.as_ref().ok_or(ChainError::NotConnected)
    }

    fn require_admin(&self) -> Result<&User> {
        let user = self.require_session()?;
        if !user.is_owner {
            return Err(ChainError::Unauthorized);
        }
        Ok(user)
    }

    // ---- Session lifecycle ----

    /// Establish a session from the wallet's active account.
    ///
    /// Admin privilege is determined by equality against the backend's owner
    /// address; failure to discover the owner degrades to a non-admin
    /// session rather than failing the connect.
    pub async fn connect(&mut self) -> Result<User> {
        let accounts = self
            .provider
            .request_accounts()
            .await
            .map_err(|e| ChainError::ProviderUnavailable(e.to_string()))?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::ProviderUnavailable("no accounts exposed".into()))?;

        let balance = self.provider.balance(&address).await?;
        let owner = match self.backend.owner_address().await {
            Ok(owner) => owner,
            Err(e) => {
                warn!(error = %e, "could not determine owner address");
                None
            }
        };
        let is_owner = owner.is_some_and(|o| o == address);

        let user = User {
            address,
            is_owner,
            balance,
        };
        self.store.lock().await.upsert_user(user.clone());
        info!(address = %user.address, is_owner, "wallet connected");
        self.session = Some(user.clone());
        Ok(user)
    }

    /// Clear the session. Idempotent.
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            info!("wallet disconnected");
        }
    }

    /// Re-read the session balance from the provider.
    pub async fn refresh_balance(&mut self) -> Result<Amount> {
        let address = self.require_session()?.address.clone();
        let balance = self.provider.balance(&address).await?;
        if let Some(session) = self.session.as_mut() {
            session.balance = balance;
            self.store.lock().await.upsert_user(session.clone());
        }
        Ok(balance)
    }

    /// React to a provider notification: any account or network change
    /// invalidates the session, requiring a fresh [`connect`](Self::connect).
    ///
    /// Returns whether a session was actually invalidated.
    pub fn handle_provider_event(&mut self, event: &ProviderEvent) -> bool {
        if self.session.is_none() {
            return false;
        }
        match event {
            ProviderEvent::AccountsChanged(_) => {
                info!("wallet accounts changed; session invalidated");
            }
            ProviderEvent::ChainChanged(chain_id) => {
                info!(chain_id, "wallet network changed; session invalidated");
            }
        }
        self.session = None;
        true
    }

    /// Flip the session's admin flag. Demonstration aid, mirrored into the
    /// store's user record.
    pub async fn toggle_admin_role(&mut self) -> Result<bool> {
        let session = self.session.as_mut().ok_or(ChainError::NotConnected)?;
        session.is_owner = !session.is_owner;
        let snapshot = session.clone();
        self.store.lock().await.upsert_user(snapshot.clone());
        info!(is_owner = snapshot.is_owner, "session role toggled");
        Ok(snapshot.is_owner)
    }

    // ---- Marketplace operations ----

    /// Purchase an active policy for the session account.
    pub async fn purchase(&mut self, policy_id: PolicyId) -> Result<TransactionResult> {
        let session = self.require_session()?.clone();

        let policy = {
            let store = self.store.lock().await;
            let policy = store
                .policy(policy_id)
                .filter(|p| p.active)
                .cloned()
                .ok_or(StoreError::PolicyNotFound(policy_id))?;
            // Repeat purchases are refused before any value moves.
            if store.owns(&session.address, policy_id) {
                return Err(StoreError::AlreadyOwned {
                    owner: session.address.to_string(),
                    policy_id,
                }
                .into());
            }
            policy
        };

        if session.balance < policy.premium {
            return Err(ChainError::InsufficientFunds {
                balance: session.balance,
                required: policy.premium,
            });
        }

        let tx_ref = self
            .backend
            .settle_purchase(&session.address, &policy)
            .await?;
        self.store
            .lock()
            .await
            .purchase_policy(&session.address, policy_id)?;

        self.debit_session(policy.premium).await;
        info!(policy_id, tx_ref = %tx_ref, "policy purchased");
        Ok(TransactionResult { tx_ref })
    }

    /// File a claim against a policy the session owns.
    ///
    /// This is the authoritative validation point for claim amounts: the
    /// request must be positive and within the owned policy's coverage, or
    /// the store is never touched.
    pub async fn submit_claim(
        &mut self,
        request: ClaimRequest,
    ) -> Result<(Claim, TransactionResult)> {
        let session = self.require_session()?.clone();

        let coverage = {
            let store = self.store.lock().await;
            store
                .owned_policy(&session.address, request.policy_id)
                .map(|owned| owned.policy.coverage_amount)
                .ok_or(ChainError::PolicyNotOwned {
                    owner: session.address.to_string(),
                    policy_id: request.policy_id,
                })?
        };
        if request.requested_amount.is_zero() {
            return Err(ChainError::ZeroClaimAmount);
        }
        if request.requested_amount > coverage {
            return Err(ChainError::ExceedsCoverage {
                requested: request.requested_amount,
                coverage,
            });
        }

        let tx_ref = self
            .backend
            .settle_claim_submission(
                &session.address,
                request.policy_id,
                &request.reason,
                &request.description,
                request.requested_amount,
            )
            .await?;
        let claim = self.store.lock().await.submit_claim(
            &session.address,
            request.policy_id,
            request.reason,
            request.description,
            request.requested_amount,
        );
        info!(claim_id = claim.id, tx_ref = %tx_ref, "claim submitted");
        Ok((claim, TransactionResult { tx_ref }))
    }

    /// Register a new policy. Admin only.
    pub async fn add_policy(&mut self, draft: PolicyDraft) -> Result<(Policy, TransactionResult)> {
        self.require_admin()?;
        if draft.duration_days == 0 {
            return Err(ChainError::InvalidPolicy(
                "duration must be at least one day".into(),
            ));
        }

        let tx_ref = self.backend.settle_policy_add(&draft).await?;
        let policy = self.store.lock().await.add_policy(draft);
        info!(policy_id = policy.id, tx_ref = %tx_ref, "policy added");
        Ok((policy, TransactionResult { tx_ref }))
    }

    /// Resolve a pending claim. Admin only; the Pending guard is checked
    /// before settlement so a stale verdict never moves value.
    pub async fn process_claim(
        &mut self,
        claim_id: ClaimId,
        verdict: ClaimVerdict,
        notes: &str,
    ) -> Result<(Claim, TransactionResult)> {
        let admin = self.require_admin()?.clone();

        let claim = {
            let store = self.store.lock().await;
            let claim = store
                .claim(claim_id)
                .cloned()
                .ok_or(StoreError::ClaimNotFound(claim_id))?;
            if !claim.status.is_pending() {
                return Err(StoreError::ClaimNotPending(claim_id).into());
            }
            claim
        };

        let tx_ref = self
            .backend
            .settle_claim_processing(&admin.address, &claim, verdict, notes)
            .await?;
        let processed = self
            .store
            .lock()
            .await
            .process_claim(claim_id, verdict, notes)?;

        if verdict == ClaimVerdict::Approved {
            // Payout leaves the acting admin's balance.
            self.debit_session(claim.requested_amount).await;
        }
        info!(claim_id, status = %processed.status, tx_ref = %tx_ref, "claim processed");
        Ok((processed, TransactionResult { tx_ref }))
    }

    // ---- Queries ----

    /// Active policies, refreshed from the ledger when it serves reads.
    pub async fn active_policies(&self) -> Result<Vec<Policy>> {
        if let Some(fetched) = self.backend.fetch_active_policies().await? {
            self.store.lock().await.replace_policies(fetched);
        }
        Ok(self.store.lock().await.active_policies())
    }

    /// Policies held by the session account.
    pub async fn user_policies(&self) -> Result<Vec<UserPolicy>> {
        let address = self.require_session()?.address.clone();
        Ok(self.store.lock().await.user_policies(&address))
    }

    /// Claims filed by the session account, merged with the ledger's view
    /// when it serves reads.
    pub async fn user_claims(&self) -> Result<Vec<Claim>> {
        let address = self.require_session()?.address.clone();
        if let Some(fetched) = self.backend.fetch_user_claims(&address).await? {
            self.store.lock().await.merge_claims(fetched);
        }
        Ok(self.store.lock().await.user_claims(&address))
    }

    /// All holdings grouped by owner. Admin only.
    pub async fn all_user_policies(&self) -> Result<Vec<(Address, Vec<UserPolicy>)>> {
        self.require_admin()?;
        Ok(self.store.lock().await.all_user_policies())
    }

    /// Every claim in the system. Admin only; the ledger's pending set is
    /// merged in first when it serves reads.
    pub async fn all_claims(&self) -> Result<Vec<Claim>> {
        self.require_admin()?;
        if let Some(fetched) = self.backend.fetch_pending_claims().await? {
            self.store.lock().await.merge_claims(fetched);
        }
        Ok(self.store.lock().await.all_claims())
    }

    /// Aggregate sales figures. Admin only.
    pub async fn stats(&self) -> Result<MarketStats> {
        self.require_admin()?;
        Ok(self.store.lock().await.stats())
    }

    // ---- Internals ----

    /// Decrease the session balance locally, then reconcile with the
    /// provider. The local debit keeps the session honest even when the
    /// provider re-read fails; the refresh wins when it succeeds.
    async fn debit_session(&mut self, amount: Amount) {
        if let Some(session) = self.session.as_mut() {
            session.balance = session.balance.saturating_sub(amount);
            let snapshot = session.clone();
            self.store.lock().await.upsert_user(snapshot);
        }
        if let Err(e) = self.refresh_balance().await {
            debug!(error = %e, "balance refresh after settlement failed");
        }
    }
}
