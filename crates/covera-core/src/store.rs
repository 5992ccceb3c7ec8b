//! The marketplace data store.
//!
//! Authoritative in-memory bookkeeping for one running session: the policy
//! catalog, per-owner policy holdings, claims, and known users. The store is
//! explicitly constructed and injected into the chain adapter; it holds no
//! global state and nothing here survives process exit.
//!
//! Expected failures (missing policy, repeat purchase, claim not pending)
//! come back as [`Error`] values. Authorization and funds checks belong to
//! the adapter layer above.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amount::Amount;
use crate::domain::{
    now_ms, Address, Claim, ClaimId, ClaimStatus, ClaimVerdict, Policy, PolicyDraft, PolicyId,
    User, UserPolicy, MS_PER_DAY,
};
use crate::error::{Error, Result};

/// Aggregate marketplace figures for the admin view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Total policies ever sold (across all owners).
    pub policies_sold: usize,
    /// Sum of premiums paid for those policies.
    pub premium_collected: Amount,
}

/// In-memory table set for policies, holdings, claims, and users.
///
/// Ids come from monotonic counters owned by the store, so they stay unique
/// even if records are ever removed or replaced by a ledger sync.
#[derive(Debug)]
pub struct Store {
    policies: Vec<Policy>,
    user_policies: HashMap<Address, Vec<UserPolicy>>,
    claims: Vec<Claim>,
    users: HashMap<Address, User>,
    next_policy_id: PolicyId,
    next_claim_id: ClaimId,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            policies: Vec::new(),
            user_policies: HashMap::new(),
            claims: Vec::new(),
            users: HashMap::new(),
            next_policy_id: 1,
            next_claim_id: 1,
        }
    }

    /// Create a store seeded with the demo policy catalog.
    pub fn with_sample_data() -> Self {
        let mut store = Self::new();
        let now = now_ms();
        let samples = [
            (
                "Basic Health Insurance",
                "Comprehensive health coverage for individuals and families",
                "0.1",
                "5.0",
                30,
            ),
            (
                "Auto Insurance Premium",
                "Complete vehicle protection with collision and comprehensive coverage",
                "0.15",
                "10.0",
                20,
            ),
            (
                "Home Protection Plan",
                "Property insurance covering fire, theft, and natural disasters",
                "0.2",
                "15.0",
                10,
            ),
        ];
        for (name, description, premium, coverage, age_days) in samples {
            let id = store.next_policy_id;
            store.next_policy_id += 1;
            store.policies.push(Policy {
                id,
                name: name.to_string(),
                description: description.to_string(),
                premium: Amount::parse(premium).unwrap_or(Amount::ZERO),
                coverage_amount: Amount::parse(coverage).unwrap_or(Amount::ZERO),
                duration_days: 365,
                active: true,
                created_at: now.saturating_sub(age_days * MS_PER_DAY),
            });
        }
        store
    }

    // ---- Policy catalog ----

    /// Active policies in insertion order.
    pub fn active_policies(&self) -> Vec<Policy> {
        self.policies.iter().filter(|p| p.active).cloned().collect()
    }

    /// Look up a policy by id, active or not.
    pub fn policy(&self, id: PolicyId) -> Option<&Policy> {
        self.policies.iter().find(|p| p.id == id)
    }

    /// Add a policy from an admin draft; assigns the id and creation time.
    pub fn add_policy(&mut self, draft: PolicyDraft) -> Policy {
        let id = self.next_policy_id;
        self.next_policy_id += 1;
        let policy = Policy {
            id,
            name: draft.name,
            description: draft.description,
            premium: draft.premium,
            coverage_amount: draft.coverage_amount,
            duration_days: draft.duration_days,
            active: draft.active,
            created_at: now_ms(),
        };
        self.policies.push(policy.clone());
        debug!(policy_id = id, name = %policy.name, "policy added");
        policy
    }

    /// Replace the policy catalog with a list fetched from the ledger.
    ///
    /// The id counter is re-anchored above the incoming maximum so locally
    /// added policies never collide.
    pub fn replace_policies(&mut self, policies: Vec<Policy>) {
        let max_id = policies.iter().map(|p| p.id).max().unwrap_or(0);
        self.next_policy_id = self.next_policy_id.max(max_id + 1);
        self.policies = policies;
    }

    // ---- Holdings ----

    /// Whether `owner` already holds `policy_id`.
    pub fn owns(&self, owner: &Address, policy_id: PolicyId) -> bool {
        self.user_policies
            .get(owner)
            .is_some_and(|held| held.iter().any(|up| up.policy.id == policy_id))
    }

    /// The owned instance of `policy_id`, if any.
    pub fn owned_policy(&self, owner: &Address, policy_id: PolicyId) -> Option<&UserPolicy> {
        self.user_policies
            .get(owner)?
            .iter()
            .find(|up| up.policy.id == policy_id)
    }

    /// Record a purchase: the (owner, policy) pair may occur at most once.
    ///
    /// Fails with [`Error::PolicyNotFound`] when no active policy matches and
    /// [`Error::AlreadyOwned`] on a repeat purchase. Expiry is stamped as
    /// `purchased_at + duration_days` in milliseconds.
    pub fn purchase_policy(&mut self, owner: &Address, policy_id: PolicyId) -> Result<UserPolicy> {
        let policy = self
            .policies
            .iter()
            .find(|p| p.id == policy_id && p.active)
            .cloned()
            .ok_or(Error::PolicyNotFound(policy_id))?;

        let held = self.user_policies.entry(owner.clone()).or_default();
        if held.iter().any(|up| up.policy.id == policy_id) {
            return Err(Error::AlreadyOwned {
                owner: owner.to_string(),
                policy_id,
            });
        }

        let purchased_at = now_ms();
        let expires_at = purchased_at + u64::from(policy.duration_days) * MS_PER_DAY;
        let record = UserPolicy {
            policy,
            owner: owner.clone(),
            purchased_at,
            expires_at,
        };
        held.push(record.clone());
        debug!(%owner, policy_id, expires_at, "policy purchased");
        Ok(record)
    }

    /// Policies held by one owner.
    pub fn user_policies(&self, owner: &Address) -> Vec<UserPolicy> {
        self.user_policies.get(owner).cloned().unwrap_or_default()
    }

    /// All holdings grouped by owner, address-sorted for stable output.
    pub fn all_user_policies(&self) -> Vec<(Address, Vec<UserPolicy>)> {
        let mut grouped: Vec<_> = self
            .user_policies
            .iter()
            .filter(|(_, held)| !held.is_empty())
            .map(|(owner, held)| (owner.clone(), held.clone()))
            .collect();
        grouped.sort_by(|a, b| a.0.cmp(&b.0));
        grouped
    }

    // ---- Claims ----

    /// Record a new claim in the Pending state.
    ///
    /// Amount and ownership validation happens in the adapter before this is
    /// called; the store itself only assigns the id and timestamps.
    pub fn submit_claim(
        &mut self,
        claimant: &Address,
        policy_id: PolicyId,
        reason: impl Into<String>,
        description: impl Into<String>,
        requested_amount: Amount,
    ) -> Claim {
        let id = self.next_claim_id;
        self.next_claim_id += 1;
        let claim = Claim {
            id,
            policy_id,
            claimant: claimant.clone(),
            reason: reason.into(),
            description: description.into(),
            requested_amount,
            status: ClaimStatus::Pending,
            submitted_at: now_ms(),
            processed_at: None,
            admin_notes: None,
        };
        self.claims.push(claim.clone());
        debug!(claim_id = id, %claimant, policy_id, "claim submitted");
        claim
    }

    /// Look up a claim by id.
    pub fn claim(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.iter().find(|c| c.id == id)
    }

    /// Resolve a pending claim. The only state transition in the system:
    /// Pending moves to Approved or Rejected exactly once.
    ///
    /// Fails with [`Error::ClaimNotFound`] or [`Error::ClaimNotPending`] and
    /// leaves the claim untouched in either case.
    pub fn process_claim(
        &mut self,
        claim_id: ClaimId,
        verdict: ClaimVerdict,
        notes: impl Into<String>,
    ) -> Result<Claim> {
        let claim = self
            .claims
            .iter_mut()
            .find(|c| c.id == claim_id)
            .ok_or(Error::ClaimNotFound(claim_id))?;
        if !claim.status.is_pending() {
            return Err(Error::ClaimNotPending(claim_id));
        }
        claim.status = verdict.into();
        claim.processed_at = Some(now_ms());
        claim.admin_notes = Some(notes.into());
        debug!(claim_id, status = %claim.status, "claim processed");
        Ok(claim.clone())
    }

    /// Claims submitted by one address.
    pub fn user_claims(&self, claimant: &Address) -> Vec<Claim> {
        self.claims
            .iter()
            .filter(|c| &c.claimant == claimant)
            .cloned()
            .collect()
    }

    /// Every claim, in submission order.
    pub fn all_claims(&self) -> Vec<Claim> {
        self.claims.clone()
    }

    /// Claims still awaiting a verdict.
    pub fn pending_claims(&self) -> Vec<Claim> {
        self.claims
            .iter()
            .filter(|c| c.status.is_pending())
            .cloned()
            .collect()
    }

    /// Upsert claims fetched from the ledger, keyed by id.
    ///
    /// Ledger reads are partial views (pending claims, one user's claims), so
    /// this merges rather than replaces; the id counter is re-anchored above
    /// the incoming maximum.
    pub fn merge_claims(&mut self, incoming: Vec<Claim>) {
        for claim in incoming {
            self.next_claim_id = self.next_claim_id.max(claim.id + 1);
            if let Some(existing) = self.claims.iter_mut().find(|c| c.id == claim.id) {
                *existing = claim;
            } else {
                self.claims.push(claim);
            }
        }
    }

    // ---- Users ----

    /// Insert or update the record for a wallet address.
    pub fn upsert_user(&mut self, user: User) {
        self.users.insert(user.address.clone(), user);
    }

    /// Look up a user by address.
    pub fn user(&self, address: &Address) -> Option<&User> {
        self.users.get(address)
    }

    // ---- Statistics ----

    /// Aggregate sales figures across all owners.
    pub fn stats(&self) -> MarketStats {
        let mut policies_sold = 0;
        let mut premium_collected = Amount::ZERO;
        for held in self.user_policies.values() {
            policies_sold += held.len();
            for up in held {
                premium_collected = premium_collected.saturating_add(up.policy.premium);
            }
        }
        MarketStats {
            policies_sold,
            premium_collected,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(name: &str, premium: &str, coverage: &str, duration_days: u32) -> PolicyDraft {
        PolicyDraft {
            name: name.to_string(),
            description: format!("{name} description"),
            premium: Amount::parse(premium).unwrap(),
            coverage_amount: Amount::parse(coverage).unwrap(),
            duration_days,
            active: true,
        }
    }

    #[test]
    fn add_policy_assigns_strictly_increasing_ids() {
        let mut store = Store::new();
        let a = store.add_policy(draft("A", "0.1", "5.0", 365));
        let b = store.add_policy(draft("B", "0.2", "10.0", 30));
        assert!(b.id > a.id);
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn add_policy_preserves_active_flag() {
        let mut store = Store::new();
        let mut inactive = draft("A", "0.1", "5.0", 365);
        inactive.active = false;
        let added = store.add_policy(inactive);
        assert!(!added.active);
        assert!(store.active_policies().is_empty());
        assert!(store.policy(added.id).is_some());
    }

    #[test]
    fn active_policies_keep_insertion_order() {
        let mut store = Store::new();
        store.add_policy(draft("A", "0.1", "5.0", 365));
        store.add_policy(draft("B", "0.2", "10.0", 30));
        let names: Vec<_> = store.active_policies().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn purchase_sets_expiry_from_duration() {
        let mut store = Store::new();
        let policy = store.add_policy(draft("Basic", "0.1", "5.0", 365));
        let owner = Address::new("0xaaa");
        let owned = store.purchase_policy(&owner, policy.id).unwrap();
        assert_eq!(owned.expires_at - owned.purchased_at, 365 * MS_PER_DAY);
        assert_eq!(store.user_policies(&owner).len(), 1);
    }

    #[test]
    fn repeat_purchase_fails_and_stores_one_record() {
        let mut store = Store::new();
        let policy = store.add_policy(draft("Basic", "0.1", "5.0", 365));
        let owner = Address::new("0xaaa");
        store.purchase_policy(&owner, policy.id).unwrap();
        let err = store.purchase_policy(&owner, policy.id).unwrap_err();
        assert!(matches!(err, Error::AlreadyOwned { .. }));
        assert_eq!(store.user_policies(&owner).len(), 1);
    }

    #[test]
    fn purchase_of_unknown_or_inactive_policy_fails() {
        let mut store = Store::new();
        let owner = Address::new("0xaaa");
        assert!(matches!(
            store.purchase_policy(&owner, 99),
            Err(Error::PolicyNotFound(99))
        ));

        let mut inactive = draft("A", "0.1", "5.0", 365);
        inactive.active = false;
        let added = store.add_policy(inactive);
        assert!(matches!(
            store.purchase_policy(&owner, added.id),
            Err(Error::PolicyNotFound(_))
        ));
    }

    #[test]
    fn claims_transition_pending_to_terminal_exactly_once() {
        let mut store = Store::new();
        let claimant = Address::new("0xaaa");
        let claim = store.submit_claim(&claimant, 1, "Medical", "ER visit", Amount::parse("2.5").unwrap());
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.id, 1);

        let processed = store
            .process_claim(claim.id, ClaimVerdict::Approved, "ok")
            .unwrap();
        assert_eq!(processed.status, ClaimStatus::Approved);
        assert_eq!(processed.admin_notes.as_deref(), Some("ok"));
        assert!(processed.processed_at.is_some());

        let err = store
            .process_claim(claim.id, ClaimVerdict::Rejected, "again")
            .unwrap_err();
        assert!(matches!(err, Error::ClaimNotPending(_)));
        // the claim is unchanged
        let stored = store.claim(claim.id).unwrap();
        assert_eq!(stored.status, ClaimStatus::Approved);
        assert_eq!(stored.admin_notes.as_deref(), Some("ok"));
    }

    #[test]
    fn processing_a_missing_claim_fails() {
        let mut store = Store::new();
        assert!(matches!(
            store.process_claim(7, ClaimVerdict::Approved, ""),
            Err(Error::ClaimNotFound(7))
        ));
    }

    #[test]
    fn claim_queries_filter_by_claimant() {
        let mut store = Store::new();
        let a = Address::new("0xaaa");
        let b = Address::new("0xbbb");
        store.submit_claim(&a, 1, "r", "d", Amount::ZERO);
        store.submit_claim(&b, 1, "r", "d", Amount::ZERO);
        store.submit_claim(&a, 2, "r", "d", Amount::ZERO);
        assert_eq!(store.user_claims(&a).len(), 2);
        assert_eq!(store.user_claims(&b).len(), 1);
        assert_eq!(store.all_claims().len(), 3);
        assert_eq!(store.pending_claims().len(), 3);
    }

    #[test]
    fn merge_claims_upserts_and_reanchors_ids() {
        let mut store = Store::new();
        let a = Address::new("0xaaa");
        let local = store.submit_claim(&a, 1, "r", "d", Amount::ZERO);

        let mut fetched = local.clone();
        fetched.status = ClaimStatus::Approved;
        let remote_new = Claim { id: 9, ..local.clone() };
        store.merge_claims(vec![fetched, remote_new]);

        assert_eq!(store.claim(local.id).unwrap().status, ClaimStatus::Approved);
        assert!(store.claim(9).is_some());
        // next local claim id lands above the merged maximum
        let next = store.submit_claim(&a, 3, "r3", "d3", Amount::ZERO);
        assert_eq!(next.id, 10);
    }

    #[test]
    fn stats_count_sales_and_premiums() {
        let mut store = Store::new();
        let p1 = store.add_policy(draft("A", "0.1", "5.0", 365));
        let p2 = store.add_policy(draft("B", "0.2", "10.0", 30));
        let a = Address::new("0xaaa");
        let b = Address::new("0xbbb");
        store.purchase_policy(&a, p1.id).unwrap();
        store.purchase_policy(&b, p1.id).unwrap();
        store.purchase_policy(&b, p2.id).unwrap();

        let stats = store.stats();
        assert_eq!(stats.policies_sold, 3);
        assert_eq!(stats.premium_collected, Amount::parse("0.4").unwrap());
    }

    #[test]
    fn sample_data_seeds_three_active_policies() {
        let store = Store::with_sample_data();
        let listed = store.active_policies();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|p| p.active));
        // counter continues past the seeds
        let mut store = store;
        let added = store.add_policy(draft("New", "0.1", "1.0", 30));
        assert_eq!(added.id, 4);
    }

    #[test]
    fn all_user_policies_groups_by_owner_sorted() {
        let mut store = Store::new();
        let p = store.add_policy(draft("A", "0.1", "5.0", 365));
        let b = Address::new("0xbbb");
        let a = Address::new("0xaaa");
        store.purchase_policy(&b, p.id).unwrap();
        store.purchase_policy(&a, p.id).unwrap();
        let grouped = store.all_user_policies();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, a);
        assert_eq!(grouped[1].0, b);
    }
}
