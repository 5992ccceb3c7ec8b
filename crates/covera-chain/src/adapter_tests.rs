//! Tests for the chain adapter: session lifecycle, authorization, funds and
//! claim validation, and the mock settlement path end to end.

use std::sync::Arc;

use tokio::sync::Mutex;

use covera_core::amount::Amount;
use covera_core::domain::{Address, ClaimStatus, ClaimVerdict, PolicyDraft, MS_PER_DAY};
use covera_core::store::Store;
use covera_core::Error as StoreError;

use crate::adapter::{ChainAdapter, ClaimRequest};
use crate::backend::MockBackend;
use crate::error::ChainError;
use crate::provider::{DevProvider, ProviderEvent, WalletProvider};

fn amount(s: &str) -> Amount {
    Amount::parse(s).unwrap()
}

fn alice() -> Address {
    Address::new("0x00a1")
}

fn admin() -> Address {
    Address::new("0x00ad")
}

/// Shared fixtures: one dev wallet, one seeded store, one designated admin.
struct Fixture {
    wallet: Arc<DevProvider>,
    store: Arc<Mutex<Store>>,
}

impl Fixture {
    async fn new() -> Self {
        let wallet = Arc::new(DevProvider::new(1));
        wallet.fund(alice(), amount("1.5")).await;
        Self {
            wallet,
            store: Arc::new(Mutex::new(Store::with_sample_data())),
        }
    }

    /// An adapter whose wallet exposes `address` as the active account.
    ///
    /// Each identity gets its own dev wallet; the store and the admin
    /// designation are shared across sessions.
    async fn adapter_as(&self, address: &Address, balance: &str) -> ChainAdapter {
        let wallet = Arc::new(DevProvider::new(1));
        wallet.fund(address.clone(), amount(balance)).await;
        let provider: Arc<dyn WalletProvider> = wallet.clone();
        let backend = Arc::new(MockBackend::new(wallet, Some(admin())));
        ChainAdapter::new(provider, backend, Arc::clone(&self.store))
    }

    /// An adapter over the fixture's shared wallet (alice's account).
    fn adapter(&self) -> ChainAdapter {
        let provider: Arc<dyn WalletProvider> = self.wallet.clone();
        let backend = Arc::new(MockBackend::new(Arc::clone(&self.wallet), Some(admin())));
        ChainAdapter::new(provider, backend, Arc::clone(&self.store))
    }
}

#[tokio::test]
async fn connect_fails_without_exposed_accounts() {
    let wallet = Arc::new(DevProvider::new(1));
    let provider: Arc<dyn WalletProvider> = wallet.clone();
    let backend = Arc::new(MockBackend::new(wallet, None));
    let store = Arc::new(Mutex::new(Store::new()));
    let mut adapter = ChainAdapter::new(provider, backend, store);

    let err = adapter.connect().await.unwrap_err();
    assert!(matches!(err, ChainError::ProviderUnavailable(_)));
    assert!(!adapter.is_connected());
}

#[tokio::test]
async fn connect_detects_admin_by_owner_equality() {
    let fixture = Fixture::new().await;

    let mut user_session = fixture.adapter();
    let user = user_session.connect().await.unwrap();
    assert_eq!(user.address, alice());
    assert!(!user.is_owner);
    assert_eq!(user.balance, amount("1.5"));

    let mut admin_session = fixture.adapter_as(&admin(), "10").await;
    let user = admin_session.connect().await.unwrap();
    assert!(user.is_owner);
}

#[tokio::test]
async fn refresh_balance_requires_a_session() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    assert!(matches!(
        adapter.refresh_balance().await,
        Err(ChainError::NotConnected)
    ));
}

#[tokio::test]
async fn purchase_decrements_session_and_wallet_balances() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    adapter.connect().await.unwrap();

    let result = adapter.purchase(1).await.unwrap();
    assert!(result.tx_ref.starts_with("0x"));

    // Policy 1 in the sample catalog costs 0.1
    let session = adapter.current_user().unwrap();
    assert_eq!(session.balance, amount("1.4"));
    assert_eq!(fixture.wallet.balance(&alice()).await.unwrap(), amount("1.4"));

    let held = adapter.user_policies().await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].expires_at - held[0].purchased_at, 365 * MS_PER_DAY);
}

#[tokio::test]
async fn purchase_with_insufficient_funds_moves_nothing() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter_as(&Address::new("0x00b2"), "0.05").await;
    adapter.connect().await.unwrap();

    let err = adapter.purchase(1).await.unwrap_err();
    assert!(matches!(err, ChainError::InsufficientFunds { .. }));
    assert!(adapter.user_policies().await.unwrap().is_empty());
}

#[tokio::test]
async fn repeat_purchase_is_refused_before_settlement() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    adapter.connect().await.unwrap();

    adapter.purchase(1).await.unwrap();
    let balance_after_first = adapter.current_user().unwrap().balance;

    let err = adapter.purchase(1).await.unwrap_err();
    assert!(matches!(
        err,
        ChainError::Store(StoreError::AlreadyOwned { .. })
    ));
    // no second debit, exactly one holding
    assert_eq!(adapter.current_user().unwrap().balance, balance_after_first);
    assert_eq!(adapter.user_policies().await.unwrap().len(), 1);
}

#[tokio::test]
async fn purchase_of_unknown_policy_is_not_found() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    adapter.connect().await.unwrap();

    let err = adapter.purchase(99).await.unwrap_err();
    assert!(matches!(
        err,
        ChainError::Store(StoreError::PolicyNotFound(99))
    ));
}

#[tokio::test]
async fn claims_require_an_owned_policy() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    adapter.connect().await.unwrap();

    let err = adapter
        .submit_claim(ClaimRequest {
            policy_id: 1,
            reason: "Medical Emergency".into(),
            description: "Hospital treatment".into(),
            requested_amount: amount("2.5"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::PolicyNotOwned { .. }));
}

#[tokio::test]
async fn claim_amounts_are_validated_before_the_store() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    adapter.connect().await.unwrap();
    adapter.purchase(1).await.unwrap();

    let base = ClaimRequest {
        policy_id: 1,
        reason: "Medical Emergency".into(),
        description: "Hospital treatment".into(),
        requested_amount: amount("2.5"),
    };

    let zero = ClaimRequest {
        requested_amount: Amount::ZERO,
        ..base.clone()
    };
    assert!(matches!(
        adapter.submit_claim(zero).await,
        Err(ChainError::ZeroClaimAmount)
    ));

    // Policy 1 coverage is 5.0
    let excessive = ClaimRequest {
        requested_amount: amount("6.0"),
        ..base.clone()
    };
    assert!(matches!(
        adapter.submit_claim(excessive).await,
        Err(ChainError::ExceedsCoverage { .. })
    ));

    // nothing reached the store
    assert!(adapter.user_claims().await.unwrap().is_empty());

    let (claim, result) = adapter.submit_claim(base).await.unwrap();
    assert_eq!(claim.status, ClaimStatus::Pending);
    assert!(result.tx_ref.starts_with("0x"));
    assert_eq!(adapter.user_claims().await.unwrap().len(), 1);
}

#[tokio::test]
async fn claim_processing_is_admin_only() {
    let fixture = Fixture::new().await;
    let mut user_session = fixture.adapter();
    user_session.connect().await.unwrap();
    user_session.purchase(1).await.unwrap();
    let (claim, _) = user_session
        .submit_claim(ClaimRequest {
            policy_id: 1,
            reason: "r".into(),
            description: "d".into(),
            requested_amount: amount("2.5"),
        })
        .await
        .unwrap();

    let err = user_session
        .process_claim(claim.id, ClaimVerdict::Approved, "ok")
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::Unauthorized));

    let err = user_session.add_policy(sample_draft()).await.unwrap_err();
    assert!(matches!(err, ChainError::Unauthorized));

    let err = user_session.all_claims().await.unwrap_err();
    assert!(matches!(err, ChainError::Unauthorized));
}

#[tokio::test]
async fn approval_transitions_once_and_pays_out() {
    let fixture = Fixture::new().await;
    let mut user_session = fixture.adapter();
    user_session.connect().await.unwrap();
    user_session.purchase(1).await.unwrap();
    let (claim, _) = user_session
        .submit_claim(ClaimRequest {
            policy_id: 1,
            reason: "Medical Emergency".into(),
            description: "ER visit".into(),
            requested_amount: amount("2.5"),
        })
        .await
        .unwrap();

    let mut admin_session = fixture.adapter_as(&admin(), "10").await;
    admin_session.connect().await.unwrap();

    let (processed, _) = admin_session
        .process_claim(claim.id, ClaimVerdict::Approved, "ok")
        .await
        .unwrap();
    assert_eq!(processed.status, ClaimStatus::Approved);
    assert_eq!(processed.admin_notes.as_deref(), Some("ok"));
    assert!(processed.processed_at.is_some());

    // payout left the admin's balance
    assert_eq!(admin_session.current_user().unwrap().balance, amount("7.5"));

    // terminal states never transition again
    let err = admin_session
        .process_claim(claim.id, ClaimVerdict::Rejected, "again")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Store(StoreError::ClaimNotPending(_))
    ));

    let err = admin_session
        .process_claim(999, ClaimVerdict::Approved, "")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Store(StoreError::ClaimNotFound(999))
    ));
}

#[tokio::test]
async fn admin_adds_policies_with_valid_durations() {
    let fixture = Fixture::new().await;
    let mut admin_session = fixture.adapter_as(&admin(), "10").await;
    admin_session.connect().await.unwrap();

    let mut bad = sample_draft();
    bad.duration_days = 0;
    assert!(matches!(
        admin_session.add_policy(bad).await,
        Err(ChainError::InvalidPolicy(_))
    ));

    let (policy, result) = admin_session.add_policy(sample_draft()).await.unwrap();
    assert_eq!(policy.id, 4); // after the three seeded policies
    assert!(result.tx_ref.starts_with("0x"));
    assert_eq!(admin_session.active_policies().await.unwrap().len(), 4);
}

#[tokio::test]
async fn provider_events_invalidate_the_session() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();

    // no session yet: nothing to invalidate
    assert!(!adapter.handle_provider_event(&ProviderEvent::ChainChanged(5)));

    adapter.connect().await.unwrap();
    assert!(adapter.handle_provider_event(&ProviderEvent::AccountsChanged(vec![])));
    assert!(!adapter.is_connected());
    assert!(matches!(
        adapter.purchase(1).await,
        Err(ChainError::NotConnected)
    ));
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    adapter.connect().await.unwrap();
    adapter.disconnect();
    adapter.disconnect();
    assert!(!adapter.is_connected());
}

#[tokio::test]
async fn toggling_the_role_grants_and_revokes_admin_ops() {
    let fixture = Fixture::new().await;
    let mut adapter = fixture.adapter();
    adapter.connect().await.unwrap();

    assert!(matches!(
        adapter.stats().await,
        Err(ChainError::Unauthorized)
    ));
    assert!(adapter.toggle_admin_role().await.unwrap());
    let stats = adapter.stats().await.unwrap();
    assert_eq!(stats.policies_sold, 0);
    assert!(!adapter.toggle_admin_role().await.unwrap());
}

#[tokio::test]
async fn stats_track_sales_for_admins() {
    let fixture = Fixture::new().await;
    let mut user_session = fixture.adapter();
    user_session.connect().await.unwrap();
    user_session.purchase(1).await.unwrap();
    user_session.purchase(2).await.unwrap();

    let mut admin_session = fixture.adapter_as(&admin(), "10").await;
    admin_session.connect().await.unwrap();
    let stats = admin_session.stats().await.unwrap();
    assert_eq!(stats.policies_sold, 2);
    assert_eq!(stats.premium_collected, amount("0.25"));

    let grouped = admin_session.all_user_policies().await.unwrap();
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].0, alice());
    assert_eq!(grouped[0].1.len(), 2);
}

fn sample_draft() -> PolicyDraft {
    PolicyDraft {
        name: "Travel Cover".into(),
        description: "Trip cancellation and luggage".into(),
        premium: amount("0.05"),
        coverage_amount: amount("2.0"),
        duration_days: 90,
        active: true,
    }
}
