//! Wallet provider boundary.
//!
//! The adapter depends on this capability set without assuming an
//! implementation: account discovery, balance queries, the network id, and
//! change notifications. [`RpcProvider`] talks to a node over JSON-RPC;
//! [`DevProvider`] is the in-process wallet used on the mock path and in
//! tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

use covera_core::amount::Amount;
use covera_core::domain::Address;

use crate::error::{ChainError, Result};
use crate::rpc::{parse_hex_u64, RpcClient};

/// Capacity of the provider event channel. Events are session-invalidation
/// signals, not a data stream; a small buffer is plenty.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session-invalidating notifications originating from the wallet.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// The exposed account set changed (switch or disconnect in the wallet).
    AccountsChanged(Vec<Address>),
    /// The wallet moved to a different network.
    ChainChanged(u64),
}

/// The wallet capability set the adapter is written against.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts the wallet exposes; the first is the active identity.
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Current balance of `address`.
    async fn balance(&self, address: &Address) -> Result<Amount>;

    /// Network identifier.
    async fn chain_id(&self) -> Result<u64>;

    /// Subscribe to account/network change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// In-process wallet for the mock path and tests.
///
/// Balances are write-through: mock settlements debit here, so a balance
/// re-query after a purchase reports the post-purchase figure just like a
/// real node would.
#[derive(Debug)]
pub struct DevProvider {
    accounts: Mutex<Vec<Address>>,
    balances: Mutex<HashMap<Address, Amount>>,
    chain_id: u64,
    events: broadcast::Sender<ProviderEvent>,
}

impl DevProvider {
    /// An empty dev wallet on the given network.
    pub fn new(chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            accounts: Mutex::new(Vec::new()),
            balances: Mutex::new(HashMap::new()),
            chain_id,
            events,
        }
    }

    /// Add an account with a starting balance. Re-funding an existing
    /// account overwrites its balance.
    pub async fn fund(&self, address: Address, balance: Amount) {
        let mut accounts = self.accounts.lock().await;
        if !accounts.contains(&address) {
            accounts.push(address.clone());
        }
        drop(accounts);
        self.balances.lock().await.insert(address, balance);
    }

    /// Remove `amount` from an account, failing when the balance is short.
    pub async fn debit(&self, address: &Address, amount: Amount) -> Result<()> {
        let mut balances = self.balances.lock().await;
        let balance = balances.get(address).copied().unwrap_or(Amount::ZERO);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(ChainError::InsufficientFunds {
                balance,
                required: amount,
            })?;
        balances.insert(address.clone(), remaining);
        Ok(())
    }

    /// Add `amount` to an account, creating it at zero if unknown.
    pub async fn credit(&self, address: &Address, amount: Amount) {
        let mut balances = self.balances.lock().await;
        let balance = balances.get(address).copied().unwrap_or(Amount::ZERO);
        balances.insert(address.clone(), balance.saturating_add(amount));
    }

    /// Inject a provider event, as a wallet would on account/network change.
    pub fn emit(&self, event: ProviderEvent) {
        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for DevProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.lock().await.clone())
    }

    async fn balance(&self, address: &Address) -> Result<Amount> {
        Ok(self
            .balances
            .lock()
            .await
            .get(address)
            .copied()
            .unwrap_or(Amount::ZERO))
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Wallet provider backed by a JSON-RPC node.
#[derive(Debug)]
pub struct RpcProvider {
    rpc: RpcClient,
    events: broadcast::Sender<ProviderEvent>,
}

impl RpcProvider {
    /// Wrap an [`RpcClient`] pointing at a wallet-capable node.
    pub fn new(rpc: RpcClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { rpc, events }
    }

    /// Accounts currently exposed, without prompting for access.
    async fn accounts(&self) -> Result<Vec<Address>> {
        let raw: Vec<String> = self.rpc.call("eth_accounts", json!([])).await?;
        Ok(raw.into_iter().map(Address::new).collect())
    }

    /// Spawn a poll loop that broadcasts account and network changes.
    ///
    /// The node has no push channel, so change detection is by comparison
    /// between polls; the first poll only records the baseline.
    pub fn spawn_watcher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut last_accounts: Option<Vec<Address>> = None;
            let mut last_chain: Option<u64> = None;
            loop {
                ticker.tick().await;

                match provider.accounts().await {
                    Ok(accounts) => {
                        if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                            let _ = provider
                                .events
                                .send(ProviderEvent::AccountsChanged(accounts.clone()));
                        }
                        last_accounts = Some(accounts);
                    }
                    Err(e) => warn!(error = %e, "account poll failed"),
                }

                match WalletProvider::chain_id(provider.as_ref()).await {
                    Ok(chain) => {
                        if last_chain.is_some_and(|prev| prev != chain) {
                            let _ = provider.events.send(ProviderEvent::ChainChanged(chain));
                        }
                        last_chain = Some(chain);
                    }
                    Err(e) => warn!(error = %e, "chain id poll failed"),
                }
            }
        })
    }
}

#[async_trait]
impl WalletProvider for RpcProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let raw: Vec<String> = self.rpc.call("eth_requestAccounts", json!([])).await?;
        Ok(raw.into_iter().map(Address::new).collect())
    }

    async fn balance(&self, address: &Address) -> Result<Amount> {
        let hex: String = self
            .rpc
            .call("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        Amount::from_hex_units(&hex).map_err(|e| ChainError::Protocol(e.to_string()))
    }

    async fn chain_id(&self) -> Result<u64> {
        let hex: String = self.rpc.call("eth_chainId", json!([])).await?;
        parse_hex_u64(&hex)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_provider_funds_and_debits() {
        let wallet = DevProvider::new(1);
        let addr = Address::new("0xAAA");
        wallet.fund(addr.clone(), Amount::parse("1.5").unwrap()).await;

        assert_eq!(wallet.request_accounts().await.unwrap(), vec![addr.clone()]);
        wallet.debit(&addr, Amount::parse("0.5").unwrap()).await.unwrap();
        assert_eq!(
            wallet.balance(&addr).await.unwrap(),
            Amount::parse("1").unwrap()
        );

        let err = wallet.debit(&addr, Amount::parse("2").unwrap()).await.unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn dev_provider_balance_of_unknown_account_is_zero() {
        let wallet = DevProvider::new(1);
        let balance = wallet.balance(&Address::new("0xnobody")).await.unwrap();
        assert_eq!(balance, Amount::ZERO);
    }

    #[tokio::test]
    async fn emitted_events_reach_subscribers() {
        let wallet = DevProvider::new(1);
        let mut rx = wallet.subscribe();
        wallet.emit(ProviderEvent::ChainChanged(5));
        match rx.recv().await.unwrap() {
            ProviderEvent::ChainChanged(id) => assert_eq!(id, 5),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
