//! Covera Chain Library
//!
//! The bridge between marketplace intent and wherever it settles:
//! - Wallet provider boundary (accounts, balances, change notifications)
//! - JSON-RPC transport and the ledger's contract-shaped capability set
//! - Settlement backends (local mock vs. external ledger), fixed per session
//! - The chain adapter owning session state, authorization, and validation

pub mod adapter;
pub mod backend;
pub mod error;
pub mod ledger;
pub mod provider;
pub mod rpc;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod adapter_tests;

pub use adapter::{ChainAdapter, ClaimRequest, TransactionResult};
pub use backend::{Backend, LedgerBackend, MockBackend};
pub use error::{ChainError, Result};
pub use ledger::RpcLedger;
pub use provider::{DevProvider, ProviderEvent, RpcProvider, WalletProvider};
pub use rpc::RpcClient;
