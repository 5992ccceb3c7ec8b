//! Covera CLI
//!
//! Drives one wallet session per invocation against the marketplace core:
//! browse and buy policies, file claims, and run the admin side. Without an
//! RPC endpoint the session runs on the in-process dev wallet with local
//! settlement; with one, operations settle against the ledger node.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::Mutex;

use covera_chain::{
    ChainAdapter, DevProvider, LedgerBackend, MockBackend, RpcClient, RpcLedger, RpcProvider,
    WalletProvider,
};
use covera_core::config::Config;
use covera_core::domain::{Address, ClaimVerdict};
use covera_core::store::Store;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "covera")]
#[command(version, about = "Insurance policy marketplace CLI", long_about = None)]
struct Cli {
    /// Wallet identity for this session (dev wallet only; an RPC node
    /// supplies its own active account)
    #[arg(
        long = "as",
        value_name = "ADDRESS",
        default_value = "0x1234567890123456789012345678901234567890"
    )]
    account: String,

    /// JSON-RPC endpoint of a wallet/ledger node (overrides config)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Admin/owner address override (overrides config)
    #[arg(long)]
    owner: Option<String>,

    /// Grant this session the admin role after connecting (demo aid)
    #[arg(long)]
    admin: bool,

    /// Emit JSON log lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active policies
    Policies,
    /// Show the session account, role, and balance
    Balance,
    /// Purchase a policy
    Buy {
        policy_id: u64,
    },
    /// List policies held by the session account
    MyPolicies,
    /// File a claim against an owned policy
    SubmitClaim {
        policy_id: u64,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        description: String,
        /// Requested payout, e.g. "2.5"
        #[arg(long)]
        amount: String,
    },
    /// List claims: your own, or everything with --all (admin)
    Claims {
        #[arg(long)]
        all: bool,
    },
    /// Approve or reject a pending claim (admin)
    ProcessClaim {
        claim_id: u64,
        #[arg(value_enum)]
        verdict: VerdictArg,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Register a new policy (admin)
    AddPolicy {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Purchase price, e.g. "0.1"
        #[arg(long)]
        premium: String,
        /// Maximum claimable amount, e.g. "5.0"
        #[arg(long)]
        coverage: String,
        #[arg(long, default_value_t = 365)]
        duration_days: u32,
    },
    /// Marketplace totals (admin)
    Stats,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VerdictArg {
    Approved,
    Rejected,
}

impl From<VerdictArg> for ClaimVerdict {
    fn from(arg: VerdictArg) -> Self {
        match arg {
            VerdictArg::Approved => Self::Approved,
            VerdictArg::Rejected => Self::Rejected,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    covera_core::tracing_init::init_tracing("covera=warn", cli.log_json);

    let cwd = std::env::current_dir().ok();
    let mut config =
        covera_core::config::load_config(cwd.as_deref()).context("failed to load configuration")?;
    if let Some(url) = cli.rpc_url.clone() {
        config.chain.rpc_url = Some(url);
    }
    if let Some(owner) = cli.owner.clone() {
        config.chain.owner_address = Some(owner);
    }

    let store = Arc::new(Mutex::new(if config.store.seed_sample_data {
        Store::with_sample_data()
    } else {
        Store::new()
    }));

    let mut adapter = build_adapter(&cli, &config, store).await?;
    adapter
        .connect()
        .await
        .context("failed to connect wallet session")?;
    if cli.admin && !adapter.current_user().is_some_and(|u| u.is_owner) {
        adapter.toggle_admin_role().await?;
    }

    dispatch(adapter, cli.command).await
}

/// Select the provider/backend pair once, from config: a JSON-RPC node when
/// an endpoint is configured, the in-process dev wallet otherwise.
async fn build_adapter(
    cli: &Cli,
    config: &Config,
    store: Arc<Mutex<Store>>,
) -> anyhow::Result<ChainAdapter> {
    let owner = config.chain.owner_address.as_deref().map(Address::new);
    let timeout = Duration::from_secs(config.chain.request_timeout_secs);

    if let Some(url) = &config.chain.rpc_url {
        let provider = Arc::new(RpcProvider::new(
            RpcClient::new(url.clone(), timeout).context("failed to build RPC client")?,
        ));
        let ledger = RpcLedger::new(
            RpcClient::new(url.clone(), timeout).context("failed to build RPC client")?,
        );
        let backend = Arc::new(LedgerBackend::new(ledger, owner));
        Ok(ChainAdapter::new(provider, backend, store))
    } else {
        let wallet = Arc::new(DevProvider::new(31337));
        wallet
            .fund(Address::new(cli.account.clone()), config.chain.dev_balance)
            .await;
        let provider: Arc<dyn WalletProvider> = wallet.clone();
        let backend = Arc::new(MockBackend::new(wallet, owner));
        Ok(ChainAdapter::new(provider, backend, store))
    }
}

async fn dispatch(mut adapter: ChainAdapter, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Policies => commands::policies(&adapter).await,
        Command::Balance => commands::balance(&mut adapter).await,
        Command::Buy { policy_id } => commands::buy(&mut adapter, policy_id).await,
        Command::MyPolicies => commands::my_policies(&adapter).await,
        Command::SubmitClaim {
            policy_id,
            reason,
            description,
            amount,
        } => commands::submit_claim(&mut adapter, policy_id, reason, description, &amount).await,
        Command::Claims { all } => commands::claims(&adapter, all).await,
        Command::ProcessClaim {
            claim_id,
            verdict,
            notes,
        } => commands::process_claim(&mut adapter, claim_id, verdict.into(), &notes).await,
        Command::AddPolicy {
            name,
            description,
            premium,
            coverage,
            duration_days,
        } => {
            commands::add_policy(&mut adapter, name, description, &premium, &coverage, duration_days)
                .await
        }
        Command::Stats => commands::stats(&adapter).await,
    }
}
