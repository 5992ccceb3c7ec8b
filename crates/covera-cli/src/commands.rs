//! Command handlers: one adapter operation each, plain-text output.

#![allow(clippy::print_stdout)] // terminal output is this module's job

use anyhow::Context;

use covera_chain::{ChainAdapter, ClaimRequest};
use covera_core::amount::Amount;
use covera_core::domain::{now_ms, Claim, ClaimVerdict, PolicyDraft, PolicyId, UserPolicy};

pub async fn policies(adapter: &ChainAdapter) -> anyhow::Result<()> {
    let policies = adapter.active_policies().await?;
    if policies.is_empty() {
        println!("No active policies.");
        return Ok(());
    }
    for policy in policies {
        println!(
            "#{}  {}  premium {}  coverage {}  {} days",
            policy.id, policy.name, policy.premium, policy.coverage_amount, policy.duration_days
        );
        println!("    {}", policy.description);
    }
    Ok(())
}

pub async fn balance(adapter: &mut ChainAdapter) -> anyhow::Result<()> {
    let balance = adapter.refresh_balance().await?;
    let user = adapter.current_user().context("session vanished")?;
    let role = if user.is_owner { "admin" } else { "user" };
    println!("{}  ({role})  balance {balance}", user.address);
    Ok(())
}

pub async fn buy(adapter: &mut ChainAdapter, policy_id: PolicyId) -> anyhow::Result<()> {
    let result = adapter.purchase(policy_id).await?;
    println!("Purchased policy #{policy_id}  tx {}", result.tx_ref);
    if let Some(user) = adapter.current_user() {
        println!("Remaining balance: {}", user.balance);
    }
    Ok(())
}

pub async fn my_policies(adapter: &ChainAdapter) -> anyhow::Result<()> {
    let held = adapter.user_policies().await?;
    if held.is_empty() {
        println!("No policies held.");
        return Ok(());
    }
    let now = now_ms();
    for owned in held {
        print_holding(&owned, now);
    }
    Ok(())
}

pub async fn submit_claim(
    adapter: &mut ChainAdapter,
    policy_id: PolicyId,
    reason: String,
    description: String,
    amount: &str,
) -> anyhow::Result<()> {
    let requested_amount = Amount::parse(amount).context("invalid claim amount")?;
    let (claim, result) = adapter
        .submit_claim(ClaimRequest {
            policy_id,
            reason,
            description,
            requested_amount,
        })
        .await?;
    println!(
        "Claim #{} submitted against policy #{} for {}  tx {}",
        claim.id, claim.policy_id, claim.requested_amount, result.tx_ref
    );
    Ok(())
}

pub async fn claims(adapter: &ChainAdapter, all: bool) -> anyhow::Result<()> {
    let claims = if all {
        adapter.all_claims().await?
    } else {
        adapter.user_claims().await?
    };
    if claims.is_empty() {
        println!("No claims.");
        return Ok(());
    }
    for claim in claims {
        print_claim(&claim);
    }
    Ok(())
}

pub async fn process_claim(
    adapter: &mut ChainAdapter,
    claim_id: u64,
    verdict: ClaimVerdict,
    notes: &str,
) -> anyhow::Result<()> {
    let (claim, result) = adapter.process_claim(claim_id, verdict, notes).await?;
    println!("Claim #{} is now {}  tx {}", claim.id, claim.status, result.tx_ref);
    Ok(())
}

pub async fn add_policy(
    adapter: &mut ChainAdapter,
    name: String,
    description: String,
    premium: &str,
    coverage: &str,
    duration_days: u32,
) -> anyhow::Result<()> {
    let draft = PolicyDraft {
        name,
        description,
        premium: Amount::parse(premium).context("invalid premium")?,
        coverage_amount: Amount::parse(coverage).context("invalid coverage amount")?,
        duration_days,
        active: true,
    };
    let (policy, result) = adapter.add_policy(draft).await?;
    println!("Added policy #{} \"{}\"  tx {}", policy.id, policy.name, result.tx_ref);
    Ok(())
}

pub async fn stats(adapter: &ChainAdapter) -> anyhow::Result<()> {
    let stats = adapter.stats().await?;
    println!("Policies sold:      {}", stats.policies_sold);
    println!("Premium collected:  {}", stats.premium_collected);
    Ok(())
}

fn print_holding(owned: &UserPolicy, now: u64) {
    let state = if owned.is_expired(now) { "expired" } else { "active" };
    println!(
        "#{}  {}  coverage {}  expires_at {}  ({state})",
        owned.policy.id, owned.policy.name, owned.policy.coverage_amount, owned.expires_at
    );
}

fn print_claim(claim: &Claim) {
    println!(
        "#{}  policy #{}  {}  {}  \"{}\"",
        claim.id, claim.policy_id, claim.requested_amount, claim.status, claim.reason
    );
    if let Some(notes) = &claim.admin_notes {
        if !notes.is_empty() {
            println!("    notes: {notes}");
        }
    }
}
