// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use cctp_bridge::attestation::IrisClient;
use cctp_bridge::chain_registry::ChainRegistry;
use cctp_bridge::fee_oracle::{max_fee_for, FeeOracle};
use cctp_bridge::metrics::BridgeMetrics;
use cctp_bridge::orchestrator::{BridgeOrchestrator, Destination};
use cctp_bridge::session::SessionContext;
use cctp_bridge::types::{BurnReceipt, FinalityThreshold, TransferOutcome};
use cctp_bridge::utils::{
    build_destination_chain, build_source_chain, generate_bridge_config_and_write_to_file,
};
use cctp_bridge_cli::{
    format_token_amount, load_bridge_config, parse_token_amount, wait_for_forced_exit, Args,
    BridgeCommand, DestinationArg, OutcomeSummary,
};
use clap::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let registry = prometheus::Registry::new();
    let metrics = Arc::new(BridgeMetrics::new(&registry));

    match args.command {
        BridgeCommand::CreateBridgeConfigTemplate { path } => {
            generate_bridge_config_and_write_to_file(&path)?;
            tracing::info!("Bridge config template generated at {}", path.display());
        }
        BridgeCommand::ListChains { config_path } => {
            let config = load_bridge_config(config_path.as_ref())?;
            for (name, chain) in ChainRegistry::from_config(&config).iter() {
                println!(
                    "{name:<20} domain={:<3} family={:?} usdc={}",
                    chain.domain, chain.family, chain.usdc
                );
            }
        }
        BridgeCommand::Quote {
            config_path,
            source,
            destination,
            amount,
        } => {
            let config = load_bridge_config(config_path.as_ref())?;
            let chains = ChainRegistry::from_config(&config);
            let source_chain = chains.get(&source)?;
            let destination_domain = chains.domain_of(&destination)?;
            let oracle = FeeOracle::new(
                Arc::new(IrisClient::new(&config.attestation)?),
                config.fees.token_decimals,
                metrics,
            );
            let quote = oracle.quote(source_chain.domain, destination_domain).await?;
            let decimals = source_chain.usdc_decimals;
            println!("Route: {source} -> {destination}");
            println!("Minimum fast fee: {} bps", quote.minimum_fee_bps);
            println!(
                "Fast transfer allowance: {}",
                format_token_amount(quote.fast_allowance, decimals)
            );
            if let Some(amount) = amount {
                let units = parse_token_amount(&amount, decimals)?;
                let max_fee = max_fee_for(
                    FinalityThreshold::Fast,
                    units,
                    quote.minimum_fee_bps,
                    config.fees.buffer_bps,
                );
                println!(
                    "Max fee for {amount} (fast, +{} bps buffer): {}",
                    config.fees.buffer_bps,
                    format_token_amount(max_fee, decimals)
                );
                if units > quote.fast_allowance {
                    println!("Amount exceeds the fast transfer allowance; use standard finality");
                }
            }
        }
        BridgeCommand::Bridge {
            config_path,
            source,
            amount,
            destinations,
            session_ttl_secs,
            json,
        } => {
            let config = load_bridge_config(config_path.as_ref())?;
            let chains = ChainRegistry::from_config(&config);
            let units = parse_token_amount(&amount, chains.get(&source)?.usdc_decimals)?;
            let orchestrator = BridgeOrchestrator::from_config(
                &config,
                Arc::new(IrisClient::new(&config.attestation)?),
                metrics.clone(),
            );
            let source_chain = build_source_chain(&chains, &source, metrics.clone()).await?;
            let mut targets = Vec::with_capacity(destinations.len());
            for destination in &destinations {
                targets.push(build_destination(&chains, destination, metrics.clone()).await?);
            }

            let session = SessionContext::new(session_ttl_secs.map(Duration::from_secs));
            cancel_on_ctrl_c(session.clone());
            let outcomes = orchestrator
                .bridge(source_chain, units, targets, &session)
                .await?;
            report(&outcomes, &source, &chains, json)?;
        }
        BridgeCommand::Resume {
            config_path,
            source,
            burn_tx,
            destination,
            json,
        } => {
            let config = load_bridge_config(config_path.as_ref())?;
            let chains = ChainRegistry::from_config(&config);
            let receipt = BurnReceipt {
                tx_hash: burn_tx,
                source_domain: chains.domain_of(&source)?,
            };
            let orchestrator = BridgeOrchestrator::from_config(
                &config,
                Arc::new(IrisClient::new(&config.attestation)?),
                metrics.clone(),
            );
            let target = build_destination(&chains, &destination, metrics.clone()).await?;
            let session = SessionContext::new(None);
            cancel_on_ctrl_c(session.clone());
            let outcome = orchestrator.resume(receipt, &target, &session).await;
            report(&[outcome], &source, &chains, json)?;
        }
    }
    Ok(())
}

async fn build_destination(
    chains: &ChainRegistry,
    destination: &DestinationArg,
    metrics: Arc<BridgeMetrics>,
) -> anyhow::Result<Destination> {
    let chain = build_destination_chain(chains, &destination.chain, metrics).await?;
    Ok(Destination::new(
        chain,
        destination.recipient,
        destination.finality,
    ))
}

fn cancel_on_ctrl_c(session: SessionContext) {
    tokio::spawn(async move {
        if wait_for_forced_exit(session, tokio::signal::ctrl_c).await {
            std::process::exit(130);
        }
    });
}

fn report(
    outcomes: &[TransferOutcome],
    source: &str,
    chains: &ChainRegistry,
    json: bool,
) -> anyhow::Result<()> {
    let summaries: Vec<OutcomeSummary> = outcomes
        .iter()
        .map(|outcome| OutcomeSummary::new(outcome, source, chains))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!("{}: {}", summary.destination, summary.status);
            if let Some(url) = summary.burn_tx_url.as_ref().or(summary.burn_tx.as_ref()) {
                println!("  burn: {url}");
            }
            if let Some(url) = summary.mint_tx_url.as_ref().or(summary.mint_tx.as_ref()) {
                println!("  mint: {url}");
            }
            if let Some(error) = &summary.error {
                println!("  error: {error}");
            }
        }
    }
    let failed = outcomes.iter().filter(|o| !o.is_completed()).count();
    if failed > 0 {
        return Err(anyhow!("{failed} of {} transfers did not complete", outcomes.len()));
    }
    Ok(())
}
