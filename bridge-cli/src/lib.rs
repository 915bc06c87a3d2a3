// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{anyhow, Context};
use cctp_bridge::chain_registry::ChainRegistry;
use cctp_bridge::config::BridgeConfig;
use cctp_bridge::encoding::UniversalAddress;
use cctp_bridge::session::SessionContext;
use cctp_bridge::types::{FinalityThreshold, TransferOutcome};
use cctp_bridge_config::Config;
use clap::*;
use ethers::types::U256;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[clap(rename_all = "kebab-case", name = "cctp-bridge-cli")]
pub struct Args {
    #[clap(subcommand)]
    pub command: BridgeCommand,
}

#[derive(Parser)]
#[clap(rename_all = "kebab-case")]
pub enum BridgeCommand {
    #[clap(name = "create-bridge-config-template")]
    CreateBridgeConfigTemplate { path: PathBuf },
    // Print the chains known to the registry
    #[clap(name = "list-chains")]
    ListChains {
        #[clap(long = "config-path")]
        config_path: Option<PathBuf>,
    },
    // Current fast burn fee and allowance for a route
    #[clap(name = "quote")]
    Quote {
        #[clap(long = "config-path")]
        config_path: Option<PathBuf>,
        #[clap(long)]
        source: String,
        #[clap(long)]
        destination: String,
        // Decimal token amount, e.g. 1.5
        #[clap(long)]
        amount: Option<String>,
    },
    // Burn on the source chain once per destination and mint each burn
    #[clap(name = "bridge")]
    Bridge {
        #[clap(long = "config-path")]
        config_path: Option<PathBuf>,
        #[clap(long)]
        source: String,
        // Decimal token amount per destination, e.g. 1.5
        #[clap(long)]
        amount: String,
        // chain:recipient[:fast|standard], repeatable
        #[clap(long = "destination", required = true)]
        destinations: Vec<DestinationArg>,
        #[clap(long = "session-ttl-secs")]
        session_ttl_secs: Option<u64>,
        #[clap(long, default_value = "false")]
        json: bool,
    },
    // Wait for the attestation of a confirmed burn and mint it
    #[clap(name = "resume")]
    Resume {
        #[clap(long = "config-path")]
        config_path: Option<PathBuf>,
        #[clap(long)]
        source: String,
        #[clap(long = "burn-tx")]
        burn_tx: String,
        #[clap(long)]
        destination: DestinationArg,
        #[clap(long, default_value = "false")]
        json: bool,
    },
}

/// `chain:recipient[:fast|standard]`. Finality defaults to fast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationArg {
    pub chain: String,
    pub recipient: UniversalAddress,
    pub finality: FinalityThreshold,
}

impl FromStr for DestinationArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(chain), Some(recipient)) = (parts.next(), parts.next()) else {
            return Err(anyhow!("expected chain:recipient[:fast|standard], got {s:?}"));
        };
        let finality = match parts.next() {
            None => FinalityThreshold::Fast,
            Some(f) => FinalityThreshold::from_str(f)
                .map_err(|e| anyhow!("invalid finality in {s:?}: {e}"))?,
        };
        if parts.next().is_some() || chain.is_empty() {
            return Err(anyhow!("expected chain:recipient[:fast|standard], got {s:?}"));
        }
        Ok(Self {
            chain: chain.to_string(),
            recipient: UniversalAddress::parse(recipient)?,
            finality,
        })
    }
}

pub fn load_bridge_config(path: Option<&PathBuf>) -> anyhow::Result<BridgeConfig> {
    let config = match path {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Converts a decimal amount like `1.25` into base units of a token.
pub fn parse_token_amount(amount: &str, decimals: u32) -> anyhow::Result<u64> {
    let units: U256 = ethers::utils::parse_units(amount.trim(), decimals)
        .with_context(|| format!("invalid amount {amount:?}"))?
        .into();
    if units.is_zero() {
        return Err(anyhow!("amount must be positive"));
    }
    if units > U256::from(u64::MAX) {
        return Err(anyhow!("amount {amount} is too large"));
    }
    Ok(units.as_u64())
}

pub fn format_token_amount(units: u64, decimals: u32) -> String {
    ethers::utils::format_units(units, decimals).unwrap_or_else(|_| units.to_string())
}

/// Invalidates `session` on the first interrupt so pending transfers stop
/// and get reported. Returns once a second interrupt arrives, or `false` if
/// interrupts can no longer be received.
pub async fn wait_for_forced_exit<F, Fut>(session: SessionContext, mut interrupted: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut interrupts = 0u32;
    while interrupted().await.is_ok() {
        interrupts += 1;
        if interrupts == 1 {
            tracing::warn!("Interrupted, cancelling pending transfers. Press Ctrl-C again to exit");
            session.invalidate();
        } else {
            tracing::warn!("Interrupted again, exiting");
            return true;
        }
    }
    false
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutcomeSummary {
    pub destination: String,
    pub status: String,
    pub amount: u64,
    pub finality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burn_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burn_tx_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_tx_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeSummary {
    pub fn new(outcome: &TransferOutcome, source: &str, registry: &ChainRegistry) -> Self {
        let status = match (outcome.is_completed(), outcome.failed_stage()) {
            (true, _) => "completed".to_string(),
            (false, Some(stage)) => format!("failed at {stage}"),
            (false, None) => "incomplete".to_string(),
        };
        let burn_tx = outcome.burn_tx().map(str::to_string);
        Self {
            destination: outcome.destination.clone(),
            status,
            amount: outcome.amount,
            finality: outcome.finality.to_string(),
            max_fee: outcome.max_fee,
            burn_tx_url: burn_tx
                .as_deref()
                .and_then(|tx| registry.explorer_tx_url(source, tx)),
            burn_tx,
            mint_tx_url: outcome
                .mint_tx
                .as_deref()
                .and_then(|tx| registry.explorer_tx_url(&outcome.destination, tx)),
            mint_tx: outcome.mint_tx.clone(),
            error: outcome.error().map(|e| e.to_string()),
        }
    }
}
