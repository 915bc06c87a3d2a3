// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::types::ChainDomain;
use anyhow::anyhow;
use cctp_bridge_config::Config;
use ethers::types::Address as EthAddress;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const IRIS_SANDBOX_URL: &str = "https://iris-api-sandbox.circle.com/v2";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainFamily {
    Evm,
    Solana,
}

/// Solana message format used when building burn transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolanaTransactionVersion {
    #[default]
    Legacy,
    V0,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttestationServiceConfig {
    // Base url of the attestation (Iris) REST api, including the version path.
    #[serde(default = "default_iris_url")]
    pub base_url: String,
    // Asset symbol used in the fast-burn endpoints.
    #[serde(default = "default_asset")]
    pub asset: String,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_request_timeout", rename = "request-timeout-ms")]
    pub request_timeout: Duration,
}

impl Default for AttestationServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_iris_url(),
            asset: default_asset(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffMode {
    #[default]
    Fixed,
    Exponential,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollingConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_poll_interval", rename = "interval-ms")]
    pub interval: Duration,
    #[serde(default)]
    pub backoff: BackoffMode,
    // Only used by exponential backoff.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_max_interval", rename = "max-interval-ms")]
    pub max_interval: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_max_wait", rename = "max-wait-secs")]
    pub max_wait: Duration,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            backoff: BackoffMode::Fixed,
            backoff_multiplier: default_backoff_multiplier(),
            max_interval: default_max_interval(),
            max_attempts: None,
            max_wait: default_max_wait(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

impl PollingConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_exponential_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff = BackoffMode::Exponential;
        self.backoff_multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    pub fn with_max_consecutive_errors(mut self, errors: u32) -> Self {
        self.max_consecutive_errors = errors;
        self
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeeConfig {
    // Added on top of the service minimum fee for fast transfers.
    #[serde(default = "default_fee_buffer_bps")]
    pub buffer_bps: u64,
    // Decimals of the bridged token, used to convert service amounts.
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            buffer_bps: default_fee_buffer_bps(),
            token_decimals: default_token_decimals(),
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MintConfig {
    #[serde(default = "default_gas_buffer_percent")]
    pub gas_buffer_percent: u64,
    // Reject proofs whose (domain, nonce) this process already minted.
    #[serde(default = "default_true")]
    pub check_consumed_nonces: bool,
    // Upper bound for retrying failed mint submissions; zero disables.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_mint_retry", rename = "retry-max-elapsed-secs")]
    pub retry_max_elapsed: Duration,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            gas_buffer_percent: default_gas_buffer_percent(),
            check_consumed_nonces: true,
            retry_max_elapsed: default_mint_retry(),
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_concurrent_destinations")]
    pub max_concurrent_destinations: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_confirmation_timeout", rename = "confirmation-timeout-secs")]
    pub confirmation_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_destinations: default_max_concurrent_destinations(),
            confirmation_timeout: default_confirmation_timeout(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    pub family: ChainFamily,
    pub domain: ChainDomain,
    pub rpc_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    // USDC token contract (EVM) or mint (Solana).
    pub usdc: String,
    #[serde(default = "default_token_decimals")]
    pub usdc_decimals: u32,
    pub message_transmitter: String,
    pub token_messenger: String,
    // Expected native chain id, verified on connect (EVM only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    // Environment variable holding the signer secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_key_env: Option<String>,
    // File holding the signer secret; used when the env var is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_key_path: Option<PathBuf>,
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    #[serde(default)]
    pub solana_transaction_version: SolanaTransactionVersion,
}

impl ChainConfig {
    pub fn validate(&self, name: &str) -> anyhow::Result<()> {
        Url::parse(&self.rpc_url)
            .map_err(|e| anyhow!("Chain {name}: invalid rpc-url {}: {e}", self.rpc_url))?;
        let addresses = [
            ("usdc", &self.usdc),
            ("message-transmitter", &self.message_transmitter),
            ("token-messenger", &self.token_messenger),
        ];
        for (field, value) in addresses {
            match self.family {
                ChainFamily::Evm => {
                    EthAddress::from_str(value)
                        .map_err(|e| anyhow!("Chain {name}: invalid {field} {value}: {e}"))?;
                }
                ChainFamily::Solana => {
                    let bytes = bs58::decode(value)
                        .into_vec()
                        .map_err(|e| anyhow!("Chain {name}: invalid {field} {value}: {e}"))?;
                    if bytes.len() != 32 {
                        return Err(anyhow!(
                            "Chain {name}: {field} {value} is not a 32 byte public key"
                        ));
                    }
                }
            }
        }
        if self.confirmations == 0 {
            return Err(anyhow!("Chain {name}: confirmations must be at least 1"));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeConfig {
    #[serde(default)]
    pub attestation: AttestationServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub mint: MintConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    // Start from the built-in testnet chain presets; `chains` entries override them.
    #[serde(default = "default_true")]
    pub use_testnet_presets: bool,
    #[serde(default)]
    pub chains: BTreeMap<String, ChainConfig>,
}

impl Config for BridgeConfig {}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            attestation: AttestationServiceConfig::default(),
            polling: PollingConfig::default(),
            fees: FeeConfig::default(),
            mint: MintConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            use_testnet_presets: true,
            chains: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.attestation.base_url).map_err(|e| {
            anyhow!(
                "Invalid attestation base-url {}: {e}",
                self.attestation.base_url
            )
        })?;
        if self.attestation.asset.is_empty() {
            return Err(anyhow!("attestation asset must not be empty"));
        }
        if self.polling.interval.is_zero() {
            return Err(anyhow!("polling interval must be positive"));
        }
        let multiplier = self.polling.backoff_multiplier;
        if self.polling.backoff == BackoffMode::Exponential
            && (!multiplier.is_finite() || multiplier < 1.0)
        {
            return Err(anyhow!(
                "polling backoff-multiplier must be finite and >= 1.0, got {}",
                self.polling.backoff_multiplier
            ));
        }
        if self.polling.max_attempts == Some(0) {
            return Err(anyhow!("polling max-attempts must be at least 1"));
        }
        if self.fees.buffer_bps >= 10_000 {
            return Err(anyhow!(
                "fee buffer-bps {} must be below 10000",
                self.fees.buffer_bps
            ));
        }
        if self.mint.gas_buffer_percent > 1_000 {
            return Err(anyhow!(
                "gas-buffer-percent {} is unreasonably large",
                self.mint.gas_buffer_percent
            ));
        }
        if self.orchestrator.max_concurrent_destinations == 0 {
            return Err(anyhow!("max-concurrent-destinations must be at least 1"));
        }
        let mut domains = HashSet::new();
        for (name, chain) in &self.chains {
            chain.validate(name)?;
            if !domains.insert(chain.domain) {
                return Err(anyhow!(
                    "Domain {} is configured for more than one chain",
                    chain.domain
                ));
            }
        }
        Ok(())
    }
}

fn default_iris_url() -> String {
    IRIS_SANDBOX_URL.to_string()
}

fn default_asset() -> String {
    "USDC".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(2000)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_max_wait() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_max_consecutive_errors() -> u32 {
    10
}

pub(crate) fn default_fee_buffer_bps() -> u64 {
    5
}

pub(crate) fn default_token_decimals() -> u32 {
    6
}

fn default_gas_buffer_percent() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_mint_retry() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent_destinations() -> usize {
    1
}

fn default_confirmation_timeout() -> Duration {
    Duration::from_secs(120)
}

pub(crate) fn default_confirmations() -> usize {
    1
}
