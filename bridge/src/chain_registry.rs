// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Static directory of chain metadata, built once from configuration.

use crate::config::{
    default_confirmations, default_token_decimals, BridgeConfig, ChainConfig, ChainFamily,
    SolanaTransactionVersion,
};
use crate::error::{BridgeError, BridgeResult};
use crate::types::ChainDomain;
use std::collections::BTreeMap;

pub const SOLANA_DEVNET: &str = "solana-devnet";
pub const ETHEREUM_SEPOLIA: &str = "ethereum-sepolia";
pub const ARBITRUM_SEPOLIA: &str = "arbitrum-sepolia";
pub const BASE_SEPOLIA: &str = "base-sepolia";

// Testnet deployments of the v2 contracts share addresses across EVM chains.
const EVM_TESTNET_MESSAGE_TRANSMITTER: &str = "0xE737e5cEBEEBa77EFE34D4aa090756590b1CE275";
const EVM_TESTNET_TOKEN_MESSENGER: &str = "0x8FE6B999Dc680CcFDD5Bf7EB0974218be2542DAA";

#[derive(Clone, Debug, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainConfig>,
}

impl ChainRegistry {
    pub fn new(chains: BTreeMap<String, ChainConfig>) -> Self {
        Self { chains }
    }

    /// Presets first (when enabled), then configured chains replace them by name.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut chains = if config.use_testnet_presets {
            testnet_presets()
        } else {
            BTreeMap::new()
        };
        for (name, chain) in &config.chains {
            chains.insert(name.clone(), chain.clone());
        }
        Self { chains }
    }

    pub fn get(&self, name: &str) -> BridgeResult<&ChainConfig> {
        self.chains.get(name).ok_or_else(|| {
            BridgeError::ConfigError(format!(
                "unknown chain {name}, known chains: {}",
                self.names().join(", ")
            ))
        })
    }

    pub fn by_domain(&self, domain: ChainDomain) -> Option<(&str, &ChainConfig)> {
        self.chains
            .iter()
            .find(|(_, c)| c.domain == domain)
            .map(|(n, c)| (n.as_str(), c))
    }

    pub fn domain_of(&self, name: &str) -> BridgeResult<ChainDomain> {
        self.get(name).map(|c| c.domain)
    }

    pub fn names(&self) -> Vec<&str> {
        self.chains.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChainConfig)> {
        self.chains.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Explorer link for a transaction, when the chain has an explorer template.
    pub fn explorer_tx_url(&self, name: &str, tx_hash: &str) -> Option<String> {
        self.chains
            .get(name)?
            .explorer_url
            .as_ref()
            .map(|template| template.replace("{tx}", tx_hash))
    }
}

fn evm_preset(
    domain: ChainDomain,
    rpc_url: &str,
    explorer: &str,
    usdc: &str,
    chain_id: u64,
    signer_env: &str,
) -> ChainConfig {
    ChainConfig {
        family: ChainFamily::Evm,
        domain,
        rpc_url: rpc_url.to_string(),
        explorer_url: Some(format!("{explorer}/tx/{{tx}}")),
        usdc: usdc.to_string(),
        usdc_decimals: default_token_decimals(),
        message_transmitter: EVM_TESTNET_MESSAGE_TRANSMITTER.to_string(),
        token_messenger: EVM_TESTNET_TOKEN_MESSENGER.to_string(),
        chain_id: Some(chain_id),
        signer_key_env: Some(signer_env.to_string()),
        signer_key_path: None,
        confirmations: default_confirmations(),
        solana_transaction_version: SolanaTransactionVersion::Legacy,
    }
}

pub fn testnet_presets() -> BTreeMap<String, ChainConfig> {
    let mut chains = BTreeMap::new();
    chains.insert(
        SOLANA_DEVNET.to_string(),
        ChainConfig {
            family: ChainFamily::Solana,
            domain: ChainDomain::SOLANA,
            rpc_url: "https://api.devnet.solana.com".to_string(),
            explorer_url: Some("https://solscan.io/tx/{tx}?cluster=devnet".to_string()),
            usdc: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".to_string(),
            usdc_decimals: default_token_decimals(),
            message_transmitter: "CCTPV2Sm4AdWt5296sk4P66VBZ7bEhcARwFaaS9YPbeC".to_string(),
            token_messenger: "CCTPV2vPZJS2u2BBsUoscuikbYjnpFmbFsvVuJdgUMQe".to_string(),
            chain_id: None,
            signer_key_env: Some("SOLANA_PRIVATE_KEY".to_string()),
            signer_key_path: None,
            confirmations: default_confirmations(),
            solana_transaction_version: SolanaTransactionVersion::Legacy,
        },
    );
    chains.insert(
        ETHEREUM_SEPOLIA.to_string(),
        evm_preset(
            ChainDomain::ETHEREUM,
            "https://ethereum-sepolia-rpc.publicnode.com",
            "https://sepolia.etherscan.io",
            "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
            11_155_111,
            "ETHEREUM_PRIVATE_KEY",
        ),
    );
    chains.insert(
        ARBITRUM_SEPOLIA.to_string(),
        evm_preset(
            ChainDomain::ARBITRUM,
            "https://arbitrum-sepolia-rpc.publicnode.com",
            "https://sepolia.arbiscan.io",
            "0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d",
            421_614,
            "ARBITRUM_PRIVATE_KEY",
        ),
    );
    chains.insert(
        BASE_SEPOLIA.to_string(),
        evm_preset(
            ChainDomain::BASE,
            "https://base-sepolia-rpc.publicnode.com",
            "https://sepolia-explorer.base.org",
            "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            84_532,
            "BASE_PRIVATE_KEY",
        ),
    );
    chains
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        let registry = ChainRegistry::from_config(&BridgeConfig::default());
        assert_eq!(
            registry.names(),
            vec![ARBITRUM_SEPOLIA, BASE_SEPOLIA, ETHEREUM_SEPOLIA, SOLANA_DEVNET]
        );
        for (name, chain) in registry.iter() {
            chain.validate(name).unwrap();
        }
        assert_eq!(registry.domain_of(SOLANA_DEVNET).unwrap(), ChainDomain::SOLANA);
        assert_eq!(registry.domain_of(ARBITRUM_SEPOLIA).unwrap(), ChainDomain::ARBITRUM);
        assert_eq!(
            registry.by_domain(ChainDomain::ETHEREUM).unwrap().0,
            ETHEREUM_SEPOLIA
        );
    }

    #[test]
    fn test_config_overrides_preset() {
        let mut config = BridgeConfig::default();
        let mut sepolia = testnet_presets().remove(ETHEREUM_SEPOLIA).unwrap();
        sepolia.rpc_url = "http://127.0.0.1:8545".to_string();
        config.chains.insert(ETHEREUM_SEPOLIA.to_string(), sepolia);
        let registry = ChainRegistry::from_config(&config);
        assert_eq!(
            registry.get(ETHEREUM_SEPOLIA).unwrap().rpc_url,
            "http://127.0.0.1:8545"
        );
        // other presets untouched
        assert_eq!(
            registry.get(ARBITRUM_SEPOLIA).unwrap().rpc_url,
            "https://arbitrum-sepolia-rpc.publicnode.com"
        );
    }

    #[test]
    fn test_presets_can_be_disabled() {
        let config = BridgeConfig {
            use_testnet_presets: false,
            ..Default::default()
        };
        let registry = ChainRegistry::from_config(&config);
        assert!(registry.names().is_empty());
        let err = registry.get(SOLANA_DEVNET).unwrap_err();
        assert_eq!(err.error_type(), "config_error");
    }

    #[test]
    fn test_explorer_url() {
        let registry = ChainRegistry::from_config(&BridgeConfig::default());
        assert_eq!(
            registry.explorer_tx_url(ETHEREUM_SEPOLIA, "0xabc").unwrap(),
            "https://sepolia.etherscan.io/tx/0xabc"
        );
        assert_eq!(
            registry.explorer_tx_url(SOLANA_DEVNET, "5sig").unwrap(),
            "https://solscan.io/tx/5sig?cluster=devnet"
        );
        assert!(registry.explorer_tx_url("nope", "x").is_none());
    }
}
