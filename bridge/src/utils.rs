// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chain_registry::{testnet_presets, ChainRegistry};
use crate::chains::evm::EvmChainClient;
use crate::chains::solana::{parse_keypair, SolanaChainClient};
use crate::chains::{DestinationChain, SourceChain};
use crate::config::{BridgeConfig, ChainConfig, ChainFamily};
use crate::metered_eth_provider::{new_metered_eth_provider, MeteredEthHttpProvider};
use crate::metrics::BridgeMetrics;
use anyhow::{anyhow, Context};
use cctp_bridge_config::Config;
use ethers::core::k256::ecdsa::SigningKey;
use ethers::middleware::SignerMiddleware;
use ethers::prelude::*;
use ethers::providers::Provider;
use ethers::signers::Wallet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub type EthSigner = SignerMiddleware<Provider<MeteredEthHttpProvider>, Wallet<SigningKey>>;

pub async fn get_eth_signer_client(
    url: &str,
    private_key_hex: &str,
    metrics: Arc<BridgeMetrics>,
) -> anyhow::Result<EthSigner> {
    let provider = new_metered_eth_provider(url, metrics)
        .map_err(|e| anyhow!("Invalid eth rpc url {url}: {e}"))?
        .interval(std::time::Duration::from_millis(2000));
    let chain_id = provider.get_chainid().await?;
    let wallet = Wallet::from_str(private_key_hex.trim())
        .map_err(|e| anyhow!("Invalid eth private key: {e}"))?
        .with_chain_id(chain_id.as_u64());
    Ok(SignerMiddleware::new(provider, wallet))
}

// Signer secret of a chain: the configured env var wins over the key file.
pub fn read_signer_secret(name: &str, config: &ChainConfig) -> anyhow::Result<String> {
    if let Some(var) = &config.signer_key_env {
        if let Ok(secret) = std::env::var(var) {
            if !secret.trim().is_empty() {
                return Ok(secret.trim().to_string());
            }
        }
    }
    if let Some(path) = &config.signer_key_path {
        let secret = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read signer key file {}", path.display()))?;
        return Ok(secret.trim().to_string());
    }
    Err(anyhow!(
        "No signer key for chain {name}: set {} or signer-key-path",
        config.signer_key_env.as_deref().unwrap_or("signer-key-env")
    ))
}

pub async fn build_evm_chain(
    name: &str,
    config: &ChainConfig,
    metrics: Arc<BridgeMetrics>,
) -> anyhow::Result<EvmChainClient<EthSigner>> {
    let secret = read_signer_secret(name, config)?;
    let signer = get_eth_signer_client(&config.rpc_url, &secret, metrics).await?;
    if let Some(expected) = config.chain_id {
        let actual = signer.signer().chain_id();
        if actual != expected {
            return Err(anyhow!(
                "Chain {name}: rpc {} reports chain id {actual}, expected {expected}",
                config.rpc_url
            ));
        }
    }
    Ok(EvmChainClient::from_signer(name, config, signer)?)
}

pub fn build_solana_chain(
    name: &str,
    config: &ChainConfig,
    metrics: Arc<BridgeMetrics>,
) -> anyhow::Result<SolanaChainClient> {
    let keypair = parse_keypair(&read_signer_secret(name, config)?)?;
    Ok(SolanaChainClient::new(name, config, keypair, metrics)?)
}

pub async fn build_source_chain(
    registry: &ChainRegistry,
    name: &str,
    metrics: Arc<BridgeMetrics>,
) -> anyhow::Result<Arc<dyn SourceChain>> {
    let config = registry.get(name)?;
    Ok(match config.family {
        ChainFamily::Evm => Arc::new(build_evm_chain(name, config, metrics).await?),
        ChainFamily::Solana => Arc::new(build_solana_chain(name, config, metrics)?),
    })
}

pub async fn build_destination_chain(
    registry: &ChainRegistry,
    name: &str,
    metrics: Arc<BridgeMetrics>,
) -> anyhow::Result<Arc<dyn DestinationChain>> {
    let config = registry.get(name)?;
    match config.family {
        ChainFamily::Evm => Ok(Arc::new(build_evm_chain(name, config, metrics).await?)),
        ChainFamily::Solana => Err(crate::error::BridgeError::UnsupportedOperation(format!(
            "{name} cannot be a mint destination"
        ))
        .into()),
    }
}

// Generate Bridge Config template and write to a file.
pub fn generate_bridge_config_and_write_to_file(path: &Path) -> Result<(), anyhow::Error> {
    let config = BridgeConfig {
        use_testnet_presets: false,
        chains: testnet_presets(),
        ..Default::default()
    };
    config.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_registry::{ARBITRUM_SEPOLIA, SOLANA_DEVNET};

    #[test]
    fn test_generate_config_template() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["bridge.yaml", "bridge.json"] {
            let path = dir.path().join(file);
            generate_bridge_config_and_write_to_file(&path).unwrap();
            let loaded = BridgeConfig::load(&path).unwrap();
            loaded.validate().unwrap();
            assert!(!loaded.use_testnet_presets);
            assert_eq!(loaded.chains, testnet_presets());
        }
    }

    #[test]
    fn test_read_signer_secret() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("key");
        std::fs::write(&key_path, "  0xabc\n").unwrap();

        let mut config = testnet_presets().remove(ARBITRUM_SEPOLIA).unwrap();
        config.signer_key_env = Some("CCTP_BRIDGE_UTILS_TEST_UNSET_KEY".into());
        assert!(read_signer_secret("arb", &config).is_err());

        config.signer_key_path = Some(key_path);
        assert_eq!(read_signer_secret("arb", &config).unwrap(), "0xabc");

        config.signer_key_env = Some("CCTP_BRIDGE_UTILS_TEST_KEY".into());
        std::env::set_var("CCTP_BRIDGE_UTILS_TEST_KEY", "0xdef");
        assert_eq!(read_signer_secret("arb", &config).unwrap(), "0xdef");
    }

    #[test]
    fn test_build_solana_chain_from_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("id.json");
        let keypair = solana_sdk::signature::Keypair::new();
        std::fs::write(&key_path, serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap())
            .unwrap();

        let mut config = testnet_presets().remove(SOLANA_DEVNET).unwrap();
        config.signer_key_env = None;
        config.signer_key_path = Some(key_path);
        let chain = build_solana_chain(
            SOLANA_DEVNET,
            &config,
            Arc::new(BridgeMetrics::new_for_testing()),
        )
        .unwrap();
        assert_eq!(
            chain.signer_address(),
            solana_sdk::signature::Signer::pubkey(&keypair).to_string()
        );
    }

    #[tokio::test]
    async fn test_solana_is_not_a_destination() {
        let registry = ChainRegistry::new(testnet_presets());
        let err = build_destination_chain(
            &registry,
            SOLANA_DEVNET,
            Arc::new(BridgeMetrics::new_for_testing()),
        )
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("unsupported operation"), "{err}");

        let err = build_source_chain(
            &registry,
            "unknown-chain",
            Arc::new(BridgeMetrics::new_for_testing()),
        )
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("unknown chain"), "{err}");
    }
}
