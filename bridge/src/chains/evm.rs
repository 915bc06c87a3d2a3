// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::abi::{EthErc20, MessageTransmitterV2, TokenMessengerV2};
use crate::chains::{DestinationChain, SourceChain};
use crate::config::{ChainConfig, ChainFamily};
use crate::error::{BridgeError, BridgeResult};
use crate::types::{AttestationProof, BurnRequest, ChainDomain};
use crate::utils::EthSigner;
use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::ContractCall;
use ethers::providers::{Middleware, PendingTransaction};
use ethers::types::{Address as EthAddress, TxHash, U256};
use std::str::FromStr;
use std::sync::Arc;
use tap::TapFallible;

/// Burns and mints on an EVM chain through the token messenger and message
/// transmitter contracts. `M` must sign for `signer`.
pub struct EvmChainClient<M> {
    name: String,
    domain: ChainDomain,
    client: Arc<M>,
    signer: EthAddress,
    usdc: EthAddress,
    token_messenger: TokenMessengerV2<M>,
    message_transmitter: MessageTransmitterV2<M>,
    confirmations: usize,
}

fn parse_address(field: &str, value: &str) -> BridgeResult<EthAddress> {
    EthAddress::from_str(value)
        .map_err(|e| BridgeError::ConfigError(format!("invalid {field} address {value:?}: {e}")))
}

impl<M: Middleware + 'static> EvmChainClient<M> {
    pub fn new(
        name: &str,
        config: &ChainConfig,
        client: Arc<M>,
        signer: EthAddress,
    ) -> BridgeResult<Self> {
        if config.family != ChainFamily::Evm {
            return Err(BridgeError::ConfigError(format!(
                "chain {name} is not an EVM chain"
            )));
        }
        let usdc = parse_address("usdc", &config.usdc)?;
        let token_messenger = parse_address("token-messenger", &config.token_messenger)?;
        let message_transmitter =
            parse_address("message-transmitter", &config.message_transmitter)?;
        Ok(Self {
            name: name.to_string(),
            domain: config.domain,
            signer,
            usdc,
            token_messenger: TokenMessengerV2::new(token_messenger, client.clone()),
            message_transmitter: MessageTransmitterV2::new(message_transmitter, client.clone()),
            client,
            confirmations: config.confirmations,
        })
    }

    pub fn signer(&self) -> EthAddress {
        self.signer
    }

    pub async fn usdc_balance(&self) -> BridgeResult<U256> {
        EthErc20::new(self.usdc, self.client.clone())
            .balance_of(self.signer)
            .call()
            .await
            .map_err(|e| BridgeError::ProviderError(format!("balanceOf failed: {e}")))
    }

    /// Approves exactly `amount` for the token messenger when the current
    /// allowance does not cover it.
    async fn ensure_allowance(&self, amount: U256) -> BridgeResult<()> {
        let erc20 = EthErc20::new(self.usdc, self.client.clone());
        let spender = self.token_messenger.address();
        let allowance = erc20
            .allowance(self.signer, spender)
            .call()
            .await
            .map_err(|e| BridgeError::ProviderError(format!("allowance query failed: {e}")))?;
        if allowance >= amount {
            return Ok(());
        }
        tracing::info!(chain = %self.name, %allowance, %amount, "Approving token messenger");
        let call = erc20.approve(spender, amount).from(self.signer);
        self.send_and_confirm(call, "approve").await?;
        Ok(())
    }

    async fn send<D: Detokenize>(&self, call: ContractCall<M, D>, label: &str) -> BridgeResult<TxHash> {
        let pending = call
            .send()
            .await
            .map_err(|e| BridgeError::ProviderError(format!("{label} send failed: {e}")))?;
        let tx_hash = pending.tx_hash();
        tracing::debug!(chain = %self.name, ?tx_hash, "{} sent", label);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, label: &str) -> BridgeResult<String> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .confirmations(self.confirmations)
            .await
            .map_err(|e| BridgeError::ProviderError(format!("{label} {tx_hash:?}: {e}")))?
            .ok_or_else(|| {
                BridgeError::ProviderError(format!("{label} {tx_hash:?} dropped from mempool"))
            })?;
        if receipt.status != Some(1.into()) {
            return Err(BridgeError::ProviderError(format!(
                "{label} {tx_hash:?} reverted"
            )));
        }
        Ok(format!("{:?}", receipt.transaction_hash))
    }

    async fn send_and_confirm<D: Detokenize>(
        &self,
        call: ContractCall<M, D>,
        label: &str,
    ) -> BridgeResult<String> {
        let tx_hash = self.send(call, label).await?;
        self.wait_for_receipt(tx_hash, label).await
    }
}

impl EvmChainClient<EthSigner> {
    pub fn from_signer(name: &str, config: &ChainConfig, signer: EthSigner) -> BridgeResult<Self> {
        let address = signer.address();
        Self::new(name, config, Arc::new(signer), address)
    }
}

#[async_trait]
impl<M: Middleware + 'static> SourceChain for EvmChainClient<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> ChainDomain {
        self.domain
    }

    fn signer_address(&self) -> String {
        format!("{:?}", self.signer)
    }

    async fn broadcast_burn(&self, request: &BurnRequest) -> BridgeResult<String> {
        let amount = U256::from(request.amount);
        self.ensure_allowance(amount).await?;
        let call = self
            .token_messenger
            .deposit_for_burn(
                amount,
                request.destination_domain.as_u32(),
                request.mint_recipient.to_bytes(),
                self.usdc,
                request.destination_caller.to_bytes(),
                U256::from(request.max_fee),
                request.finality.as_u32(),
            )
            .from(self.signer);
        let tx_hash = self.send(call, "depositForBurn").await?;
        Ok(format!("{tx_hash:?}"))
    }

    async fn confirm_burn(&self, tx_hash: &str) -> BridgeResult<()> {
        let hash = TxHash::from_str(tx_hash)
            .map_err(|e| BridgeError::SerializationError(format!("tx hash {tx_hash}: {e}")))?;
        self.wait_for_receipt(hash, "depositForBurn")
            .await
            .tap_ok(|tx_hash| tracing::info!(chain = %self.name, %tx_hash, "Burn transaction confirmed"))
            .map(|_| ())
    }
}

#[async_trait]
impl<M: Middleware + 'static> DestinationChain for EvmChainClient<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> ChainDomain {
        self.domain
    }

    fn signer_address(&self) -> String {
        format!("{:?}", self.signer)
    }

    async fn estimate_mint_gas(&self, proof: &AttestationProof) -> BridgeResult<u64> {
        let gas = self
            .message_transmitter
            .receive_message(proof.message.clone(), proof.attestation.clone())
            .from(self.signer)
            .estimate_gas()
            .await
            .map_err(|e| BridgeError::GasEstimationFailed(e.to_string()))?;
        if gas > U256::from(u64::MAX) {
            return Err(BridgeError::GasEstimationFailed(format!(
                "estimate {gas} out of range"
            )));
        }
        Ok(gas.as_u64())
    }

    async fn submit_mint(&self, proof: &AttestationProof, gas_limit: u64) -> BridgeResult<String> {
        let call = self
            .message_transmitter
            .receive_message(proof.message.clone(), proof.attestation.clone())
            .from(self.signer)
            .gas(gas_limit);
        self.send_and_confirm(call, "receiveMessage")
            .await
            .map_err(|e| BridgeError::MintSubmissionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_registry::{testnet_presets, ETHEREUM_SEPOLIA, SOLANA_DEVNET};
    use crate::test_utils::test_proof;
    use ethers::providers::{MockProvider, Provider};

    fn sepolia_client() -> (EvmChainClient<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        let config = testnet_presets().remove(ETHEREUM_SEPOLIA).unwrap();
        let client = EvmChainClient::new(
            ETHEREUM_SEPOLIA,
            &config,
            Arc::new(provider),
            EthAddress::repeat_byte(0x42),
        )
        .unwrap();
        (client, mock)
    }

    #[tokio::test]
    async fn test_estimate_mint_gas() {
        let (client, mock) = sepolia_client();
        mock.push::<U256, _>(U256::from(143_210u64)).unwrap();
        let gas = client
            .estimate_mint_gas(&test_proof(ChainDomain::SOLANA, "1"))
            .await
            .unwrap();
        assert_eq!(gas, 143_210);
    }

    #[tokio::test]
    async fn test_estimate_failure_maps_to_gas_estimation_failed() {
        // no scripted response: the call fails like an unreachable node
        let (client, _mock) = sepolia_client();
        let err = client
            .estimate_mint_gas(&test_proof(ChainDomain::SOLANA, "1"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "gas_estimation_failed");
    }

    #[tokio::test]
    async fn test_usdc_balance() {
        let (client, mock) = sepolia_client();
        // eth_call returns the abi-encoded uint256
        mock.push::<ethers::types::Bytes, _>(ethers::types::Bytes::from(
            ethers::abi::encode(&[ethers::abi::Token::Uint(U256::from(25_000_000u64))]),
        ))
        .unwrap();
        assert_eq!(client.usdc_balance().await.unwrap(), U256::from(25_000_000u64));
    }

    #[tokio::test]
    async fn test_confirm_burn_rejects_malformed_hash() {
        let (client, _mock) = sepolia_client();
        let err = client.confirm_burn("0x1234").await.unwrap_err();
        assert_eq!(err.error_type(), "serialization_error");
    }

    #[test]
    fn test_rejects_non_evm_config() {
        let (provider, _mock) = Provider::mocked();
        let config = testnet_presets().remove(SOLANA_DEVNET).unwrap();
        let err = EvmChainClient::new(SOLANA_DEVNET, &config, Arc::new(provider), EthAddress::zero())
            .err()
            .unwrap();
        assert_eq!(err.error_type(), "config_error");
    }

    #[test]
    fn test_signer_and_domain() {
        let (client, _mock) = sepolia_client();
        assert_eq!(SourceChain::domain(&client), ChainDomain::ETHEREUM);
        assert_eq!(
            DestinationChain::signer_address(&client),
            format!("{:?}", EthAddress::repeat_byte(0x42))
        );
    }
}
