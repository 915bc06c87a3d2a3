// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Solana source adapter. Builds `deposit_for_burn` against the token
//! messenger minter program and submits it through the RPC client.

pub mod instruction;

use self::instruction::{
    associated_token_address, create_token_account_idempotent, deposit_for_burn,
    DepositForBurnAccounts, DepositForBurnParams, DepositForBurnPdas,
};
use crate::chains::SourceChain;
use crate::config::{ChainConfig, ChainFamily, SolanaTransactionVersion};
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::BridgeMetrics;
use crate::types::{BurnRequest, ChainDomain};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Parses a signer secret: a JSON byte array (the CLI wallet file format) or
/// base58, holding either the 64-byte keypair or the bare 32-byte secret.
pub fn parse_keypair(encoded: &str) -> BridgeResult<Keypair> {
    let encoded = encoded.trim();
    let bytes: Vec<u8> = if encoded.starts_with('[') {
        serde_json::from_str(encoded)
            .map_err(|e| BridgeError::ConfigError(format!("invalid keypair file: {e}")))?
    } else {
        bs58::decode(encoded)
            .into_vec()
            .map_err(|e| BridgeError::ConfigError(format!("invalid base58 key: {e}")))?
    };
    match bytes.len() {
        32 => {
            let mut secret = [0u8; 32];
            secret.copy_from_slice(&bytes);
            Ok(Keypair::new_from_array(secret))
        }
        64 => {
            let keypair = Keypair::try_from(bytes.as_slice())
                .map_err(|e| BridgeError::ConfigError(format!("invalid keypair: {e}")))?;
            if keypair.pubkey().as_ref() != &bytes[32..] {
                return Err(BridgeError::ConfigError(
                    "keypair halves do not match".into(),
                ));
            }
            Ok(keypair)
        }
        n => Err(BridgeError::ConfigError(format!(
            "solana key must be 32 or 64 bytes, got {n}"
        ))),
    }
}

pub struct SolanaChainClient {
    name: String,
    domain: ChainDomain,
    rpc: Arc<RpcClient>,
    owner: Keypair,
    usdc_mint: Pubkey,
    message_transmitter_program: Pubkey,
    token_messenger_minter_program: Pubkey,
    version: SolanaTransactionVersion,
    poll_interval: Duration,
    metrics: Arc<BridgeMetrics>,
}

impl SolanaChainClient {
    pub fn new(
        name: &str,
        config: &ChainConfig,
        owner: Keypair,
        metrics: Arc<BridgeMetrics>,
    ) -> BridgeResult<Self> {
        let rpc = RpcClient::new_with_commitment(
            config.rpc_url.clone(),
            CommitmentConfig::confirmed(),
        );
        Self::with_rpc(name, config, owner, Arc::new(rpc), metrics)
    }

    pub fn with_rpc(
        name: &str,
        config: &ChainConfig,
        owner: Keypair,
        rpc: Arc<RpcClient>,
        metrics: Arc<BridgeMetrics>,
    ) -> BridgeResult<Self> {
        if config.family != ChainFamily::Solana {
            return Err(BridgeError::ConfigError(format!(
                "chain {name} is not a Solana chain"
            )));
        }
        let parse = |field: &str, value: &str| {
            Pubkey::from_str(value).map_err(|e| {
                BridgeError::ConfigError(format!("chain {name}: invalid {field}: {e}"))
            })
        };
        Ok(Self {
            name: name.to_string(),
            domain: config.domain,
            usdc_mint: parse("usdc", &config.usdc)?,
            message_transmitter_program: parse("message-transmitter", &config.message_transmitter)?,
            token_messenger_minter_program: parse("token-messenger", &config.token_messenger)?,
            version: config.solana_transaction_version,
            poll_interval: Duration::from_millis(500),
            rpc,
            owner,
            metrics,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn owner(&self) -> Pubkey {
        self.owner.pubkey()
    }

    pub fn burn_token_account(&self) -> Pubkey {
        associated_token_address(&self.owner.pubkey(), &self.usdc_mint)
    }

    /// The burn instructions. `event_data` is the fresh account that the
    /// message transmitter writes the outgoing message into.
    pub fn build_burn_instructions(
        &self,
        request: &BurnRequest,
        event_data: &Pubkey,
        create_token_account: bool,
    ) -> Vec<Instruction> {
        let owner = self.owner.pubkey();
        let burn_token_account = self.burn_token_account();
        let pdas = DepositForBurnPdas::derive(
            &self.message_transmitter_program,
            &self.token_messenger_minter_program,
            &self.usdc_mint,
            &owner,
            request.destination_domain,
        );
        let params = DepositForBurnParams {
            amount: request.amount,
            destination_domain: request.destination_domain.as_u32(),
            mint_recipient: Pubkey::new_from_array(request.mint_recipient.to_bytes()),
            destination_caller: Pubkey::new_from_array(request.destination_caller.to_bytes()),
            max_fee: request.max_fee,
            min_finality_threshold: request.finality.as_u32(),
        };

        let mut instructions = Vec::with_capacity(2);
        if create_token_account {
            instructions.push(create_token_account_idempotent(&owner, &owner, &self.usdc_mint));
        }
        instructions.push(deposit_for_burn(
            &DepositForBurnAccounts {
                owner: &owner,
                burn_token_account: &burn_token_account,
                mint: &self.usdc_mint,
                message_sent_event_data: event_data,
                message_transmitter_program: &self.message_transmitter_program,
                token_messenger_minter_program: &self.token_messenger_minter_program,
                pdas: &pdas,
            },
            &params,
        ));
        instructions
    }

    /// Compiles the burn in the configured message format and signs it with
    /// the owner and the event-data account.
    pub fn build_burn_transaction(
        &self,
        request: &BurnRequest,
        event_data: &Keypair,
        create_token_account: bool,
        blockhash: Hash,
    ) -> BridgeResult<VersionedTransaction> {
        let payer = self.owner.pubkey();
        let instructions =
            self.build_burn_instructions(request, &event_data.pubkey(), create_token_account);
        let message = match self.version {
            SolanaTransactionVersion::Legacy => VersionedMessage::Legacy(
                Message::new_with_blockhash(&instructions, Some(&payer), &blockhash),
            ),
            SolanaTransactionVersion::V0 => VersionedMessage::V0(
                v0::Message::try_compile(&payer, &instructions, &[], blockhash)
                    .map_err(|e| BridgeError::SerializationError(format!("burn message: {e}")))?,
            ),
        };
        VersionedTransaction::try_new(message, &[&self.owner, event_data])
            .map_err(|e| BridgeError::InternalError(format!("signing burn: {e}")))
    }

    async fn account_exists(&self, address: &Pubkey) -> BridgeResult<bool> {
        let response = self
            .observe(
                "getAccountInfo",
                self.rpc
                    .get_account_with_commitment(address, self.rpc.commitment()),
            )
            .await?;
        Ok(response.value.is_some())
    }

    async fn observe<T, E, F>(&self, method: &str, call: F) -> BridgeResult<T>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        self.metrics
            .solana_rpc_queries
            .with_label_values(&[method])
            .inc();
        call.await.map_err(|e| {
            self.metrics
                .solana_rpc_errors
                .with_label_values(&[method])
                .inc();
            tracing::warn!(chain = %self.name, method, "Solana rpc call failed: {}", e);
            BridgeError::ProviderError(format!("{method}: {e}"))
        })
    }
}

#[async_trait]
impl SourceChain for SolanaChainClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> ChainDomain {
        self.domain
    }

    fn signer_address(&self) -> String {
        self.owner.pubkey().to_string()
    }

    async fn broadcast_burn(&self, request: &BurnRequest) -> BridgeResult<String> {
        let token_account = self.burn_token_account();
        let create_token_account = !self.account_exists(&token_account).await?;
        if create_token_account {
            tracing::info!(chain = %self.name, %token_account, "Creating USDC token account");
        }
        let event_data = Keypair::new();
        let blockhash = self
            .observe("getLatestBlockhash", self.rpc.get_latest_blockhash())
            .await?;
        let tx = self.build_burn_transaction(request, &event_data, create_token_account, blockhash)?;
        let signature = self
            .observe("sendTransaction", self.rpc.send_transaction(&tx))
            .await?;
        tracing::info!(
            chain = %self.name,
            %signature,
            event_account = %event_data.pubkey(),
            "Burn transaction sent"
        );
        Ok(signature.to_string())
    }

    async fn confirm_burn(&self, tx_hash: &str) -> BridgeResult<()> {
        let signature = Signature::from_str(tx_hash)
            .map_err(|e| BridgeError::SerializationError(format!("signature {tx_hash}: {e}")))?;
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            let status = self
                .observe(
                    "getSignatureStatuses",
                    self.rpc
                        .get_signature_status_with_commitment(&signature, self.rpc.commitment()),
                )
                .await;
            match status {
                Ok(Some(Ok(()))) => return Ok(()),
                Ok(Some(Err(e))) => {
                    return Err(BridgeError::ProviderError(format!(
                        "transaction {tx_hash} failed: {e}"
                    )))
                }
                Ok(None) => tracing::debug!(chain = %self.name, tx_hash, "Burn not confirmed yet"),
                // already counted and logged; the caller's timeout bounds the wait
                Err(_) => {}
            }
        }
    }
}
