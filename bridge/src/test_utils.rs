// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scripted attestation service and chain adapters for tests.

use crate::attestation::{
    AttestationApi, AttestationMessage, FastBurnAllowanceResponse, FastBurnFeesResponse,
    MessagesResponse, PENDING_ATTESTATION,
};
use crate::chains::{DestinationChain, SourceChain};
use crate::encoding::UniversalAddress;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{AttestationProof, BurnRequest, ChainDomain, FinalityThreshold};
use async_trait::async_trait;
use ethers::types::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_for_testing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

pub fn pending_response() -> MessagesResponse {
    MessagesResponse {
        messages: Some(vec![AttestationMessage {
            message: Some("0x".to_string()),
            attestation: Some(PENDING_ATTESTATION.to_string()),
            event_nonce: None,
            status: Some("pending_confirmations".to_string()),
        }]),
        error: None,
    }
}

pub fn ready_response(message: &[u8], attestation: &[u8], nonce: &str) -> MessagesResponse {
    MessagesResponse {
        messages: Some(vec![AttestationMessage {
            message: Some(format!("0x{}", hex::encode(message))),
            attestation: Some(format!("0x{}", hex::encode(attestation))),
            event_nonce: Some(nonce.to_string()),
            status: Some("complete".to_string()),
        }]),
        error: None,
    }
}

pub fn test_recipient() -> UniversalAddress {
    UniversalAddress::new([0x11; 32])
}

pub fn standard_request(amount: u64) -> BurnRequest {
    BurnRequest {
        source_domain: ChainDomain::SOLANA,
        destination_domain: ChainDomain::ETHEREUM,
        amount,
        mint_recipient: test_recipient(),
        max_fee: 0,
        finality: FinalityThreshold::Standard,
        destination_caller: UniversalAddress::ZERO,
    }
}

pub fn fast_request(amount: u64, max_fee: u64) -> BurnRequest {
    BurnRequest {
        max_fee,
        finality: FinalityThreshold::Fast,
        ..standard_request(amount)
    }
}

pub fn test_proof(source_domain: ChainDomain, nonce: &str) -> AttestationProof {
    AttestationProof {
        source_domain,
        message: Bytes::from([&[0xaa, 0xbb][..], nonce.as_bytes()].concat()),
        attestation: Bytes::from(vec![0xcc; 65]),
        event_nonce: Some(nonce.to_string()),
    }
}

#[allow(clippy::type_complexity)]
#[derive(Clone, Default)]
pub struct MockAttestationApi {
    fees: Arc<Mutex<HashMap<(ChainDomain, ChainDomain), BridgeResult<FastBurnFeesResponse>>>>,
    allowance: Arc<Mutex<Option<BridgeResult<FastBurnAllowanceResponse>>>>,
    messages: Arc<Mutex<HashMap<String, VecDeque<BridgeResult<MessagesResponse>>>>>,
    default_messages: Arc<Mutex<Option<BridgeResult<MessagesResponse>>>>,
    messages_calls: Arc<Mutex<HashMap<String, usize>>>,
    messages_delay: Duration,
}

impl MockAttestationApi {
    /// Every `messages` request takes `delay` before answering.
    pub fn with_messages_delay(mut self, delay: Duration) -> Self {
        self.messages_delay = delay;
        self
    }

    pub fn set_fees(
        &self,
        source: ChainDomain,
        destination: ChainDomain,
        response: BridgeResult<FastBurnFeesResponse>,
    ) {
        self.fees
            .lock()
            .unwrap()
            .insert((source, destination), response);
    }

    pub fn set_allowance(&self, response: BridgeResult<FastBurnAllowanceResponse>) {
        self.allowance.lock().unwrap().replace(response);
    }

    /// Queues one response for `tx_hash`. Queued responses are served in order,
    /// then the default response takes over.
    pub fn push_messages(&self, tx_hash: &str, response: BridgeResult<MessagesResponse>) {
        self.messages
            .lock()
            .unwrap()
            .entry(tx_hash.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_default_messages(&self, response: BridgeResult<MessagesResponse>) {
        self.default_messages.lock().unwrap().replace(response);
    }

    pub fn messages_calls(&self, tx_hash: &str) -> usize {
        self.messages_calls
            .lock()
            .unwrap()
            .get(tx_hash)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AttestationApi for MockAttestationApi {
    async fn fast_burn_fees(
        &self,
        source: ChainDomain,
        destination: ChainDomain,
    ) -> BridgeResult<FastBurnFeesResponse> {
        self.fees
            .lock()
            .unwrap()
            .get(&(source, destination))
            .cloned()
            .unwrap_or_else(|| {
                Err(BridgeError::FeeQueryFailed(format!(
                    "no fees scripted for {source} -> {destination}"
                )))
            })
    }

    async fn fast_burn_allowance(&self) -> BridgeResult<FastBurnAllowanceResponse> {
        self.allowance
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(BridgeError::FeeQueryFailed("no allowance scripted".into())))
    }

    async fn messages(
        &self,
        _source: ChainDomain,
        tx_hash: &str,
    ) -> BridgeResult<MessagesResponse> {
        *self
            .messages_calls
            .lock()
            .unwrap()
            .entry(tx_hash.to_string())
            .or_default() += 1;
        if !self.messages_delay.is_zero() {
            tokio::time::sleep(self.messages_delay).await;
        }
        if let Some(response) = self
            .messages
            .lock()
            .unwrap()
            .get_mut(tx_hash)
            .and_then(|q| q.pop_front())
        {
            return response;
        }
        self.default_messages
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(MessagesResponse::default()))
    }
}

/// Source chain that records every burn it is asked to submit.
#[derive(Clone)]
pub struct MockSourceChain {
    name: String,
    domain: ChainDomain,
    burns: Arc<Mutex<Vec<BurnRequest>>>,
    results: Arc<Mutex<VecDeque<BridgeResult<String>>>>,
    confirm_results: Arc<Mutex<VecDeque<BridgeResult<()>>>>,
    attempts: Arc<AtomicU64>,
    confirm_delay: Option<Duration>,
}

impl MockSourceChain {
    pub fn new(name: &str, domain: ChainDomain) -> Self {
        Self {
            name: name.to_string(),
            domain,
            burns: Default::default(),
            results: Default::default(),
            confirm_results: Default::default(),
            attempts: Default::default(),
            confirm_delay: None,
        }
    }

    pub fn solana() -> Self {
        Self::new("solana-devnet", ChainDomain::SOLANA)
    }

    /// Every broadcast burn takes `delay` to confirm.
    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = Some(delay);
        self
    }

    pub fn push_burn_result(&self, result: BridgeResult<String>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn push_confirm_result(&self, result: BridgeResult<()>) {
        self.confirm_results.lock().unwrap().push_back(result);
    }

    /// Successfully broadcast burns, in submission order.
    pub fn burns(&self) -> Vec<BurnRequest> {
        self.burns.lock().unwrap().clone()
    }

    pub fn burn_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceChain for MockSourceChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> ChainDomain {
        self.domain
    }

    fn signer_address(&self) -> String {
        "mock-source-signer".to_string()
    }

    async fn broadcast_burn(&self, request: &BurnRequest) -> BridgeResult<String> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("burn-{n}")));
        if result.is_ok() {
            self.burns.lock().unwrap().push(request.clone());
        }
        result
    }

    async fn confirm_burn(&self, _tx_hash: &str) -> BridgeResult<()> {
        if let Some(delay) = self.confirm_delay {
            tokio::time::sleep(delay).await;
        }
        self.confirm_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// Destination chain with scripted gas estimates and submissions.
#[derive(Clone)]
pub struct MockDestinationChain {
    name: String,
    domain: ChainDomain,
    gas_results: Arc<Mutex<VecDeque<BridgeResult<u64>>>>,
    submit_results: Arc<Mutex<VecDeque<BridgeResult<String>>>>,
    minted: Arc<Mutex<Vec<(AttestationProof, u64)>>>,
    estimate_calls: Arc<AtomicU64>,
    submit_calls: Arc<AtomicU64>,
    delay: Option<Duration>,
}

impl MockDestinationChain {
    pub fn new(name: &str, domain: ChainDomain) -> Self {
        Self {
            name: name.to_string(),
            domain,
            gas_results: Default::default(),
            submit_results: Default::default(),
            minted: Default::default(),
            estimate_calls: Default::default(),
            submit_calls: Default::default(),
            delay: None,
        }
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_gas_result(&self, result: BridgeResult<u64>) {
        self.gas_results.lock().unwrap().push_back(result);
    }

    pub fn push_submit_result(&self, result: BridgeResult<String>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    /// Proofs that were minted, with the gas limit each was submitted with.
    pub fn minted(&self) -> Vec<(AttestationProof, u64)> {
        self.minted.lock().unwrap().clone()
    }

    pub fn estimate_calls(&self) -> u64 {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DestinationChain for MockDestinationChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> ChainDomain {
        self.domain
    }

    fn signer_address(&self) -> String {
        "0x000000000000000000000000000000000000dEaD".to_string()
    }

    async fn estimate_mint_gas(&self, _proof: &AttestationProof) -> BridgeResult<u64> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.gas_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(100_000))
    }

    async fn submit_mint(&self, proof: &AttestationProof, gas_limit: u64) -> BridgeResult<String> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = self
            .submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("{}-mint-{n}", self.name)));
        if result.is_ok() {
            self.minted.lock().unwrap().push((proof.clone(), gas_limit));
        }
        result
    }
}
