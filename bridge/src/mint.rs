// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chains::DestinationChain;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::BridgeMetrics;
use crate::submission_lock::SubmissionLocks;
use crate::types::{AttestationProof, ChainDomain};
use ethers::types::H256;
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tap::TapFallible;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NonceState {
    InFlight,
    Consumed,
}

/// Local record of proofs this process has minted, keyed by source domain
/// and the keccak256 of the attested message. The message embeds the
/// protocol nonce, so the key is unique per burn even when the service
/// leaves `eventNonce` out. The destination contract is the authority on
/// replays; this only avoids paying gas for known ones.
#[derive(Debug, Default)]
pub struct ConsumedNonces {
    nonces: Mutex<HashMap<(ChainDomain, H256), NonceState>>,
}

fn replay_key(proof: &AttestationProof) -> (ChainDomain, H256) {
    (proof.source_domain, H256(keccak256(&proof.message)))
}

impl ConsumedNonces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the proof for one mint attempt. Fails if it is already
    /// consumed or another mint of the same proof is in flight.
    fn reserve(&self, proof: &AttestationProof) -> BridgeResult<()> {
        let key = replay_key(proof);
        let mut nonces = self.nonces.lock().unwrap_or_else(|e| e.into_inner());
        let describe = || {
            format!(
                "message {:?} (nonce {:?}) from domain {}",
                key.1, proof.event_nonce, proof.source_domain
            )
        };
        match nonces.get(&key) {
            Some(NonceState::Consumed) => Err(BridgeError::InvalidProof(format!(
                "{} was already minted",
                describe()
            ))),
            Some(NonceState::InFlight) => Err(BridgeError::InvalidProof(format!(
                "{} is being minted",
                describe()
            ))),
            None => {
                nonces.insert(key, NonceState::InFlight);
                Ok(())
            }
        }
    }

    fn release(&self, proof: &AttestationProof) {
        let key = replay_key(proof);
        let mut nonces = self.nonces.lock().unwrap_or_else(|e| e.into_inner());
        if nonces.get(&key) == Some(&NonceState::InFlight) {
            nonces.remove(&key);
        }
    }

    fn consume(&self, proof: &AttestationProof) {
        self.nonces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(replay_key(proof), NonceState::Consumed);
    }

    pub fn is_consumed(&self, proof: &AttestationProof) -> bool {
        self.nonces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&replay_key(proof))
            == Some(&NonceState::Consumed)
    }
}

/// `estimate * (100 + buffer_percent) / 100`, saturating.
pub fn apply_gas_buffer(estimate: u64, buffer_percent: u64) -> u64 {
    let limit = estimate as u128 * (100 + buffer_percent as u128) / 100;
    u64::try_from(limit).unwrap_or(u64::MAX)
}

/// Submits attestation proofs to destination chains.
pub struct MintExecutor {
    locks: Arc<SubmissionLocks>,
    confirmation_timeout: Duration,
    gas_buffer_percent: u64,
    consumed: Option<Arc<ConsumedNonces>>,
    metrics: Arc<BridgeMetrics>,
}

impl MintExecutor {
    pub fn new(
        locks: Arc<SubmissionLocks>,
        confirmation_timeout: Duration,
        gas_buffer_percent: u64,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            locks,
            confirmation_timeout,
            gas_buffer_percent,
            consumed: None,
            metrics,
        }
    }

    pub fn with_consumed_nonces(mut self, consumed: Arc<ConsumedNonces>) -> Self {
        self.consumed = Some(consumed);
        self
    }

    pub async fn mint(
        &self,
        chain: &dyn DestinationChain,
        proof: &AttestationProof,
    ) -> BridgeResult<String> {
        let domain_label = chain.domain().to_string();
        if !proof.is_populated() {
            let err = BridgeError::InvalidProof(format!(
                "empty message or attestation for nonce {:?}",
                proof.event_nonce
            ));
            return Err(self.record_failure(&domain_label, chain.name(), err));
        }
        if let Some(consumed) = &self.consumed {
            consumed
                .reserve(proof)
                .tap_err(|_| {
                    self.metrics
                        .mint_replays_rejected
                        .with_label_values(&[&proof.source_domain.to_string()])
                        .inc();
                })
                .map_err(|e| self.record_failure(&domain_label, chain.name(), e))?;
        }

        let result = self.estimate_and_submit(chain, proof, &domain_label).await;
        if let Some(consumed) = &self.consumed {
            match &result {
                Ok(_) => consumed.consume(proof),
                Err(_) => consumed.release(proof),
            }
        }
        result
    }

    async fn estimate_and_submit(
        &self,
        chain: &dyn DestinationChain,
        proof: &AttestationProof,
        domain_label: &str,
    ) -> BridgeResult<String> {
        let estimate = chain.estimate_mint_gas(proof).await.map_err(|e| {
            let err = match e {
                BridgeError::GasEstimationFailed(_) => e,
                other => BridgeError::GasEstimationFailed(other.to_string()),
            };
            self.record_failure(domain_label, chain.name(), err)
        })?;
        let gas_limit = apply_gas_buffer(estimate, self.gas_buffer_percent);
        tracing::info!(
            chain = chain.name(),
            nonce = ?proof.event_nonce,
            estimate,
            gas_limit,
            "Submitting mint"
        );

        let signer = chain.signer_address();
        let result = {
            let _guard = self.locks.acquire(chain.domain(), &signer).await;
            tokio::time::timeout(self.confirmation_timeout, chain.submit_mint(proof, gas_limit))
                .await
        };
        let tx_hash = match result {
            Ok(Ok(tx_hash)) => tx_hash,
            Ok(Err(e)) => {
                let err = match e {
                    BridgeError::MintSubmissionFailed(_) => e,
                    other => BridgeError::MintSubmissionFailed(other.to_string()),
                };
                return Err(self.record_failure(domain_label, chain.name(), err));
            }
            Err(_) => {
                let err = BridgeError::MintSubmissionFailed(format!(
                    "mint not confirmed within {:?}",
                    self.confirmation_timeout
                ));
                return Err(self.record_failure(domain_label, chain.name(), err));
            }
        };
        self.metrics
            .mints_submitted
            .with_label_values(&[domain_label])
            .inc();
        tracing::info!(chain = chain.name(), ?tx_hash, "Mint confirmed");
        Ok(tx_hash)
    }

    fn record_failure(&self, domain_label: &str, chain: &str, err: BridgeError) -> BridgeError {
        self.metrics
            .err_mints
            .with_label_values(&[domain_label, err.error_type()])
            .inc();
        tracing::error!(chain, "Mint failed: {}", err);
        err
    }
}
