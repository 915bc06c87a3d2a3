// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Drives one source burn session across its destinations.
//!
//! Every destination runs quote, burn, attestation and mint strictly in
//! that order and gets its own burn. A failure is recorded on that
//! destination's `TransferRecord` and never stops its siblings.

use crate::attestation::{AttestationApi, AttestationPoller};
use crate::burn::BurnExecutor;
use crate::chains::{DestinationChain, SourceChain};
use crate::config::BridgeConfig;
use crate::encoding::UniversalAddress;
use crate::error::{BridgeError, BridgeResult};
use crate::fee_oracle::{max_fee_for, FeeOracle};
use crate::metrics::BridgeMetrics;
use crate::mint::{ConsumedNonces, MintExecutor};
use crate::retry_with_max_elapsed_time;
use crate::session::SessionContext;
use crate::submission_lock::SubmissionLocks;
use crate::types::{
    BurnReceipt, BurnRequest, FinalityThreshold, TransferOutcome, TransferRecord, TransferStage,
    TransferState,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One mint target of a bridging session.
#[derive(Clone)]
pub struct Destination {
    pub chain: Arc<dyn DestinationChain>,
    pub recipient: UniversalAddress,
    pub finality: FinalityThreshold,
}

impl Destination {
    pub fn new(
        chain: Arc<dyn DestinationChain>,
        recipient: UniversalAddress,
        finality: FinalityThreshold,
    ) -> Self {
        Self {
            chain,
            recipient,
            finality,
        }
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("chain", &self.chain.name())
            .field("recipient", &self.recipient)
            .field("finality", &self.finality)
            .finish()
    }
}

pub struct BridgeOrchestrator {
    fee_oracle: Arc<FeeOracle>,
    burn: Arc<BurnExecutor>,
    poller: Arc<AttestationPoller>,
    mint: Arc<MintExecutor>,
    fee_buffer_bps: u64,
    mint_retry_max_elapsed: Duration,
    max_concurrent_destinations: usize,
    metrics: Arc<BridgeMetrics>,
}

impl BridgeOrchestrator {
    pub fn new(
        fee_oracle: Arc<FeeOracle>,
        burn: Arc<BurnExecutor>,
        poller: Arc<AttestationPoller>,
        mint: Arc<MintExecutor>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            fee_oracle,
            burn,
            poller,
            mint,
            fee_buffer_bps: crate::config::default_fee_buffer_bps(),
            mint_retry_max_elapsed: Duration::ZERO,
            max_concurrent_destinations: 1,
            metrics,
        }
    }

    /// Wires every stage from configuration around one attestation client.
    /// Burns and mints share a single set of submission locks.
    pub fn from_config(
        config: &BridgeConfig,
        api: Arc<dyn AttestationApi>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        let locks = Arc::new(SubmissionLocks::new());
        let timeout = config.orchestrator.confirmation_timeout;
        let fee_oracle = FeeOracle::new(api.clone(), config.fees.token_decimals, metrics.clone());
        let burn = BurnExecutor::new(locks.clone(), timeout, metrics.clone());
        let poller = AttestationPoller::new(api, config.polling.clone(), metrics.clone());
        let mut mint = MintExecutor::new(locks, timeout, config.mint.gas_buffer_percent, metrics.clone());
        if config.mint.check_consumed_nonces {
            mint = mint.with_consumed_nonces(Arc::new(ConsumedNonces::new()));
        }
        Self::new(
            Arc::new(fee_oracle),
            Arc::new(burn),
            Arc::new(poller),
            Arc::new(mint),
            metrics,
        )
        .with_fee_buffer_bps(config.fees.buffer_bps)
        .with_mint_retry_max_elapsed(config.mint.retry_max_elapsed)
        .with_max_concurrent_destinations(config.orchestrator.max_concurrent_destinations)
    }

    pub fn with_fee_buffer_bps(mut self, buffer_bps: u64) -> Self {
        self.fee_buffer_bps = buffer_bps;
        self
    }

    /// Zero disables mint retries.
    pub fn with_mint_retry_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.mint_retry_max_elapsed = max_elapsed;
        self
    }

    pub fn with_max_concurrent_destinations(mut self, n: usize) -> Self {
        self.max_concurrent_destinations = n.max(1);
        self
    }

    pub fn fee_oracle(&self) -> &FeeOracle {
        &self.fee_oracle
    }

    /// Burns `amount` once per destination and mints each burn on its
    /// destination. Outcomes are returned in destination order.
    pub async fn bridge(
        &self,
        source: Arc<dyn SourceChain>,
        amount: u64,
        destinations: Vec<Destination>,
        session: &SessionContext,
    ) -> BridgeResult<Vec<TransferOutcome>> {
        session.ensure_active()?;
        if destinations.is_empty() {
            return Err(BridgeError::InvalidRequest("no destinations".into()));
        }
        tracing::info!(
            session = session.id(),
            source = source.name(),
            amount,
            destinations = destinations.len(),
            "Starting bridge session"
        );
        let source = source.as_ref();
        let outcomes = futures::stream::iter(destinations.iter())
            .map(|destination| self.run_destination(source, amount, destination, session))
            .buffered(self.max_concurrent_destinations)
            .collect::<Vec<_>>()
            .await;
        let completed = outcomes.iter().filter(|o| o.is_completed()).count();
        tracing::info!(
            session = session.id(),
            completed,
            failed = outcomes.len() - completed,
            "Bridge session finished"
        );
        Ok(outcomes)
    }

    /// Continues a transfer whose burn is already confirmed: waits for the
    /// attestation of `receipt` and mints it on `destination`.
    pub async fn resume(
        &self,
        receipt: BurnReceipt,
        destination: &Destination,
        session: &SessionContext,
    ) -> TransferOutcome {
        let mut record = TransferRecord::resumed(
            destination.chain.name(),
            receipt.clone(),
            destination.chain.domain(),
            destination.finality,
        );
        tracing::info!(
            session = session.id(),
            destination = destination.chain.name(),
            tx_hash = %receipt.tx_hash,
            "Resuming transfer"
        );
        self.metrics.transfers_inflight.inc();
        let result = self
            .attest_and_mint(destination.chain.as_ref(), &receipt, session, &mut record)
            .await;
        self.finish(record, result)
    }

    async fn run_destination(
        &self,
        source: &dyn SourceChain,
        amount: u64,
        destination: &Destination,
        session: &SessionContext,
    ) -> TransferOutcome {
        let mut record = TransferRecord::new(
            destination.chain.name(),
            source.domain(),
            destination.chain.domain(),
            amount,
            destination.finality,
        );
        self.metrics.transfers_inflight.inc();
        let result = self.drive(source, destination, session, &mut record).await;
        self.finish(record, result)
    }

    async fn drive(
        &self,
        source: &dyn SourceChain,
        destination: &Destination,
        session: &SessionContext,
        record: &mut TransferRecord,
    ) -> BridgeResult<()> {
        session.ensure_active()?;
        let started = Instant::now();
        let (max_fee, fast_allowance) = match destination.finality {
            FinalityThreshold::Standard => (0, None),
            FinalityThreshold::Fast => {
                let quote = self
                    .fee_oracle
                    .quote(source.domain(), destination.chain.domain())
                    .await?;
                let max_fee = max_fee_for(
                    destination.finality,
                    record.amount,
                    quote.minimum_fee_bps,
                    self.fee_buffer_bps,
                );
                (max_fee, Some(quote.fast_allowance))
            }
        };
        record.max_fee = Some(max_fee);
        self.observe_stage(TransferStage::Quoting, started);

        record.advance(TransferState::Burning)?;
        session.ensure_active()?;
        let started = Instant::now();
        let request = BurnRequest {
            source_domain: source.domain(),
            destination_domain: destination.chain.domain(),
            amount: record.amount,
            mint_recipient: destination.recipient,
            max_fee,
            finality: destination.finality,
            destination_caller: UniversalAddress::ZERO,
        };
        let receipt = self
            .burn
            .burn(source, &request, fast_allowance)
            .await
            .map_err(|e| {
                // a broadcast burn may still land; keep its hash for resume
                if let Some(tx_hash) = e.burn_tx_hash() {
                    record.burn = Some(BurnReceipt {
                        tx_hash: tx_hash.to_string(),
                        source_domain: request.source_domain,
                    });
                }
                e
            })?;
        record.burn = Some(receipt.clone());
        self.observe_stage(TransferStage::Burning, started);

        record.advance(TransferState::AwaitingAttestation)?;
        self.attest_and_mint(destination.chain.as_ref(), &receipt, session, record)
            .await
    }

    async fn attest_and_mint(
        &self,
        chain: &dyn DestinationChain,
        receipt: &BurnReceipt,
        session: &SessionContext,
        record: &mut TransferRecord,
    ) -> BridgeResult<()> {
        session.ensure_active()?;
        let started = Instant::now();
        let cancel = session.child_token();
        let _stop_expiry = cancel.clone().drop_guard();
        let proof = self
            .poller
            .poll(receipt, &cancel)
            .await
            .map_err(|e| match e {
                BridgeError::Cancelled => session.cancellation_error(),
                other => other,
            })?;
        record.event_nonce = proof.event_nonce.clone();
        self.observe_stage(TransferStage::AwaitingAttestation, started);

        record.advance(TransferState::Minting)?;
        session.ensure_active()?;
        let started = Instant::now();
        let mint_tx = if self.mint_retry_max_elapsed.is_zero() {
            self.mint.mint(chain, &proof).await?
        } else {
            match retry_with_max_elapsed_time!(
                self.mint.mint(chain, &proof),
                self.mint_retry_max_elapsed,
                |e: &BridgeError| matches!(e, BridgeError::MintSubmissionFailed(_))
            ) {
                Ok(Ok(tx)) => tx,
                Ok(Err(e)) | Err(e) => return Err(e),
            }
        };
        record.mint_tx = Some(mint_tx);
        self.observe_stage(TransferStage::Minting, started);
        record.advance(TransferState::Completed)
    }

    fn finish(&self, mut record: TransferRecord, result: BridgeResult<()>) -> TransferOutcome {
        self.metrics.transfers_inflight.dec();
        match result {
            Ok(()) => {
                self.metrics
                    .transfer_outcomes
                    .with_label_values(&["completed", "none"])
                    .inc();
                tracing::info!(
                    destination = %record.destination,
                    burn_tx = ?record.burn_tx(),
                    mint_tx = ?record.mint_tx,
                    "Transfer completed"
                );
            }
            Err(e) => {
                record.fail(e);
                let stage = record.failed_stage().map(|s| s.as_str()).unwrap_or("none");
                let outcome = match record.error() {
                    Some(BridgeError::Cancelled) | Some(BridgeError::SessionExpired(_)) => "cancelled",
                    _ => "failed",
                };
                self.metrics
                    .transfer_outcomes
                    .with_label_values(&[outcome, stage])
                    .inc();
                tracing::error!(
                    destination = %record.destination,
                    stage,
                    burn_tx = ?record.burn_tx(),
                    "Transfer failed: {:?}",
                    record.error()
                );
            }
        }
        record
    }

    fn observe_stage(&self, stage: TransferStage, started: Instant) {
        self.metrics
            .stage_latency
            .with_label_values(&[stage.as_str()])
            .observe(started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{FastBurnAllowanceResponse, FastBurnFeesResponse};
    use crate::config::PollingConfig;
    use crate::test_utils::{
        init_for_testing, pending_response, ready_response, MockAttestationApi,
        MockDestinationChain, MockSourceChain,
    };
    use crate::types::ChainDomain;

    const AMOUNT: u64 = 10_000_000;

    struct Harness {
        api: MockAttestationApi,
        source: MockSourceChain,
        sepolia: MockDestinationChain,
        arbitrum: MockDestinationChain,
        orchestrator: BridgeOrchestrator,
    }

    fn harness() -> Harness {
        init_for_testing();
        let api = MockAttestationApi::default();
        api.set_fees(
            ChainDomain::SOLANA,
            ChainDomain::ARBITRUM,
            Ok(FastBurnFeesResponse::Single {
                minimum_fee: "1".into(),
            }),
        );
        api.set_allowance(Ok(FastBurnAllowanceResponse {
            allowance: "50".into(),
            last_updated: None,
        }));
        let config = BridgeConfig {
            polling: PollingConfig::default().with_max_wait(Duration::from_secs(60)),
            ..Default::default()
        };
        let orchestrator = BridgeOrchestrator::from_config(
            &config,
            Arc::new(api.clone()),
            Arc::new(BridgeMetrics::new_for_testing()),
        );
        Harness {
            api,
            source: MockSourceChain::solana(),
            sepolia: MockDestinationChain::new("ethereum-sepolia", ChainDomain::ETHEREUM),
            arbitrum: MockDestinationChain::new("arbitrum-sepolia", ChainDomain::ARBITRUM),
            orchestrator,
        }
    }

    impl Harness {
        fn destinations(&self) -> Vec<Destination> {
            vec![
                Destination::new(
                    Arc::new(self.sepolia.clone()),
                    UniversalAddress::new([0xd1; 32]),
                    FinalityThreshold::Standard,
                ),
                Destination::new(
                    Arc::new(self.arbitrum.clone()),
                    UniversalAddress::new([0xd2; 32]),
                    FinalityThreshold::Fast,
                ),
            ]
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_destinations_end_to_end() {
        let h = harness();
        h.api.push_messages("burn-1", Ok(pending_response()));
        h.api
            .push_messages("burn-1", Ok(ready_response(b"msg-d1", b"att-d1", "101")));
        h.api
            .push_messages("burn-2", Ok(ready_response(b"msg-d2", b"att-d2", "102")));

        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                h.destinations(),
                &SessionContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.is_completed()));
        let (d1, d2) = (&outcomes[0], &outcomes[1]);
        assert_eq!(d1.max_fee, Some(0));
        // 10 USDC at 1 bps + 5 bps buffer
        assert_eq!(d2.max_fee, Some(6_000));
        assert_eq!(d1.burn_tx(), Some("burn-1"));
        assert_eq!(d2.burn_tx(), Some("burn-2"));
        assert_eq!(d1.mint_tx.as_deref(), Some("ethereum-sepolia-mint-1"));
        assert_eq!(d2.mint_tx.as_deref(), Some("arbitrum-sepolia-mint-1"));
        assert_eq!(d1.event_nonce.as_deref(), Some("101"));

        let burns = h.source.burns();
        assert_eq!(burns[0].finality, FinalityThreshold::Standard);
        assert_eq!(burns[0].max_fee, 0);
        assert_eq!(burns[0].mint_recipient, UniversalAddress::new([0xd1; 32]));
        assert_eq!(burns[1].finality, FinalityThreshold::Fast);
        assert_eq!(burns[1].destination_domain, ChainDomain::ARBITRUM);
        assert_eq!(burns[1].max_fee, 6_000);

        // each destination only ever sees its own proof
        let d1_mints = h.sepolia.minted();
        let d2_mints = h.arbitrum.minted();
        assert_eq!(d1_mints.len(), 1);
        assert_eq!(d2_mints.len(), 1);
        assert_eq!(d1_mints[0].0.message.as_ref(), b"msg-d1");
        assert_eq!(d1_mints[0].0.attestation.as_ref(), b"att-d1");
        assert_eq!(d2_mints[0].0.message.as_ref(), b"msg-d2");
        assert_eq!(d2_mints[0].0.attestation.as_ref(), b"att-d2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_abort_siblings() {
        let h = harness();
        h.sepolia.push_gas_result(Err(BridgeError::GasEstimationFailed(
            "execution reverted".into(),
        )));
        h.api
            .push_messages("burn-1", Ok(ready_response(b"m1", b"a1", "1")));
        h.api
            .push_messages("burn-2", Ok(ready_response(b"m2", b"a2", "2")));

        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                h.destinations(),
                &SessionContext::default(),
            )
            .await
            .unwrap();
        let (d1, d2) = (&outcomes[0], &outcomes[1]);
        assert_eq!(d1.failed_stage(), Some(TransferStage::Minting));
        assert_eq!(d1.error().map(|e| e.error_type()), Some("gas_estimation_failed"));
        assert_eq!(d1.burn_tx(), Some("burn-1"), "burn hash kept for resumption");
        assert!(d2.is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_destinations_without_event_nonce_both_mint() {
        let h = harness();
        for (tx, message) in [("burn-1", b"m1"), ("burn-2", b"m2")] {
            let mut response = ready_response(message, b"att", "unused");
            if let Some(messages) = response.messages.as_mut() {
                messages[0].event_nonce = None;
            }
            h.api.push_messages(tx, Ok(response));
        }

        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                h.destinations(),
                &SessionContext::default(),
            )
            .await
            .unwrap();
        assert!(outcomes.iter().all(|o| o.is_completed()), "{outcomes:?}");
        assert_eq!(outcomes[0].event_nonce, None);
        assert_eq!(h.sepolia.minted().len(), 1);
        assert_eq!(h.arbitrum.minted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_burn_keeps_hash_for_resume() {
        let h = harness();
        let source = h.source.clone().with_confirm_delay(Duration::from_secs(3600));
        let destinations = h.destinations().split_off(1);
        let outcomes = h
            .orchestrator
            .bridge(Arc::new(source), AMOUNT, destinations, &SessionContext::default())
            .await
            .unwrap();
        let outcome = &outcomes[0];
        assert_eq!(outcome.failed_stage(), Some(TransferStage::Burning));
        assert_eq!(outcome.error().map(|e| e.error_type()), Some("burn_submission_failed"));
        assert_eq!(outcome.burn_tx(), Some("burn-1"));
        assert!(h.arbitrum.minted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_allowance_skips_burn() {
        let h = harness();
        h.api.set_allowance(Ok(FastBurnAllowanceResponse {
            allowance: "9.999999".into(),
            last_updated: None,
        }));
        h.api
            .push_messages("burn-1", Ok(ready_response(b"m1", b"a1", "1")));
        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                h.destinations(),
                &SessionContext::default(),
            )
            .await
            .unwrap();
        assert!(outcomes[0].is_completed());
        assert_eq!(outcomes[1].failed_stage(), Some(TransferStage::Burning));
        assert_eq!(
            outcomes[1].error(),
            Some(&BridgeError::InsufficientAllowance {
                requested: AMOUNT,
                available: 9_999_999
            })
        );
        assert_eq!(outcomes[1].burn_tx(), None);
        assert_eq!(h.source.burns().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fee_query_failure_fails_at_quoting() {
        let h = harness();
        h.api.set_allowance(Err(BridgeError::FeeQueryFailed("503".into())));
        let destinations = h.destinations().split_off(1);
        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                destinations,
                &SessionContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcomes[0].failed_stage(), Some(TransferStage::Quoting));
        assert!(h.source.burns().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_poll_keeps_burn() {
        let h = harness();
        h.api.set_default_messages(Ok(pending_response()));
        let session = SessionContext::default();
        let destinations = h.destinations()[..1].to_vec();

        let invalidate = {
            let session = session.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                session.invalidate();
            })
        };
        let outcomes = h
            .orchestrator
            .bridge(Arc::new(h.source.clone()), AMOUNT, destinations, &session)
            .await
            .unwrap();
        invalidate.await.unwrap();

        let outcome = &outcomes[0];
        assert_eq!(outcome.error(), Some(&BridgeError::Cancelled));
        assert_eq!(outcome.failed_stage(), Some(TransferStage::AwaitingAttestation));
        assert_eq!(outcome.burn_tx(), Some("burn-1"));
        assert_eq!(h.source.burns().len(), 1);
        assert!(h.sepolia.minted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout_is_distinct_from_cancellation() {
        let h = harness();
        h.api.set_default_messages(Ok(pending_response()));
        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                h.destinations()[..1].to_vec(),
                &SessionContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcomes[0].error().map(|e| e.error_type()),
            Some("attestation_timed_out")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expiry_reports_expired() {
        let h = harness();
        h.api.set_default_messages(Ok(pending_response()));
        let session = SessionContext::new(Some(Duration::from_secs(10))).with_id("demo");
        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                h.destinations()[..1].to_vec(),
                &session,
            )
            .await
            .unwrap();
        assert_eq!(
            outcomes[0].error(),
            Some(&BridgeError::SessionExpired("demo".into()))
        );
    }

    #[tokio::test]
    async fn test_inactive_session_and_empty_destinations_rejected() {
        let h = harness();
        let source: Arc<dyn SourceChain> = Arc::new(h.source.clone());
        let err = h
            .orchestrator
            .bridge(source.clone(), AMOUNT, vec![], &SessionContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "invalid_request");

        let session = SessionContext::default();
        session.invalidate();
        let err = h
            .orchestrator
            .bridge(source, AMOUNT, h.destinations(), &session)
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::Cancelled);
        assert!(h.source.burns().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mint_submission_failure_is_retried() {
        let h = harness();
        h.sepolia
            .push_submit_result(Err(BridgeError::ProviderError("nonce too low".into())));
        h.api
            .push_messages("burn-1", Ok(ready_response(b"m1", b"a1", "1")));
        let outcomes = h
            .orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                h.destinations()[..1].to_vec(),
                &SessionContext::default(),
            )
            .await
            .unwrap();
        assert!(outcomes[0].is_completed());
        assert_eq!(h.sepolia.submit_calls(), 2);
        assert_eq!(h.sepolia.minted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_from_receipt() {
        let h = harness();
        h.api
            .push_messages("5abc", Ok(ready_response(b"m", b"a", "77")));
        let destination = h.destinations().remove(0);
        let receipt = BurnReceipt {
            tx_hash: "5abc".into(),
            source_domain: ChainDomain::SOLANA,
        };
        let outcome = h
            .orchestrator
            .resume(receipt, &destination, &SessionContext::default())
            .await;
        assert!(outcome.is_completed());
        assert_eq!(outcome.burn_tx(), Some("5abc"));
        assert_eq!(outcome.event_nonce.as_deref(), Some("77"));
        assert!(h.source.burns().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_destinations() {
        let h = harness();
        let destinations = h.destinations();
        let orchestrator = h.orchestrator.with_max_concurrent_destinations(2);
        h.api.push_messages("burn-1", Ok(pending_response()));
        h.api
            .push_messages("burn-1", Ok(ready_response(b"m1", b"a1", "1")));
        h.api
            .push_messages("burn-2", Ok(ready_response(b"m2", b"a2", "2")));
        let outcomes = orchestrator
            .bridge(
                Arc::new(h.source.clone()),
                AMOUNT,
                destinations,
                &SessionContext::default(),
            )
            .await
            .unwrap();
        assert!(outcomes.iter().all(|o| o.is_completed()));
        assert_eq!(outcomes[0].destination, "ethereum-sepolia");
        assert_eq!(outcomes[1].destination, "arbitrum-sepolia");
        assert_eq!(h.arbitrum.minted()[0].0.message.as_ref(), b"m2");
    }
}
