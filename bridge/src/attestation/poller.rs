// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::{classify_messages, AttestationApi, PollStatus};
use crate::config::{BackoffMode, PollingConfig};
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::BridgeMetrics;
use crate::types::{AttestationProof, BurnReceipt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Polls the attestation service until the burn message is signed.
///
/// The loop is bounded by `max-attempts` (optional), `max-wait` and
/// `max-consecutive-errors`; hitting any of them gives `AttestationTimedOut`.
/// Every request and wait races the caller's cancellation token. Cancelling never affects the
/// burn itself; the receipt stays valid for a later resume.
pub struct AttestationPoller {
    api: Arc<dyn AttestationApi>,
    config: PollingConfig,
    metrics: Arc<BridgeMetrics>,
}

impl AttestationPoller {
    pub fn new(
        api: Arc<dyn AttestationApi>,
        config: PollingConfig,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            api,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    fn next_interval(&self, current: Duration) -> Duration {
        match self.config.backoff {
            BackoffMode::Fixed => current,
            BackoffMode::Exponential => {
                Duration::try_from_secs_f64(current.as_secs_f64() * self.config.backoff_multiplier)
                    .map_or(self.config.max_interval, |next| next.min(self.config.max_interval))
            }
        }
    }

    pub async fn poll(
        &self,
        receipt: &BurnReceipt,
        cancel: &CancellationToken,
    ) -> BridgeResult<AttestationProof> {
        let domain = receipt.source_domain;
        let tx_hash = receipt.tx_hash.as_str();
        let started = Instant::now();
        let deadline = started + self.config.max_wait;
        let mut interval = self.config.interval;
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        tracing::info!(%domain, tx_hash, "Waiting for attestation");
        loop {
            if cancel.is_cancelled() {
                return Err(BridgeError::Cancelled);
            }
            attempts += 1;
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => return Err(self.timed_out(attempts, started)),
                response = self.api.messages(domain, tx_hash) => match response {
                    Ok(response) => classify_messages(domain, &response),
                    Err(e) => PollStatus::Error(e.to_string()),
                },
            };
            self.metrics
                .attestation_polls
                .with_label_values(&[status.label()])
                .inc();

            match status {
                PollStatus::Ready(proof) => {
                    let elapsed = started.elapsed();
                    self.metrics
                        .attestation_wait_latency
                        .with_label_values(&[&domain.to_string()])
                        .observe(elapsed.as_secs_f64());
                    tracing::info!(
                        %domain,
                        tx_hash,
                        attempts,
                        event_nonce = ?proof.event_nonce,
                        "Attestation received after {:?}",
                        elapsed
                    );
                    return Ok(proof);
                }
                PollStatus::Error(msg) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        %domain,
                        tx_hash,
                        attempts,
                        consecutive_errors,
                        "Attestation service error: {}",
                        msg
                    );
                    if consecutive_errors > self.config.max_consecutive_errors {
                        return Err(self.timed_out(attempts, started));
                    }
                }
                PollStatus::NotFound | PollStatus::Pending => {
                    consecutive_errors = 0;
                    tracing::debug!(%domain, tx_hash, attempts, "Attestation {}", status.label());
                }
            }

            if let Some(max_attempts) = self.config.max_attempts {
                if attempts >= max_attempts {
                    return Err(self.timed_out(attempts, started));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(attempts, started));
            }
            let wake = (now + interval).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
                _ = tokio::time::sleep_until(wake) => {}
            }
            if Instant::now() >= deadline {
                return Err(self.timed_out(attempts, started));
            }
            interval = self.next_interval(interval);
        }
    }

    fn timed_out(&self, attempts: u32, started: Instant) -> BridgeError {
        let elapsed_secs = started.elapsed().as_secs();
        tracing::warn!(attempts, elapsed_secs, "Gave up waiting for attestation");
        BridgeError::AttestationTimedOut {
            attempts,
            elapsed_secs,
        }
    }
}
