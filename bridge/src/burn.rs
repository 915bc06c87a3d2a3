// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chains::SourceChain;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::BridgeMetrics;
use crate::submission_lock::SubmissionLocks;
use crate::types::{BurnReceipt, BurnRequest, FinalityThreshold};
use std::sync::Arc;
use std::time::Duration;
use tap::TapFallible;
use tokio::time::Instant;

/// Validates burn requests and submits them through a source chain adapter.
///
/// A burn is submitted at most once per call. Failures are reported as
/// `BurnSubmissionFailed` and never retried here: a retry after an
/// ambiguous failure could burn the funds twice.
pub struct BurnExecutor {
    locks: Arc<SubmissionLocks>,
    confirmation_timeout: Duration,
    metrics: Arc<BridgeMetrics>,
}

impl BurnExecutor {
    pub fn new(
        locks: Arc<SubmissionLocks>,
        confirmation_timeout: Duration,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            locks,
            confirmation_timeout,
            metrics,
        }
    }

    /// Local checks that must pass before anything is sent on chain.
    ///
    /// `fast_allowance` is the allowance fetched for this transfer; it is
    /// required for fast burns and ignored for standard ones.
    pub fn validate(request: &BurnRequest, fast_allowance: Option<u64>) -> BridgeResult<()> {
        if request.amount == 0 {
            return Err(BridgeError::InvalidRequest("amount must be positive".into()));
        }
        if request.source_domain == request.destination_domain {
            return Err(BridgeError::InvalidRequest(format!(
                "source and destination are both domain {}",
                request.source_domain
            )));
        }
        if request.mint_recipient.is_zero() {
            return Err(BridgeError::InvalidRequest("mint recipient is zero".into()));
        }
        if request.max_fee >= request.amount {
            return Err(BridgeError::InvalidRequest(format!(
                "max fee {} must be below amount {}",
                request.max_fee, request.amount
            )));
        }
        match request.finality {
            FinalityThreshold::Standard => {
                if request.max_fee != 0 {
                    return Err(BridgeError::InvalidRequest(format!(
                        "standard transfers carry no fee, got max fee {}",
                        request.max_fee
                    )));
                }
            }
            FinalityThreshold::Fast => {
                let available = fast_allowance.ok_or_else(|| {
                    BridgeError::InvalidRequest(
                        "fast transfer requires the current fast allowance".into(),
                    )
                })?;
                if available < request.amount {
                    return Err(BridgeError::InsufficientAllowance {
                        requested: request.amount,
                        available,
                    });
                }
            }
        }
        Ok(())
    }

    pub async fn burn(
        &self,
        chain: &dyn SourceChain,
        request: &BurnRequest,
        fast_allowance: Option<u64>,
    ) -> BridgeResult<BurnReceipt> {
        let domain_label = request.source_domain.to_string();
        Self::validate(request, fast_allowance)
            .and_then(|_| {
                if chain.domain() != request.source_domain {
                    return Err(BridgeError::InvalidRequest(format!(
                        "request is for domain {} but chain {} is domain {}",
                        request.source_domain,
                        chain.name(),
                        chain.domain()
                    )));
                }
                Ok(())
            })
            .tap_err(|e| {
                self.metrics
                    .err_burns
                    .with_label_values(&[&domain_label, e.error_type()])
                    .inc();
                tracing::warn!(chain = chain.name(), "Burn request rejected: {}", e);
            })?;

        let signer = chain.signer_address();
        tracing::info!(
            chain = chain.name(),
            destination_domain = %request.destination_domain,
            amount = request.amount,
            max_fee = request.max_fee,
            finality = %request.finality,
            "Submitting burn"
        );
        let _guard = self.locks.acquire(chain.domain(), &signer).await;
        let deadline = Instant::now() + self.confirmation_timeout;
        let tx_hash = match tokio::time::timeout_at(deadline, chain.broadcast_burn(request)).await {
            Ok(Ok(tx_hash)) => tx_hash,
            Ok(Err(e)) => {
                let err = submission_failed(e, None);
                return Err(self.record_failure(&domain_label, chain.name(), err));
            }
            Err(_) => {
                let err = BridgeError::BurnSubmissionFailed {
                    reason: format!("burn not broadcast within {:?}", self.confirmation_timeout),
                    tx_hash: None,
                };
                return Err(self.record_failure(&domain_label, chain.name(), err));
            }
        };
        tracing::info!(chain = chain.name(), %tx_hash, "Burn broadcast, waiting for confirmation");
        match tokio::time::timeout_at(deadline, chain.confirm_burn(&tx_hash)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let err = submission_failed(e, Some(tx_hash));
                return Err(self.record_failure(&domain_label, chain.name(), err));
            }
            Err(_) => {
                let err = BridgeError::BurnSubmissionFailed {
                    reason: format!(
                        "burn {tx_hash} not confirmed within {:?}",
                        self.confirmation_timeout
                    ),
                    tx_hash: Some(tx_hash),
                };
                return Err(self.record_failure(&domain_label, chain.name(), err));
            }
        }

        self.metrics
            .burns_submitted
            .with_label_values(&[&domain_label, request.finality.as_str()])
            .inc();
        tracing::info!(chain = chain.name(), ?tx_hash, "Burn confirmed");
        Ok(BurnReceipt {
            tx_hash,
            source_domain: request.source_domain,
        })
    }

    fn record_failure(&self, domain_label: &str, chain: &str, err: BridgeError) -> BridgeError {
        self.metrics
            .err_burns
            .with_label_values(&[domain_label, err.error_type()])
            .inc();
        tracing::error!(chain, tx_hash = ?err.burn_tx_hash(), "Burn failed: {}", err);
        err
    }
}

fn submission_failed(err: BridgeError, tx_hash: Option<String>) -> BridgeError {
    match err {
        BridgeError::BurnSubmissionFailed {
            reason,
            tx_hash: inner,
        } => BridgeError::BurnSubmissionFailed {
            reason,
            tx_hash: inner.or(tx_hash),
        },
        other => BridgeError::BurnSubmissionFailed {
            reason: other.to_string(),
            tx_hash,
        },
    }
}
