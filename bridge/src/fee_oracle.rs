// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::attestation::{AttestationApi, DecimalValue, FastBurnFeesResponse};
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::BridgeMetrics;
use crate::types::{ChainDomain, FeeQuote, FinalityThreshold};
use ethers::types::U256;
use ethers::utils::parse_units;
use std::sync::Arc;
use tap::TapFallible;

const BPS_DENOMINATOR: u128 = 10_000;

/// Quotes burn fees and the fast-transfer allowance. Nothing is cached:
/// every quote reflects the service at call time.
pub struct FeeOracle {
    api: Arc<dyn AttestationApi>,
    token_decimals: u32,
    metrics: Arc<BridgeMetrics>,
}

impl FeeOracle {
    pub fn new(api: Arc<dyn AttestationApi>, token_decimals: u32, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            api,
            token_decimals,
            metrics,
        }
    }

    /// Current fast-transfer allowance in the token's smallest unit.
    pub async fn get_allowance(&self) -> BridgeResult<u64> {
        self.metrics
            .fee_queries
            .with_label_values(&["allowance"])
            .inc();
        let response = self.api.fast_burn_allowance().await.tap_err(|e| {
            self.metrics
                .err_fee_queries
                .with_label_values(&["allowance"])
                .inc();
            tracing::error!("Fast burn allowance query failed: {:?}", e);
        })?;
        let allowance = to_base_units(&response.allowance, self.token_decimals)?;
        tracing::debug!(allowance, "Fetched fast burn allowance");
        Ok(allowance)
    }

    /// Minimum fast-transfer fee in basis points, rounded up to a whole basis point.
    pub async fn get_minimum_fee(
        &self,
        source: ChainDomain,
        destination: ChainDomain,
    ) -> BridgeResult<u64> {
        self.metrics.fee_queries.with_label_values(&["fees"]).inc();
        let response = self
            .api
            .fast_burn_fees(source, destination)
            .await
            .tap_err(|e| {
                self.metrics
                    .err_fee_queries
                    .with_label_values(&["fees"])
                    .inc();
                tracing::error!(%source, %destination, "Fast burn fee query failed: {:?}", e);
            })?;
        let fee = match &response {
            FastBurnFeesResponse::Single { minimum_fee } => minimum_fee,
            FastBurnFeesResponse::Tiers(tiers) => {
                &tiers
                    .iter()
                    .find(|t| t.finality_threshold == FinalityThreshold::FAST_VALUE)
                    .ok_or_else(|| {
                        BridgeError::FeeQueryFailed(format!(
                            "no fast tier in fee response for {source} -> {destination}"
                        ))
                    })?
                    .minimum_fee
            }
        };
        let bps = parse_basis_points_ceil(&fee.as_decimal_string())?;
        tracing::debug!(%source, %destination, minimum_fee_bps = bps, "Fetched fast burn fee");
        Ok(bps)
    }

    pub async fn quote(&self, source: ChainDomain, destination: ChainDomain) -> BridgeResult<FeeQuote> {
        let (minimum_fee_bps, fast_allowance) = tokio::try_join!(
            self.get_minimum_fee(source, destination),
            self.get_allowance()
        )?;
        Ok(FeeQuote {
            minimum_fee_bps,
            fast_allowance,
        })
    }
}

/// `amount * (min_bps + buffer_bps) / 10000`, truncating.
pub fn compute_max_fee(amount: u64, minimum_fee_bps: u64, buffer_bps: u64) -> u64 {
    let bps = minimum_fee_bps as u128 + buffer_bps as u128;
    let fee = amount as u128 * bps / BPS_DENOMINATOR;
    u64::try_from(fee).unwrap_or(u64::MAX)
}

/// Max fee for a burn at the given finality. Standard transfers never pay a fee.
pub fn max_fee_for(
    finality: FinalityThreshold,
    amount: u64,
    minimum_fee_bps: u64,
    buffer_bps: u64,
) -> u64 {
    match finality {
        FinalityThreshold::Standard => 0,
        FinalityThreshold::Fast => compute_max_fee(amount, minimum_fee_bps, buffer_bps),
    }
}

fn parse_basis_points_ceil(value: &str) -> BridgeResult<u64> {
    let invalid = || BridgeError::FeeQueryFailed(format!("invalid minimum fee {value:?}"));
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let round_up = fraction.chars().any(|c| c != '0');
    whole.checked_add(round_up as u64).ok_or_else(invalid)
}

/// Converts a decimal token amount into its smallest unit.
pub fn to_base_units(value: &DecimalValue, decimals: u32) -> BridgeResult<u64> {
    let text = value.as_decimal_string();
    if text.starts_with('-') {
        return Err(BridgeError::FeeQueryFailed(format!("negative amount {text}")));
    }
    let units = parse_units(&text, decimals)
        .map_err(|e| BridgeError::FeeQueryFailed(format!("invalid amount {text}: {e}")))?;
    let units = U256::from(units);
    if units > U256::from(u64::MAX) {
        return Err(BridgeError::FeeQueryFailed(format!("amount {text} overflows u64")));
    }
    Ok(units.as_u64())
}
