// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

#![allow(clippy::too_many_arguments, clippy::new_without_default)]

pub mod abi;
pub mod attestation;
pub mod burn;
pub mod chain_registry;
pub mod chains;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fee_oracle;
pub mod metered_eth_provider;
pub mod metrics;
pub mod mint;
pub mod orchestrator;
pub mod session;
pub mod submission_lock;
pub mod types;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

#[macro_export]
macro_rules! retry_with_max_elapsed_time {
    ($func:expr, $max_elapsed_time:expr) => {{
        $crate::retry_with_max_elapsed_time!($func, $max_elapsed_time, |_: &_| true)
    }};
    // Errors for which `$is_transient` returns false stop the retry at once.
    ($func:expr, $max_elapsed_time:expr, $is_transient:expr) => {{
        // The following delay sequence (in secs) will be used, applied with jitter
        // 0.4, 0.8, 1.6, 3.2, 6.4, 12.8, 25.6, 30, 60, 120, 120 ...
        let backoff = backoff::ExponentialBackoff {
            initial_interval: Duration::from_millis(400),
            randomization_factor: 0.1,
            multiplier: 2.0,
            max_interval: Duration::from_secs(120),
            max_elapsed_time: Some($max_elapsed_time),
            ..Default::default()
        };
        let is_transient = $is_transient;
        backoff::future::retry(backoff, || {
            let fut = async {
                let result = $func.await;
                match result {
                    Ok(_) => {
                        return Ok(result);
                    }
                    Err(e) => {
                        if !is_transient(&e) {
                            return Err(backoff::Error::permanent(e));
                        }
                        tracing::debug!("Retrying due to error: {:?}", e);
                        return Err(backoff::Error::transient(e));
                    }
                }
            };
            std::boxed::Box::pin(fut)
        })
        .await
    }};
}
