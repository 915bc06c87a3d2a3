// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::metrics::BridgeMetrics;
use ethers::providers::{Http, HttpClientError, JsonRpcClient, Provider};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use url::{ParseError, Url};

const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// HTTP transport that counts and times every JSON-RPC call and backs off
/// when the node answers with a rate limit.
#[derive(Debug, Clone)]
pub struct MeteredEthHttpProvider {
    inner: Http,
    metrics: Arc<BridgeMetrics>,
}

// Public testnet endpoints do not agree on a rate limit error shape, so this
// matches on the rendered error.
fn is_rate_limited(error: &HttpClientError) -> bool {
    let rendered = format!("{:?}", error).to_lowercase();
    rendered.contains("rate limit")
        || rendered.contains("429")
        || rendered.contains("too many requests")
        || rendered.contains("-32005")
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl JsonRpcClient for MeteredEthHttpProvider {
    type Error = HttpClientError;

    async fn request<T: Serialize + Send + Sync + Debug, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, HttpClientError> {
        self.metrics
            .eth_rpc_queries
            .with_label_values(&[method])
            .inc();
        let _guard = self
            .metrics
            .eth_rpc_queries_latency
            .with_label_values(&[method])
            .start_timer();

        let mut result = self.inner.request(method, &params).await;
        let mut retry_count = 0;
        while retry_count < MAX_RATE_LIMIT_RETRIES {
            match &result {
                Err(e) if is_rate_limited(e) => {}
                _ => break,
            }
            // 1s, 2s, 4s
            let backoff = Duration::from_secs(1 << retry_count);
            tracing::warn!(
                method,
                "Rate limited by RPC node, retrying after {:?} (attempt {}/{})",
                backoff,
                retry_count + 1,
                MAX_RATE_LIMIT_RETRIES
            );
            tokio::time::sleep(backoff).await;
            result = self.inner.request(method, &params).await;
            retry_count += 1;
        }
        result
    }
}

impl MeteredEthHttpProvider {
    pub fn new(url: impl Into<Url>, metrics: Arc<BridgeMetrics>) -> Self {
        Self {
            inner: Http::new(url),
            metrics,
        }
    }
}

pub fn new_metered_eth_provider(
    url: &str,
    metrics: Arc<BridgeMetrics>,
) -> Result<Provider<MeteredEthHttpProvider>, ParseError> {
    let http_provider = MeteredEthHttpProvider::new(Url::parse(url)?, metrics);
    Ok(Provider::new(http_provider))
}
