// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::{AttestationApi, FastBurnAllowanceResponse, FastBurnFeesResponse, MessagesResponse};
use crate::config::AttestationServiceConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::types::ChainDomain;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// REST client for the attestation (Iris) service.
#[derive(Clone, Debug)]
pub struct IrisClient {
    http_client: reqwest::Client,
    base_url: String,
    asset: String,
}

enum Fetched<T> {
    Found(T),
    NotFound,
}

impl IrisClient {
    pub fn new(config: &AttestationServiceConfig) -> BridgeResult<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BridgeError::ConfigError(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            asset: config.asset.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Fetched<T>, String> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "[Iris] >>> GET");
        let response = self
            .http_client
            .get(&url)
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(%url, "[Iris] <<< 404");
            return Ok(Fetched::NotFound);
        }
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed reading response from {url}: {e}"))?;
        if !status.is_success() {
            return Err(format!("HTTP error {status} from {url}: {body}"));
        }
        serde_json::from_str(&body)
            .map(Fetched::Found)
            .map_err(|e| format!("undecodable response from {url}: {e}; body: {body}"))
    }
}

#[async_trait]
impl AttestationApi for IrisClient {
    async fn fast_burn_fees(
        &self,
        source: ChainDomain,
        destination: ChainDomain,
    ) -> BridgeResult<FastBurnFeesResponse> {
        let path = format!("/fastBurn/{}/fees/{}/{}", self.asset, source, destination);
        match self.get_json(&path, &[]).await {
            Ok(Fetched::Found(fees)) => Ok(fees),
            Ok(Fetched::NotFound) => Err(BridgeError::FeeQueryFailed(format!(
                "no fast burn fees for route {source} -> {destination}"
            ))),
            Err(e) => Err(BridgeError::FeeQueryFailed(e)),
        }
    }

    async fn fast_burn_allowance(&self) -> BridgeResult<FastBurnAllowanceResponse> {
        let path = format!("/fastBurn/{}/allowance", self.asset);
        match self.get_json(&path, &[]).await {
            Ok(Fetched::Found(allowance)) => Ok(allowance),
            Ok(Fetched::NotFound) => Err(BridgeError::FeeQueryFailed(format!(
                "no fast burn allowance for {}",
                self.asset
            ))),
            Err(e) => Err(BridgeError::FeeQueryFailed(e)),
        }
    }

    async fn messages(
        &self,
        source: ChainDomain,
        tx_hash: &str,
    ) -> BridgeResult<MessagesResponse> {
        let path = format!("/messages/{source}");
        match self.get_json(&path, &[("transactionHash", tx_hash)]).await {
            Ok(Fetched::Found(messages)) => Ok(messages),
            Ok(Fetched::NotFound) => Ok(MessagesResponse::default()),
            Err(e) => Err(BridgeError::AttestationServiceError(e)),
        }
    }
}
