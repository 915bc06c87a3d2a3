// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Attestation service access.
//!
//! `AttestationApi` is the seam between the bridge stages and the REST
//! service that quotes fees and signs burn messages. `IrisClient` talks to
//! the real service; tests script responses through the mock in `test_utils`.

mod iris;
mod poller;

pub use iris::IrisClient;
pub use poller::AttestationPoller;

use crate::encoding::decode_hex;
use crate::error::BridgeResult;
use crate::types::{AttestationProof, ChainDomain};
use async_trait::async_trait;
use ethers::types::Bytes;
use serde::{Deserialize, Serialize};

/// Marker the service uses while the attestation is not signed yet.
pub const PENDING_ATTESTATION: &str = "PENDING";

/// A service value that may be encoded as a JSON number or a decimal string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalValue {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalValue {
    pub fn as_decimal_string(&self) -> String {
        match self {
            DecimalValue::Number(n) => n.to_string(),
            DecimalValue::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&str> for DecimalValue {
    fn from(s: &str) -> Self {
        DecimalValue::Text(s.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTier {
    pub finality_threshold: u32,
    pub minimum_fee: DecimalValue,
}

/// The fee endpoint answers either with a single minimum fee or with one
/// entry per finality threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FastBurnFeesResponse {
    Tiers(Vec<FeeTier>),
    Single {
        #[serde(rename = "minimumFee")]
        minimum_fee: DecimalValue,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastBurnAllowanceResponse {
    pub allowance: DecimalValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<AttestationMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

/// One poll response, classified.
#[derive(Clone, Debug, PartialEq)]
pub enum PollStatus {
    NotFound,
    Pending,
    Ready(AttestationProof),
    Error(String),
}

impl PollStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PollStatus::NotFound => "not_found",
            PollStatus::Pending => "pending",
            PollStatus::Ready(_) => "ready",
            PollStatus::Error(_) => "error",
        }
    }
}

fn is_blank_hex(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s == "0x"
}

/// Classifies a messages response. Only the first message is considered.
pub fn classify_messages(source_domain: ChainDomain, response: &MessagesResponse) -> PollStatus {
    if let Some(error) = &response.error {
        let msg = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return PollStatus::Error(msg);
    }
    let Some(first) = response.messages.as_ref().and_then(|m| m.first()) else {
        return PollStatus::NotFound;
    };
    let attestation = match first.attestation.as_deref() {
        None => return PollStatus::Pending,
        Some(a) if a == PENDING_ATTESTATION || is_blank_hex(a) => return PollStatus::Pending,
        Some(a) => a,
    };
    let message = match first.message.as_deref() {
        Some(m) if !is_blank_hex(m) => m,
        _ => return PollStatus::Pending,
    };
    let (message, attestation) = match (decode_hex(message), decode_hex(attestation)) {
        (Ok(m), Ok(a)) => (m, a),
        (Err(e), _) | (_, Err(e)) => {
            return PollStatus::Error(format!("undecodable attestation payload: {e}"))
        }
    };
    PollStatus::Ready(AttestationProof {
        source_domain,
        message: Bytes::from(message),
        attestation: Bytes::from(attestation),
        event_nonce: first.event_nonce.clone(),
    })
}

#[async_trait]
pub trait AttestationApi: Send + Sync {
    /// `GET /fastBurn/{asset}/fees/{source}/{destination}`
    async fn fast_burn_fees(
        &self,
        source: ChainDomain,
        destination: ChainDomain,
    ) -> BridgeResult<FastBurnFeesResponse>;

    /// `GET /fastBurn/{asset}/allowance`
    async fn fast_burn_allowance(&self) -> BridgeResult<FastBurnAllowanceResponse>;

    /// `GET /messages/{source}?transactionHash={tx_hash}`. A 404 is an empty response.
    async fn messages(&self, source: ChainDomain, tx_hash: &str)
        -> BridgeResult<MessagesResponse>;
}
