// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::encoding::UniversalAddress;
use crate::error::{BridgeError, BridgeResult};
use ethers::types::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol domain identifier. Unrelated to the EVM chain id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainDomain(pub u32);

impl ChainDomain {
    pub const ETHEREUM: ChainDomain = ChainDomain(0);
    pub const AVALANCHE: ChainDomain = ChainDomain(1);
    pub const OPTIMISM: ChainDomain = ChainDomain(2);
    pub const ARBITRUM: ChainDomain = ChainDomain(3);
    pub const SOLANA: ChainDomain = ChainDomain(5);
    pub const BASE: ChainDomain = ChainDomain(6);
    pub const POLYGON: ChainDomain = ChainDomain(7);

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChainDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimum finality the burn asks the attesters to wait for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalityThreshold {
    Fast,
    Standard,
}

impl FinalityThreshold {
    pub const FAST_VALUE: u32 = 1000;
    pub const STANDARD_VALUE: u32 = 2000;

    pub fn as_u32(&self) -> u32 {
        match self {
            FinalityThreshold::Fast => Self::FAST_VALUE,
            FinalityThreshold::Standard => Self::STANDARD_VALUE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinalityThreshold::Fast => "fast",
            FinalityThreshold::Standard => "standard",
        }
    }
}

impl TryFrom<u32> for FinalityThreshold {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            Self::FAST_VALUE => Ok(FinalityThreshold::Fast),
            Self::STANDARD_VALUE => Ok(FinalityThreshold::Standard),
            other => Err(BridgeError::InvalidRequest(format!(
                "unknown finality threshold {other}"
            ))),
        }
    }
}

impl FromStr for FinalityThreshold {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" | "1000" => Ok(FinalityThreshold::Fast),
            "standard" | "2000" => Ok(FinalityThreshold::Standard),
            other => Err(BridgeError::InvalidRequest(format!(
                "unknown finality threshold {other}"
            ))),
        }
    }
}

impl fmt::Display for FinalityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One burn, built fresh per destination and immutable once submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BurnRequest {
    pub source_domain: ChainDomain,
    pub destination_domain: ChainDomain,
    /// Smallest token unit.
    pub amount: u64,
    pub mint_recipient: UniversalAddress,
    pub max_fee: u64,
    pub finality: FinalityThreshold,
    /// Zero means any caller may submit the mint.
    pub destination_caller: UniversalAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BurnReceipt {
    pub tx_hash: String,
    pub source_domain: ChainDomain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttestationProof {
    pub source_domain: ChainDomain,
    pub message: Bytes,
    pub attestation: Bytes,
    pub event_nonce: Option<String>,
}

impl AttestationProof {
    pub fn is_populated(&self) -> bool {
        !self.message.is_empty() && !self.attestation.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeeQuote {
    pub minimum_fee_bps: u64,
    /// Smallest token unit.
    pub fast_allowance: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStage {
    Quoting,
    Burning,
    AwaitingAttestation,
    Minting,
}

impl TransferStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStage::Quoting => "quoting",
            TransferStage::Burning => "burning",
            TransferStage::AwaitingAttestation => "awaiting_attestation",
            TransferStage::Minting => "minting",
        }
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferState {
    Quoting,
    Burning,
    AwaitingAttestation,
    Minting,
    Completed,
    Failed {
        stage: TransferStage,
        error: BridgeError,
    },
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed { .. })
    }

    pub fn stage(&self) -> Option<TransferStage> {
        match self {
            TransferState::Quoting => Some(TransferStage::Quoting),
            TransferState::Burning => Some(TransferStage::Burning),
            TransferState::AwaitingAttestation => Some(TransferStage::AwaitingAttestation),
            TransferState::Minting => Some(TransferStage::Minting),
            TransferState::Completed | TransferState::Failed { .. } => None,
        }
    }

    fn can_advance_to(&self, next: &TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Quoting, Burning)
                | (Burning, AwaitingAttestation)
                | (AwaitingAttestation, Minting)
                | (Minting, Completed)
        )
    }
}

/// Per-destination progress; returned to the caller as the transfer outcome.
#[derive(Clone, Debug)]
pub struct TransferRecord {
    pub destination: String,
    pub source_domain: ChainDomain,
    pub destination_domain: ChainDomain,
    pub amount: u64,
    pub finality: FinalityThreshold,
    pub max_fee: Option<u64>,
    pub burn: Option<BurnReceipt>,
    pub event_nonce: Option<String>,
    pub mint_tx: Option<String>,
    state: TransferState,
}

pub type TransferOutcome = TransferRecord;

impl TransferRecord {
    pub fn new(
        destination: impl Into<String>,
        source_domain: ChainDomain,
        destination_domain: ChainDomain,
        amount: u64,
        finality: FinalityThreshold,
    ) -> Self {
        Self {
            destination: destination.into(),
            source_domain,
            destination_domain,
            amount,
            finality,
            max_fee: None,
            burn: None,
            event_nonce: None,
            mint_tx: None,
            state: TransferState::Quoting,
        }
    }

    /// A record for a transfer whose burn already happened.
    pub fn resumed(
        destination: impl Into<String>,
        receipt: BurnReceipt,
        destination_domain: ChainDomain,
        finality: FinalityThreshold,
    ) -> Self {
        Self {
            destination: destination.into(),
            source_domain: receipt.source_domain,
            destination_domain,
            amount: 0,
            finality,
            max_fee: None,
            burn: Some(receipt),
            event_nonce: None,
            mint_tx: None,
            state: TransferState::AwaitingAttestation,
        }
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn advance(&mut self, next: TransferState) -> BridgeResult<()> {
        if !self.state.can_advance_to(&next) {
            return Err(BridgeError::InternalError(format!(
                "illegal transfer transition {:?} -> {:?}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Moves a non-terminal record to `Failed` at its current stage.
    pub fn fail(&mut self, error: BridgeError) {
        if let Some(stage) = self.state.stage() {
            self.state = TransferState::Failed { stage, error };
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == TransferState::Completed
    }

    pub fn error(&self) -> Option<&BridgeError> {
        match &self.state {
            TransferState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn failed_stage(&self) -> Option<TransferStage> {
        match &self.state {
            TransferState::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn burn_tx(&self) -> Option<&str> {
        self.burn.as_ref().map(|b| b.tx_hash.as_str())
    }
}
