// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    // The attestation service fee/allowance endpoints could not be read
    #[error("fee query failed: {0}")]
    FeeQueryFailed(String),
    // Fast transfer requested more than the current fast-transfer allowance
    #[error("insufficient fast transfer allowance: requested {requested}, available {available}")]
    InsufficientAllowance { requested: u64, available: u64 },
    // The source chain rejected the burn or it never confirmed. `tx_hash` is
    // set once the burn was broadcast, so a late confirmation can be resumed.
    #[error("burn submission failed: {reason}")]
    BurnSubmissionFailed {
        reason: String,
        tx_hash: Option<String>,
    },
    // No attestation within the configured attempt/wait bounds
    #[error("attestation not ready after {attempts} attempts in {elapsed_secs}s")]
    AttestationTimedOut { attempts: u32, elapsed_secs: u64 },
    // The attestation service kept answering with errors
    #[error("attestation service error: {0}")]
    AttestationServiceError(String),
    // The destination contract reverted during gas estimation
    #[error("gas estimation failed: {0}")]
    GasEstimationFailed(String),
    // The mint transaction failed, reverted or never confirmed
    #[error("mint submission failed: {0}")]
    MintSubmissionFailed(String),
    // Attestation proof is malformed or already consumed
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    // Caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,
    // The session that owns the transfer is past its expiry
    #[error("session {0} expired")]
    SessionExpired(String),
    // Request failed local validation before touching any chain
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    // The chain family does not support this operation
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    // RPC provider error
    #[error("provider error: {0}")]
    ProviderError(String),
    // Configuration or registry lookup error
    #[error("config error: {0}")]
    ConfigError(String),
    // Encoding / decoding failure
    #[error("serialization error: {0}")]
    SerializationError(String),
    // Internal invariant violation
    #[error("internal error: {0}")]
    InternalError(String),
}

impl BridgeError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::FeeQueryFailed(_) => "fee_query_failed",
            BridgeError::InsufficientAllowance { .. } => "insufficient_allowance",
            BridgeError::BurnSubmissionFailed { .. } => "burn_submission_failed",
            BridgeError::AttestationTimedOut { .. } => "attestation_timed_out",
            BridgeError::AttestationServiceError(_) => "attestation_service_error",
            BridgeError::GasEstimationFailed(_) => "gas_estimation_failed",
            BridgeError::MintSubmissionFailed(_) => "mint_submission_failed",
            BridgeError::InvalidProof(_) => "invalid_proof",
            BridgeError::Cancelled => "cancelled",
            BridgeError::SessionExpired(_) => "session_expired",
            BridgeError::InvalidRequest(_) => "invalid_request",
            BridgeError::UnsupportedOperation(_) => "unsupported_operation",
            BridgeError::ProviderError(_) => "provider_error",
            BridgeError::ConfigError(_) => "config_error",
            BridgeError::SerializationError(_) => "serialization_error",
            BridgeError::InternalError(_) => "internal_error",
        }
    }

    /// Whether the caller can recover by retrying.
    ///
    /// Pre-flight failures (fees, allowance) happen before any funds move, so
    /// the whole transfer can be retried. Attestation and mint failures leave
    /// a confirmed burn behind and are recovered by resuming from the receipt.
    /// Burn failures and gas estimation reverts are not retryable: the former
    /// could double-burn, the latter will revert again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::FeeQueryFailed(_)
                | BridgeError::InsufficientAllowance { .. }
                | BridgeError::AttestationTimedOut { .. }
                | BridgeError::AttestationServiceError(_)
                | BridgeError::MintSubmissionFailed(_)
        )
    }

    /// Hash of a burn that was broadcast but did not confirm in time.
    pub fn burn_tx_hash(&self) -> Option<&str> {
        match self {
            BridgeError::BurnSubmissionFailed { tx_hash, .. } => tx_hash.as_deref(),
            _ => None,
        }
    }
}

impl From<ethers::providers::ProviderError> for BridgeError {
    fn from(e: ethers::providers::ProviderError) -> Self {
        BridgeError::ProviderError(e.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
