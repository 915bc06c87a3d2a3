// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chain family adapters.
//!
//! The executors only see the capability traits below. Each family
//! implements the capabilities it supports: EVM chains can burn and mint,
//! the Solana adapter burns only.

pub mod evm;
pub mod solana;

use crate::error::BridgeResult;
use crate::types::{AttestationProof, BurnRequest, ChainDomain};
use async_trait::async_trait;

#[async_trait]
pub trait SourceChain: Send + Sync {
    fn name(&self) -> &str;

    fn domain(&self) -> ChainDomain;

    /// Native-format address of the key that pays for and signs burns.
    fn signer_address(&self) -> String;

    /// Builds, signs and sends exactly one burn. Returns the transaction
    /// hash (or signature) as soon as the node accepted it.
    async fn broadcast_burn(&self, request: &BurnRequest) -> BridgeResult<String>;

    /// Waits until the burn `tx_hash` is confirmed. Fails if it reverted.
    async fn confirm_burn(&self, tx_hash: &str) -> BridgeResult<()>;
}

#[async_trait]
pub trait DestinationChain: Send + Sync {
    fn name(&self) -> &str;

    fn domain(&self) -> ChainDomain;

    fn signer_address(&self) -> String;

    /// Gas the receive call needs, as estimated by the chain. A revert here
    /// means the proof will not be accepted.
    async fn estimate_mint_gas(&self, proof: &AttestationProof) -> BridgeResult<u64>;

    /// Submits the receive call with an explicit gas limit and waits for it
    /// to be confirmed. Returns the transaction hash.
    async fn submit_mint(&self, proof: &AttestationProof, gas_limit: u64) -> BridgeResult<String>;
}
