// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Instructions the burn transaction is made of.

use crate::types::ChainDomain;
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account_interface::address::get_associated_token_address_with_program_id;

pub const TOKEN_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::from_str_const("11111111111111111111111111111111");

/// First 8 bytes of `sha256("global:<name>")`.
pub fn anchor_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, &TOKEN_PROGRAM_ID)
}

/// Creates `owner`'s associated token account for `mint` unless it exists.
pub fn create_token_account_idempotent(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    spl_associated_token_account_interface::instruction::create_associated_token_account_idempotent(
        payer,
        owner,
        mint,
        &TOKEN_PROGRAM_ID,
    )
}

/// State accounts of the message transmitter and token messenger minter
/// programs that a burn towards `destination_domain` touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositForBurnPdas {
    pub message_transmitter: Pubkey,
    pub token_messenger: Pubkey,
    pub token_minter: Pubkey,
    pub local_token: Pubkey,
    pub remote_token_messenger: Pubkey,
    pub sender_authority: Pubkey,
    pub denylist: Pubkey,
    pub event_authority: Pubkey,
}

impl DepositForBurnPdas {
    pub fn derive(
        message_transmitter_program: &Pubkey,
        token_messenger_minter_program: &Pubkey,
        mint: &Pubkey,
        owner: &Pubkey,
        destination_domain: ChainDomain,
    ) -> Self {
        let tmm = token_messenger_minter_program;
        let pda = |seeds: &[&[u8]], program: &Pubkey| Pubkey::find_program_address(seeds, program).0;
        let domain = destination_domain.to_string();
        Self {
            message_transmitter: pda(&[b"message_transmitter"], message_transmitter_program),
            token_messenger: pda(&[b"token_messenger"], tmm),
            token_minter: pda(&[b"token_minter"], tmm),
            local_token: pda(&[b"local_token", mint.as_ref()], tmm),
            remote_token_messenger: pda(&[b"remote_token_messenger", domain.as_bytes()], tmm),
            sender_authority: pda(&[b"sender_authority"], tmm),
            denylist: pda(&[b"denylist_account", owner.as_ref()], tmm),
            event_authority: pda(&[b"__event_authority"], tmm),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositForBurnParams {
    pub amount: u64,
    pub destination_domain: u32,
    pub mint_recipient: Pubkey,
    pub destination_caller: Pubkey,
    pub max_fee: u64,
    pub min_finality_threshold: u32,
}

impl DepositForBurnParams {
    /// Borsh layout: little-endian integers, keys as raw 32 bytes.
    fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(8 + 8 + 4 + 32 + 32 + 8 + 4);
        data.extend_from_slice(&anchor_discriminator("deposit_for_burn"));
        data.extend_from_slice(&self.amount.to_le_bytes());
        data.extend_from_slice(&self.destination_domain.to_le_bytes());
        data.extend_from_slice(self.mint_recipient.as_ref());
        data.extend_from_slice(self.destination_caller.as_ref());
        data.extend_from_slice(&self.max_fee.to_le_bytes());
        data.extend_from_slice(&self.min_finality_threshold.to_le_bytes());
        data
    }
}

pub struct DepositForBurnAccounts<'a> {
    pub owner: &'a Pubkey,
    pub burn_token_account: &'a Pubkey,
    pub mint: &'a Pubkey,
    pub message_sent_event_data: &'a Pubkey,
    pub message_transmitter_program: &'a Pubkey,
    pub token_messenger_minter_program: &'a Pubkey,
    pub pdas: &'a DepositForBurnPdas,
}

pub fn deposit_for_burn(
    accounts: &DepositForBurnAccounts<'_>,
    params: &DepositForBurnParams,
) -> Instruction {
    let pdas = accounts.pdas;
    let tmm = *accounts.token_messenger_minter_program;
    Instruction::new_with_bytes(
        tmm,
        &params.encode(),
        vec![
            AccountMeta::new_readonly(*accounts.owner, true),
            // event rent payer
            AccountMeta::new(*accounts.owner, true),
            AccountMeta::new_readonly(pdas.sender_authority, false),
            AccountMeta::new(*accounts.burn_token_account, false),
            AccountMeta::new_readonly(pdas.denylist, false),
            AccountMeta::new(pdas.message_transmitter, false),
            AccountMeta::new_readonly(pdas.token_messenger, false),
            AccountMeta::new_readonly(pdas.remote_token_messenger, false),
            AccountMeta::new_readonly(pdas.token_minter, false),
            AccountMeta::new(pdas.local_token, false),
            AccountMeta::new(*accounts.mint, false),
            AccountMeta::new(*accounts.message_sent_event_data, true),
            AccountMeta::new_readonly(*accounts.message_transmitter_program, false),
            AccountMeta::new_readonly(tmm, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(pdas.event_authority, false),
            AccountMeta::new_readonly(tmm, false),
        ],
    )
}
