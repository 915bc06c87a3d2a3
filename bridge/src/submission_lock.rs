// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::types::ChainDomain;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serialises transaction submissions per (chain domain, signer address) so
/// that concurrent transfers never race for the same account nonce.
#[derive(Debug, Default)]
pub struct SubmissionLocks {
    locks: Mutex<HashMap<(ChainDomain, String), Arc<Mutex<()>>>>,
}

impl SubmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, domain: ChainDomain, signer: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry((domain, signer.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}
