// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{BridgeError, BridgeResult};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-owned session for one bridging run.
///
/// Carries an identity, an optional expiry and a cancellation token.
/// Invalidating the session cancels every in-flight attestation wait that
/// was started under it.
#[derive(Clone, Debug)]
pub struct SessionContext {
    id: String,
    expires_at: Option<Instant>,
    cancel: CancellationToken,
}

impl SessionContext {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.is_expired()
    }

    pub fn ensure_active(&self) -> BridgeResult<()> {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        if self.is_expired() {
            return Err(BridgeError::SessionExpired(self.id.clone()));
        }
        Ok(())
    }

    pub fn invalidate(&self) {
        tracing::info!(session = %self.id, "Session invalidated");
        self.cancel.cancel();
    }

    /// Token that fires when the session is invalidated or reaches its expiry.
    pub fn child_token(&self) -> CancellationToken {
        let child = self.cancel.child_token();
        if let Some(expires_at) = self.expires_at {
            let expiring = child.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = expiring.cancelled() => {}
                    _ = tokio::time::sleep_until(expires_at) => expiring.cancel(),
                }
            });
        }
        child
    }

    /// The error to report for a cancelled stage: expiry wins over plain cancellation.
    pub fn cancellation_error(&self) -> BridgeError {
        if self.is_expired() {
            BridgeError::SessionExpired(self.id.clone())
        } else {
            BridgeError::Cancelled
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(None)
    }
}
