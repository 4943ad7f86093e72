use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::token_store::{ConfidentialToken, TokenStore};
use crate::services::PasswordVerifier;

pub const CONFIDENTIAL_TOKEN_KEY: &str = "confidential_access_token";

/// Snapshot of confidential pricing access
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessState {
    pub has_access: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub time_remaining: Option<String>,
}

/// Time-boxed access to confidential deal prices
pub struct ConfidentialAccess {
    tokens: TokenStore<ConfidentialToken>,
    verifier: Arc<dyn PasswordVerifier>,
    duration: Duration,
    state: Mutex<AccessState>,
}

impl ConfidentialAccess {
    pub fn new(
        tokens: TokenStore<ConfidentialToken>,
        verifier: Arc<dyn PasswordVerifier>,
        duration: Duration,
    ) -> Self {
        let access = Self {
            tokens,
            verifier,
            duration,
            state: Mutex::new(AccessState::default()),
        };
        access.check_access();
        access
    }

    pub fn state(&self) -> AccessState {
        self.lock().clone()
    }

    pub fn has_access(&self) -> bool {
        self.lock().has_access
    }

    /// On a verified password a new grant replaces any existing one. A
    /// rejected password or a verifier failure leaves everything as it was.
    pub async fn grant_access(&self, password: &str) -> bool {
        match self.verifier.verify(password).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Confidential access password rejected");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Confidential access verification failed");
                return false;
            }
        }

        let now = self.tokens.now();
        let token = ConfidentialToken {
            granted_at: now,
            expires_at: now + self.duration,
        };
        self.tokens.set(&token);
        info!(expires_at = %token.expires_at, "Confidential access granted");

        self.publish(Some(token));
        true
    }

    pub fn revoke_access(&self) {
        self.tokens.clear();
        *self.lock() = AccessState::default();
        info!("Confidential access revoked");
    }

    /// Re-read storage, dropping an expired grant
    pub fn check_access(&self) -> bool {
        let token = self.tokens.load_valid();
        self.publish(token)
    }

    /// Keep `time_remaining` current and drop access the moment it expires
    pub fn spawn_refresh(self: &Arc<Self>, every: StdDuration) -> RefreshHandle {
        let access = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                let wait = access.next_wake(every);
                tokio::time::sleep(wait).await;
                let before = access.has_access();
                if before && !access.check_access() {
                    info!("Confidential access expired");
                }
            }
        });
        RefreshHandle { handle }
    }

    fn next_wake(&self, every: StdDuration) -> StdDuration {
        let Some(expires_at) = self.lock().expires_at else {
            return every;
        };
        let until_expiry = (expires_at - self.tokens.now())
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        until_expiry.min(every)
    }

    fn publish(&self, token: Option<ConfidentialToken>) -> bool {
        let now = self.tokens.now();
        let next = match token {
            Some(token) => AccessState {
                has_access: true,
                expires_at: Some(token.expires_at),
                time_remaining: format_remaining(token.expires_at - now),
            },
            None => AccessState::default(),
        };
        let has_access = next.has_access;
        *self.lock() = next;
        has_access
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AccessState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Running refresh timer; stops when dropped
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// "5h 12m" with at least an hour left, "42m" below that, floored
pub fn format_remaining(remaining: Duration) -> Option<String> {
    if remaining <= Duration::zero() {
        return None;
    }
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    if hours > 0 {
        Some(format!("{hours}h {minutes}m"))
    } else {
        Some(format!("{minutes}m"))
    }
}
