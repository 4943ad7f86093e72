use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::Clock;
use crate::storage::KeyValueStore;

/// Capability record with an absolute expiry
pub trait ExpiringToken: Serialize + DeserializeOwned {
    fn expires_at(&self) -> DateTime<Utc>;

    /// Extra condition beyond the expiry check
    fn is_granted(&self) -> bool {
        true
    }
}

/// Confidential pricing grant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfidentialToken {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub granted_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl ExpiringToken for ConfidentialToken {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Site-wide password grant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteAccessToken {
    pub verified: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl ExpiringToken for SiteAccessToken {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn is_granted(&self) -> bool {
        self.verified
    }
}

/// Persists one token of type `T` under a fixed key.
///
/// Corrupt or missing data reads as `None`. A token is valid strictly before
/// its `expires_at`.
pub struct TokenStore<T> {
    key: &'static str,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    _token: PhantomData<fn() -> T>,
}

impl<T: ExpiringToken> TokenStore<T> {
    pub fn new(key: &'static str, storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            key,
            storage,
            clock,
            _token: PhantomData,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn set(&self, token: &T) {
        match serde_json::to_string(token) {
            Ok(json) => self.storage.set(self.key, &json),
            Err(e) => debug!(key = self.key, error = %e, "Failed to serialize token"),
        }
    }

    pub fn get(&self) -> Option<T> {
        let raw = self.storage.get(self.key)?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!(key = self.key, error = %e, "Ignoring corrupt token");
                None
            }
        }
    }

    pub fn is_valid(&self, token: Option<&T>) -> bool {
        token.map_or(false, |t| t.is_granted() && self.now() < t.expires_at())
    }

    pub fn clear(&self) {
        self.storage.remove(self.key);
    }

    /// Read the token and return it only while valid. Anything stored that
    /// fails the check (expired, revoked or unreadable) is removed.
    pub fn load_valid(&self) -> Option<T> {
        let token = self.get();
        if self.is_valid(token.as_ref()) {
            return token;
        }
        if self.storage.get(self.key).is_some() {
            debug!(key = self.key, "Clearing stale token");
            self.clear();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, TokenStore<ConfidentialToken>) {
        let storage = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        ));
        let store = TokenStore::new("test_token", storage.clone(), clock.clone());
        (storage, clock, store)
    }

    #[test]
    fn test_valid_until_expiry_then_cleared() {
        let (storage, clock, store) = setup();
        let now = clock.now();
        store.set(&ConfidentialToken {
            granted_at: now,
            expires_at: now + Duration::hours(24),
        });

        assert!(store.load_valid().is_some());

        clock.advance(Duration::hours(24));
        assert!(!store.is_valid(store.get().as_ref()), "expiry instant is invalid");
        assert!(store.load_valid().is_none());
        assert!(store.get().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_corrupt_token_reads_as_absent() {
        let (storage, _clock, store) = setup();
        storage.set("test_token", "{\"grantedAt\":");

        assert!(store.get().is_none());
        assert!(store.load_valid().is_none());
        assert!(storage.get("test_token").is_none());
    }

    #[test]
    fn test_persisted_shape_uses_millis() {
        let (storage, clock, store) = setup();
        let now = clock.now();
        store.set(&ConfidentialToken {
            granted_at: now,
            expires_at: now + Duration::minutes(1),
        });

        let raw: serde_json::Value =
            serde_json::from_str(&storage.get("test_token").unwrap()).unwrap();
        assert_eq!(raw["grantedAt"], now.timestamp_millis());
        assert_eq!(raw["expiresAt"], now.timestamp_millis() + 60_000);
    }

    #[test]
    fn test_unverified_site_token_is_invalid() {
        let storage = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store: TokenStore<SiteAccessToken> =
            TokenStore::new("site", storage.clone(), clock.clone());

        store.set(&SiteAccessToken {
            verified: false,
            expires_at: clock.now() + Duration::hours(1),
        });
        assert!(store.load_valid().is_none());
        assert!(storage.is_empty());
    }
}
