use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use super::token_store::{SiteAccessToken, TokenStore};
use crate::services::{AuthService, PasswordVerifier};

pub const SITE_TOKEN_KEY: &str = "site_access_token";

/// Shared-password gate in front of the public catalog.
///
/// Verification and persistence are separate steps: `verify_password` only
/// answers whether the password is right, `set_site_access_token` records the
/// grant.
pub struct SiteAccessGate {
    tokens: TokenStore<SiteAccessToken>,
    auth: Arc<dyn AuthService>,
    verifier: Arc<dyn PasswordVerifier>,
    duration: Duration,
    admin_prefix: String,
}

impl SiteAccessGate {
    pub fn new(
        tokens: TokenStore<SiteAccessToken>,
        auth: Arc<dyn AuthService>,
        verifier: Arc<dyn PasswordVerifier>,
        duration: Duration,
        admin_prefix: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            auth,
            verifier,
            duration,
            admin_prefix: admin_prefix.into(),
        }
    }

    /// Admin routes carry their own sign-in and never see this gate
    pub fn requires_gate(&self, path: &str) -> bool {
        let prefix = self.admin_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(prefix) {
            Some(rest) => !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')),
            None => true,
        }
    }

    /// Signed-in admins pass regardless of any stored token
    pub async fn check_site_access(&self) -> bool {
        match self.auth.current_admin().await {
            Ok(Some(admin)) => {
                debug!(email = %admin.email, "Admin bypasses site access gate");
                return true;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Admin lookup failed, falling back to site token"),
        }
        self.tokens.load_valid().is_some()
    }

    /// Whether the page at `path` may be shown without a password prompt
    pub async fn check_path(&self, path: &str) -> bool {
        if !self.requires_gate(path) {
            return true;
        }
        self.check_site_access().await
    }

    pub async fn verify_password(&self, password: &str) -> bool {
        match self.verifier.verify(password).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "Site password verification failed");
                false
            }
        }
    }

    pub fn set_site_access_token(&self) {
        let token = SiteAccessToken {
            verified: true,
            expires_at: self.tokens.now() + self.duration,
        };
        self.tokens.set(&token);
        info!(expires_at = %token.expires_at, "Site access granted");
    }

    pub fn clear_site_access(&self) {
        self.tokens.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::clock::ManualClock;
    use crate::error::{ServiceError, ServiceResult};
    use crate::models::{AdminRole, AdminUser};
    use crate::services::SharedSecretVerifier;
    use crate::storage::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use chrono::Utc;

    struct FixedAuth(Option<AdminUser>);

    #[async_trait]
    impl AuthService for FixedAuth {
        async fn current_admin(&self) -> ServiceResult<Option<AdminUser>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenAuth;

    #[async_trait]
    impl AuthService for BrokenAuth {
        async fn current_admin(&self) -> ServiceResult<Option<AdminUser>> {
            Err(ServiceError::Unavailable("auth down".to_string()))
        }
    }

    fn admin() -> AdminUser {
        AdminUser {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            email: "ops@example.com".to_string(),
            role: AdminRole::Admin,
        }
    }

    fn setup(
        auth: Arc<dyn AuthService>,
    ) -> (Arc<MemoryStore>, Arc<ManualClock>, SiteAccessGate) {
        let storage = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tokens = TokenStore::new(SITE_TOKEN_KEY, storage.clone(), clock.clone());
        let gate = SiteAccessGate::new(
            tokens,
            auth,
            Arc::new(SharedSecretVerifier::new("open-sesame")),
            Duration::hours(24),
            "/admin",
        );
        (storage, clock, gate)
    }

    #[tokio::test]
    async fn test_admin_bypasses_token_state() {
        let (storage, clock, gate) = setup(Arc::new(FixedAuth(Some(admin()))));
        assert!(gate.check_site_access().await);

        gate.set_site_access_token();
        clock.advance(Duration::days(3));
        assert!(gate.check_site_access().await);

        storage.set(SITE_TOKEN_KEY, "garbage");
        assert!(gate.check_site_access().await);
    }

    #[tokio::test]
    async fn test_verify_does_not_persist() {
        let (storage, _clock, gate) = setup(Arc::new(FixedAuth(None)));

        assert!(!gate.verify_password("nope").await);
        assert!(gate.verify_password("open-sesame").await);
        assert!(storage.is_empty());
        assert!(!gate.check_site_access().await);

        gate.set_site_access_token();
        assert!(gate.check_site_access().await);
    }

    #[tokio::test]
    async fn test_token_expires_and_is_cleared() {
        let (storage, clock, gate) = setup(Arc::new(FixedAuth(None)));
        gate.set_site_access_token();

        clock.advance(Duration::hours(24));
        assert!(!gate.check_site_access().await);
        assert!(storage.get(SITE_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_auth_failure_falls_back_to_token() {
        let (_storage, _clock, gate) = setup(Arc::new(BrokenAuth));
        assert!(!gate.check_site_access().await);

        gate.set_site_access_token();
        assert!(gate.check_site_access().await);

        gate.clear_site_access();
        assert!(!gate.check_site_access().await);
    }

    #[tokio::test]
    async fn test_admin_paths_skip_the_gate() {
        let (_storage, _clock, gate) = setup(Arc::new(BrokenAuth));

        assert!(!gate.requires_gate("/admin"));
        assert!(!gate.requires_gate("/admin/deals/42"));
        assert!(gate.requires_gate("/administrator"));
        assert!(gate.requires_gate("/deals"));

        assert!(gate.check_path("/admin/login").await);
        assert!(!gate.check_path("/").await);
    }
}
