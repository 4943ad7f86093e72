use std::sync::Arc;

use tracing::info;

use crate::access::{
    confidential::CONFIDENTIAL_TOKEN_KEY, site::SITE_TOKEN_KEY, Clock, ConfidentialAccess,
    RefreshHandle, SiteAccessGate, TokenStore,
};
use crate::config::Config;
use crate::fetcher::DealsFetcher;
use crate::filters::{FilterSync, Location};
use crate::models::Deal;
use crate::services::{AuthService, ChangeFeed, DealsQuery, PasswordVerifier};
use crate::storage::KeyValueStore;

/// Collaborators a session talks to
pub struct SessionServices {
    pub deals: Arc<dyn DealsQuery>,
    pub changes: Option<Arc<dyn ChangeFeed>>,
    pub auth: Arc<dyn AuthService>,
    pub site_verifier: Arc<dyn PasswordVerifier>,
    pub confidential_verifier: Arc<dyn PasswordVerifier>,
}

/// Everything one visitor's catalog view owns, created once and torn down on
/// sign-out. Must be started inside a Tokio runtime.
pub struct DealsSession {
    filters: FilterSync,
    fetcher: DealsFetcher,
    site: SiteAccessGate,
    confidential: Arc<ConfidentialAccess>,
    refresh: RefreshHandle,
}

impl DealsSession {
    pub fn start(
        config: &Config,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        location: Arc<dyn Location>,
        services: SessionServices,
    ) -> Self {
        let filters = FilterSync::new(Arc::clone(&storage), location);

        let site = SiteAccessGate::new(
            TokenStore::new(SITE_TOKEN_KEY, Arc::clone(&storage), Arc::clone(&clock)),
            services.auth,
            services.site_verifier,
            config.access_duration,
            config.admin_prefix.clone(),
        );

        let confidential = Arc::new(ConfidentialAccess::new(
            TokenStore::new(CONFIDENTIAL_TOKEN_KEY, storage, clock),
            services.confidential_verifier,
            config.access_duration,
        ));
        let refresh = confidential.spawn_refresh(config.refresh_interval);

        let fetcher = DealsFetcher::spawn(
            services.deals,
            filters.watch(),
            services.changes.as_ref().map(|feed| feed.subscribe()),
            config.debounce,
        );

        Self {
            filters,
            fetcher,
            site,
            confidential,
            refresh,
        }
    }

    pub fn filters(&self) -> &FilterSync {
        &self.filters
    }

    pub fn fetcher(&self) -> &DealsFetcher {
        &self.fetcher
    }

    pub fn site(&self) -> &SiteAccessGate {
        &self.site
    }

    pub fn confidential(&self) -> &ConfidentialAccess {
        &self.confidential
    }

    /// Price to render for `deal` under the current confidential grant
    pub fn visible_price(&self, deal: &Deal) -> Option<f64> {
        deal.visible_price(self.confidential.has_access())
    }

    /// Drop every grant and stop background work
    pub fn sign_out(self) {
        let Self {
            refresh,
            confidential,
            site,
            ..
        } = self;
        refresh.stop();
        confidential.revoke_access();
        site.clear_site_access();
        info!("Session signed out");
    }
}
