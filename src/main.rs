use std::sync::Arc;

use anyhow::{bail, Context};
use deal_scout::access::{Clock, SystemClock};
use deal_scout::filters::{Location, MemoryLocation};
use deal_scout::services::{
    sample_deals, Anonymous, AuthService, ChangeFeed, DealsQuery, InMemoryDeals, PasswordVerifier,
    RestAuthService, RestClient, RestDealsClient, RpcPasswordVerifier, SharedSecretVerifier,
};
use deal_scout::storage::{FileStore, KeyValueStore};
use deal_scout::{Config, DealsSession, SessionServices};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn build_services(config: &Config) -> anyhow::Result<(SessionServices, bool)> {
    if let Some(api_url) = &config.api_url {
        info!("Using deals backend at {}", api_url);
        let rest = RestClient::new(api_url, &config.api_key, config.http_timeout)
            .context("Failed to create HTTP client")?;

        let services = SessionServices {
            deals: Arc::new(RestDealsClient::new(rest.clone())),
            changes: None,
            auth: Arc::new(RestAuthService::new(rest.clone(), config.session_token.clone())),
            site_verifier: Arc::new(RpcPasswordVerifier::new(rest.clone(), "verify_site_password")),
            confidential_verifier: Arc::new(RpcPasswordVerifier::new(
                rest,
                "verify_confidential_password",
            )),
        };
        return Ok((services, true));
    }

    info!("DEALS_API_URL not set, using sample deals");
    let store = Arc::new(InMemoryDeals::new(sample_deals()));
    let site_gated = config.site_secret.is_some();
    let verifier = |secret: &Option<String>| -> Arc<dyn PasswordVerifier> {
        Arc::new(SharedSecretVerifier::new(secret.clone().unwrap_or_default()))
    };

    let services = SessionServices {
        deals: store.clone() as Arc<dyn DealsQuery>,
        changes: Some(store as Arc<dyn ChangeFeed>),
        auth: Arc::new(Anonymous) as Arc<dyn AuthService>,
        site_verifier: verifier(&config.site_secret),
        confidential_verifier: verifier(&config.confidential_secret),
    };
    Ok((services, site_gated))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🏙️ Deal Scout - Landmark Deals Catalog");
    info!("==========================================");

    let config = Config::load()?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage_path)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let url = std::env::args().nth(1).unwrap_or_else(|| "/deals".to_string());
    let location = Arc::new(MemoryLocation::new(&url));

    let (services, site_gated) = build_services(&config)?;
    let session = DealsSession::start(&config, storage, clock, location.clone(), services);

    // Site access
    let path = location.path();
    if site_gated && !session.site().check_path(&path).await {
        let Some(password) = &config.site_password else {
            bail!("Site access required: set DEALS_PASSWORD");
        };
        if !session.site().verify_password(password).await {
            bail!("Incorrect site password");
        }
        session.site().set_site_access_token();
    }

    // Confidential pricing
    if let Some(password) = &config.pricing_password {
        if session.confidential().grant_access(password).await {
            let state = session.confidential().state();
            info!(
                "🔓 Confidential pricing unlocked ({} remaining)",
                state.time_remaining.unwrap_or_default()
            );
        } else {
            warn!("Confidential pricing password rejected");
        }
    }

    session.fetcher().refresh().await;
    let state = session.fetcher().snapshot();
    if let Some(error) = &state.error {
        bail!("Failed to load deals: {}", error);
    }

    info!(
        "\n✅ Showing {} of {} deals{}\n",
        state.filtered,
        state.total,
        if session.filters().has_active_filters() {
            " (filtered)"
        } else {
            ""
        }
    );

    for (i, deal) in state.data.iter().enumerate() {
        let price = match session.visible_price(deal) {
            Some(price) => format!("US${:.0}M", price / 1_000_000.0),
            None if deal.is_confidential => "Confidential".to_string(),
            None => "Undisclosed".to_string(),
        };
        println!("{}. {} ({})", i + 1, deal.property_name, price);
        println!("   {} · {}", deal.country, deal.asset_class);
        if let Some(quarter) = &deal.deal_quarter {
            println!("   Closed: {}", quarter);
        }
        println!("   Buyers: {}", deal.buyers.join(", "));
        let services: Vec<_> = deal
            .service_categories()
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        println!("   Services: {}", services.join(", "));
        println!();
    }

    let json = serde_json::to_string_pretty(&state.data)?;
    tokio::fs::write("filtered_deals.json", json).await?;
    info!("💾 Saved {} deals to filtered_deals.json", state.data.len());
    info!("🔗 Shareable view: {}", location.href());

    Ok(())
}
