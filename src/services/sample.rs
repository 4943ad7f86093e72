use serde_json::json;
use tracing::info;

use crate::models::Deal;

#[allow(clippy::too_many_arguments)]
fn deal(
    id: &str,
    property_name: &str,
    country: &str,
    asset_class: &str,
    services: &[&str],
    buyers: &[&str],
    sellers: &[&str],
    price: Option<f64>,
    quarter: &str,
    is_confidential: bool,
) -> Deal {
    let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let mut extra = serde_json::Map::new();
    extra.insert("sample".to_string(), json!(true));

    Deal {
        id: id.to_string(),
        property_name: property_name.to_string(),
        country: country.to_string(),
        asset_class: asset_class.to_string(),
        services: to_vec(services),
        buyers: to_vec(buyers),
        sellers: to_vec(sellers),
        deal_price_usd: price,
        deal_quarter: Some(quarter.to_string()),
        is_confidential,
        extra,
    }
}

/// Landmark deals for running without a backend
pub fn sample_deals() -> Vec<Deal> {
    info!("📋 Loading sample landmark deals");

    vec![
        deal(
            "sample-1",
            "Asia Square Tower 2",
            "Singapore",
            "Office",
            &["Investment Sales"],
            &["CapitaLand Integrated Commercial Trust"],
            &["BlackRock"],
            Some(1_620_000_000.0),
            "Q4 2017",
            false,
        ),
        deal(
            "sample-2",
            "Otemachi Place East Tower",
            "Japan",
            "Office",
            &["Investment Sales", "Capital Markets"],
            &["Hulic"],
            &["NTT Urban Development"],
            Some(2_000_000_000.0),
            "Q2 2023",
            true,
        ),
        deal(
            "sample-3",
            "One Taikoo Place",
            "Hong Kong",
            "Office",
            &["Leasing"],
            &["Swire Properties"],
            &[],
            None,
            "Q3 2022",
            false,
        ),
        deal(
            "sample-4",
            "Pacific Place Sydney",
            "Australia",
            "Retail",
            &["Investment Sales"],
            &["GIC"],
            &["Charter Hall"],
            Some(410_000_000.0),
            "Q1 2024",
            false,
        ),
        deal(
            "sample-5",
            "Raffles City Chongqing",
            "China",
            "Mixed Use",
            &["Valuation"],
            &["CapitaLand Investment"],
            &[],
            Some(870_000_000.0),
            "Q2 2024",
            true,
        ),
    ]
}
