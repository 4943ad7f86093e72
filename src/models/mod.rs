use serde::{Deserialize, Serialize};

/// Service line a deal was brokered under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCategory {
    Sales,
    Leasing,
    CapitalMarkets,
    Valuation,
    Other(String),
}

impl ServiceCategory {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sales" | "investment sales" => Self::Sales,
            "leasing" => Self::Leasing,
            "capital markets" | "debt advisory" => Self::CapitalMarkets,
            "valuation" | "valuation advisory" => Self::Valuation,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Sales => "Sales",
            Self::Leasing => "Leasing",
            Self::CapitalMarkets => "Capital Markets",
            Self::Valuation => "Valuation",
            Self::Other(label) => label,
        }
    }
}

/// A landmark transaction as stored by the deals backend.
///
/// Only the columns the catalog filters on are typed; everything else the
/// backend returns is kept in `extra` so records pass through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    pub id: String,
    pub property_name: String,
    pub country: String,
    pub asset_class: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub buyers: Vec<String>,
    #[serde(default)]
    pub sellers: Vec<String>,
    pub deal_price_usd: Option<f64>,
    /// Quarter label such as "Q2 2024"
    pub deal_quarter: Option<String>,
    #[serde(default)]
    pub is_confidential: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Deal {
    pub fn service_categories(&self) -> Vec<ServiceCategory> {
        self.services.iter().map(|s| ServiceCategory::parse(s)).collect()
    }

    /// Price as it may be shown to a viewer with or without confidential access
    pub fn visible_price(&self, confidential_access: bool) -> Option<f64> {
        if self.is_confidential && !confidential_access {
            None
        } else {
            self.deal_price_usd
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DealsResponse {
    pub data: Vec<Deal>,
    /// Row count before filters
    pub total: usize,
    /// Row count after filters
    pub filtered: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

/// Row of the `admin_users` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminUser {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub role: AdminRole,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deal_keeps_unknown_columns() {
        let raw = json!({
            "id": "d1",
            "property_name": "Marina One",
            "country": "Singapore",
            "asset_class": "Office",
            "services": ["Investment Sales"],
            "deal_price_usd": 1500000000.0,
            "deal_quarter": "Q2 2024",
            "image_url": "https://cdn.example.com/marina.jpg",
            "remarks": "<p>Largest office deal of the year</p>"
        });

        let deal: Deal = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(deal.extra.len(), 2);
        assert!(!deal.is_confidential);

        let back = serde_json::to_value(&deal).unwrap();
        assert_eq!(back["image_url"], raw["image_url"]);
        assert_eq!(back["remarks"], raw["remarks"]);
    }

    #[test]
    fn test_visible_price_hides_confidential() {
        let deal = Deal {
            id: "d2".to_string(),
            property_name: "Tower".to_string(),
            country: "Japan".to_string(),
            asset_class: "Office".to_string(),
            services: vec![],
            buyers: vec![],
            sellers: vec![],
            deal_price_usd: Some(250.0),
            deal_quarter: None,
            is_confidential: true,
            extra: Default::default(),
        };
        assert_eq!(deal.visible_price(false), None);
        assert_eq!(deal.visible_price(true), Some(250.0));
    }

    #[test]
    fn test_service_category_parse() {
        assert_eq!(ServiceCategory::parse("Investment Sales"), ServiceCategory::Sales);
        assert_eq!(ServiceCategory::parse(" leasing "), ServiceCategory::Leasing);
        assert_eq!(
            ServiceCategory::parse("Hotels"),
            ServiceCategory::Other("Hotels".to_string())
        );
        assert_eq!(ServiceCategory::CapitalMarkets.label(), "Capital Markets");
    }
}
