use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
}

/// Inclusive price bounds; `None` leaves that side open
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Currency,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Quarter bounds such as "Q1 2023" to "Q4 2024"
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DateRange {
    pub start_quarter: Option<String>,
    pub end_quarter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    PriceDesc,
    PriceAsc,
    #[default]
    DateDesc,
    DateAsc,
    NameAsc,
}

impl SortBy {
    pub const ALL: [SortBy; 5] = [
        SortBy::PriceDesc,
        SortBy::PriceAsc,
        SortBy::DateDesc,
        SortBy::DateAsc,
        SortBy::NameAsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::PriceDesc => "price_desc",
            SortBy::PriceAsc => "price_asc",
            SortBy::DateDesc => "date_desc",
            SortBy::DateAsc => "date_asc",
            SortBy::NameAsc => "name_asc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// Canonical search, filter and sort selection for the deals catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    pub search: String,
    pub countries: Vec<String>,
    pub asset_classes: Vec<String>,
    pub services: Vec<String>,
    pub buyers: Vec<String>,
    pub sellers: Vec<String>,
    pub price_range: PriceRange,
    pub date_range: DateRange,
    pub sort_by: SortBy,
}

impl FilterState {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Search(v) => self.search = v,
            FilterUpdate::Countries(v) => self.countries = v,
            FilterUpdate::AssetClasses(v) => self.asset_classes = v,
            FilterUpdate::Services(v) => self.services = v,
            FilterUpdate::Buyers(v) => self.buyers = v,
            FilterUpdate::Sellers(v) => self.sellers = v,
            FilterUpdate::PriceRange(v) => self.price_range = v,
            FilterUpdate::DateRange(v) => self.date_range = v,
            FilterUpdate::SortBy(v) => self.sort_by = v,
        }
        self.normalize();
    }

    /// Drop values the URL query cannot carry: blank list entries, blank
    /// quarter labels and non-finite price bounds
    pub fn normalize(&mut self) {
        for list in [
            &mut self.countries,
            &mut self.asset_classes,
            &mut self.services,
            &mut self.buyers,
            &mut self.sellers,
        ] {
            list.retain(|v| !v.trim().is_empty());
        }
        for quarter in [
            &mut self.date_range.start_quarter,
            &mut self.date_range.end_quarter,
        ] {
            if quarter.as_deref().is_some_and(|q| q.trim().is_empty()) {
                *quarter = None;
            }
        }
        for bound in [&mut self.price_range.min, &mut self.price_range.max] {
            if bound.is_some_and(|v| !v.is_finite()) {
                *bound = None;
            }
        }
    }
}

/// Replacement of exactly one [`FilterState`] field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    Search(String),
    Countries(Vec<String>),
    AssetClasses(Vec<String>),
    Services(Vec<String>),
    Buyers(Vec<String>),
    Sellers(Vec<String>),
    PriceRange(PriceRange),
    DateRange(DateRange),
    SortBy(SortBy),
}

/// Named, ready-made filter selection
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPreset {
    pub name: String,
    pub filters: FilterState,
}

impl FilterPreset {
    pub fn new(name: impl Into<String>, filters: FilterState) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }

    /// Largest deals first, optionally above a price floor
    pub fn largest_deals(min_price: Option<f64>) -> Self {
        Self::new(
            "Largest deals",
            FilterState {
                price_range: PriceRange {
                    min: min_price,
                    ..PriceRange::default()
                },
                sort_by: SortBy::PriceDesc,
                ..FilterState::default()
            },
        )
    }

    /// Everything closed within a single quarter
    pub fn quarter(label: &str) -> Self {
        Self::new(
            label,
            FilterState {
                date_range: DateRange {
                    start_quarter: Some(label.to_string()),
                    end_quarter: Some(label.to_string()),
                },
                ..FilterState::default()
            },
        )
    }
}
