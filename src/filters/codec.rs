//! URL query encoding for [`FilterState`].
//!
//! A field appears only when it differs from its default, arrays are
//! comma-joined, and params are emitted in a fixed order. Decoding starts
//! from defaults, so an absent or unparseable param always yields the
//! default for its field. List values must not contain commas.

use url::form_urlencoded;

use super::types::{FilterState, SortBy};

pub const SEARCH: &str = "search";
pub const COUNTRIES: &str = "countries";
pub const ASSET_CLASSES: &str = "assetClasses";
pub const SERVICES: &str = "services";
pub const BUYERS: &str = "buyers";
pub const SELLERS: &str = "sellers";
pub const MIN_PRICE: &str = "minPrice";
pub const MAX_PRICE: &str = "maxPrice";
pub const START_QUARTER: &str = "startQuarter";
pub const END_QUARTER: &str = "endQuarter";
pub const SORT_BY: &str = "sortBy";

/// Every query key owned by the filter encoding, in emission order
pub const FILTER_KEYS: [&str; 11] = [
    SEARCH,
    COUNTRIES,
    ASSET_CLASSES,
    SERVICES,
    BUYERS,
    SELLERS,
    MIN_PRICE,
    MAX_PRICE,
    START_QUARTER,
    END_QUARTER,
    SORT_BY,
];

pub type QueryParams = Vec<(String, String)>;

pub fn is_filter_key(key: &str) -> bool {
    FILTER_KEYS.contains(&key)
}

/// True when at least one recognized filter key is present
pub fn has_filter_params(params: &[(String, String)]) -> bool {
    params.iter().any(|(k, _)| is_filter_key(k))
}

pub fn encode(filters: &FilterState) -> QueryParams {
    let mut params = Vec::new();
    let mut push = |key: &str, value: String| params.push((key.to_string(), value));

    if !filters.search.is_empty() {
        push(SEARCH, filters.search.clone());
    }
    for (key, values) in [
        (COUNTRIES, &filters.countries),
        (ASSET_CLASSES, &filters.asset_classes),
        (SERVICES, &filters.services),
        (BUYERS, &filters.buyers),
        (SELLERS, &filters.sellers),
    ] {
        if !values.is_empty() {
            push(key, values.join(","));
        }
    }
    if let Some(min) = filters.price_range.min {
        push(MIN_PRICE, min.to_string());
    }
    if let Some(max) = filters.price_range.max {
        push(MAX_PRICE, max.to_string());
    }
    if let Some(start) = &filters.date_range.start_quarter {
        push(START_QUARTER, start.clone());
    }
    if let Some(end) = &filters.date_range.end_quarter {
        push(END_QUARTER, end.clone());
    }
    if filters.sort_by != SortBy::default() {
        push(SORT_BY, filters.sort_by.as_str().to_string());
    }

    params
}

pub fn decode(params: &[(String, String)]) -> FilterState {
    let mut filters = FilterState::default();

    for (key, value) in params {
        match key.as_str() {
            SEARCH => filters.search = value.clone(),
            COUNTRIES => filters.countries = split_list(value),
            ASSET_CLASSES => filters.asset_classes = split_list(value),
            SERVICES => filters.services = split_list(value),
            BUYERS => filters.buyers = split_list(value),
            SELLERS => filters.sellers = split_list(value),
            MIN_PRICE => filters.price_range.min = parse_price(value),
            MAX_PRICE => filters.price_range.max = parse_price(value),
            START_QUARTER => filters.date_range.start_quarter = non_empty(value),
            END_QUARTER => filters.date_range.end_quarter = non_empty(value),
            SORT_BY => filters.sort_by = SortBy::parse(value).unwrap_or_default(),
            _ => {}
        }
    }

    filters.normalize();
    filters
}

/// Replace the filter params in `params` with the encoding of `filters`,
/// keeping every unrelated param in its original position
pub fn merge_into(params: &[(String, String)], filters: &FilterState) -> QueryParams {
    let mut merged = strip(params);
    merged.extend(encode(filters));
    merged
}

/// Drop every filter param
pub fn strip(params: &[(String, String)]) -> QueryParams {
    params
        .iter()
        .filter(|(k, _)| !is_filter_key(k))
        .cloned()
        .collect()
}

pub fn parse_query(query: &str) -> QueryParams {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

pub fn to_query_string(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_price(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
