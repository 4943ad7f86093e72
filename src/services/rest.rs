//! Clients for the hosted backend's REST surface (PostgREST tables and RPC
//! functions, plus the auth user endpoint).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::traits::{AuthService, DealsQuery, PasswordVerifier};
use crate::error::{ServiceError, ServiceResult};
use crate::filters::quarter::{quarter_end, quarter_start};
use crate::filters::{FilterState, SortBy};
use crate::models::{AdminUser, Deal, DealsResponse};

const USER_AGENT: &str = concat!("deal-scout/", env!("CARGO_PKG_VERSION"));

/// Connection to one backend project
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        let bearer = bearer.unwrap_or(self.api_key.as_str());
        builder
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }
}

async fn check_status(response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "Backend returned error status");
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Row count from a `Content-Range` value like `0-24/57` or `*/0`
pub fn parse_content_range(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.parse().ok()
}

fn content_range(headers: &HeaderMap) -> ServiceResult<usize> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .and_then(parse_content_range)
        .ok_or(ServiceError::ContentRange)
}

/// Deals table queried through PostgREST
pub struct RestDealsClient {
    rest: RestClient,
    table: String,
}

impl RestDealsClient {
    pub fn new(rest: RestClient) -> Self {
        Self {
            rest,
            table: "deals".to_string(),
        }
    }

    /// PostgREST query params for `filters`.
    ///
    /// Search covers name, country and asset class, matching `InMemoryDeals`.
    /// Array columns (services, buyers, sellers) use overlap, scalar columns
    /// use `in`. Quarter bounds are compared against the `deal_date` column.
    pub fn build_query(filters: &FilterState) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        let mut push = |key: &str, value: String| params.push((key.to_string(), value));

        let term = sanitize_search(&filters.search);
        if !term.is_empty() {
            let clauses = ["property_name", "country", "asset_class"]
                .iter()
                .map(|col| format!("{col}.ilike.*{term}*"))
                .collect::<Vec<_>>()
                .join(",");
            push("or", format!("({clauses})"));
        }

        if !filters.countries.is_empty() {
            push("country", format!("in.({})", quoted_list(&filters.countries)));
        }
        if !filters.asset_classes.is_empty() {
            push("asset_class", format!("in.({})", quoted_list(&filters.asset_classes)));
        }
        for (column, values) in [
            ("services", &filters.services),
            ("buyers", &filters.buyers),
            ("sellers", &filters.sellers),
        ] {
            if !values.is_empty() {
                push(column, format!("ov.{{{}}}", quoted_list(values)));
            }
        }

        if let Some(min) = filters.price_range.min {
            push("deal_price_usd", format!("gte.{min}"));
        }
        if let Some(max) = filters.price_range.max {
            push("deal_price_usd", format!("lte.{max}"));
        }

        let start = filters.date_range.start_quarter.as_deref().and_then(quarter_start);
        let end = filters.date_range.end_quarter.as_deref().and_then(quarter_end);
        if let Some(start) = start {
            push("deal_date", format!("gte.{start}"));
        }
        if let Some(end) = end {
            push("deal_date", format!("lte.{end}"));
        }

        push("order", order_clause(filters.sort_by).to_string());
        params
    }

    async fn total_count(&self) -> ServiceResult<usize> {
        let request = self
            .rest
            .client
            .head(self.rest.url(&format!("rest/v1/{}", self.table)))
            .query(&[("select", "id")])
            .header("Prefer", "count=exact");
        let response = check_status(self.rest.authorized(request, None).send().await?).await?;
        content_range(response.headers())
    }
}

#[async_trait]
impl DealsQuery for RestDealsClient {
    async fn query(&self, filters: &FilterState) -> ServiceResult<DealsResponse> {
        let params = Self::build_query(filters);
        debug!(?params, "Querying deals");

        let request = self
            .rest
            .client
            .get(self.rest.url(&format!("rest/v1/{}", self.table)))
            .query(&params)
            .header("Prefer", "count=exact");
        let response = check_status(self.rest.authorized(request, None).send().await?).await?;

        let filtered = content_range(response.headers())?;
        let body = response.bytes().await?;
        let data: Vec<Deal> = serde_json::from_slice(&body)?;

        let total = if filters.is_default() {
            filtered
        } else {
            self.total_count().await?
        };

        Ok(DealsResponse {
            data,
            total,
            filtered,
        })
    }

    fn source_name(&self) -> &'static str {
        "rest"
    }
}

fn order_clause(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::PriceDesc => "deal_price_usd.desc.nullslast",
        SortBy::PriceAsc => "deal_price_usd.asc.nullslast",
        SortBy::DateDesc => "deal_date.desc.nullslast",
        SortBy::DateAsc => "deal_date.asc.nullslast",
        SortBy::NameAsc => "property_name.asc",
    }
}

/// PostgREST reserves these inside `or=(...)`
fn sanitize_search(term: &str) -> String {
    term.trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\'))
        .collect()
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Resolves the signed-in user against the `admin_users` table
pub struct RestAuthService {
    rest: RestClient,
    access_token: Option<String>,
}

impl RestAuthService {
    pub fn new(rest: RestClient, access_token: Option<String>) -> Self {
        Self { rest, access_token }
    }
}

#[async_trait]
impl AuthService for RestAuthService {
    async fn current_admin(&self) -> ServiceResult<Option<AdminUser>> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(None);
        };

        let request = self.rest.client.get(self.rest.url("auth/v1/user"));
        let response = self.rest.authorized(request, Some(token)).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Session token rejected, treating as signed out");
            return Ok(None);
        }
        let user: AuthUser = check_status(response).await?.json().await?;

        let request = self
            .rest
            .client
            .get(self.rest.url("rest/v1/admin_users"))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user.id)),
                ("limit", "1".to_string()),
            ]);
        let response = check_status(self.rest.authorized(request, Some(token)).send().await?).await?;
        let admins: Vec<AdminUser> = response.json().await?;

        Ok(admins.into_iter().next())
    }
}

/// Password check run by a database function, so the secret stays server-side
pub struct RpcPasswordVerifier {
    rest: RestClient,
    function: String,
}

impl RpcPasswordVerifier {
    pub fn new(rest: RestClient, function: impl Into<String>) -> Self {
        Self {
            rest,
            function: function.into(),
        }
    }
}

#[async_trait]
impl PasswordVerifier for RpcPasswordVerifier {
    async fn verify(&self, password: &str) -> ServiceResult<bool> {
        let request = self
            .rest
            .client
            .post(self.rest.url(&format!("rest/v1/rpc/{}", self.function)))
            .json(&json!({ "password": password }));
        let response = check_status(self.rest.authorized(request, None).send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice::<bool>(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{DateRange, PriceRange};

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_default_query_only_selects_and_orders() {
        let params = RestDealsClient::build_query(&FilterState::default());
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("order".to_string(), "deal_date.desc.nullslast".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_predicates() {
        let filters = FilterState {
            search: " marina (bay), ".to_string(),
            countries: vec!["Singapore".to_string(), "Hong \"HK\" Kong".to_string()],
            buyers: vec!["GIC".to_string()],
            price_range: PriceRange {
                min: Some(1e8),
                max: Some(5e8),
                ..PriceRange::default()
            },
            date_range: DateRange {
                start_quarter: Some("Q2 2023".to_string()),
                end_quarter: Some("Q1 2024".to_string()),
            },
            sort_by: SortBy::NameAsc,
            ..FilterState::default()
        };
        let params = RestDealsClient::build_query(&filters);

        assert_eq!(
            value(&params, "or"),
            vec!["(property_name.ilike.*marina bay*,country.ilike.*marina bay*,asset_class.ilike.*marina bay*)"]
        );
        assert_eq!(
            value(&params, "country"),
            vec![r#"in.("Singapore","Hong \"HK\" Kong")"#]
        );
        assert_eq!(value(&params, "buyers"), vec![r#"ov.{"GIC"}"#]);
        assert_eq!(
            value(&params, "deal_price_usd"),
            vec!["gte.100000000", "lte.500000000"]
        );
        assert_eq!(
            value(&params, "deal_date"),
            vec!["gte.2023-04-01", "lte.2024-03-31"]
        );
        assert_eq!(value(&params, "order"), vec!["property_name.asc"]);
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/57"), Some(57));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_client_trims_base_url() {
        let rest = RestClient::new("https://db.example.com/", "anon", Duration::from_secs(5)).unwrap();
        assert_eq!(rest.url("/rest/v1/deals"), "https://db.example.com/rest/v1/deals");
    }
}
