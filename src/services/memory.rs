use std::cmp::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::debug;

use super::traits::{ChangeEvent, ChangeFeed, DealsQuery};
use crate::error::ServiceResult;
use crate::filters::quarter::{quarter_end, quarter_start};
use crate::filters::{FilterState, SortBy};
use crate::models::{Deal, DealsResponse};

const DEALS_TABLE: &str = "deals";

/// Deals store held in process memory
pub struct InMemoryDeals {
    deals: RwLock<Vec<Deal>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl InMemoryDeals {
    pub fn new(deals: Vec<Deal>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            deals: RwLock::new(deals),
            changes,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace by id, then notify subscribers
    pub fn upsert(&self, deal: Deal) {
        let id = deal.id.clone();
        {
            let mut deals = self.deals.write().unwrap_or_else(|e| e.into_inner());
            match deals.iter_mut().find(|d| d.id == deal.id) {
                Some(existing) => *existing = deal,
                None => deals.push(deal),
            }
        }
        self.notify(Some(id));
    }

    pub fn remove(&self, id: &str) -> Option<Deal> {
        let removed = {
            let mut deals = self.deals.write().unwrap_or_else(|e| e.into_inner());
            let index = deals.iter().position(|d| d.id == id)?;
            deals.remove(index)
        };
        self.notify(Some(id.to_string()));
        Some(removed)
    }

    fn notify(&self, record_id: Option<String>) {
        // No subscribers is fine.
        let _ = self.changes.send(ChangeEvent {
            table: DEALS_TABLE.to_string(),
            record_id,
        });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Deal>> {
        self.deals.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DealsQuery for InMemoryDeals {
    async fn query(&self, filters: &FilterState) -> ServiceResult<DealsResponse> {
        let deals = self.read();
        let total = deals.len();

        let mut data: Vec<Deal> = deals
            .iter()
            .filter(|d| matches(d, filters))
            .cloned()
            .collect();
        drop(deals);

        data.sort_by(|a, b| compare(a, b, filters.sort_by));
        debug!(total, filtered = data.len(), "Queried in-memory deals");

        Ok(DealsResponse {
            filtered: data.len(),
            data,
            total,
        })
    }

    fn source_name(&self) -> &'static str {
        "memory"
    }
}

impl ChangeFeed for InMemoryDeals {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

/// Whether `deal` passes every active predicate in `filters`.
///
/// Free-text search covers name, country and asset class, the same columns
/// `RestDealsClient` searches. Buyers and sellers are matched only by their
/// own filters.
pub fn matches(deal: &Deal, filters: &FilterState) -> bool {
    if !filters.search.trim().is_empty() {
        let needle = filters.search.trim().to_lowercase();
        let hit = [&deal.property_name, &deal.country, &deal.asset_class]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    if !one_of(&filters.countries, std::slice::from_ref(&deal.country))
        || !one_of(&filters.asset_classes, std::slice::from_ref(&deal.asset_class))
        || !one_of(&filters.services, &deal.services)
        || !one_of(&filters.buyers, &deal.buyers)
        || !one_of(&filters.sellers, &deal.sellers)
    {
        return false;
    }

    if !filters.price_range.is_unbounded() {
        match deal.deal_price_usd {
            Some(price) if filters.price_range.contains(price) => {}
            _ => return false,
        }
    }

    let start = filters.date_range.start_quarter.as_deref().and_then(quarter_start);
    let end = filters.date_range.end_quarter.as_deref().and_then(quarter_end);
    if start.is_some() || end.is_some() {
        let Some(date) = deal_date(deal) else {
            return false;
        };
        if start.map_or(false, |s| date < s) || end.map_or(false, |e| date > e) {
            return false;
        }
    }

    true
}

fn one_of(selected: &[String], values: &[String]) -> bool {
    selected.is_empty() || values.iter().any(|v| selected.contains(v))
}

fn deal_date(deal: &Deal) -> Option<NaiveDate> {
    deal.deal_quarter.as_deref().and_then(quarter_start)
}

/// Missing prices and dates always sort last
fn compare(a: &Deal, b: &Deal, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::PriceDesc => last_if_none(a.deal_price_usd, b.deal_price_usd, |x, y| {
            y.total_cmp(x)
        }),
        SortBy::PriceAsc => last_if_none(a.deal_price_usd, b.deal_price_usd, |x, y| {
            x.total_cmp(y)
        }),
        SortBy::DateDesc => last_if_none(deal_date(a), deal_date(b), |x, y| y.cmp(x)),
        SortBy::DateAsc => last_if_none(deal_date(a), deal_date(b), |x, y| x.cmp(y)),
        SortBy::NameAsc => a
            .property_name
            .to_lowercase()
            .cmp(&b.property_name.to_lowercase()),
    }
}

fn last_if_none<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(&x, &y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
