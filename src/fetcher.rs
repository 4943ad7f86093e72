//! Turns filter changes into deal queries.
//!
//! Filter edits are debounced so a burst of changes issues one query. Change
//! notifications from the store re-run the current query in the background;
//! their failures are logged and never replace what is on screen. There is no
//! request sequencing: whichever response resolves last wins.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::filters::FilterState;
use crate::models::{Deal, DealsResponse};
use crate::services::{ChangeEvent, DealsQuery};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// What the results grid renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchState {
    pub data: Vec<Deal>,
    pub total: usize,
    pub filtered: usize,
    pub loading: bool,
    pub error: Option<String>,
}

struct Inner {
    query: Arc<dyn DealsQuery>,
    current: Mutex<FilterState>,
    state: watch::Sender<FetchState>,
}

impl Inner {
    fn current(&self) -> FilterState {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn run(&self, filters: FilterState) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = filters.clone();
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.query.query(&filters).await {
            Ok(response) => {
                debug!(
                    source = self.query.source_name(),
                    total = response.total,
                    filtered = response.filtered,
                    "Fetched deals"
                );
                self.state.send_modify(|s| {
                    apply(s, response);
                    s.loading = false;
                });
            }
            Err(e) => {
                error!(source = self.query.source_name(), error = %e, "Failed to fetch deals");
                self.state.send_modify(|s| {
                    s.data.clear();
                    s.total = 0;
                    s.filtered = 0;
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    async fn background_refresh(&self) {
        let filters = self.current();
        match self.query.query(&filters).await {
            Ok(response) => {
                debug!(filtered = response.filtered, "Background refresh applied");
                self.state.send_modify(|s| {
                    apply(s, response);
                    s.error = None;
                });
            }
            Err(e) => warn!(error = %e, "Background refresh failed"),
        }
    }
}

fn apply(state: &mut FetchState, response: DealsResponse) {
    state.data = response.data;
    state.total = response.total;
    state.filtered = response.filtered;
}

/// Owns the debounce and change-listener tasks; both stop when dropped
pub struct DealsFetcher {
    inner: Arc<Inner>,
    tasks: Vec<JoinHandle<()>>,
}

impl DealsFetcher {
    /// Queries the current filters right away, then follows `filters`
    pub fn spawn(
        query: Arc<dyn DealsQuery>,
        filters: watch::Receiver<FilterState>,
        changes: Option<broadcast::Receiver<ChangeEvent>>,
        debounce: Duration,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        let inner = Arc::new(Inner {
            query,
            current: Mutex::new(filters.borrow().clone()),
            state,
        });

        let mut tasks = vec![tokio::spawn(debounce_loop(
            Arc::clone(&inner),
            filters,
            debounce,
        ))];
        if let Some(changes) = changes {
            tasks.push(tokio::spawn(change_loop(Arc::clone(&inner), changes)));
        }

        info!(debounce_ms = debounce.as_millis() as u64, "Deals fetcher started");
        Self { inner, tasks }
    }

    pub fn snapshot(&self) -> FetchState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.inner.state.subscribe()
    }

    /// Filters of the most recent query
    pub fn current_filters(&self) -> FilterState {
        self.inner.current()
    }

    /// Re-run the current query now, with the usual loading and error handling
    pub async fn refresh(&self) {
        let filters = self.inner.current();
        self.inner.run(filters).await;
    }
}

impl Drop for DealsFetcher {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn debounce_loop(inner: Arc<Inner>, mut filters: watch::Receiver<FilterState>, debounce: Duration) {
    let initial = filters.borrow_and_update().clone();
    inner.run(initial).await;

    while filters.changed().await.is_ok() {
        // Every further edit restarts the wait.
        loop {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => break,
                changed = filters.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let latest = filters.borrow_and_update().clone();
        inner.run(latest).await;
    }
    debug!("Filter source closed, debounce loop exiting");
}

async fn change_loop(inner: Arc<Inner>, mut changes: broadcast::Receiver<ChangeEvent>) {
    loop {
        match changes.recv().await {
            Ok(event) => {
                debug!(table = %event.table, record = ?event.record_id, "Store changed");
                inner.background_refresh().await;
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!(missed, "Coalescing missed change notifications");
                inner.background_refresh().await;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ServiceError, ServiceResult};
    use crate::filters::{FilterSync, FilterUpdate, MemoryLocation};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingQuery {
        calls: Mutex<Vec<FilterState>>,
        fail: AtomicBool,
    }

    impl RecordingQuery {
        fn calls(&self) -> Vec<FilterState> {
            self.calls.lock().unwrap().clone()
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DealsQuery for RecordingQuery {
        async fn query(&self, filters: &FilterState) -> ServiceResult<DealsResponse> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(filters.clone());
                calls.len()
            };
            if self.fail.load(Ordering::SeqCst) {
                return Err(ServiceError::Unavailable("store offline".to_string()));
            }
            let deal: Deal = serde_json::from_value(serde_json::json!({
                "id": format!("deal-{n}"),
                "property_name": filters.search,
                "country": "Singapore",
                "asset_class": "Office",
                "deal_price_usd": null,
                "deal_quarter": null
            }))
            .unwrap();
            Ok(DealsResponse {
                data: vec![deal],
                total: 10,
                filtered: 1,
            })
        }

        fn source_name(&self) -> &'static str {
            "recording"
        }
    }

    fn sync() -> FilterSync {
        FilterSync::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryLocation::new("/deals")),
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_within_window_coalesce() {
        let query = Arc::new(RecordingQuery::default());
        let sync = sync();
        let fetcher = DealsFetcher::spawn(query.clone(), sync.watch(), None, DEFAULT_DEBOUNCE);
        settle().await;
        assert_eq!(query.calls().len(), 1, "initial load");

        for (i, term) in ["m", "ma", "mar", "mari"].iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            sync.update_filter(FilterUpdate::Search(term.to_string()));
        }

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(query.calls().len(), 1, "still inside the window");

        tokio::time::sleep(Duration::from_millis(100)).await;
        let calls = query.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].search, "mari");

        let state = fetcher.snapshot();
        assert!(!state.loading);
        assert_eq!(state.data[0].property_name, "mari");
        assert_eq!(fetcher.current_filters().search, "mari");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_filters_issue_no_query() {
        let query = Arc::new(RecordingQuery::default());
        let sync = sync();
        let _fetcher = DealsFetcher::spawn(query.clone(), sync.watch(), None, DEFAULT_DEBOUNCE);
        settle().await;

        sync.clear_filters();
        sync.clear_filters();
        sync.update_filter(FilterUpdate::Countries(vec![String::new()]));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(query.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_clears_results_and_refresh_recovers() {
        let query = Arc::new(RecordingQuery::default());
        let sync = sync();
        let fetcher = DealsFetcher::spawn(query.clone(), sync.watch(), None, DEFAULT_DEBOUNCE);
        settle().await;
        assert_eq!(fetcher.snapshot().filtered, 1);

        query.set_failing(true);
        fetcher.refresh().await;
        let state = fetcher.snapshot();
        assert_eq!(state.error.as_deref(), Some("store offline"));
        assert!(state.data.is_empty());
        assert_eq!((state.total, state.filtered), (0, 0));
        assert!(!state.loading);

        query.set_failing(false);
        fetcher.refresh().await;
        let state = fetcher.snapshot();
        assert_eq!(state.error, None);
        assert_eq!((state.total, state.filtered), (10, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_failure_keeps_state() {
        let query = Arc::new(RecordingQuery::default());
        let sync = sync();
        let (tx, rx) = broadcast::channel(8);
        let fetcher = DealsFetcher::spawn(query.clone(), sync.watch(), Some(rx), DEFAULT_DEBOUNCE);
        settle().await;
        let before = fetcher.snapshot();
        assert_eq!(before.data.len(), 1);

        query.set_failing(true);
        tx.send(ChangeEvent {
            table: "deals".to_string(),
            record_id: Some("x".to_string()),
        })
        .unwrap();
        settle().await;

        assert_eq!(query.calls().len(), 2);
        assert_eq!(fetcher.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_replaces_results() {
        let query = Arc::new(RecordingQuery::default());
        let sync = sync();
        let (tx, rx) = broadcast::channel(8);
        let fetcher = DealsFetcher::spawn(query.clone(), sync.watch(), Some(rx), DEFAULT_DEBOUNCE);
        settle().await;
        assert_eq!(fetcher.snapshot().data[0].id, "deal-1");

        tx.send(ChangeEvent {
            table: "deals".to_string(),
            record_id: None,
        })
        .unwrap();
        settle().await;

        let state = fetcher.snapshot();
        assert_eq!(state.data[0].id, "deal-2");
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_following_filters() {
        let query = Arc::new(RecordingQuery::default());
        let sync = sync();
        let fetcher = DealsFetcher::spawn(query.clone(), sync.watch(), None, DEFAULT_DEBOUNCE);
        settle().await;

        drop(fetcher);
        sync.update_filter(FilterUpdate::Search("late".to_string()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(query.calls().len(), 1);
    }
}
