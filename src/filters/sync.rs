use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::codec;
use super::location::Location;
use super::types::{FilterPreset, FilterState, FilterUpdate};
use crate::storage::KeyValueStore;

/// Storage key of the saved filter copy
pub const FILTERS_KEY: &str = "deal_filters";

/// Owns the canonical [`FilterState`] and mirrors it into the URL query and
/// the persisted copy on every change.
pub struct FilterSync {
    storage: Arc<dyn KeyValueStore>,
    location: Arc<dyn Location>,
    state: watch::Sender<FilterState>,
}

impl FilterSync {
    /// URL params win wholesale over the saved copy: a URL with any filter
    /// param starts from defaults, never from what was persisted.
    pub fn new(storage: Arc<dyn KeyValueStore>, location: Arc<dyn Location>) -> Self {
        let params = location.query_params();
        let initial = if codec::has_filter_params(&params) {
            debug!("Initializing filters from URL");
            codec::decode(&params)
        } else {
            load_saved(storage.as_ref()).unwrap_or_default()
        };

        let (state, _) = watch::channel(initial);
        Self {
            storage,
            location,
            state,
        }
    }

    pub fn filters(&self) -> FilterState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every committed filter change
    pub fn watch(&self) -> watch::Receiver<FilterState> {
        self.state.subscribe()
    }

    pub fn has_active_filters(&self) -> bool {
        !self.state.borrow().is_default()
    }

    pub fn update_filter(&self, update: FilterUpdate) {
        let mut next = self.filters();
        next.apply(update);
        self.commit(next);
    }

    pub fn apply_preset(&self, preset: &FilterPreset) {
        info!(preset = %preset.name, "Applying filter preset");
        self.commit(preset.filters.clone());
    }

    pub fn clear_filters(&self) {
        self.commit(FilterState::default());
    }

    /// The URL and saved copy are always rewritten; watchers only hear about
    /// an actual change.
    fn commit(&self, mut next: FilterState) {
        next.normalize();
        self.save(&next);
        let params = codec::merge_into(&self.location.query_params(), &next);
        self.location.replace_query(params);
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn save(&self, filters: &FilterState) {
        match serde_json::to_string(filters) {
            Ok(json) => self.storage.set(FILTERS_KEY, &json),
            Err(e) => debug!(error = %e, "Failed to serialize filters"),
        }
    }
}

fn load_saved(storage: &dyn KeyValueStore) -> Option<FilterState> {
    let raw = storage.get(FILTERS_KEY)?;
    match serde_json::from_str::<FilterState>(&raw) {
        Ok(mut filters) => {
            filters.normalize();
            Some(filters)
        }
        Err(e) => {
            debug!(error = %e, "Ignoring corrupt saved filters");
            None
        }
    }
}
