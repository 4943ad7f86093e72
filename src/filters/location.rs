use std::sync::Mutex;

use super::codec::{self, QueryParams};

/// Current page URL query, as the filter synchronizer sees it
pub trait Location: Send + Sync {
    fn path(&self) -> String;

    fn query_params(&self) -> QueryParams;

    /// Rewrite the query in place without adding a history entry
    fn replace_query(&self, params: QueryParams);
}

#[derive(Debug, Default)]
struct LocationInner {
    path: String,
    params: QueryParams,
    history: Vec<String>,
    replacements: usize,
}

/// In-process location with a navigable history list
#[derive(Debug, Default)]
pub struct MemoryLocation {
    inner: Mutex<LocationInner>,
}

impl MemoryLocation {
    /// `url` is a path with an optional `?query`
    pub fn new(url: &str) -> Self {
        let location = Self::default();
        location.navigate(url);
        location
    }

    /// Push a new history entry
    pub fn navigate(&self, url: &str) {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let mut inner = self.lock();
        inner.path = path.to_string();
        inner.params = codec::parse_query(query);
        inner.history.push(url.to_string());
    }

    pub fn href(&self) -> String {
        let inner = self.lock();
        let query = codec::to_query_string(&inner.params);
        if query.is_empty() {
            inner.path.clone()
        } else {
            format!("{}?{}", inner.path, query)
        }
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn replacements(&self) -> usize {
        self.lock().replacements
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocationInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Location for MemoryLocation {
    fn path(&self) -> String {
        self.lock().path.clone()
    }

    fn query_params(&self) -> QueryParams {
        self.lock().params.clone()
    }

    fn replace_query(&self, params: QueryParams) {
        let mut inner = self.lock();
        inner.params = params;
        inner.replacements += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_does_not_grow_history() {
        let location = MemoryLocation::new("/deals?view=grid");
        assert_eq!(location.path(), "/deals");
        assert_eq!(location.history_len(), 1);

        location.replace_query(vec![("search".to_string(), "one".to_string())]);
        location.replace_query(vec![("search".to_string(), "two".to_string())]);

        assert_eq!(location.history_len(), 1);
        assert_eq!(location.replacements(), 2);
        assert_eq!(location.href(), "/deals?search=two");
    }
}
