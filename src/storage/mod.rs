//! Synchronous string key-value storage shared by the access tokens and the
//! saved filter copy.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Process-wide persisted storage keyed by fixed string keys
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrites any previous value
    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);
}
