//! Catalog core for a landmark real-estate deals site: typed filter state
//! mirrored into the URL and local storage, a debounced deals fetcher, and
//! the time-boxed site and confidential-pricing access gates.

pub mod access;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use fetcher::{DealsFetcher, FetchState};
pub use filters::{FilterState, FilterSync, FilterUpdate};
pub use session::{DealsSession, SessionServices};
