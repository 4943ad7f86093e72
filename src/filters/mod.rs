pub mod codec;
pub mod location;
pub mod quarter;
pub mod sync;
pub mod types;

pub use location::{Location, MemoryLocation};
pub use quarter::Quarter;
pub use sync::FilterSync;
pub use types::{
    Currency, DateRange, FilterPreset, FilterState, FilterUpdate, PriceRange, SortBy,
};
