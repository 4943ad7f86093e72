pub mod memory;
pub mod rest;
pub mod sample;
pub mod shared_secret;
pub mod traits;

pub use memory::InMemoryDeals;
pub use rest::{RestAuthService, RestClient, RestDealsClient, RpcPasswordVerifier};
pub use sample::sample_deals;
pub use shared_secret::SharedSecretVerifier;
pub use traits::{Anonymous, AuthService, ChangeEvent, ChangeFeed, DealsQuery, PasswordVerifier};
