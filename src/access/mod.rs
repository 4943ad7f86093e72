pub mod clock;
pub mod confidential;
pub mod site;
pub mod token_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use confidential::{AccessState, ConfidentialAccess, RefreshHandle};
pub use site::SiteAccessGate;
pub use token_store::{ConfidentialToken, ExpiringToken, SiteAccessToken, TokenStore};
