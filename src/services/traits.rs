use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::ServiceResult;
use crate::filters::FilterState;
use crate::models::{AdminUser, DealsResponse};

/// Remote store that answers filtered, sorted deal queries
#[async_trait]
pub trait DealsQuery: Send + Sync {
    async fn query(&self, filters: &FilterState) -> ServiceResult<DealsResponse>;

    /// Get the name of the backing source
    fn source_name(&self) -> &'static str;
}

/// Signal that rows in the deals store changed. Consumers always re-query
/// rather than trusting the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub record_id: Option<String>,
}

/// Push channel announcing data changes
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Identity of the signed-in user, if any
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn current_admin(&self) -> ServiceResult<Option<AdminUser>>;
}

/// Server-side shared password comparison
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    async fn verify(&self, password: &str) -> ServiceResult<bool>;
}

/// Auth service for sessions with no signed-in user
pub struct Anonymous;

#[async_trait]
impl AuthService for Anonymous {
    async fn current_admin(&self) -> ServiceResult<Option<AdminUser>> {
        Ok(None)
    }
}
