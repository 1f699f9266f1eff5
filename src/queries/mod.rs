use async_trait::async_trait;

use crate::{errors::ServiceError, store::PromotionStore};

pub mod promotion_queries;

pub use promotion_queries::{GetPromotionQuery, ListPromotionsQuery, PromotionFilter};

/// Trait representing a generic asynchronous query.
#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    /// Executes the query against the promotions backend.
    async fn execute(&self, store: &dyn PromotionStore) -> Result<Self::Result, ServiceError>;
}
