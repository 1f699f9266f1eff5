//! Boundary to the promotions backend.

use async_trait::async_trait;

use crate::errors::ServiceResult;
use crate::models::{ListQuery, Promotion, PromotionInput, PromotionPatch, PromotionPage};

pub mod http;
pub mod memory;

pub use http::HttpPromotionStore;
pub use memory::InMemoryPromotionStore;

/// Operations the promotion core needs from the backend.
///
/// `list` and `get_by_slug` have no side effects. `create`, `update` and
/// `delete` each take effect once per call and are never retried here.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    async fn list(&self, query: &ListQuery) -> ServiceResult<PromotionPage>;

    async fn get_by_slug(&self, slug: &str) -> ServiceResult<Promotion>;

    async fn create(&self, input: &PromotionInput) -> ServiceResult<Promotion>;

    async fn update(&self, slug: &str, patch: &PromotionPatch) -> ServiceResult<Promotion>;

    async fn delete(&self, slug: &str) -> ServiceResult<()>;

    async fn increment_share_count(&self, slug: &str) -> ServiceResult<u64>;
}
