use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::Query;
use crate::{
    errors::ServiceError,
    models::{ListQuery, Promotion, PromotionPage},
    services::promotion_status::StatusFilter,
    store::PromotionStore,
};

/// Struct to get a specific promotion by slug.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetPromotionQuery {
    pub slug: String,
}

#[async_trait]
impl Query for GetPromotionQuery {
    type Result = Promotion;

    #[instrument(skip(self, store), fields(slug = %self.slug))]
    async fn execute(&self, store: &dyn PromotionStore) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetPromotionQuery");
        store.get_by_slug(&self.slug).await
    }
}

/// One page of promotions, bounds-checked before it is requested.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListPromotionsQuery {
    pub query: ListQuery,
    pub max_page_size: u32,
}

#[async_trait]
impl Query for ListPromotionsQuery {
    type Result = PromotionPage;

    #[instrument(skip(self, store), fields(page = self.query.page, limit = self.query.limit, sort = %self.query.sort))]
    async fn execute(&self, store: &dyn PromotionStore) -> Result<Self::Result, ServiceError> {
        self.query.ensure_valid(self.max_page_size)?;
        let page = store.list(&self.query).await?;
        debug!(
            items = page.items.len(),
            total = page.pagination.total_items,
            "Listed promotions"
        );
        Ok(page)
    }
}

/// Client-side filter over an already fetched list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionFilter {
    #[serde(default)]
    pub status: StatusFilter,
    /// Case-insensitive match against title, code and slug.
    #[serde(default)]
    pub search: Option<String>,
}

impl PromotionFilter {
    pub fn matches(&self, promotion: &Promotion) -> bool {
        if !self.status.matches(&promotion.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                promotion.title.to_lowercase().contains(&term)
                    || promotion.code.to_lowercase().contains(&term)
                    || promotion.slug.contains(&term)
            }
        }
    }

    pub fn apply<'a>(&self, promotions: &'a [Promotion]) -> Vec<&'a Promotion> {
        promotions.iter().filter(|p| self.matches(p)).collect()
    }
}
