use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::PromotionStore;
use crate::errors::{ConflictField, ServiceError, ServiceResult};
use crate::models::{
    normalize_code, ListQuery, Pagination, Promotion, PromotionInput, PromotionPage,
    PromotionPatch,
};

/// Store kept in process memory.
///
/// Enforces the same rules the backend does (unique slug and code, a valid
/// date window, usage within the ceiling) so that the service can be driven
/// end to end without a server.
#[derive(Debug, Default)]
pub struct InMemoryPromotionStore {
    promotions: RwLock<Vec<Promotion>>,
}

impl InMemoryPromotionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store without running any checks.
    pub fn with_promotions(promotions: Vec<Promotion>) -> Self {
        Self {
            promotions: RwLock::new(promotions),
        }
    }

    /// Inserts a record as-is, bypassing every rule.
    pub async fn insert_raw(&self, promotion: Promotion) {
        self.promotions.write().await.push(promotion);
    }

    pub async fn snapshot(&self) -> Vec<Promotion> {
        self.promotions.read().await.clone()
    }

    fn check_unique(
        promotions: &[Promotion],
        slug: &str,
        code: &str,
        skip_slug: Option<&str>,
    ) -> ServiceResult<()> {
        let code = normalize_code(code);
        for existing in promotions
            .iter()
            .filter(|p| Some(p.slug.as_str()) != skip_slug)
        {
            if existing.slug == slug {
                return Err(ServiceError::conflict(
                    ConflictField::Slug,
                    format!("Duplicate slug '{}'", slug),
                ));
            }
            if existing.normalized_code() == code {
                return Err(ServiceError::conflict(
                    ConflictField::Code,
                    format!("Duplicate code '{}'", existing.code),
                ));
            }
        }
        Ok(())
    }

    fn check_record(promotion: &Promotion) -> ServiceResult<()> {
        if promotion.end_date <= promotion.start_date {
            return Err(ServiceError::ValidationError(
                "endDate must be after startDate".to_string(),
            ));
        }
        if promotion.max_usage == 0 {
            return Err(ServiceError::ValidationError(
                "maxUsage must be at least 1".to_string(),
            ));
        }
        if promotion.current_usage > promotion.max_usage {
            return Err(ServiceError::ValidationError(
                "currentUsage cannot exceed maxUsage".to_string(),
            ));
        }
        Ok(())
    }
}

fn compare(a: &Promotion, b: &Promotion, field: &str) -> Ordering {
    match field {
        "title" => a.title.cmp(&b.title),
        "startDate" => a.start_date.cmp(&b.start_date),
        "endDate" => a.end_date.cmp(&b.end_date),
        "maxUsage" => a.max_usage.cmp(&b.max_usage),
        "shareCount" => a.share_count.cmp(&b.share_count),
        _ => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl PromotionStore for InMemoryPromotionStore {
    async fn list(&self, query: &ListQuery) -> ServiceResult<PromotionPage> {
        let promotions = self.promotions.read().await;

        // insertion order breaks ties, newest insert first when descending
        let mut indexed: Vec<(usize, &Promotion)> = promotions.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            let ordering = compare(a, b, &query.sort.field).then(ia.cmp(ib));
            if query.sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let limit = query.limit.max(1) as usize;
        let items = indexed
            .into_iter()
            .skip(query.offset())
            .take(limit)
            .map(|(_, p)| p.clone())
            .collect();

        Ok(PromotionPage {
            items,
            pagination: Pagination::for_total(query.page, query.limit, promotions.len() as u64),
        })
    }

    async fn get_by_slug(&self, slug: &str) -> ServiceResult<Promotion> {
        self.promotions
            .read()
            .await
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Promotion '{}' not found", slug)))
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    async fn create(&self, input: &PromotionInput) -> ServiceResult<Promotion> {
        let mut promotions = self.promotions.write().await;
        Self::check_unique(&promotions, &input.slug, &input.code, None)?;

        let now = Utc::now();
        let promotion = Promotion {
            id: Uuid::new_v4().to_string(),
            slug: input.slug.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            image: input.image.clone(),
            code: input.code.clone(),
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            start_date: input.start_date,
            end_date: input.end_date,
            max_usage: input.max_usage,
            current_usage: 0,
            status: input.status.clone(),
            content: input.content.clone(),
            share_count: 0,
            created_at: Some(now),
            updated_at: Some(now),
        };
        Self::check_record(&promotion)?;

        promotions.push(promotion.clone());
        debug!(id = %promotion.id, "stored promotion");
        Ok(promotion)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, slug: &str, patch: &PromotionPatch) -> ServiceResult<Promotion> {
        let mut promotions = self.promotions.write().await;
        let index = promotions
            .iter()
            .position(|p| p.slug == slug)
            .ok_or_else(|| ServiceError::NotFound(format!("Promotion '{}' not found", slug)))?;

        let mut updated = patch.apply_to(&promotions[index]);
        Self::check_unique(&promotions, &updated.slug, &updated.code, Some(slug))?;
        Self::check_record(&updated)?;
        updated.updated_at = Some(Utc::now());

        promotions[index] = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, slug: &str) -> ServiceResult<()> {
        let mut promotions = self.promotions.write().await;
        let before = promotions.len();
        promotions.retain(|p| p.slug != slug);
        if promotions.len() == before {
            return Err(ServiceError::NotFound(format!(
                "Promotion '{}' not found",
                slug
            )));
        }
        Ok(())
    }

    async fn increment_share_count(&self, slug: &str) -> ServiceResult<u64> {
        let mut promotions = self.promotions.write().await;
        let promotion = promotions
            .iter_mut()
            .find(|p| p.slug == slug)
            .ok_or_else(|| ServiceError::NotFound(format!("Promotion '{}' not found", slug)))?;
        promotion.share_count += 1;
        Ok(promotion.share_count)
    }
}
