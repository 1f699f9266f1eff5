use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::in_flight::InFlightGuard;
use super::promotion_status::{count_buckets, BucketCounts};
use super::reconciliation::{drift, ensure_code_available, StatusDrift};
use crate::{
    commands::{
        promotions::{
            CreatePromotionCommand, DeletePromotionCommand, RecordRedemptionCommand,
            ResyncPromotionStatusCommand, SharePromotionCommand, TogglePromotionStatusCommand,
            UpdatePromotionCommand,
        },
        Command,
    },
    config::AppConfig,
    errors::ServiceResult,
    events::EventSender,
    models::{ListQuery, Pagination, Promotion, PromotionDraft, PromotionPage, PromotionPatch},
    queries::{GetPromotionQuery, ListPromotionsQuery, PromotionFilter, Query},
    store::PromotionStore,
};

const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default)]
struct Listing {
    items: Vec<Promotion>,
    pagination: Option<Pagination>,
}

/// Administrator-facing promotion workflows.
///
/// Holds the last fetched page. A fetch replaces it wholesale; a mutation only
/// writes back the record the backend returned. Every mutating action holds an
/// in-flight ticket keyed by action and slug for as long as its request runs.
pub struct PromotionService {
    store: Arc<dyn PromotionStore>,
    event_sender: Arc<EventSender>,
    in_flight: InFlightGuard,
    listing: RwLock<Listing>,
    max_page_size: u32,
}

impl PromotionService {
    pub fn new(store: Arc<dyn PromotionStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
            in_flight: InFlightGuard::new(),
            listing: RwLock::new(Listing::default()),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let mut service = Self::new(store, event_sender);
        service.max_page_size = config.max_page_size;
        service
    }

    pub fn in_flight(&self) -> &InFlightGuard {
        &self.in_flight
    }

    /// Fetches a page and makes it the current listing.
    #[instrument(skip(self, query))]
    pub async fn load(&self, query: &ListQuery) -> ServiceResult<PromotionPage> {
        let page = ListPromotionsQuery {
            query: query.clone(),
            max_page_size: self.max_page_size,
        }
        .execute(self.store.as_ref())
        .await?;

        let mut listing = self.listing.write().await;
        listing.items = page.items.clone();
        listing.pagination = Some(page.pagination.clone());
        Ok(page)
    }

    pub async fn promotions(&self) -> Vec<Promotion> {
        self.listing.read().await.items.clone()
    }

    pub async fn pagination(&self) -> Option<Pagination> {
        self.listing.read().await.pagination.clone()
    }

    /// Active/expired counts over the current listing.
    pub async fn stats(&self) -> BucketCounts {
        count_buckets(self.listing.read().await.items.iter())
    }

    pub async fn filtered(&self, filter: &PromotionFilter) -> Vec<Promotion> {
        let listing = self.listing.read().await;
        filter.apply(&listing.items).into_iter().cloned().collect()
    }

    /// Listed promotions whose persisted status disagrees with the status
    /// derived at `now`.
    pub async fn drifted(&self, now: DateTime<Utc>) -> Vec<(Promotion, StatusDrift)> {
        self.listing
            .read()
            .await
            .items
            .iter()
            .filter_map(|p| drift(p, now).map(|d| (p.clone(), d)))
            .collect()
    }

    pub async fn get(&self, slug: &str) -> ServiceResult<Promotion> {
        GetPromotionQuery {
            slug: slug.to_string(),
        }
        .execute(self.store.as_ref())
        .await
    }

    #[instrument(skip(self, draft), fields(code = %draft.code))]
    pub async fn create(&self, draft: PromotionDraft) -> ServiceResult<Promotion> {
        let _ticket = self.in_flight.try_begin("create")?;

        {
            let listing = self.listing.read().await;
            ensure_code_available(&draft.code, &listing.items, None)?;
        }

        let created = CreatePromotionCommand::new(draft)
            .execute(self.store.clone(), self.event_sender.clone())
            .await?;

        self.listing.write().await.items.insert(0, created.clone());
        Ok(created)
    }

    #[instrument(skip(self, changes))]
    pub async fn edit(&self, slug: &str, changes: PromotionPatch) -> ServiceResult<Promotion> {
        let _ticket = self.in_flight.try_begin(format!("edit:{}", slug))?;

        if let Some(code) = &changes.code {
            let listing = self.listing.read().await;
            ensure_code_available(code, &listing.items, Some(slug))?;
        }

        let current = self.current(slug).await?;
        let updated = UpdatePromotionCommand::new(current, changes)
            .execute(self.store.clone(), self.event_sender.clone())
            .await?;

        self.write_back(slug, &updated).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn toggle_status(&self, slug: &str) -> ServiceResult<Promotion> {
        let _ticket = self.in_flight.try_begin(format!("toggle:{}", slug))?;

        let current = self.current(slug).await?;
        let updated = TogglePromotionStatusCommand { current }
            .execute(self.store.clone(), self.event_sender.clone())
            .await?;

        self.write_back(slug, &updated).await;
        Ok(updated)
    }

    /// Deletes only when `confirmed`; nothing is sent otherwise.
    #[instrument(skip(self))]
    pub async fn delete(&self, slug: &str, confirmed: bool) -> ServiceResult<()> {
        let _ticket = self.in_flight.try_begin(format!("delete:{}", slug))?;

        DeletePromotionCommand {
            slug: slug.to_string(),
            confirmed,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;

        self.listing.write().await.items.retain(|p| p.slug != slug);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn record_redemption(&self, slug: &str) -> ServiceResult<Promotion> {
        let _ticket = self.in_flight.try_begin(format!("redeem:{}", slug))?;

        let current = self.current(slug).await?;
        let updated = RecordRedemptionCommand { current }
            .execute(self.store.clone(), self.event_sender.clone())
            .await?;

        self.write_back(slug, &updated).await;
        Ok(updated)
    }

    /// Re-derives and persists the status. `None` when it was already in sync.
    #[instrument(skip(self))]
    pub async fn resync_status(&self, slug: &str) -> ServiceResult<Option<Promotion>> {
        let _ticket = self.in_flight.try_begin(format!("resync:{}", slug))?;

        let current = self.current(slug).await?;
        let updated = ResyncPromotionStatusCommand::new(current)
            .execute(self.store.clone(), self.event_sender.clone())
            .await?;

        if let Some(updated) = &updated {
            self.write_back(slug, updated).await;
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn share(&self, slug: &str) -> ServiceResult<u64> {
        let _ticket = self.in_flight.try_begin(format!("share:{}", slug))?;

        let share_count = SharePromotionCommand {
            slug: slug.to_string(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;

        if let Some(listed) = self
            .listing
            .write()
            .await
            .items
            .iter_mut()
            .find(|p| p.slug == slug)
        {
            listed.share_count = share_count;
        }
        Ok(share_count)
    }

    /// The listed record, or a fresh fetch when the slug is not listed.
    async fn current(&self, slug: &str) -> ServiceResult<Promotion> {
        let listed = self
            .listing
            .read()
            .await
            .items
            .iter()
            .find(|p| p.slug == slug)
            .cloned();

        match listed {
            Some(promotion) => Ok(promotion),
            None => {
                debug!(slug, "promotion not listed, fetching");
                self.get(slug).await
            }
        }
    }

    async fn write_back(&self, slug: &str, updated: &Promotion) {
        let mut listing = self.listing.write().await;
        match listing.items.iter_mut().find(|p| p.slug == slug) {
            Some(entry) => *entry = updated.clone(),
            None => info!(slug = %updated.slug, "updated promotion is not in the current listing"),
        }
    }
}

impl std::fmt::Debug for PromotionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromotionService")
            .field("in_flight", &self.in_flight.in_flight_count())
            .field("max_page_size", &self.max_page_size)
            .finish()
    }
}
