#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cinema_promotions::{
    errors::ServiceResult,
    events::{self, Event},
    models::{
        DiscountType, ListQuery, Promotion, PromotionDraft, PromotionInput, PromotionPage,
        PromotionPatch, PromotionStatus,
    },
    services::PromotionService,
    store::{InMemoryPromotionStore, PromotionStore},
};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, Notify, Semaphore};

/// A fixed instant so date arithmetic in scenarios is reproducible.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_790_000_000, 0).unwrap()
}

pub fn draft(title: &str, code: &str) -> PromotionDraft {
    PromotionDraft {
        title: title.to_string(),
        description: None,
        image: None,
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: Decimal::from(20),
        start_date: Utc::now() - Duration::days(1),
        end_date: Utc::now() + Duration::days(10),
        max_usage: 100,
        content: Vec::new(),
    }
}

/// A stored record with an arbitrary persisted status.
pub fn stored(slug: &str, code: &str, status: &str) -> Promotion {
    Promotion {
        id: format!("id-{}", slug),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        description: None,
        image: None,
        code: code.to_string(),
        discount_type: DiscountType::Fixed,
        discount_value: Decimal::from(30_000),
        start_date: Utc::now() - Duration::days(1),
        end_date: Utc::now() + Duration::days(30),
        max_usage: 100,
        current_usage: 0,
        status: PromotionStatus::from(status),
        content: Vec::new(),
        share_count: 0,
        created_at: Some(Utc::now()),
        updated_at: None,
    }
}

/// In-memory store that counts backend calls and can hold writes at a gate.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryPromotionStore,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    gate: Option<Gate>,
}

struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl CountingStore {
    pub fn with_promotions(promotions: Vec<Promotion>) -> Self {
        Self {
            inner: InMemoryPromotionStore::with_promotions(promotions),
            ..Default::default()
        }
    }

    /// Writes block until [`CountingStore::release`] is called.
    pub fn gated(promotions: Vec<Promotion>) -> Self {
        Self {
            gate: Some(Gate {
                entered: Notify::new(),
                release: Semaphore::new(0),
            }),
            ..Self::with_promotions(promotions)
        }
    }

    pub async fn wait_until_entered(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.release.add_permits(1);
        }
    }

    pub fn writes(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl PromotionStore for CountingStore {
    async fn list(&self, query: &ListQuery) -> ServiceResult<PromotionPage> {
        self.inner.list(query).await
    }

    async fn get_by_slug(&self, slug: &str) -> ServiceResult<Promotion> {
        self.inner.get_by_slug(slug).await
    }

    async fn create(&self, input: &PromotionInput) -> ServiceResult<Promotion> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        self.inner.create(input).await
    }

    async fn update(&self, slug: &str, patch: &PromotionPatch) -> ServiceResult<Promotion> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        self.inner.update(slug, patch).await
    }

    async fn delete(&self, slug: &str) -> ServiceResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        self.inner.delete(slug).await
    }

    async fn increment_share_count(&self, slug: &str) -> ServiceResult<u64> {
        self.inner.increment_share_count(slug).await
    }
}

pub struct Harness {
    pub service: Arc<PromotionService>,
    pub store: Arc<CountingStore>,
    pub events: mpsc::Receiver<Event>,
}

impl Harness {
    pub fn new(store: CountingStore) -> Self {
        let store = Arc::new(store);
        let (sender, events) = events::channel(64);
        let service = PromotionService::new(store.clone(), Arc::new(sender));
        Self {
            service: Arc::new(service),
            store,
            events,
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}
