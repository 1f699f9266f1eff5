use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Promotion, PromotionDraft},
    services::reconciliation::prepare_create,
    store::PromotionStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePromotionCommand {
    pub draft: PromotionDraft,
    /// Instant the status is derived at.
    pub requested_at: DateTime<Utc>,
}

impl CreatePromotionCommand {
    pub fn new(draft: PromotionDraft) -> Self {
        Self {
            draft,
            requested_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Command for CreatePromotionCommand {
    type Result = Promotion;

    #[instrument(skip(self, store, event_sender), fields(title = %self.draft.title))]
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let input = prepare_create(&self.draft, self.requested_at)?;

        let created = store.create(&input).await.map_err(|e| {
            error!(slug = %input.slug, error = %e, "Failed to create promotion");
            e
        })?;

        self.log_and_trigger_event(event_sender, &created).await;

        Ok(created)
    }
}

impl CreatePromotionCommand {
    async fn log_and_trigger_event(&self, event_sender: Arc<EventSender>, promotion: &Promotion) {
        info!(slug = %promotion.slug, status = %promotion.status, "Promotion created");

        event_sender
            .publish(Event::PromotionCreated {
                slug: promotion.slug.clone(),
                status: promotion.status.clone(),
            })
            .await;
    }
}
