use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Promotion, PromotionPatch},
    services::reconciliation::prepare_edit,
    store::PromotionStore,
};

/// Full edit of a promotion. The persisted status is always re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePromotionCommand {
    pub current: Promotion,
    pub changes: PromotionPatch,
    pub requested_at: DateTime<Utc>,
}

impl UpdatePromotionCommand {
    pub fn new(current: Promotion, changes: PromotionPatch) -> Self {
        Self {
            current,
            changes,
            requested_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Command for UpdatePromotionCommand {
    type Result = Promotion;

    #[instrument(skip(self, store, event_sender), fields(slug = %self.current.slug))]
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let patch = prepare_edit(&self.current, self.changes.clone(), self.requested_at)?;

        let updated = store
            .update(&self.current.slug, &patch)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update promotion");
                e
            })?;

        info!(
            slug = %updated.slug,
            status = %updated.status,
            "Promotion updated"
        );

        let previous_slug = (updated.slug != self.current.slug).then(|| self.current.slug.clone());
        event_sender
            .publish(Event::PromotionUpdated {
                slug: updated.slug.clone(),
                previous_slug,
                status: updated.status.clone(),
            })
            .await;

        Ok(updated)
    }
}
