use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::Promotion,
    services::reconciliation::prepare_toggle,
    store::PromotionStore,
};

/// Manual override: `active` becomes `expired`, anything else `active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TogglePromotionStatusCommand {
    pub current: Promotion,
}

#[async_trait]
impl Command for TogglePromotionStatusCommand {
    type Result = Promotion;

    #[instrument(skip(self, store, event_sender), fields(slug = %self.current.slug, from = %self.current.status))]
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let patch = prepare_toggle(&self.current);

        let updated = store
            .update(&self.current.slug, &patch)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to toggle promotion status");
                e
            })?;

        info!(to = %updated.status, "Promotion status toggled");
        event_sender
            .publish(Event::PromotionStatusToggled {
                slug: updated.slug.clone(),
                from: self.current.status.clone(),
                to: updated.status.clone(),
            })
            .await;

        Ok(updated)
    }
}
