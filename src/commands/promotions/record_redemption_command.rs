use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::Promotion,
    services::usage::prepare_redemption,
    store::PromotionStore,
};

/// Records one use of the promotion code. The persisted status is left alone
/// even when this redemption exhausts the promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRedemptionCommand {
    pub current: Promotion,
}

#[async_trait]
impl Command for RecordRedemptionCommand {
    type Result = Promotion;

    #[instrument(skip(self, store, event_sender), fields(slug = %self.current.slug))]
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let patch = prepare_redemption(&self.current)?;

        let updated = store
            .update(&self.current.slug, &patch)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to record redemption");
                e
            })?;

        info!(
            current_usage = updated.current_usage,
            max_usage = updated.max_usage,
            "Redemption recorded"
        );
        event_sender
            .publish(Event::PromotionRedeemed {
                slug: updated.slug.clone(),
                current_usage: updated.current_usage,
                max_usage: updated.max_usage,
            })
            .await;

        Ok(updated)
    }
}
