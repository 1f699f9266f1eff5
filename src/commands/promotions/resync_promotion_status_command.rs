use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::Promotion,
    services::reconciliation::prepare_resync,
    store::PromotionStore,
};

/// Writes the derived status back when the persisted one has drifted.
///
/// Returns `None` without touching the backend when there is no drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncPromotionStatusCommand {
    pub current: Promotion,
    pub requested_at: DateTime<Utc>,
}

impl ResyncPromotionStatusCommand {
    pub fn new(current: Promotion) -> Self {
        Self {
            current,
            requested_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Command for ResyncPromotionStatusCommand {
    type Result = Option<Promotion>;

    #[instrument(skip(self, store, event_sender), fields(slug = %self.current.slug))]
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let Some(patch) = prepare_resync(&self.current, self.requested_at) else {
            debug!(status = %self.current.status, "Status already in sync");
            return Ok(None);
        };

        let updated = store
            .update(&self.current.slug, &patch)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to resync promotion status");
                e
            })?;

        info!(from = %self.current.status, to = %updated.status, "Promotion status resynced");
        event_sender
            .publish(Event::PromotionStatusResynced {
                slug: updated.slug.clone(),
                from: self.current.status.clone(),
                to: updated.status.clone(),
            })
            .await;

        Ok(Some(updated))
    }
}
