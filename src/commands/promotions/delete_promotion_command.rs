use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    store::PromotionStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePromotionCommand {
    pub slug: String,
    /// Set only after the user explicitly confirmed the deletion.
    pub confirmed: bool,
}

#[async_trait]
impl Command for DeletePromotionCommand {
    type Result = ();

    #[instrument(skip(self, store, event_sender), fields(slug = %self.slug))]
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if !self.confirmed {
            warn!("Refusing unconfirmed delete");
            return Err(ServiceError::InvalidOperation(format!(
                "deleting '{}' requires confirmation",
                self.slug
            )));
        }

        store.delete(&self.slug).await.map_err(|e| {
            error!(error = %e, "Failed to delete promotion");
            e
        })?;

        info!("Promotion deleted");
        event_sender
            .publish(Event::PromotionDeleted(self.slug.clone()))
            .await;

        Ok(())
    }
}
