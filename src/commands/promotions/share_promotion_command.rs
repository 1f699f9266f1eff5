use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    store::PromotionStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePromotionCommand {
    pub slug: String,
}

#[async_trait]
impl Command for SharePromotionCommand {
    type Result = u64;

    #[instrument(skip(self, store, event_sender), fields(slug = %self.slug))]
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let share_count = store.increment_share_count(&self.slug).await?;

        info!(share_count, "Promotion shared");
        event_sender
            .publish(Event::PromotionShared {
                slug: self.slug.clone(),
                share_count,
            })
            .await;

        Ok(share_count)
    }
}
