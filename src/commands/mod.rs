use crate::{errors::ServiceError, events::EventSender, store::PromotionStore};
use async_trait::async_trait;
use std::sync::Arc;

/// Command trait for implementing the Command Pattern
///
/// Each command prepares its request locally, sends it through the store once
/// and publishes a domain event after the backend accepted it.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `store` - Promotions backend
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        store: Arc<dyn PromotionStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod promotions;
