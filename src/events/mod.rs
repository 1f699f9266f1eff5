use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use crate::models::PromotionStatus;

/// Domain events published after a promotion mutation has been accepted by
/// the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PromotionCreated {
        slug: String,
        status: PromotionStatus,
    },
    PromotionUpdated {
        slug: String,
        previous_slug: Option<String>,
        status: PromotionStatus,
    },
    PromotionStatusToggled {
        slug: String,
        from: PromotionStatus,
        to: PromotionStatus,
    },
    PromotionDeleted(String),
    PromotionRedeemed {
        slug: String,
        current_usage: u32,
        max_usage: u32,
    },
    PromotionStatusResynced {
        slug: String,
        from: PromotionStatus,
        to: PromotionStatus,
    },
    PromotionShared {
        slug: String,
        share_count: u64,
    },
}

impl Event {
    pub fn slug(&self) -> &str {
        match self {
            Event::PromotionCreated { slug, .. }
            | Event::PromotionUpdated { slug, .. }
            | Event::PromotionStatusToggled { slug, .. }
            | Event::PromotionRedeemed { slug, .. }
            | Event::PromotionStatusResynced { slug, .. }
            | Event::PromotionShared { slug, .. } => slug,
            Event::PromotionDeleted(slug) => slug,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::PromotionCreated { .. } => "promotion_created",
            Event::PromotionUpdated { .. } => "promotion_updated",
            Event::PromotionStatusToggled { .. } => "promotion_status_toggled",
            Event::PromotionDeleted(_) => "promotion_deleted",
            Event::PromotionRedeemed { .. } => "promotion_redeemed",
            Event::PromotionStatusResynced { .. } => "promotion_status_resynced",
            Event::PromotionShared { .. } => "promotion_shared",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Enqueues an event without waiting for channel capacity.
    ///
    /// The mutation that produced the event has already been persisted, so a
    /// full or closed channel only drops the event with a warning.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        let slug = event.slug().to_string();
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(event = name, slug = %slug, "event channel full, event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(event = name, slug = %slug, "event channel closed, event dropped");
            }
        }
    }
}

/// Bounded event channel; `capacity` is clamped to at least one slot.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Drains the channel, logging every event and handing it to `handler`.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handler: Option<&dyn EventHandler>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PromotionRedeemed {
                slug,
                current_usage,
                max_usage,
            } if current_usage >= max_usage => {
                warn!(slug = %slug, max_usage, "promotion reached its usage limit");
            }
            Event::PromotionStatusToggled { slug, from, to }
            | Event::PromotionStatusResynced { slug, from, to } => {
                info!(slug = %slug, from = %from, to = %to, event = event.name(), "status changed");
            }
            other => {
                info!(slug = %other.slug(), event = other.name(), "promotion event");
            }
        }

        if let Some(handler) = handler {
            let name = event.name();
            if let Err(e) = handler.handle_event(event).await {
                error!(event = name, error = %e, "event handler failed");
            }
        }
    }

    warn!("Event processing loop has ended");
}
