use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::errors::{ServiceError, ServiceResult};

/// Tracks mutating requests that have not completed yet.
///
/// Holding an [`InFlightTicket`] is the equivalent of a disabled submit
/// button: a second submission under the same key is refused until the ticket
/// is dropped, whether the request succeeded or failed.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: Arc<DashMap<String, Instant>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, key: impl Into<String>) -> ServiceResult<InFlightTicket> {
        let key = key.into();
        match self.active.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(action = %key, "rejecting duplicate submission");
                Err(ServiceError::RequestInFlight(key))
            }
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Ok(InFlightTicket {
                    key,
                    active: Arc::clone(&self.active),
                })
            }
        }
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.active.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.active.len()
    }
}

#[derive(Debug)]
pub struct InFlightTicket {
    key: String,
    active: Arc<DashMap<String, Instant>>,
}

impl InFlightTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn elapsed(&self) -> Duration {
        self.active
            .get(&self.key)
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}
