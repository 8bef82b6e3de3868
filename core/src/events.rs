//! Process-wide event bus.
//!
//! A cloneable handle over a `tokio::sync::broadcast` channel. Every clone
//! publishes to and subscribes from the same channel, so one bus can be handed
//! to any number of resources and UI listeners.

use tokio::sync::broadcast;

use crate::error::ApiError;

/// Name under which failed requests are announced.
pub const REQUEST_ERROR: &str = "request-error";

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// A request failed; carries the original error.
    RequestError(ApiError),
}

impl BusEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::RequestError(_) => REQUEST_ERROR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Subscribers that fall more than `capacity` events behind skip ahead.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Publish `event` to every current subscriber and return how many there
    /// were. Publishing with nobody listening is not an error.
    pub fn publish(&self, event: BusEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = name, receivers, "event published");
                receivers
            }
            Err(_) => {
                tracing::debug!(event = name, "event published without subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> BusEvent {
        BusEvent::RequestError(ApiError::Transport("down".to_string()))
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(event()), 0);
    }

    #[tokio::test]
    async fn clones_share_one_channel() {
        let bus = EventBus::default();
        let listener = bus.clone();
        let mut first = listener.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(event()), 2);
        assert_eq!(first.recv().await.unwrap(), event());
        assert_eq!(second.recv().await.unwrap(), event());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(event());
        assert_eq!(rx.try_recv().unwrap().name(), REQUEST_ERROR);
    }
}
