/// Event system for call-out lifecycle notifications
///
/// The registry publishes onto an `EventBus` when one is attached:
/// - scheduling and cancellation
/// - firing, including callbacks that failed
/// - entries dropped because their owner no longer exists

use crate::callout::AlarmHandle;
use crate::core::objects::OwnerId;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Maximum number of events buffered per subscriber
const EVENT_BUFFER_SIZE: usize = 100;

/// Events emitted by a `CallOutRegistry`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CallOutEvent {
    /// New call-out registered
    Scheduled {
        handle: AlarmHandle,
        owner: OwnerId,
        method: String,
        delay: f64,
        repeat: f64,
    },

    /// Callback invoked
    Fired {
        handle: AlarmHandle,
        owner: OwnerId,
        method: String,
    },

    /// Call-out removed before firing
    Cancelled {
        handle: AlarmHandle,
        owner: OwnerId,
        method: String,
        remaining: f64,
    },

    /// Owner was gone at fire time; entry dropped without invocation
    OwnerGone {
        handle: AlarmHandle,
        owner: OwnerId,
        method: String,
    },

    /// Callback returned an error
    CallbackFailed {
        handle: AlarmHandle,
        owner: OwnerId,
        method: String,
        error: String,
    },
}

impl CallOutEvent {
    /// Handle of the call-out this event refers to
    pub fn handle(&self) -> AlarmHandle {
        match self {
            CallOutEvent::Scheduled { handle, .. }
            | CallOutEvent::Fired { handle, .. }
            | CallOutEvent::Cancelled { handle, .. }
            | CallOutEvent::OwnerGone { handle, .. }
            | CallOutEvent::CallbackFailed { handle, .. } => *handle,
        }
    }

    /// Owner of the call-out this event refers to
    pub fn owner(&self) -> OwnerId {
        match self {
            CallOutEvent::Scheduled { owner, .. }
            | CallOutEvent::Fired { owner, .. }
            | CallOutEvent::Cancelled { owner, .. }
            | CallOutEvent::OwnerGone { owner, .. }
            | CallOutEvent::CallbackFailed { owner, .. } => *owner,
        }
    }

    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        matches!(self, CallOutEvent::CallbackFailed { .. })
    }
}

/// Event bus for pub/sub communication
pub struct EventBus {
    sender: broadcast::Sender<CallOutEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: CallOutEvent) -> Result<()> {
        // broadcast::send returns error only if no receivers exist, which is ok
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Subscribe to events
    ///
    /// Returns a receiver that will receive all future events.
    /// The receiver will buffer up to EVENT_BUFFER_SIZE events.
    pub fn subscribe(&self) -> broadcast::Receiver<CallOutEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired(owner: OwnerId) -> CallOutEvent {
        CallOutEvent::Fired {
            handle: AlarmHandle(1),
            owner,
            method: "clean_up".to_string(),
        }
    }

    #[test]
    fn test_create_event_bus() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0, "Should start with no subscribers");
    }

    #[tokio::test]
    async fn test_publish_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let event = fired(OwnerId::new());
        bus.publish(event.clone()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event, "Should receive published event");
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = fired(OwnerId::new());
        bus.publish(event.clone()).unwrap();

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        drop(rx);

        let result = bus.publish(fired(OwnerId::new()));
        assert!(result.is_ok(), "Publishing should succeed with no subscribers");
    }

    #[test]
    fn test_event_accessors() {
        let owner = OwnerId::new();
        let failed = CallOutEvent::CallbackFailed {
            handle: AlarmHandle(7),
            owner,
            method: "poll".to_string(),
            error: "boom".to_string(),
        };

        assert_eq!(failed.handle(), AlarmHandle(7));
        assert_eq!(failed.owner(), owner);
        assert!(failed.is_error());
        assert!(!fired(owner).is_error());
    }

    #[test]
    fn test_json_serialization() {
        let event = CallOutEvent::Scheduled {
            handle: AlarmHandle(3),
            owner: OwnerId::new(),
            method: "beat".to_string(),
            delay: 1.0,
            repeat: 1.0,
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: CallOutEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event, "Should deserialize correctly");
    }
}
