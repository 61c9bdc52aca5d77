use log::{debug, info};
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Pushes an event to whoever is listening. Delivery is best effort.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, event: &str, payload: serde_json::Value);
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LiveEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl LiveEvent {
    /// Server-sent-events framing.
    pub fn to_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.payload)
    }
}

/// Fan-out hub for every connected live session. Slow subscribers lose the
/// oldest events once the channel is full.
pub struct EventHub {
    sender: broadcast::Sender<LiveEvent>,
}

impl EventHub {
    pub fn new() -> EventHub {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        EventHub { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        info!(
            "[EventHub] session joined, {} listening",
            self.sender.receiver_count() + 1
        );
        self.sender.subscribe()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        EventHub::new()
    }
}

impl Broadcaster for EventHub {
    fn broadcast(&self, event: &str, payload: serde_json::Value) {
        let live_event = LiveEvent {
            event: event.to_string(),
            payload,
        };
        match self.sender.send(live_event) {
            Ok(sessions) => debug!("[EventHub] {} sent to {} sessions", event, sessions),
            Err(_) => debug!("[EventHub] {} dropped, nobody listening", event),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribers_receive_broadcasts() {
        let hub = EventHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.broadcast("newApplication", json!({"id": 1}));

        let received = first.try_recv().unwrap();
        assert_eq!(received.event, "newApplication");
        assert_eq!(received.payload, json!({"id": 1}));
        assert_eq!(second.try_recv().unwrap(), received);
    }

    #[test]
    fn broadcasting_without_listeners_is_fine() {
        let hub = EventHub::new();
        hub.broadcast("applicationApproved", json!(null));

        let mut late = hub.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn lagging_subscriber_skips_old_events() {
        let hub = EventHub::new();
        let mut slow = hub.subscribe();
        for n in 0..(CHANNEL_CAPACITY + 3) {
            hub.broadcast("tick", json!(n));
        }

        assert!(matches!(
            slow.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        ));
        assert_eq!(slow.try_recv().unwrap().payload, json!(3));
    }

    #[test]
    fn frame_uses_sse_layout() {
        let event = LiveEvent {
            event: String::from("applicationRejected"),
            payload: json!({"status": "rejected"}),
        };
        assert_eq!(
            event.to_frame(),
            "event: applicationRejected\ndata: {\"status\":\"rejected\"}\n\n"
        );
    }
}
