// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process event bus for engine notifications.
//!
//! Built on a tokio broadcast channel. Publishing never blocks and never
//! fails; events sent while nobody is subscribed are dropped.

use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    ChallengeUpdated,
    LogAdded,
    MilestoneAchieved,
}

/// A single engine event, broadcast to all subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct EngineEvent {
    pub topic: EventTopic,
    pub challenge_id: String,
    pub payload: serde_json::Value,
}

/// Cloneable handle to the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Lagging or absent subscribers are not an error.
    pub fn publish(&self, topic: EventTopic, challenge_id: &str, payload: serde_json::Value) {
        let event = EngineEvent {
            topic,
            challenge_id: challenge_id.to_string(),
            payload,
        };

        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(?topic, challenge_id, receivers, "Event published");
            }
            Err(_) => {
                tracing::debug!(?topic, challenge_id, "Event dropped (no subscribers)");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
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

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(
            EventTopic::LogAdded,
            "ch1",
            serde_json::json!({ "user_id": "u1" }),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, EventTopic::LogAdded);
        assert_eq!(event.challenge_id, "ch1");
        assert_eq!(event.payload["user_id"], "u1");
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new();
        bus.publish(EventTopic::ChallengeUpdated, "ch1", serde_json::json!({}));
    }
}
