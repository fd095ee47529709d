//! Domain event system — observability hooks for the orchestration loop.
//!
//! The loop publishes an event at the start and end of every consultation
//! and after every capability run. Nobody has to listen: publishing without
//! subscribers is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A model consultation is about to start
    ConsultStarted {
        conversation_id: String,
        turns: usize,
        timestamp: DateTime<Utc>,
    },

    /// The model answered
    ConsultFinished {
        conversation_id: String,
        model: String,
        requested_tool: Option<String>,
        tokens_used: Option<u32>,
        timestamp: DateTime<Utc>,
    },

    /// A capability was run
    ToolExecuted {
        conversation_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run reached its final answer
    RunFinished {
        conversation_id: String,
        turns: usize,
        steps: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolExecuted {
            conversation_id: "c1".into(),
            tool_name: "search_query".into(),
            success: true,
            duration_ms: 42,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolExecuted { tool_name, duration_ms, .. } => {
                assert_eq!(tool_name, "search_query");
                assert_eq!(*duration_ms, 42);
            }
            other => panic!("Unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::RunFinished {
            conversation_id: "c1".into(),
            turns: 2,
            steps: 1,
            timestamp: Utc::now(),
        });
    }
}
