use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const MAX_QUEUED: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffEvent {
    pub session_id: Uuid,
    pub user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Conversations waiting for a human agent.
pub struct HandoffQueue {
    pending: Mutex<Vec<HandoffEvent>>,
    tx: broadcast::Sender<HandoffEvent>,
}

impl HandoffQueue {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            pending: Mutex::new(Vec::new()),
            tx,
        }
    }

    pub fn push(&self, session_id: Uuid, user_id: i64, message: &str) {
        let event = HandoffEvent {
            session_id,
            user_id,
            message: message.to_string(),
            created_at: Utc::now(),
        };

        if let Ok(mut pending) = self.pending.lock() {
            if pending.len() >= MAX_QUEUED {
                pending.remove(0);
            }
            pending.push(event.clone());
        }

        tracing::info!(user_id, session_id = %session_id, "conversation transferred to a human agent");
        // Broadcast to SSE subscribers; ignore if no receivers
        let _ = self.tx.send(event);
    }

    pub fn pending(&self) -> Vec<HandoffEvent> {
        self.pending
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HandoffEvent> {
        self.tx.subscribe()
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_queues_and_broadcasts() {
        let queue = HandoffQueue::new();
        let mut rx = queue.subscribe();
        let session_id = Uuid::new_v4();

        queue.push(session_id, 42, "I want to cancel my order");

        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_id, 42);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id, session_id);
        assert_eq!(event.message, "I want to cancel my order");
    }
}
