//! Live WebSocket connections, keyed by task id.
//!
//! The registry is an ordinary value held in the router state. Each
//! connection is represented by a [`ConnectionGuard`]; dropping the guard
//! removes the entry, whichever way the handler exits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::TaskUpdate;

type Senders = HashMap<Uuid, mpsc::UnboundedSender<TaskUpdate>>;

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<Senders>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task_id` and return the guard that receives its updates.
    ///
    /// Connecting twice with the same id replaces the older connection; the
    /// older guard then stops receiving and its drop leaves the newer entry alone.
    pub fn connect(&self, task_id: Uuid) -> ConnectionGuard {
        let (sender, receiver) = mpsc::unbounded_channel();
        let previous = self.lock().insert(task_id, sender.clone());
        if previous.is_some() {
            debug!(%task_id, "Replacing existing connection");
        }
        debug!(%task_id, connections = self.len(), "WebSocket connected");

        ConnectionGuard {
            task_id,
            registry: self.clone(),
            sender,
            receiver,
        }
    }

    /// Queue `update` for the connection, if it is still there.
    pub fn send_update(&self, task_id: Uuid, update: TaskUpdate) -> bool {
        match self.lock().get(&task_id) {
            Some(sender) => sender.send(update).is_ok(),
            None => {
                debug!(%task_id, "Dropping update for a closed connection");
                false
            }
        }
    }

    pub fn is_connected(&self, task_id: Uuid) -> bool {
        self.lock().contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Senders> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn disconnect(&self, task_id: Uuid, sender: &mpsc::UnboundedSender<TaskUpdate>) {
        let mut senders = self.lock();
        if senders.get(&task_id).is_some_and(|current| current.same_channel(sender)) {
            senders.remove(&task_id);
            debug!(%task_id, "WebSocket disconnected");
        }
    }
}

/// One registered connection. Updates sent to its task id arrive here.
pub struct ConnectionGuard {
    task_id: Uuid,
    registry: ConnectionRegistry,
    sender: mpsc::UnboundedSender<TaskUpdate>,
    receiver: mpsc::UnboundedReceiver<TaskUpdate>,
}

impl ConnectionGuard {
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Wait for the next update addressed to this connection.
    pub async fn recv(&mut self) -> Option<TaskUpdate> {
        self.receiver.recv().await
    }

    /// An update that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<TaskUpdate> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.disconnect(self.task_id, &self.sender);
    }
}
