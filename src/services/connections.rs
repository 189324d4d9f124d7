//! Registry of open WebSocket connections.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

/// Details kept for each open connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub client_addr: String,
    pub connected_at: DateTime<Utc>,
}

/// Set of open push connections. Entries are removed when their guard drops.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<Uuid, ConnectionInfo>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for as long as the returned guard lives.
    pub fn register(&self, client_addr: impl Into<String>) -> ConnectionGuard {
        let id = Uuid::new_v4();
        self.connections.lock().insert(
            id,
            ConnectionInfo {
                client_addr: client_addr.into(),
                connected_at: Utc::now(),
            },
        );
        ConnectionGuard {
            id,
            registry: self.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<ConnectionInfo> {
        self.connections.lock().get(&id).cloned()
    }
}

/// Removes its connection from the registry on drop.
pub struct ConnectionGuard {
    id: Uuid,
    registry: ConnectionRegistry,
}

impl ConnectionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.connections.lock().remove(&self.id);
    }
}
