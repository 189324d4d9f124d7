//! Event broadcaster for build lifecycle events.
//!
//! Two kinds of subscribers are supported:
//! - synchronous [`BuildEventListener`]s, called in registration order on the
//!   publishing thread, each isolated so a panicking listener cannot starve the rest;
//! - async receivers from [`EventBroadcaster::subscribe`], fed through a
//!   `tokio::sync::broadcast` channel (one per WebSocket connection).

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::models::BuildEvent;

/// Default capacity for the broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Synchronous event subscriber.
///
/// Listeners run while the publishing job is locked, so they must be quick and
/// must not call back into the job store.
pub trait BuildEventListener: Send + Sync {
    fn on_event(&self, event: &BuildEvent);
}

impl<F> BuildEventListener for F
where
    F: Fn(&BuildEvent) + Send + Sync,
{
    fn on_event(&self, event: &BuildEvent) {
        self(event)
    }
}

/// Handle returned by [`EventBroadcaster::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event broadcaster that distributes build events to listeners and connected clients.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<BuildEvent>,
    listeners: Arc<RwLock<Vec<(ListenerId, Arc<dyn BuildEventListener>)>>>,
    next_listener_id: Arc<AtomicU64>,
}

impl EventBroadcaster {
    /// Create a new EventBroadcaster with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new EventBroadcaster with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_listener_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to receive events.
    /// Returns a receiver that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.sender.subscribe()
    }

    /// Number of live async receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Register a synchronous listener. Listeners are notified in registration order.
    pub fn add_listener(&self, listener: Arc<dyn BuildEventListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Publish an event to every listener, then to every async receiver.
    /// Returns the number of async receivers that were handed the event.
    pub fn publish(&self, event: BuildEvent) -> usize {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))).is_err() {
                warn!(
                    listener = id.0,
                    build_job_id = %event.job_id(),
                    event = %event.kind,
                    "Build event listener panicked, skipping"
                );
            }
        }

        // No receivers is not an error
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener that writes terminal build events to the log.
pub struct TracingListener;

impl BuildEventListener for TracingListener {
    fn on_event(&self, event: &BuildEvent) {
        if !event.kind.is_terminal() {
            return;
        }
        let job = &event.job;
        match &job.error_message {
            Some(error) => warn!(
                build_job_id = %job.id,
                device = job.config.device_name().unwrap_or_default(),
                error = %error,
                "Build failed"
            ),
            None => info!(
                build_job_id = %job.id,
                device = job.config.device_name().unwrap_or_default(),
                status = %job.status,
                outputs = ?job.output_files,
                "Build finished"
            ),
        }
    }
}
