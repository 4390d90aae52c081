use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::UtcDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerEventKind {
    IngestionStarted,
    IngestionCompleted,
    EnrichmentStarted,
    EnrichmentCompleted,
    RefreshStarted,
    RefreshCompleted,
    SchedulerStarted,
    SchedulerStopped,
    Error,
}

impl SchedulerEventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IngestionStarted => "ingestion_started",
            Self::IngestionCompleted => "ingestion_completed",
            Self::EnrichmentStarted => "enrichment_started",
            Self::EnrichmentCompleted => "enrichment_completed",
            Self::RefreshStarted => "refresh_started",
            Self::RefreshCompleted => "refresh_completed",
            Self::SchedulerStarted => "scheduler_started",
            Self::SchedulerStopped => "scheduler_stopped",
            Self::Error => "error",
        }
    }
}

impl Display for SchedulerEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notification delivered to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerEvent {
    pub kind: SchedulerEventKind,
    pub timestamp: UtcDateTime,
    pub payload: Value,
}

impl SchedulerEvent {
    pub fn new(kind: SchedulerEventKind, payload: Value) -> Self {
        Self {
            kind,
            timestamp: UtcDateTime::now(),
            payload,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&SchedulerEvent) + Send + Sync>;

/// Ordered list of subscriber callbacks, invoked synchronously on emit.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, Handler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .expect("event handlers lock is not poisoned")
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self
            .handlers
            .lock()
            .expect("event handlers lock is not poisoned");
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Deliver `event` to every handler in registration order.
    ///
    /// Handlers run outside the lock, so a handler may subscribe or
    /// unsubscribe; such changes apply from the next emit.
    pub fn emit(&self, event: &SchedulerEvent) {
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .expect("event handlers lock is not poisoned")
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers
            .lock()
            .expect("event handlers lock is not poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
