//! In-process event bus for synchronous cross-subsystem fan-out.
//!
//! Topic-based publish/subscribe within one process. Handlers are called
//! sequentially in subscription order with failure isolation: one failing
//! handler never prevents the rest from running. Callers get the collected
//! failures back and decide whether to log, retry, or ignore.
//!
//! Subscribe and unsubscribe are expected at startup; the registry lock is
//! held only while copying the handler list out, so handlers may publish
//! re-entrantly.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Event payloads are topic-specific JSON objects; consumers must tolerate
/// unknown keys.
pub type EventPayload = serde_json::Value;

/// Error type handlers may fail with.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type HandlerFn = Arc<dyn Fn(EventPayload) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

#[derive(Clone)]
struct Handler {
    name: String,
    func: HandlerFn,
}

/// A handler failure recorded during publish.
#[derive(Debug)]
pub struct HandlerFailure {
    pub handler_name: String,
    pub error: HandlerError,
    pub event_type: String,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Topic registry with named async handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a named handler for an event type. Handlers run in
    /// subscription order on publish.
    pub async fn subscribe<F, Fut>(&self, event_type: &str, name: &str, func: F)
    where
        F: Fn(EventPayload) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let func: HandlerFn = Arc::new(move |payload| Box::pin(func(payload)));
        let handler = Handler {
            name: name.to_string(),
            func,
        };
        let mut handlers = self.handlers.write().await;
        handlers.entry(event_type.to_string()).or_default().push(handler);
        debug!(event_type, handler = name, "subscribed handler");
    }

    /// Remove the first handler registered under `name` for `event_type`.
    /// A missing handler is logged and ignored.
    pub async fn unsubscribe(&self, event_type: &str, name: &str) {
        let mut handlers = self.handlers.write().await;
        let Some(list) = handlers.get_mut(event_type) else {
            warn!(event_type, handler = name, "handler not found for event type");
            return;
        };
        match list.iter().position(|h| h.name == name) {
            Some(idx) => {
                list.remove(idx);
                debug!(event_type, handler = name, "unsubscribed handler");
            }
            None => warn!(event_type, handler = name, "handler not found for event type"),
        }
    }

    /// Remove all handlers. Test hook.
    pub async fn clear(&self) {
        self.handlers.write().await.clear();
        debug!("cleared all event handlers");
    }

    /// Publish an event to all subscribed handlers, sequentially, in
    /// subscription order. Returns the failures; an empty list means every
    /// handler succeeded. Publishing a topic with no handlers is a no-op.
    pub async fn publish(&self, event_type: &str, payload: EventPayload) -> Vec<HandlerFailure> {
        // Copy the handler list out so the lock is not held across awaits.
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.read().await;
            match handlers.get(event_type) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => {
                    debug!(event_type, "no handlers for event");
                    return Vec::new();
                }
            }
        };

        debug!(event_type, count = snapshot.len(), "publishing event");

        let mut failures = Vec::new();
        for handler in &snapshot {
            if let Err(error) = (handler.func.as_ref())(payload.clone()).await {
                warn!(
                    event_type,
                    handler = %handler.name,
                    %error,
                    "event handler failed"
                );
                failures.push(HandlerFailure {
                    handler_name: handler.name.clone(),
                    error,
                    event_type: event_type.to_string(),
                });
            }
        }

        if !failures.is_empty() {
            warn!(
                event_type,
                failed = failures.len(),
                total = snapshot.len(),
                "one or more event handlers failed"
            );
        }
        failures
    }
}

/// The process-wide bus. Created on first use; tests call `clear()` between
/// cases instead of replacing it.
pub fn event_bus() -> &'static EventBus {
    static BUS: OnceLock<EventBus> = OnceLock::new();
    BUS.get_or_init(EventBus::new)
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Stable event-type strings, `entity.action`.
pub mod topics {
    pub const CAMPAIGN_CREATED: &str = "campaign.created";
    pub const CAMPAIGN_UPDATED: &str = "campaign.updated";
    pub const CAMPAIGN_DELETED: &str = "campaign.deleted";
    pub const CAMPAIGN_STARTED: &str = "campaign.started";
    pub const CAMPAIGN_PAUSED: &str = "campaign.paused";
    pub const CAMPAIGN_COMPLETED: &str = "campaign.completed";

    pub const ATTACK_CREATED: &str = "attack.created";
    pub const ATTACK_UPDATED: &str = "attack.updated";
    pub const ATTACK_DELETED: &str = "attack.deleted";
    pub const ATTACK_STARTED: &str = "attack.started";
    pub const ATTACK_COMPLETED: &str = "attack.completed";

    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_ASSIGNED: &str = "task.assigned";
    pub const TASK_PROGRESS: &str = "task.progress";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_FAILED: &str = "task.failed";

    pub const AGENT_REGISTERED: &str = "agent.registered";
    pub const AGENT_HEARTBEAT: &str = "agent.heartbeat";
    pub const AGENT_OFFLINE: &str = "agent.offline";
    pub const AGENT_ERROR: &str = "agent.error";

    pub const HASH_CRACKED: &str = "hash.cracked";
    pub const HASH_LIST_CREATED: &str = "hash_list.created";
    pub const HASH_LIST_UPDATED: &str = "hash_list.updated";

    pub const RESOURCE_UPLOADED: &str = "resource.uploaded";
    pub const RESOURCE_DELETED: &str = "resource.deleted";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn subscribe_and_publish_calls_handler_once() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        bus.subscribe("campaign.created", "counter", move |payload| {
            let seen = seen.clone();
            async move {
                assert_eq!(payload["campaign_id"], 123);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        let failures = bus
            .publish("campaign.created", serde_json::json!({"campaign_id": 123}))
            .await;
        assert!(failures.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = order.clone();
            bus.subscribe("task.progress", label, move |_| {
                let order = order.clone();
                async move {
                    order.lock().await.push(label);
                    Ok(())
                }
            })
            .await;
        }

        bus.publish("task.progress", serde_json::json!({})).await;
        assert_eq!(*order.lock().await, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn publish_without_handlers_is_noop() {
        let bus = EventBus::new();
        let failures = bus.publish("agent.offline", serde_json::json!({})).await;
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        bus.subscribe("hash.cracked", "recorder", move |_| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        bus.publish("hash.cracked", serde_json::json!({})).await;
        bus.unsubscribe("hash.cracked", "recorder").await;
        bus.publish("hash.cracked", serde_json::json!({})).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_missing_handler_is_harmless() {
        let bus = EventBus::new();
        bus.unsubscribe("campaign.deleted", "ghost").await;
        bus.subscribe("campaign.deleted", "real", |_| async { Ok(()) })
            .await;
        bus.unsubscribe("campaign.deleted", "ghost").await;
        let failures = bus.publish("campaign.deleted", serde_json::json!({})).await;
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn failing_handler_is_isolated_and_reported() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        bus.subscribe("attack.started", "faulty", |_| async {
            Err("boom".into())
        })
        .await;
        let seen = calls.clone();
        bus.subscribe("attack.started", "healthy", move |_| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        let failures = bus.publish("attack.started", serde_json::json!({})).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].handler_name, "faulty");
        assert_eq!(failures[0].event_type, "attack.started");
        assert_eq!(calls.load(Ordering::SeqCst), 1, "healthy handler still ran");
    }

    #[tokio::test]
    async fn clear_empties_registry() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        bus.subscribe("resource.uploaded", "recorder", move |_| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;
        bus.clear().await;
        bus.publish("resource.uploaded", serde_json::json!({})).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn global_bus_is_a_singleton() {
        let a = event_bus() as *const EventBus;
        let b = event_bus() as *const EventBus;
        assert_eq!(a, b);
    }

    #[test]
    fn topic_constants_follow_entity_action_convention() {
        for topic in [
            topics::CAMPAIGN_CREATED,
            topics::ATTACK_COMPLETED,
            topics::TASK_PROGRESS,
            topics::AGENT_HEARTBEAT,
            topics::HASH_CRACKED,
            topics::RESOURCE_DELETED,
        ] {
            assert_eq!(topic.split('.').count(), 2);
        }
    }
}
