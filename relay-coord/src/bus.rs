//! In-process typed pub/sub with async fan-out.

use relay0::error::EventError;
use relay0::id::SubscriptionId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Boxed future returned by event handlers.
pub type EventFuture = Pin<Box<dyn Future<Output = Result<(), EventError>> + Send>>;

/// An event handler: an async closure over the event payload.
pub type EventHandler = Arc<dyn Fn(serde_json::Value) -> EventFuture + Send + Sync>;

/// Create an event handler from an async closure.
///
/// # Example
///
/// ```ignore
/// let handler = event_handler_fn(|payload| async move {
///     println!("agent registered: {payload}");
///     Ok(())
/// });
/// bus.on("agent.registered", handler).await;
/// ```
pub fn event_handler_fn<F, Fut>(f: F) -> EventHandler
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    Arc::new(move |payload| Box::pin(f(payload)))
}

/// Topic-keyed subscriber lists with concurrent async emit.
///
/// Subscriber failures (and panics) are logged per subscriber and do
/// not prevent the others from running. `emit` returns once every
/// subscriber has settled.
pub struct EventBus {
    topics: RwLock<HashMap<String, Vec<(SubscriptionId, EventHandler)>>>,
    next: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next: AtomicU64::new(0),
        }
    }

    /// Subscribe a handler to a topic. Returns the token that
    /// unsubscribes it.
    pub async fn on(&self, topic: impl Into<String>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId::new(format!("sub-{}", self.next.fetch_add(1, Ordering::SeqCst)));
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.into())
            .or_default()
            .push((id.clone(), handler));
        id
    }

    /// Remove one subscription. Returns whether it existed.
    pub async fn off(&self, id: &SubscriptionId) -> bool {
        let mut topics = self.topics.write().await;
        let mut found = false;
        for handlers in topics.values_mut() {
            let before = handlers.len();
            handlers.retain(|(sub, _)| sub != id);
            found |= handlers.len() < before;
        }
        topics.retain(|_, handlers| !handlers.is_empty());
        found
    }

    /// Emit a payload to every subscriber of the topic, concurrently.
    pub async fn emit(&self, topic: &str, payload: serde_json::Value) {
        let handlers: Vec<(SubscriptionId, EventHandler)> = {
            let topics = self.topics.read().await;
            match topics.get(topic) {
                Some(handlers) => handlers.clone(),
                None => return,
            }
        };

        let mut joins = Vec::with_capacity(handlers.len());
        for (id, handler) in handlers {
            let payload = payload.clone();
            joins.push((id, tokio::spawn(handler(payload))));
        }

        for (id, join) in joins {
            match join.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(topic, subscription = %id, error = %e, "event subscriber failed");
                }
                Err(e) => {
                    warn!(topic, subscription = %id, error = %e, "event subscriber aborted");
                }
            }
        }
    }

    /// Number of subscribers on a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, |handlers| handlers.len())
    }

    /// Drop every subscription. Used on coordinator stop.
    pub async fn remove_all(&self) {
        self.topics.write().await.clear();
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
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(counter: Arc<AtomicUsize>) -> EventHandler {
        event_handler_fn(move |_payload| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn emit_reaches_all_subscribers() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.on("topic", counting_handler(counter.clone())).await;
        bus.on("topic", counting_handler(counter.clone())).await;
        bus.on("other", counting_handler(counter.clone())).await;

        bus.emit("topic", json!({})).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_block_others() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.on(
            "topic",
            event_handler_fn(|_| async { Err(EventError::Failed("boom".into())) }),
        )
        .await;
        bus.on(
            "topic",
            event_handler_fn(|_| async { panic!("subscriber bug") }),
        )
        .await;
        bus.on("topic", counting_handler(counter.clone())).await;

        bus.emit("topic", json!({})).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn off_removes_one_subscription() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let keep = bus.on("topic", counting_handler(counter.clone())).await;
        let drop = bus.on("topic", counting_handler(counter.clone())).await;

        assert!(bus.off(&drop).await);
        assert!(!bus.off(&drop).await);
        bus.emit("topic", json!({})).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count("topic").await, 1);
        let _ = keep;
    }

    #[tokio::test]
    async fn remove_all_silences_the_bus() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.on("topic", counting_handler(counter.clone())).await;

        bus.remove_all().await;
        bus.emit("topic", json!({})).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count("topic").await, 0);
    }

    #[tokio::test]
    async fn emit_on_empty_topic_is_a_no_op() {
        let bus = EventBus::new();
        bus.emit("nobody-listening", json!({"fine": true})).await;
    }
}
