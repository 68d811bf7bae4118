//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EngineEventBus`] relays the registry's engine added/removed
//! notifications to any number of async listeners. Share it as
//! `Arc<EngineEventBus>` and attach it with
//! `ScriptEngineRegistry::attach_event_sink`.

use scripthub_core::{EventSink, ScriptEngineEvent};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Events buffered per subscriber unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for script-engine events.
///
/// # Usage
///
/// ```rust
/// use std::sync::Arc;
///
/// use scripthub_core::ScriptEngineRegistry;
/// use scripthub_events::EngineEventBus;
///
/// let registry = ScriptEngineRegistry::new();
/// let bus = Arc::new(EngineEventBus::default());
/// let _rx = bus.subscribe();
///
/// registry.attach_event_sink(bus);
/// ```
pub struct EngineEventBus {
    sender: broadcast::Sender<ScriptEngineEvent>,
}

impl EngineEventBus {
    /// Bus keeping up to `capacity` engine events per subscriber.
    ///
    /// A subscriber that falls further behind loses the oldest events and
    /// sees `RecvError::Lagged` with the number skipped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fan `event` out to every subscriber.
    ///
    /// With no subscriber the added/removed notification is discarded, the
    /// same as a registry without a sink.
    pub fn publish(&self, event: ScriptEngineEvent) {
        let _ = self.sender.send(event);
    }

    /// Receiver for every engine added or removed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ScriptEngineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EngineEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for EngineEventBus {
    fn post_event(&self, event: ScriptEngineEvent) {
        self.publish(event);
    }
}

/// Log every event received on `rx` until the bus is dropped.
///
/// Returns the number of events logged.
pub async fn log_events(mut rx: broadcast::Receiver<ScriptEngineEvent>) -> usize {
    let mut logged = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                logged += 1;
                tracing::info!(
                    topic = event.topic.as_str(),
                    engine = %event.engine_name,
                    version = %event.engine_version,
                    language = %event.language_name,
                    extensions = %event.extensions.join(","),
                    mime_types = %serde_json::Value::from(event.mime_types.clone()),
                    "Script engine event",
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Script engine event log lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    logged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scripthub_core::{EngineDescriptor, EngineTopic, ScriptEngineRegistry};

    use super::*;

    fn rhino() -> EngineDescriptor {
        EngineDescriptor::builder("rhino")
            .version("1.7")
            .language("ECMAScript", "1.8")
            .extension("ecma")
            .mime_type("text/ecmascript")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EngineEventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(ScriptEngineEvent::new(EngineTopic::Added, &rhino()));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.topic, EngineTopic::Added);
        assert_eq!(received.engine_name, "rhino");
        assert_eq!(received.language_version, "1.8");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EngineEventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(ScriptEngineEvent::new(EngineTopic::Removed, &rhino()));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.topic, EngineTopic::Removed);
        assert_eq!(e2.topic, EngineTopic::Removed);
    }

    #[tokio::test]
    async fn subscriber_behind_capacity_lags_and_recovers() {
        let bus = EngineEventBus::new(2);
        let mut rx = bus.subscribe();

        bus.publish(ScriptEngineEvent::new(EngineTopic::Added, &rhino()));
        bus.publish(ScriptEngineEvent::new(EngineTopic::Removed, &rhino()));
        bus.publish(ScriptEngineEvent::new(EngineTopic::Added, &rhino()));

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap().topic, EngineTopic::Removed);
        assert_eq!(rx.recv().await.unwrap().topic, EngineTopic::Added);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EngineEventBus::default();
        bus.publish(ScriptEngineEvent::new(EngineTopic::Added, &rhino()));
    }

    #[tokio::test]
    async fn registry_bind_reaches_bus_subscribers() {
        let registry = ScriptEngineRegistry::new();
        let bus = Arc::new(EngineEventBus::default());
        let mut rx = bus.subscribe();
        registry.attach_event_sink(bus.clone());

        let d = registry.bind_descriptor(rhino()).unwrap();
        registry.unbind_descriptor(&d);

        let added = rx.recv().await.unwrap();
        let removed = rx.recv().await.unwrap();
        assert_eq!(added.topic, EngineTopic::Added);
        assert_eq!(removed.topic, EngineTopic::Removed);
        assert_eq!(removed.extensions, vec!["ecma"]);
    }

    #[tokio::test]
    async fn log_events_stops_when_bus_is_dropped() {
        let bus = EngineEventBus::default();
        let rx = bus.subscribe();
        bus.publish(ScriptEngineEvent::new(EngineTopic::Added, &rhino()));
        bus.publish(ScriptEngineEvent::new(EngineTopic::Removed, &rhino()));
        drop(bus);

        assert_eq!(log_events(rx).await, 2);
    }
}
