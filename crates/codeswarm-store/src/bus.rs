use codeswarm_types::SwarmEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// In-memory publish-subscribe fan-out for same-process consumers.
///
/// Built on a broadcast ring: `emit` never blocks the producer, each
/// subscriber has a bounded buffer of `capacity` events, and a subscriber
/// that falls behind loses the oldest events (drop-oldest). [`EventStream`]
/// surfaces the gap and continues.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SwarmEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Fan an event out to all current subscribers. An event emitted with
    /// nobody listening is simply gone; the durable copy lives in the store.
    pub fn emit(&self, event: SwarmEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Raw broadcast receiver, for callers that want `recv` semantics.
    pub fn subscribe(&self) -> broadcast::Receiver<SwarmEvent> {
        self.tx.subscribe()
    }

    /// Async iterator over future events, for UI consumers.
    pub fn stream(&self) -> EventStream {
        EventStream {
            rx: self.tx.subscribe(),
        }
    }

    /// Invoke `handler` for every future event. The forwarding task stops
    /// when the returned handle is dropped. Must be called within a tokio
    /// runtime.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriberHandle
    where
        F: FnMut(SwarmEvent) + Send + 'static,
    {
        self.spawn_forwarder(None, handler)
    }

    /// Like [`subscribe_all`](Self::subscribe_all), filtered to one event
    /// type tag (e.g. `"AgentErrorEvent"`).
    pub fn subscribe_type<F>(&self, event_type: impl Into<String>, handler: F) -> SubscriberHandle
    where
        F: FnMut(SwarmEvent) + Send + 'static,
    {
        self.spawn_forwarder(Some(event_type.into()), handler)
    }

    fn spawn_forwarder<F>(&self, event_type: Option<String>, mut handler: F) -> SubscriberHandle
    where
        F: FnMut(SwarmEvent) + Send + 'static,
    {
        let mut stream = self.stream();
        let handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let Some(wanted) = &event_type {
                    if event.event_type() != wanted {
                        continue;
                    }
                }
                handler(event);
            }
        });
        SubscriberHandle {
            handle: Some(handle),
        }
    }
}

/// Async iterator over bus events. Lag (a slow consumer overrun by the ring)
/// is logged and skipped rather than ending the stream.
pub struct EventStream {
    rx: broadcast::Receiver<SwarmEvent>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<SwarmEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "bus subscriber lagged, oldest events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Aborts its forwarding task on drop; `detach` lets it run for the life of
/// the runtime.
pub struct SubscriberHandle {
    handle: Option<JoinHandle<()>>,
}

impl SubscriberHandle {
    pub fn detach(mut self) {
        // Dropping a JoinHandle detaches the task without aborting it
        drop(self.handle.take());
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
