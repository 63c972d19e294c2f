use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::media::ArtifactRef;

/// Notification delivered to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeEvent {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub kind: BridgeEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEventKind {
    /// Camera enabled, recorder constructed
    Ready,
    Started,
    /// A chunk was appended to the buffer. Only its timestamp is forwarded.
    ChunkAvailable { timestamp_ms: u64 },
    Paused,
    Resumed,
    /// Recording finished; the artifact holds every chunk of the run
    Stopped {
        artifact: ArtifactRef,
        size_bytes: usize,
    },
    /// Recorder-side failure, relayed as reported
    Error { kind: String, message: String },
}

impl BridgeEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEventKind::Ready => "ready",
            BridgeEventKind::Started => "started",
            BridgeEventKind::ChunkAvailable { .. } => "chunk_available",
            BridgeEventKind::Paused => "paused",
            BridgeEventKind::Resumed => "resumed",
            BridgeEventKind::Stopped { .. } => "stopped",
            BridgeEventKind::Error { .. } => "error",
        }
    }
}

/// Callback-style observer
///
/// `on_event` sees every event, including the two that also get a dedicated hook.
pub trait BridgeListener: Send + Sync {
    fn on_chunk_available(&self, session_id: Uuid, timestamp_ms: u64);

    fn on_stop(&self, session_id: Uuid, artifact: &ArtifactRef);

    fn on_event(&self, _event: &BridgeEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ListenerId(u64);

#[derive(Default)]
struct HubInner {
    next_id: u64,
    streams: HashMap<u64, mpsc::UnboundedSender<BridgeEvent>>,
    listeners: Vec<(ListenerId, Arc<dyn BridgeListener>)>,
}

impl HubInner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Fan-out of bridge events to registered observers, in emission order
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id();
            inner.streams.insert(id, tx);
            id
        };
        debug!("Event subscription {} opened", id);

        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn BridgeListener>) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id());
        inner.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }

    /// Number of live subscriptions and listeners
    pub fn observer_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.streams.len() + inner.listeners.len()
    }

    /// End every open subscription stream
    pub fn close(&self) {
        self.inner.lock().streams.clear();
    }

    pub fn emit(&self, event: BridgeEvent) {
        // listeners run outside the lock so they may (un)register observers
        let listeners: Vec<Arc<dyn BridgeListener>> = {
            let mut inner = self.inner.lock();
            inner
                .streams
                .retain(|_, tx| tx.send(event.clone()).is_ok());
            inner
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };

        for listener in listeners {
            match &event.kind {
                BridgeEventKind::ChunkAvailable { timestamp_ms } => {
                    listener.on_chunk_available(event.session_id, *timestamp_ms)
                }
                BridgeEventKind::Stopped { artifact, .. } => {
                    listener.on_stop(event.session_id, artifact)
                }
                _ => {}
            }
            listener.on_event(&event);
        }
    }
}

/// Cancellable stream of bridge events. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<BridgeEvent>,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        self.rx.recv().await
    }

    /// Next already-delivered event, without waiting
    pub fn try_next_event(&mut self) -> Option<BridgeEvent> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Stream for Subscription {
    type Item = BridgeEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.lock().streams.remove(&self.id);
            debug!("Event subscription {} closed", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(kind: BridgeEventKind) -> BridgeEvent {
        BridgeEvent {
            session_id: Uuid::nil(),
            kind,
        }
    }

    #[derive(Default)]
    struct Counting {
        chunks: AtomicUsize,
        stops: AtomicUsize,
        all: AtomicUsize,
    }

    impl BridgeListener for Counting {
        fn on_chunk_available(&self, _session_id: Uuid, _timestamp_ms: u64) {
            self.chunks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stop(&self, _session_id: Uuid, _artifact: &ArtifactRef) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn on_event(&self, _event: &BridgeEvent) {
            self.all.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn subscription_receives_in_order_until_dropped() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();

        hub.emit(event(BridgeEventKind::Started));
        hub.emit(event(BridgeEventKind::ChunkAvailable { timestamp_ms: 0 }));

        assert_eq!(sub.next_event().await.unwrap().kind, BridgeEventKind::Started);
        assert_eq!(
            sub.next_event().await.unwrap().kind,
            BridgeEventKind::ChunkAvailable { timestamp_ms: 0 }
        );

        assert_eq!(hub.observer_count(), 1);
        sub.unsubscribe();
        assert_eq!(hub.observer_count(), 0);
    }

    #[test]
    fn listener_hooks_and_removal() {
        let hub = EventHub::new();
        let listener = Arc::new(Counting::default());
        let id = hub.add_listener(listener.clone());

        hub.emit(event(BridgeEventKind::ChunkAvailable { timestamp_ms: 1000 }));
        hub.emit(event(BridgeEventKind::Paused));
        let artifact = ArtifactRef::parse(&Uuid::new_v4().to_string()).unwrap();
        hub.emit(event(BridgeEventKind::Stopped {
            artifact,
            size_bytes: 3,
        }));

        assert_eq!(listener.chunks.load(Ordering::SeqCst), 1);
        assert_eq!(listener.stops.load(Ordering::SeqCst), 1);
        assert_eq!(listener.all.load(Ordering::SeqCst), 3);

        assert!(hub.remove_listener(id));
        hub.emit(event(BridgeEventKind::Resumed));
        assert_eq!(listener.all.load(Ordering::SeqCst), 3);
        assert!(!hub.remove_listener(id));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(event(BridgeEventKind::ChunkAvailable {
            timestamp_ms: 2000,
        }))
        .unwrap();

        assert_eq!(json["type"], "chunk_available");
        assert_eq!(json["timestamp_ms"], 2000);
        assert_eq!(json["session_id"], Uuid::nil().to_string());
    }
}
