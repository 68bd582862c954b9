//! Fire-and-forget fan-out of serialized events to live SSE connections.
//!
//! Each connection owns a bounded queue; `publish` snapshots the current set
//! of senders, releases the lock, then attempts a non-blocking enqueue on
//! each. A full queue drops that event for that subscriber only, so a stalled
//! consumer can never block a producer or other consumers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

/// Pending events per subscriber before new ones are dropped.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 100;

/// Broadcasts serialized events to every registered subscriber.
///
/// Cloneable; all clones share one subscriber set. One instance lives in
/// `AppState` for the lifetime of the process.
///
/// Delivery is best-effort: there is no acknowledgement, no retry, and no
/// relative ordering guarantee across subscribers. Within one subscriber,
/// events arrive in publish order.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<String>>>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    /// Creates a new, empty `EventBroadcaster`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving half.
    ///
    /// The subscriber only sees events published after this call returns.
    /// Dropping the returned `Subscriber` unregisters it.
    pub fn register(&self) -> Subscriber {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .expect("subscriber set lock poisoned")
            .insert(id, tx);
        Subscriber {
            id,
            rx,
            broadcaster: self.clone(),
        }
    }

    /// Removes a subscriber from the active set.
    ///
    /// Idempotent: unregistering an unknown or already-removed id is a no-op.
    /// Called from `Subscriber::drop`, and safe to call again manually.
    pub fn unregister(&self, id: u64) {
        if let Ok(mut subscribers) = self.inner.subscribers.lock() {
            subscribers.remove(&id);
        }
    }

    /// Serializes `event` to JSON and fans it out to every current subscriber.
    ///
    /// The lock is held only to snapshot the sender set; delivery happens
    /// outside it with `try_send`, so this never waits on a consumer. If a
    /// subscriber's queue is full the event is silently dropped for that
    /// subscriber — this is intentional, not an error.
    ///
    /// A serialization failure means the producer handed over a malformed
    /// event, and is propagated rather than swallowed.
    pub fn publish<T: Serialize>(&self, event: &T) -> Result<(), serde_json::Error> {
        let payload = serde_json::to_string(event)?;

        let snapshot: Vec<mpsc::Sender<String>> = {
            let subscribers = self
                .inner
                .subscribers
                .lock()
                .expect("subscriber set lock poisoned");
            subscribers.values().cloned().collect()
        };

        for tx in snapshot {
            let _ = tx.try_send(payload.clone());
        }

        Ok(())
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .expect("subscriber set lock poisoned")
            .len()
    }
}

/// The consuming half of one registration: a bounded inbox of serialized
/// events, owned by a single streaming connection.
///
/// Unregisters itself on drop, so the active set shrinks on every exit path
/// of the consuming loop — normal completion, error, or cancellation when the
/// peer disconnects and the response stream is dropped.
pub struct Subscriber {
    id: u64,
    rx: mpsc::Receiver<String>,
    broadcaster: EventBroadcaster,
}

impl Subscriber {
    /// Identity of this registration, usable with [`EventBroadcaster::unregister`].
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next queued event.
    ///
    /// Returns `None` once unregistered with no events left in the queue.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Non-blocking read of the next queued event, if any.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.broadcaster.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::{Duration, timeout};

    #[tokio::test]
    async fn register_and_unregister_track_the_active_set() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);

        let a = broadcaster.register();
        let b = broadcaster.register();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.unregister(a.id());
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(b);
        assert_eq!(broadcaster.subscriber_count(), 0);

        drop(a); // drop after manual unregister must not remove anyone else
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent_and_never_panics() {
        let broadcaster = EventBroadcaster::new();
        let a = broadcaster.register();
        let mut b = broadcaster.register();
        let a_id = a.id();

        broadcaster.unregister(a_id);
        broadcaster.unregister(a_id);
        broadcaster.unregister(9999); // never registered

        assert_eq!(broadcaster.subscriber_count(), 1);
        broadcaster.publish(&json!({"type": "PING"})).unwrap();
        assert_eq!(b.try_recv().unwrap(), r#"{"type":"PING"}"#);
    }

    #[tokio::test]
    async fn publish_reaches_only_subscribers_registered_before_it() {
        let broadcaster = EventBroadcaster::new();

        let mut a = broadcaster.register();
        broadcaster.publish(&json!({"type": "PING"})).unwrap();

        let mut b = broadcaster.register();
        broadcaster.publish(&json!({"type": "PONG"})).unwrap();

        // A saw both, in publish order.
        assert_eq!(a.try_recv().unwrap(), r#"{"type":"PING"}"#);
        assert_eq!(a.try_recv().unwrap(), r#"{"type":"PONG"}"#);
        assert!(a.try_recv().is_none());

        // B must not retroactively receive PING.
        assert_eq!(b.try_recv().unwrap(), r#"{"type":"PONG"}"#);
        assert!(b.try_recv().is_none());
    }

    #[tokio::test]
    async fn per_subscriber_delivery_preserves_publish_order() {
        let broadcaster = EventBroadcaster::new();
        let mut sub = broadcaster.register();

        for i in 0..10 {
            broadcaster.publish(&json!({"n": i})).unwrap();
        }
        for i in 0..10 {
            let msg = sub.recv().await.unwrap();
            assert_eq!(msg, format!(r#"{{"n":{i}}}"#));
        }
    }

    #[tokio::test]
    async fn full_queue_drops_newest_without_blocking_the_publisher() {
        let broadcaster = EventBroadcaster::new();
        let mut stalled = broadcaster.register();

        for i in 0..SUBSCRIBER_QUEUE_CAPACITY {
            broadcaster.publish(&json!({"n": i})).unwrap();
        }

        // A healthy subscriber registered now must still be served while the
        // stalled one silently misses the overflow event.
        let mut healthy = broadcaster.register();
        let result = timeout(Duration::from_secs(1), async {
            broadcaster.publish(&json!({"type": "OVERFLOW"})).unwrap();
        })
        .await;
        assert!(result.is_ok(), "publish blocked on a full queue");

        assert_eq!(healthy.try_recv().unwrap(), r#"{"type":"OVERFLOW"}"#);

        // Stalled queue contents are unchanged: the original events, capped
        // at capacity, with no OVERFLOW at the end.
        let mut drained = Vec::new();
        while let Some(msg) = stalled.try_recv() {
            drained.push(msg);
        }
        assert_eq!(drained.len(), SUBSCRIBER_QUEUE_CAPACITY);
        assert_eq!(drained[0], r#"{"n":0}"#);
        assert_eq!(
            drained[SUBSCRIBER_QUEUE_CAPACITY - 1],
            format!(r#"{{"n":{}}}"#, SUBSCRIBER_QUEUE_CAPACITY - 1)
        );
    }

    #[tokio::test]
    async fn unserializable_event_propagates_to_the_publisher() {
        let broadcaster = EventBroadcaster::new();
        let _sub = broadcaster.register();

        // Map keys must be strings in JSON; a tuple key is a producer bug.
        let bad: HashMap<(i32, i32), i32> = HashMap::from([((1, 2), 3)]);
        assert!(broadcaster.publish(&bad).is_err());
    }

    #[tokio::test]
    async fn concurrent_churn_does_not_corrupt_the_active_set() {
        let broadcaster = EventBroadcaster::new();
        let mut keeper = broadcaster.register();

        let publisher = {
            let broadcaster = broadcaster.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    broadcaster.publish(&json!({"n": i})).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let churner = {
            let broadcaster = broadcaster.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let sub = broadcaster.register();
                    tokio::task::yield_now().await;
                    drop(sub);
                }
            })
        };

        publisher.await.unwrap();
        churner.await.unwrap();

        assert_eq!(broadcaster.subscriber_count(), 1);
        // The surviving subscriber received a FIFO prefix-consistent stream.
        let first = keeper.recv().await.unwrap();
        assert_eq!(first, r#"{"n":0}"#);
    }
}
