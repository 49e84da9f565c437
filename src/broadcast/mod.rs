//! Live feed: every connected observer gets the latest snapshot on a fixed
//! push interval plus a `"ping"` keepalive.
//!
//! Each observer runs its own task reading the [`SnapshotStore`], so a slow
//! or stuck client only ever delays itself.

use chrono::{DateTime, Utc};
use futures::{Sink, SinkExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BroadcastConfig;
use crate::store::SnapshotStore;

pub const PING: &str = "ping";

/// One outbound message on the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFrame {
    Ping,
    /// Serialized snapshot JSON
    Snapshot(String),
}

impl FeedFrame {
    pub fn into_text(self) -> String {
        match self {
            FeedFrame::Ping => PING.to_string(),
            FeedFrame::Snapshot(json) => json,
        }
    }
}

/// Connected observers, id → connect time
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl ObserverRegistry {
    pub fn register(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.observers.lock().insert(id, Utc::now());
        id
    }

    pub fn remove(&self, id: &Uuid) -> Option<DateTime<Utc>> {
        self.observers.lock().remove(id)
    }

    pub fn count(&self) -> usize {
        self.observers.lock().len()
    }
}

pub struct Broadcaster {
    store: SnapshotStore,
    registry: Arc<ObserverRegistry>,
    push_interval: Duration,
    keepalive_interval: Duration,
}

impl Broadcaster {
    pub fn new(store: SnapshotStore, cfg: &BroadcastConfig) -> Self {
        Self {
            store,
            registry: Arc::new(ObserverRegistry::default()),
            push_interval: cfg.push_interval(),
            keepalive_interval: cfg.keepalive_interval(),
        }
    }

    /// Register a new observer; it stays registered until its task ends
    pub fn connect(&self) -> Observer {
        let id = self.registry.register();
        info!(observer = %id, observers = self.registry.count(), "observer connected");
        Observer {
            id,
            store: self.store.clone(),
            registry: self.registry.clone(),
            push_interval: self.push_interval,
            keepalive_interval: self.keepalive_interval,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.registry.count()
    }
}

pub struct Observer {
    id: Uuid,
    store: SnapshotStore,
    registry: Arc<ObserverRegistry>,
    push_interval: Duration,
    keepalive_interval: Duration,
}

impl Observer {
    /// Feed `sink` until a send fails or `closed` resolves, then deregister.
    pub async fn run<S, C>(self, mut sink: S, closed: C)
    where
        S: Sink<FeedFrame> + Unpin,
        S::Error: Display,
        C: Future<Output = ()>,
    {
        tokio::pin!(closed);

        let mut push = interval(self.push_interval);
        push.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut keepalive = interval_at(
            Instant::now() + self.keepalive_interval,
            self.keepalive_interval,
        );
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let frame = tokio::select! {
                _ = &mut closed => {
                    debug!(observer = %self.id, "observer closed the feed");
                    break;
                }
                _ = push.tick() => {
                    let Some(snapshot) = self.store.get() else { continue };
                    match snapshot.to_json() {
                        Ok(json) => FeedFrame::Snapshot(json),
                        Err(e) => {
                            warn!(error = %e, "failed to serialize snapshot");
                            continue;
                        }
                    }
                }
                _ = keepalive.tick() => FeedFrame::Ping,
            };

            if let Err(e) = sink.send(frame).await {
                debug!(observer = %self.id, error = %e, "observer send failed");
                break;
            }
        }

        self.registry.remove(&self.id);
        info!(observer = %self.id, observers = self.registry.count(), "observer disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, Snapshot};
    use futures::channel::mpsc;
    use futures::StreamExt;

    fn broadcaster(store: SnapshotStore) -> Broadcaster {
        Broadcaster::new(
            store,
            &BroadcastConfig {
                push_interval_ms: 1000,
                keepalive_seconds: 30,
            },
        )
    }

    fn snapshot(temp: f64) -> Snapshot {
        Snapshot {
            action: Action::Idle,
            reward: -(temp - 24.0).abs(),
            indoor_temperature: temp,
            outdoor_temperature: None,
            rain: false,
            humidity: 50,
            energy_saved_percentage: 100.0,
            timestamp: 1_700_000_000.0,
        }
    }

    #[test]
    fn test_frame_text() {
        assert_eq!(FeedFrame::Ping.into_text(), "ping");
        assert_eq!(FeedFrame::Snapshot("{}".into()).into_text(), "{}");
    }

    #[test]
    fn test_registry() {
        let registry = ObserverRegistry::default();
        let a = registry.register();
        let b = registry.register();
        assert_ne!(a, b);
        assert_eq!(registry.count(), 2);
        assert!(registry.remove(&a).is_some());
        assert!(registry.remove(&a).is_none());
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_without_snapshots() {
        let store = SnapshotStore::new();
        let broadcaster = broadcaster(store);
        let (tx, mut rx) = mpsc::unbounded();
        tokio::spawn(broadcaster.connect().run(tx, std::future::pending()));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_next().is_err(), "nothing before the first keepalive");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_next().unwrap(), Some(FeedFrame::Ping));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_latest_snapshot() {
        let store = SnapshotStore::new();
        let broadcaster = broadcaster(store.clone());
        let (tx, mut rx) = mpsc::unbounded();
        tokio::spawn(broadcaster.connect().run(tx, std::future::pending()));

        store.set(snapshot(22.0));
        let expected = snapshot(22.0).to_json().unwrap();
        assert_eq!(rx.next().await, Some(FeedFrame::Snapshot(expected.clone())));
        // No dedup: the same snapshot is pushed again on the next tick
        assert_eq!(rx.next().await, Some(FeedFrame::Snapshot(expected)));

        store.set(snapshot(23.0));
        let newer = snapshot(23.0).to_json().unwrap();
        assert_eq!(rx.next().await, Some(FeedFrame::Snapshot(newer)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_removes_observer() {
        let store = SnapshotStore::new();
        store.set(snapshot(25.0));
        let broadcaster = broadcaster(store);
        let (tx, rx) = mpsc::unbounded();
        let task = tokio::spawn(broadcaster.connect().run(tx, std::future::pending()));
        assert_eq!(broadcaster.observer_count(), 1);

        drop(rx);
        task.await.unwrap();
        assert_eq!(broadcaster.observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_future_ends_observer() {
        let broadcaster = broadcaster(SnapshotStore::new());
        let (tx, _rx) = mpsc::unbounded();
        let (close_tx, close_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(broadcaster.connect().run(tx, async move {
            let _ = close_rx.await;
        }));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(broadcaster.observer_count(), 1);
        close_tx.send(()).unwrap();
        task.await.unwrap();
        assert_eq!(broadcaster.observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_observer_does_not_delay_others() {
        let store = SnapshotStore::new();
        store.set(snapshot(24.0));
        let broadcaster = broadcaster(store);

        // Never drained: its task blocks on the full channel
        let (stuck_tx, _stuck_rx) = mpsc::channel(0);
        tokio::spawn(broadcaster.connect().run(stuck_tx, std::future::pending()));

        let (tx, mut rx) = mpsc::unbounded();
        tokio::spawn(broadcaster.connect().run(tx, std::future::pending()));

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let mut received = 0;
        while let Ok(Some(_)) = rx.try_next() {
            received += 1;
        }
        assert!(received >= 10, "only {received} frames delivered");
        assert_eq!(broadcaster.observer_count(), 2);
    }
}
