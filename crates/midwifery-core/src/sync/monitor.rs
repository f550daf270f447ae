//! Connectivity state machine and simulated queue drain.
//!
//! ```text
//!            set_connectivity(Offline)
//!   Online ─────────────────────────────▶ Offline
//!     ▲                                      │
//!     └──────────────────────────────────────┘
//!      set_connectivity(Online) → spawn drain
//! ```
//!
//! The drain does not talk to a server. It waits a fixed delay and then
//! clears the whole queue. There is no per-item acknowledgment and no retry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::db::{Database, DbResult};

use super::SyncQueue;

/// Observed network state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

/// Result of one drain attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Offline at the time of the attempt; nothing touched.
    SkippedOffline,
    /// Queue was already empty.
    Empty,
    /// Queue cleared after the delay.
    Drained { cleared: usize },
    /// Storage failed; the queue is left as it was.
    Failed(String),
}

/// Tracks connectivity and drains the sync queue on reconnect.
pub struct NetworkMonitor {
    store: Arc<Mutex<Database>>,
    config: SyncConfig,
    state: watch::Sender<Connectivity>,
}

impl NetworkMonitor {
    pub fn new(store: Arc<Mutex<Database>>, config: SyncConfig, initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            store,
            config,
            state,
        }
    }

    pub fn status(&self) -> Connectivity {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    /// Receive every connectivity change.
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Apply a connectivity event from the host.
    ///
    /// An Offline to Online transition spawns a drain on the current tokio
    /// runtime and returns its handle. Repeated events for the current state
    /// change nothing.
    pub fn set_connectivity(&self, next: Connectivity) -> Option<JoinHandle<DrainOutcome>> {
        let previous = self.state.send_replace(next);
        if previous == next {
            debug!(?next, "connectivity unchanged");
            return None;
        }
        info!(?previous, ?next, "connectivity changed");

        if !next.is_online() || !self.config.drain_on_reconnect {
            return None;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let drainer = self.drainer();
                Some(runtime.spawn(drainer.drain()))
            }
            Err(_) => {
                warn!("no async runtime available, reconnect drain skipped");
                None
            }
        }
    }

    /// Attempt a drain now.
    pub async fn drain(&self) -> DrainOutcome {
        self.drainer().drain().await
    }

    fn drainer(&self) -> QueueDrainer {
        QueueDrainer {
            store: Arc::clone(&self.store),
            delay: self.config.drain_delay(),
            connectivity: self.state.subscribe(),
        }
    }
}

/// Owned drain task state, so the drain can outlive the caller's borrow.
struct QueueDrainer {
    store: Arc<Mutex<Database>>,
    delay: Duration,
    connectivity: watch::Receiver<Connectivity>,
}

impl QueueDrainer {
    async fn drain(self) -> DrainOutcome {
        let online = self.connectivity.borrow().is_online();
        if !online {
            debug!("offline, drain skipped");
            return DrainOutcome::SkippedOffline;
        }

        let pending = match self.with_queue(|queue| queue.len()) {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "failed to read sync queue");
                return DrainOutcome::Failed(e);
            }
        };
        if pending == 0 {
            return DrainOutcome::Empty;
        }

        info!(pending, "syncing queued changes");
        tokio::time::sleep(self.delay).await;

        match self.with_queue(|queue| queue.clear()) {
            Ok(cleared) => {
                info!(cleared, "sync completed");
                DrainOutcome::Drained { cleared }
            }
            Err(e) => {
                error!(error = %e, "sync failed, queue left intact");
                DrainOutcome::Failed(e)
            }
        }
    }

    /// Run `f` against the queue. The store lock is released before returning.
    fn with_queue<T>(&self, f: impl FnOnce(&SyncQueue<'_>) -> DbResult<T>) -> Result<T, String> {
        let db = self
            .store
            .lock()
            .map_err(|e| format!("store lock poisoned: {}", e))?;
        f(&SyncQueue::new(&db)).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SyncAction, SyncEntityType};
    use serde_json::json;

    fn setup(initial: Connectivity, pending: usize) -> (Arc<Mutex<Database>>, NetworkMonitor) {
        let db = Database::open_in_memory().unwrap();
        {
            let queue = SyncQueue::new(&db);
            for i in 0..pending {
                queue
                    .record(SyncEntityType::Patient, SyncAction::Add, json!({"id": i}))
                    .unwrap();
            }
        }
        let store = Arc::new(Mutex::new(db));
        let monitor = NetworkMonitor::new(Arc::clone(&store), SyncConfig::default(), initial);
        (store, monitor)
    }

    fn queue_len(store: &Arc<Mutex<Database>>) -> usize {
        SyncQueue::new(&store.lock().unwrap()).len().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_online_clears_queue() {
        let (store, monitor) = setup(Connectivity::Online, 3);

        let outcome = monitor.drain().await;
        assert_eq!(outcome, DrainOutcome::Drained { cleared: 3 });
        assert_eq!(queue_len(&store), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_offline_is_noop() {
        let (store, monitor) = setup(Connectivity::Offline, 2);

        assert_eq!(monitor.drain().await, DrainOutcome::SkippedOffline);
        assert_eq!(queue_len(&store), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_empty_queue() {
        let (_store, monitor) = setup(Connectivity::Online, 0);
        assert_eq!(monitor.drain().await, DrainOutcome::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_delay() {
        let (store, monitor) = setup(Connectivity::Online, 1);
        let started = tokio::time::Instant::now();

        monitor.drain().await;

        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(queue_len(&store), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_triggers_drain() {
        let (store, monitor) = setup(Connectivity::Offline, 2);

        let handle = monitor
            .set_connectivity(Connectivity::Online)
            .expect("reconnect should spawn a drain");
        assert_eq!(handle.await.unwrap(), DrainOutcome::Drained { cleared: 2 });
        assert_eq!(queue_len(&store), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_online_does_not_drain() {
        let (store, monitor) = setup(Connectivity::Online, 2);

        assert!(monitor.set_connectivity(Connectivity::Online).is_none());
        assert_eq!(queue_len(&store), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_going_offline_does_not_drain() {
        let (store, monitor) = setup(Connectivity::Online, 1);

        assert!(monitor.set_connectivity(Connectivity::Offline).is_none());
        assert!(!monitor.is_online());
        assert_eq!(queue_len(&store), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_on_reconnect_disabled() {
        let db = Database::open_in_memory().unwrap();
        let store = Arc::new(Mutex::new(db));
        let config = SyncConfig {
            drain_on_reconnect: false,
            ..SyncConfig::default()
        };
        let monitor = NetworkMonitor::new(store, config, Connectivity::Offline);

        assert!(monitor.set_connectivity(Connectivity::Online).is_none());
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (_store, monitor) = setup(Connectivity::Online, 0);
        let mut rx = monitor.subscribe();

        monitor.set_connectivity(Connectivity::Offline);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Connectivity::Offline);
    }

    #[test]
    fn test_reconnect_without_runtime_skips_drain() {
        let (store, monitor) = setup(Connectivity::Offline, 1);

        assert!(monitor.set_connectivity(Connectivity::Online).is_none());
        assert!(monitor.is_online());
        assert_eq!(queue_len(&store), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_leaves_queue_intact() {
        let (store, monitor) = setup(Connectivity::Online, 1);

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("writer crashed while holding the store");
        })
        .join();
        assert!(store.is_poisoned());

        match monitor.drain().await {
            DrainOutcome::Failed(reason) => assert!(reason.contains("poisoned")),
            other => panic!("expected a failed drain, got {:?}", other),
        }

        let db = store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(SyncQueue::new(&db).len().unwrap(), 1);
    }
}
