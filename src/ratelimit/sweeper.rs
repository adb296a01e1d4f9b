//! Background reclamation of stale limiter records.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::clock::Clock;
use super::store::LimiterStore;
use crate::config::LimiterConfig;

/// Periodically evicts records older than the retention horizon.
///
/// The horizon is independent of any policy window, so even the longest
/// window's records are eventually reclaimed.
pub struct Sweeper {
    store: Arc<LimiterStore>,
    clock: Arc<dyn Clock>,
    retention_secs: f64,
    interval: Duration,
}

impl Sweeper {
    /// Create a sweeper using the retention and cadence from `config`.
    pub fn new(store: Arc<LimiterStore>, clock: Arc<dyn Clock>, config: &LimiterConfig) -> Self {
        Self {
            store,
            clock,
            retention_secs: config.retention_secs,
            interval: config.sweep_interval(),
        }
    }

    /// Override the sweep cadence.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep at the clock's current time. Returns remaining clients.
    pub fn run_once(&self) -> usize {
        self.store.sweep(self.clock.now(), self.retention_secs)
    }

    /// Start sweeping on a tokio task.
    ///
    /// Must be called from within a tokio runtime. The task stops when the
    /// returned handle is shut down or dropped.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.interval.max(Duration::from_millis(1));

        info!(
            interval_ms = period.as_millis() as u64,
            retention_secs = self.retention_secs,
            "Starting limiter sweeper"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    // Shutdown wins over a tick that is ready at the same time
                    biased;
                    _ = &mut shutdown_rx => {
                        info!("Limiter sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let remaining = self.run_once();
                        debug!(active_clients = remaining, "Sweep complete");
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for its task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    fn config() -> LimiterConfig {
        LimiterConfig {
            retention_secs: 60.0,
            sweep_interval_secs: 30,
        }
    }

    #[test]
    fn test_run_once_evicts_by_age() {
        let store = Arc::new(LimiterStore::new());
        let clock = Arc::new(ManualClock::new(1000.0));
        store.admit("client_a", "create_job", 990.0);
        store.admit("client_b", "create_job", 930.0);

        let sweeper = Sweeper::new(store.clone(), clock, &config());
        let remaining = sweeper.run_once();

        assert_eq!(remaining, 1);
        assert_eq!(store.peek("client_a", "create_job"), Some(990.0));
        assert_eq!(store.peek("client_b", "create_job"), None);
        assert_eq!(store.stats().active_clients, 1);
    }

    #[tokio::test]
    async fn test_spawned_sweeper_reclaims_state() {
        let store = Arc::new(LimiterStore::new());
        let clock = Arc::new(ManualClock::new(0.0));
        store.admit("client", "delete_job", 0.0);

        let handle = Sweeper::new(store.clone(), clock.clone(), &config())
            .with_interval(Duration::from_millis(10))
            .spawn();

        clock.set(61.0);
        for _ in 0..100 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let store = Arc::new(LimiterStore::new());
        let clock = Arc::new(ManualClock::new(0.0));

        let handle = Sweeper::new(store, clock, &config())
            .with_interval(Duration::from_millis(5))
            .spawn();
        assert!(!handle.is_finished());

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("sweeper did not stop");
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_sweeping() {
        let store = Arc::new(LimiterStore::new());
        let clock = Arc::new(ManualClock::new(0.0));

        let handle = Sweeper::new(store.clone(), clock.clone(), &config())
            .with_interval(Duration::from_millis(5))
            .spawn();
        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.admit("client", "create_job", 0.0);
        clock.set(1000.0);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A running sweeper would have evicted this long ago
        assert_eq!(store.peek("client", "create_job"), Some(0.0));
    }
}
