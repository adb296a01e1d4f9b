//! Last-admission state, sharded by client key.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Per-client records: operation id -> last admitted timestamp (seconds).
type Records = HashMap<String, f64>;

/// Point-in-time counts over the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    /// Always `"memory"`; state lives only in this process
    pub backend: &'static str,
    /// Clients with at least one record
    pub active_clients: usize,
    /// Total (client, operation) records
    pub active_tracked_pairs: usize,
}

/// Concurrent map of client -> operation -> last admission time.
///
/// Each client key lives in one `DashMap` shard, so every read-decide-write
/// on a (client, operation) pair runs under that shard's write lock while
/// pairs of clients in other shards proceed in parallel.
#[derive(Debug, Default)]
pub struct LimiterStore {
    clients: DashMap<String, Records>,
}

impl LimiterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Last admission time for a pair, if any.
    pub fn peek(&self, client: &str, operation: &str) -> Option<f64> {
        self.clients
            .get(client)
            .and_then(|records| records.get(operation).copied())
    }

    /// Record an admission at `now`, overwriting any previous record.
    pub fn admit(&self, client: &str, operation: &str, now: f64) {
        self.clients
            .entry(client.to_string())
            .or_default()
            .insert(operation.to_string(), now);
    }

    /// Atomically admit the pair if its last admission is at least `window`
    /// seconds before `now`.
    ///
    /// Returns `Err(last)` with the anchoring timestamp when the call falls
    /// inside the window; the record is left untouched in that case.
    pub fn try_admit(
        &self,
        client: &str,
        operation: &str,
        now: f64,
        window: f64,
    ) -> Result<(), f64> {
        // Denials only happen for clients that already have a record, so the
        // shard entry is never created empty.
        if let Some(mut records) = self.clients.get_mut(client) {
            match records.get_mut(operation) {
                Some(last) if now - *last < window => return Err(*last),
                Some(last) => {
                    *last = now;
                    return Ok(());
                }
                None => {
                    records.insert(operation.to_string(), now);
                    return Ok(());
                }
            }
        }

        // Client absent. Re-check under the entry lock in case another caller
        // inserted it between the lookup above and here.
        let mut records = self.clients.entry(client.to_string()).or_default();
        match records.get(operation) {
            Some(&last) if now - last < window => Err(last),
            _ => {
                records.insert(operation.to_string(), now);
                Ok(())
            }
        }
    }

    /// Evict records older than `retention_secs` and drop emptied clients.
    ///
    /// Shards are visited one at a time. Returns the number of clients left.
    pub fn sweep(&self, now: f64, retention_secs: f64) -> usize {
        let mut evicted = 0usize;
        self.clients.retain(|_, records| {
            let before = records.len();
            records.retain(|_, last| now - *last <= retention_secs);
            evicted += before - records.len();
            !records.is_empty()
        });

        let remaining = self.clients.len();
        debug!(
            evicted = evicted,
            active_clients = remaining,
            "Swept expired limiter records"
        );
        remaining
    }

    /// Current client and pair counts.
    pub fn stats(&self) -> LimiterStats {
        let mut active_clients = 0;
        let mut active_tracked_pairs = 0;
        for records in self.clients.iter() {
            active_clients += 1;
            active_tracked_pairs += records.len();
        }

        LimiterStats {
            backend: "memory",
            active_clients,
            active_tracked_pairs,
        }
    }

    /// Number of clients with at least one record.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client has a record.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Drop all state.
    pub fn clear(&self) {
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_creation() {
        let store = LimiterStore::new();
        assert!(store.is_empty());
        assert_eq!(store.peek("a", "op"), None);
    }

    #[test]
    fn test_admit_overwrites_in_place() {
        let store = LimiterStore::new();

        store.admit("a", "op", 1.0);
        store.admit("a", "op", 2.0);

        assert_eq!(store.peek("a", "op"), Some(2.0));
        assert_eq!(store.stats().active_tracked_pairs, 1);
    }

    #[test]
    fn test_try_admit_respects_window() {
        let store = LimiterStore::new();

        assert_eq!(store.try_admit("a", "op", 0.0, 3.0), Ok(()));
        assert_eq!(store.try_admit("a", "op", 1.0, 3.0), Err(0.0));
        // Denial leaves the anchor alone
        assert_eq!(store.peek("a", "op"), Some(0.0));
        // Exactly one window later is admitted
        assert_eq!(store.try_admit("a", "op", 3.0, 3.0), Ok(()));
        assert_eq!(store.peek("a", "op"), Some(3.0));
    }

    #[test]
    fn test_try_admit_new_operation_for_known_client() {
        let store = LimiterStore::new();

        store.admit("a", "first", 0.0);
        assert_eq!(store.try_admit("a", "second", 0.1, 3.0), Ok(()));
        assert_eq!(store.stats().active_tracked_pairs, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sweep_evicts_by_age() {
        let store = LimiterStore::new();
        store.admit("a", "fresh", 90.0);
        store.admit("a", "stale", 20.0);
        store.admit("b", "stale", 30.0);

        let remaining = store.sweep(100.0, 60.0);

        assert_eq!(remaining, 1);
        assert_eq!(store.peek("a", "fresh"), Some(90.0));
        assert_eq!(store.peek("a", "stale"), None);
        assert_eq!(store.peek("b", "stale"), None);
        assert_eq!(
            store.stats(),
            LimiterStats {
                backend: "memory",
                active_clients: 1,
                active_tracked_pairs: 1,
            }
        );
    }

    #[test]
    fn test_sweep_keeps_records_at_horizon() {
        let store = LimiterStore::new();
        store.admit("a", "op", 40.0);

        // Age of exactly 60s is not older than the horizon
        assert_eq!(store.sweep(100.0, 60.0), 1);
        assert_eq!(store.sweep(100.5, 60.0), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_during_admissions_keeps_fresh_records() {
        let store = LimiterStore::new();
        let now = 1000.0;
        let writers = 8;
        let pairs_per_writer = 200;

        // Stale records so every sweep empties and removes these clients
        for c in 0..5 {
            store.admit(&format!("client-{}", c), "stale", 0.0);
        }

        let done = std::sync::atomic::AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                while !done.load(std::sync::atomic::Ordering::Acquire) {
                    store.sweep(now, 60.0);
                }
            });

            let handles: Vec<_> = (0..writers)
                .map(|w| {
                    let store = &store;
                    s.spawn(move || {
                        for i in 0..pairs_per_writer {
                            let client = format!("client-{}", i % 5);
                            let op = format!("op-{}-{}", w, i);
                            assert_eq!(store.try_admit(&client, &op, now, 3.0), Ok(()));
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            done.store(true, std::sync::atomic::Ordering::Release);
        });

        store.sweep(now, 60.0);
        for w in 0..writers {
            for i in 0..pairs_per_writer {
                let client = format!("client-{}", i % 5);
                let op = format!("op-{}-{}", w, i);
                assert_eq!(store.peek(&client, &op), Some(now));
            }
        }
        for c in 0..5 {
            assert_eq!(store.peek(&format!("client-{}", c), "stale"), None);
        }
        assert_eq!(store.stats().active_tracked_pairs, writers * pairs_per_writer);
    }

    #[test]
    fn test_clear() {
        let store = LimiterStore::new();
        store.admit("a", "op", 0.0);
        store.admit("b", "op", 0.0);
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
    }
}
