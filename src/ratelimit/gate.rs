//! The admission decision.

use std::sync::Arc;
use tracing::trace;

use super::clock::{Clock, SystemClock};
use super::events::{EventSink, GateAction, GateEvent, TracingSink};
use super::policy::PolicyTable;
use super::store::{LimiterStats, LimiterStore};
use crate::error::RateLimited;

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// The call may proceed; its timestamp is now the pair's anchor.
    Allow,
    /// The call arrived inside the window anchored at the last admission.
    Deny {
        /// `floor(window - elapsed)`, in whole seconds
        remaining_secs: u64,
        window_secs: f64,
    },
}

impl Decision {
    /// Whether the call may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// `Ok(())` on allow, the rate-limit outcome otherwise.
    pub fn into_result(self) -> Result<(), RateLimited> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny {
                remaining_secs,
                window_secs,
            } => Err(RateLimited {
                remaining_secs,
                window_secs,
            }),
        }
    }
}

/// Whole seconds left in a window, truncated toward zero.
///
/// Clamped to `[0, window]` so a clock that stepped backwards past the anchor
/// never reports more than one full window.
fn remaining_secs(window: f64, elapsed: f64) -> u64 {
    (window - elapsed).clamp(0.0, window).floor() as u64
}

/// Per-(client, operation) sliding-window gate.
///
/// Owns its store; share it across request handlers behind an `Arc`.
pub struct Gate {
    policies: PolicyTable,
    store: Arc<LimiterStore>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl Gate {
    /// Create a gate over the given policies using the system clock and the
    /// tracing event sink.
    pub fn new(policies: PolicyTable) -> Self {
        Self::with_parts(
            policies,
            Arc::new(LimiterStore::new()),
            Arc::new(SystemClock),
            Arc::new(TracingSink),
        )
    }

    /// Create a gate from explicit collaborators.
    pub fn with_parts(
        policies: PolicyTable,
        store: Arc<LimiterStore>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            policies,
            store,
            clock,
            sink,
        }
    }

    /// Decide whether `client` may call `operation` at `now`.
    ///
    /// On allow the pair's record becomes `now`. On deny nothing is written,
    /// so repeated denials count down toward the anchoring admission's expiry.
    pub fn check(&self, client: &str, operation: &str, now: f64) -> Decision {
        let window = self.policies.resolve(operation);

        trace!(
            client = %client,
            operation = %operation,
            window_secs = window,
            "Checking admission"
        );

        let decision = match self.store.try_admit(client, operation, now, window) {
            Ok(()) => Decision::Allow,
            Err(last) => Decision::Deny {
                remaining_secs: remaining_secs(window, now - last),
                window_secs: window,
            },
        };

        let (action, remaining) = match decision {
            Decision::Allow => (GateAction::Admitted, None),
            Decision::Deny { remaining_secs, .. } => (GateAction::Blocked, Some(remaining_secs)),
        };
        self.sink.emit(&GateEvent {
            timestamp: now,
            client: client.to_string(),
            operation: operation.to_string(),
            action,
            remaining_secs: remaining,
            window_secs: window,
        });

        decision
    }

    /// [`check`](Self::check) at the injected clock's current time.
    pub fn check_now(&self, client: &str, operation: &str) -> Decision {
        self.check(client, operation, self.clock.now())
    }

    /// Client and pair counts of the underlying store.
    pub fn stats(&self) -> LimiterStats {
        self.store.stats()
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn store(&self) -> &Arc<LimiterStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(PolicyTable::default())
    }
}
