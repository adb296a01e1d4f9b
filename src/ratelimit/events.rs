//! Observability events emitted by the gate.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

/// What the gate did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateAction {
    Admitted,
    Blocked,
}

/// One gate decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateEvent {
    /// Decision time in seconds since the epoch
    pub timestamp: f64,
    pub client: String,
    pub operation: String,
    pub action: GateAction,
    /// Only present for blocked requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_secs: Option<u64>,
    /// Window that was applied
    pub window_secs: f64,
}

/// Receives gate events.
///
/// Called synchronously on the request path, so implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &GateEvent);
}

/// Forwards events to `tracing`.
///
/// Blocked requests are logged at `info`, never as errors; admissions at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &GateEvent) {
        match event.action {
            GateAction::Admitted => debug!(
                client = %event.client,
                operation = %event.operation,
                window_secs = event.window_secs,
                "Request admitted"
            ),
            GateAction::Blocked => info!(
                client = %event.client,
                operation = %event.operation,
                remaining_secs = event.remaining_secs.unwrap_or_default(),
                window_secs = event.window_secs,
                "Request blocked"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<GateEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, oldest first.
    pub fn events(&self) -> Vec<GateEvent> {
        self.events.lock().clone()
    }

    /// Remove and return all recorded events.
    pub fn drain(&self) -> Vec<GateEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &GateEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked_event() -> GateEvent {
        GateEvent {
            timestamp: 12.5,
            client: "10.0.0.1".to_string(),
            operation: "delete_job".to_string(),
            action: GateAction::Blocked,
            remaining_secs: Some(4),
            window_secs: 6.0,
        }
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(blocked_event()).unwrap();
        assert_eq!(json["action"], "blocked");
        assert_eq!(json["remaining_secs"], 4);

        let admitted = GateEvent {
            action: GateAction::Admitted,
            remaining_secs: None,
            ..blocked_event()
        };
        let json = serde_json::to_value(admitted).unwrap();
        assert_eq!(json["action"], "admitted");
        assert!(json.get("remaining_secs").is_none());
    }

    #[test]
    fn test_memory_sink_drain() {
        let sink = MemorySink::new();
        sink.emit(&blocked_event());
        sink.emit(&blocked_event());

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.events().is_empty());
    }
}
