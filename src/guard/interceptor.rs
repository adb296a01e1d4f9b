//! Around-call admission middleware.

use std::future::Future;
use std::sync::Arc;
use tracing::{instrument, warn};

use super::responder::{self, Rejection};
use crate::ratelimit::Gate;

/// Client key used when the transport could not identify the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Runs handlers only when the gate admits the call.
///
/// The operation id is passed explicitly by the caller rather than derived
/// from the handler.
#[derive(Clone)]
pub struct Guard {
    gate: Arc<Gate>,
}

impl Guard {
    /// Wrap a shared gate.
    pub fn new(gate: Arc<Gate>) -> Self {
        Self { gate }
    }

    /// The gate behind this guard.
    pub fn gate(&self) -> &Arc<Gate> {
        &self.gate
    }

    /// Check admission at the gate's clock and render a rejection on denial.
    #[instrument(level = "trace", skip(self))]
    pub fn admit(&self, client: &str, operation: &str) -> Result<(), Rejection> {
        let client = if client.is_empty() {
            warn!(operation = %operation, "Request without a client key");
            UNKNOWN_CLIENT
        } else {
            client
        };

        self.gate
            .check_now(client, operation)
            .into_result()
            .map_err(|limited| responder::render(&limited))
    }

    /// Run `handler` if admitted.
    pub fn call<T, F>(&self, client: &str, operation: &str, handler: F) -> Result<T, Rejection>
    where
        F: FnOnce() -> T,
    {
        self.admit(client, operation)?;
        Ok(handler())
    }

    /// Run an async `handler` if admitted. The decision is made before the
    /// handler's future is created.
    pub async fn call_async<T, F, Fut>(
        &self,
        client: &str,
        operation: &str,
        handler: F,
    ) -> Result<T, Rejection>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.admit(client, operation)?;
        Ok(handler().await)
    }
}
