//! Transport-agnostic middleware around the gate.
//!
//! A host's HTTP layer extracts a client key and an operation id, calls
//! [`Guard::call`], and turns a [`Rejection`] into its own 429 response.

mod interceptor;
pub mod responder;

pub use interceptor::{Guard, UNKNOWN_CLIENT};
pub use responder::{Rejection, RejectionPayload};
