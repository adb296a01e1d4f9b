//! Gatekeeper - per-client, per-operation admission gate
//!
//! This crate decides whether an API call may proceed or arrived too soon
//! after the previous admitted call from the same client to the same
//! operation. State lives in process memory and is reclaimed by a background
//! sweeper.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gatekeeper::guard::Guard;
//! use gatekeeper::ratelimit::{Gate, PolicyTable, Sweeper};
//! use gatekeeper::config::LimiterConfig;
//!
//! # async fn run() {
//! let gate = Arc::new(Gate::new(PolicyTable::default()));
//! let _sweeper = Sweeper::new(gate.store().clone(), gate.clock().clone(), &LimiterConfig::default()).spawn();
//!
//! let guard = Guard::new(gate);
//! match guard.call("10.0.0.1", "delete_job", || "deleted") {
//!     Ok(body) => println!("{body}"),
//!     Err(rejection) => println!("{}", rejection.payload.message),
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod ratelimit;
pub mod telemetry;

pub use error::{GateError, RateLimited, Result};
