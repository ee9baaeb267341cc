//! Worker transport (O1): line-framed JSON-RPC over a subprocess's stdio.
//!
//! [`client`] is used by the orchestrator to drive a worker subprocess;
//! [`server`] is used inside each worker binary to serve its methods.

pub mod client;
pub mod error;
pub mod server;

pub use client::{WorkerConfig, WorkerHandle};
pub use error::TransportError;
