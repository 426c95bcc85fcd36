//! HTTP API module.
//!
//! This module provides the HTTP server, API types and the diagnostic
//! log stream for the reconciliation backend.

pub mod server;
pub mod types;
pub mod logs;

pub use server::start_server;
pub use types::*;
pub use logs::*;
