//! civicsync_server: HTTP surface for CivicSync.
//!
//! Exposed as a library so the integration tests can build the router
//! against in-memory stores.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod session;
