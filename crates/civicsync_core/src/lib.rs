//! CivicSync core: domain types, port traits and services for civic issue
//! reporting.
//!
//! Pure crate: no sqlx, no HTTP. Storage comes in through the traits in
//! [`ports`]; identity comes in as an explicit [`actor::Actor`].

pub mod accounts;
pub mod actor;
pub mod error;
pub mod memory;
pub mod password;
pub mod ports;
pub mod projection;
pub mod proto;
pub mod service;
pub mod types;
