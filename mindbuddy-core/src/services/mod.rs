//! Core services
//!
//! The state store, the startup bootstrap, and the pure sharing
//! projections the UI renders group views from.

pub mod bootstrap;
pub mod sharing;
pub mod store;

pub use bootstrap::{bootstrap, SESSION_RESTORE_TIMEOUT};
pub use store::{AppStore, Readiness, Snapshot};
