//! Backend adapters implementing the persistence port
//!
//! One adapter per backend: the REST API server, the hosted BaaS with
//! row-level security, and the local on-device files used for demo
//! mode. `rows` holds the shared row normalizers.

mod api;
mod baas;
mod local;
pub mod rows;

pub use api::{ApiPersistence, FileTokenStore};
pub use baas::BaasPersistence;
pub use local::LocalPersistence;
