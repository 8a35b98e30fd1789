//! Token store port - durable bearer-token persistence for the REST backend

use crate::domain::result::Result;

/// Durable storage for the REST backend's auth token. A held token is
/// attached to every request; logout clears it.
pub trait TokenStore: Send + Sync {
    /// Currently held token, if any
    fn get(&self) -> Option<String>;

    fn set(&self, token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}
