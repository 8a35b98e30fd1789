//! Assistant port - the AI question-answering collaborator

use async_trait::async_trait;

use crate::domain::result::Result;

/// Opaque AI assistant. The caller builds the context (the user's goal
/// history); this port only relays it. Transport or quota failures are
/// surfaced verbatim to the caller.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn ask(&self, context: &str, message: &str) -> Result<String>;
}
