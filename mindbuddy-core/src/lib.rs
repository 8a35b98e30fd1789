//! MindBuddy Core - state synchronization for the goal-tracking app
//!
//! This crate implements the client-side core following hexagonal
//! architecture:
//!
//! - **domain**: Canonical entities (User, Goal, CheckIn, Group)
//! - **ports**: Trait definitions for external dependencies
//!   (Persistence, SessionProvider, Assistant)
//! - **services**: State store, sharing resolver, session bootstrap
//! - **adapters**: Concrete backends (REST API, hosted BaaS, local files)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::{ApiPersistence, BaasPersistence, FileTokenStore, LocalPersistence};
use config::{BackendKind, Config};
use domain::result::{Error, Result};
use ports::{Assistant, Persistence, SessionProvider};
use services::{bootstrap, AppStore};

// Re-export commonly used types at crate root
pub use domain::result;
pub use domain::{CheckIn, CheckInDraft, Completion, Frequency, Goal, GoalDraft, GoalUpdate, Group, User};
pub use services::{Readiness, Snapshot, SESSION_RESTORE_TIMEOUT};

/// Main context for MindBuddy operations
///
/// The primary entry point: holds the configuration, the selected
/// backend, the state store, and the optional AI assistant.
pub struct MindbuddyContext {
    pub config: Config,
    pub store: AppStore,
    assistant: Option<Arc<dyn Assistant>>,
}

impl MindbuddyContext {
    /// Create a context from the configuration in `data_dir`. The
    /// configured backend is constructed here and never switched.
    ///
    /// The BaaS backend needs an externally-managed auth service; use
    /// [`MindbuddyContext::new_hosted`] for that.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir).map_err(|e| Error::other(e.to_string()))?;

        let backend: Arc<dyn Persistence> = match config.backend {
            BackendKind::Api => {
                let base_url = config
                    .api_url
                    .clone()
                    .ok_or_else(|| Error::validation("api backend selected but no apiUrl set"))?;
                let tokens = Arc::new(FileTokenStore::new(data_dir));
                Arc::new(ApiPersistence::new(&base_url, tokens)?)
            }
            BackendKind::Baas => {
                return Err(Error::validation(
                    "baas backend needs a session provider; use MindbuddyContext::new_hosted",
                ))
            }
            BackendKind::Local => Arc::new(LocalPersistence::new(data_dir)?),
        };

        Ok(Self::with_backend(config, backend))
    }

    /// Create a context for the hosted BaaS backend, with its auth
    /// delegated to the given session provider
    pub fn new_hosted(data_dir: &Path, sessions: Arc<dyn SessionProvider>) -> Result<Self> {
        let config = Config::load(data_dir).map_err(|e| Error::other(e.to_string()))?;
        let base_url = config
            .baas_url
            .clone()
            .ok_or_else(|| Error::validation("baas backend selected but no baasUrl set"))?;
        let anon_key = config.baas_anon_key.clone().unwrap_or_default();

        let backend: Arc<dyn Persistence> =
            Arc::new(BaasPersistence::new(&base_url, &anon_key, sessions)?);
        Ok(Self::with_backend(config, backend))
    }

    /// Build a context around an already-constructed backend
    pub fn with_backend(config: Config, backend: Arc<dyn Persistence>) -> Self {
        Self {
            config,
            store: AppStore::new(backend),
            assistant: None,
        }
    }

    pub fn with_assistant(mut self, assistant: Arc<dyn Assistant>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    /// Run the startup bootstrap: restore any session (bounded by
    /// [`SESSION_RESTORE_TIMEOUT`]), load the snapshot, and mark the
    /// store ready. Returns the restored user, if any.
    pub async fn bootstrap(&self) -> Option<User> {
        bootstrap(&self.store).await
    }

    /// Ask the AI assistant a question, with the signed-in user's goal
    /// history as context. Assistant failures surface verbatim.
    pub async fn ask(&self, message: &str) -> Result<String> {
        let assistant = self
            .assistant
            .as_ref()
            .ok_or_else(|| Error::other("No assistant configured"))?;

        let snapshot = self.store.snapshot().await;
        let user = snapshot
            .user
            .as_ref()
            .ok_or_else(|| Error::auth("Not signed in"))?;

        let today = chrono::Local::now().date_naive();
        let context = goal_context(&snapshot.goals, &user.id, today);
        assistant.ask(&context, message).await
    }
}

/// Summarize the user's goals for the assistant: title, frequency,
/// total completions, and current streak per goal
fn goal_context(goals: &[Goal], user_id: &str, today: chrono::NaiveDate) -> String {
    let mut lines = Vec::new();
    for goal in goals.iter().filter(|g| g.user_id == user_id) {
        let streak = services::sharing::current_streak(goal, today);
        lines.push(format!(
            "- {} ({:?}): {} completions, current streak {} days",
            goal.title,
            goal.frequency,
            goal.completions.len(),
            streak
        ));
    }
    if lines.is_empty() {
        "The user has no goals yet.".to_string()
    } else {
        format!("The user's goals:\n{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_goal_context_lists_only_own_goals() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mine = Goal {
            id: "g1".to_string(),
            user_id: "u1".to_string(),
            title: "Morning Meditation".to_string(),
            description: String::new(),
            frequency: Frequency::Daily,
            custom_days: None,
            checklist: None,
            start_date: None,
            end_date: None,
            completions: vec![Completion { date: today, reflection: None }],
            visible_to_groups: Vec::new(),
            created_at: chrono::Utc::now(),
        };
        let theirs = Goal {
            id: "g2".to_string(),
            user_id: "u2".to_string(),
            title: "Secret".to_string(),
            ..mine.clone()
        };

        let context = goal_context(&[mine, theirs], "u1", today);
        assert!(context.contains("Morning Meditation"));
        assert!(!context.contains("Secret"));
        assert!(context.contains("streak 1"));
    }
}
