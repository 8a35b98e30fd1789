//! Persistence port - storage backend abstraction
//!
//! One implementation per backend (REST API, hosted BaaS, local files),
//! selected once at startup by configuration and never switched at
//! runtime. The state store depends only on this trait.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::{CheckIn, CheckInDraft, Goal, GoalDraft, GoalUpdate, Group, User};

/// Outcome of toggling a goal completion. The backend decides whether
/// the call added or removed the completion and reports the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionToggle {
    pub completed: bool,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}

/// The groups a user belongs to plus the member profiles needed to
/// render them.
#[derive(Debug, Clone, Default)]
pub struct GroupsSnapshot {
    pub groups: Vec<Group>,
    pub members: Vec<User>,
}

/// Storage backend abstraction
///
/// All operations return canonical-model values; row normalization is
/// each adapter's concern. Adapters never swallow errors - they return
/// typed failures the state store passes through unchanged.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Backend name ("api", "baas", "local")
    fn name(&self) -> &str;

    /// Whether collections outlive a sign-out (true only for the local
    /// backend, where they are shared device state rather than per-user
    /// fetched data)
    fn shares_device_state(&self) -> bool {
        false
    }

    // === Session ===

    /// Restore a previously established session, if any
    async fn restore_session(&self) -> Result<Option<User>>;

    async fn login(&self, email: &str, password: &str) -> Result<User>;

    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User>;

    /// Invalidate the session/token
    async fn logout(&self) -> Result<()>;

    // === Goals ===

    /// Fetch the caller's goals plus goals shared into their groups
    async fn fetch_goals(&self) -> Result<Vec<Goal>>;

    async fn create_goal(&self, owner: &User, draft: &GoalDraft) -> Result<Goal>;

    async fn update_goal(&self, id: &str, updates: &GoalUpdate) -> Result<Goal>;

    /// Delete a goal, cascading its completions and visibility records
    async fn delete_goal(&self, id: &str) -> Result<()>;

    /// Toggle the completion for a calendar date
    async fn toggle_completion(
        &self,
        goal_id: &str,
        date: NaiveDate,
        reflection: Option<&str>,
    ) -> Result<CompletionToggle>;

    // === Check-ins ===

    async fn fetch_check_ins(&self) -> Result<Vec<CheckIn>>;

    async fn create_check_in(&self, owner: &User, draft: &CheckInDraft) -> Result<CheckIn>;

    // === Groups ===

    async fn fetch_groups(&self) -> Result<GroupsSnapshot>;

    async fn create_group(&self, creator: &User, name: &str) -> Result<Group>;

    /// Resolve a normalized invite code and join. `None` means the code
    /// matched no group (expected path, not an error); joining a group
    /// the user already belongs to succeeds without duplicating
    /// membership.
    async fn join_group(&self, user: &User, invite_code: &str) -> Result<Option<Group>>;

    /// Remove the caller's own membership only
    async fn leave_group(&self, user: &User, group_id: &str) -> Result<()>;

    /// Delete a group; the backend enforces that only the creator may
    async fn delete_group(&self, user: &User, group_id: &str) -> Result<()>;

    // === Users ===

    /// Fetch user profiles by id; network backends restrict the result
    /// to users sharing a group with the caller
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>>;
}
