//! Application state store
//!
//! Holds the in-memory snapshot the UI renders: the signed-in user,
//! known member profiles, goals, check-ins, and groups. Every mutation
//! goes through the active backend first and applies the backend's
//! confirmed result, never an optimistic guess. Collection refreshes
//! fail open: a backend error is logged and the previous snapshot kept.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, RwLock};

use crate::domain::result::{Error, Result};
use crate::domain::{
    CheckIn, CheckInDraft, Completion, Goal, GoalDraft, GoalUpdate, Group, User,
};
use crate::ports::{CompletionToggle, Persistence};

/// One-way readiness progression. The store never returns to an
/// earlier phase, even when bootstrap fetches fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Readiness {
    Uninitialized = 0,
    Bootstrapping = 1,
    Ready = 2,
}

impl Readiness {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Bootstrapping,
            _ => Self::Ready,
        }
    }
}

/// Everything the UI renders, cloned out as one consistent view
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub user: Option<User>,
    /// Profiles of every user seen in the caller's groups
    pub users: Vec<User>,
    pub goals: Vec<Goal>,
    pub check_ins: Vec<CheckIn>,
    pub groups: Vec<Group>,
}

pub struct AppStore {
    backend: Arc<dyn Persistence>,
    state: RwLock<Snapshot>,
    readiness: AtomicU8,
    /// Per-goal serialization of completion toggles, so two rapid taps
    /// resolve as toggle-then-toggle instead of racing the backend
    toggle_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AppStore {
    pub fn new(backend: Arc<dyn Persistence>) -> Self {
        Self {
            backend,
            state: RwLock::new(Snapshot::default()),
            readiness: AtomicU8::new(Readiness::Uninitialized as u8),
            toggle_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Persistence> {
        &self.backend
    }

    pub fn readiness(&self) -> Readiness {
        Readiness::from_u8(self.readiness.load(Ordering::Acquire))
    }

    /// Advance readiness; lower phases never overwrite higher ones
    pub(crate) fn advance_readiness(&self, to: Readiness) {
        self.readiness.fetch_max(to as u8, Ordering::AcqRel);
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    async fn require_user(&self) -> Result<User> {
        self.current_user()
            .await
            .ok_or_else(|| Error::auth("Not signed in"))
    }

    // === Session ===

    /// Restore a persisted session and, when one exists, load the
    /// user's collections
    pub async fn restore_session(&self) -> Result<Option<User>> {
        let Some(user) = self.backend.restore_session().await? else {
            return Ok(None);
        };
        self.state.write().await.user = Some(user.clone());
        self.refresh_all().await;
        Ok(Some(user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = self.backend.login(email, password).await?;
        self.state.write().await.user = Some(user.clone());
        self.refresh_all().await;
        Ok(user)
    }

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let user = self.backend.signup(email, password, name).await?;
        self.state.write().await.user = Some(user.clone());
        self.refresh_all().await;
        Ok(user)
    }

    /// Sign out. Fetched per-user collections are dropped; on a backend
    /// whose collections are shared device state they are kept.
    pub async fn logout(&self) -> Result<()> {
        self.backend.logout().await?;
        let mut state = self.state.write().await;
        state.user = None;
        if !self.backend.shares_device_state() {
            state.users.clear();
            state.goals.clear();
            state.check_ins.clear();
            state.groups.clear();
        }
        Ok(())
    }

    // === Refresh ===

    /// Refetch every collection. Each fetch fails open: an error keeps
    /// the collection's previous contents and is logged, never raised.
    pub async fn refresh_all(&self) {
        match self.backend.fetch_goals().await {
            Ok(goals) => self.state.write().await.goals = goals,
            Err(e) => log::warn!("goal refresh failed: {}", e),
        }
        match self.backend.fetch_check_ins().await {
            Ok(check_ins) => self.state.write().await.check_ins = check_ins,
            Err(e) => log::warn!("check-in refresh failed: {}", e),
        }
        match self.backend.fetch_groups().await {
            Ok(snapshot) => {
                let mut state = self.state.write().await;
                state.groups = snapshot.groups;
                upsert_users(&mut state.users, snapshot.members);
            }
            Err(e) => log::warn!("group refresh failed: {}", e),
        }
    }

    // === Goals ===

    pub async fn create_goal(&self, draft: GoalDraft) -> Result<Goal> {
        draft.validate().map_err(Error::validation)?;
        let user = self.require_user().await?;
        let goal = self.backend.create_goal(&user, &draft).await?;
        self.state.write().await.goals.push(goal.clone());
        Ok(goal)
    }

    pub async fn update_goal(&self, id: &str, updates: GoalUpdate) -> Result<Goal> {
        self.require_user().await?;
        let updated = self.backend.update_goal(id, &updates).await?;
        let mut state = self.state.write().await;
        if let Some(goal) = state.goals.iter_mut().find(|g| g.id == id) {
            *goal = updated.clone();
        }
        Ok(updated)
    }

    /// Delete one of the caller's own goals. Goals merely shared into a
    /// common group belong to their owner and cannot be deleted here.
    pub async fn delete_goal(&self, id: &str) -> Result<()> {
        let user = self.require_user().await?;
        {
            let state = self.state.read().await;
            if let Some(goal) = state.goals.iter().find(|g| g.id == id) {
                if goal.user_id != user.id {
                    return Err(Error::auth("Only the goal owner can delete a goal"));
                }
            }
        }
        self.backend.delete_goal(id).await?;
        self.state.write().await.goals.retain(|g| g.id != id);
        Ok(())
    }

    /// Toggle a goal completion for a calendar date.
    ///
    /// Toggles on the same goal are serialized, so two rapid calls for
    /// the same date land as on-then-off rather than racing into a
    /// duplicate. The backend's confirmed result is applied, not the
    /// local guess.
    pub async fn toggle_completion(
        &self,
        goal_id: &str,
        date: NaiveDate,
        reflection: Option<&str>,
    ) -> Result<CompletionToggle> {
        self.require_user().await?;

        let lock = {
            let mut locks = self.toggle_locks.lock().await;
            locks
                .entry(goal_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        let toggle = self.backend.toggle_completion(goal_id, date, reflection).await?;

        let mut state = self.state.write().await;
        if let Some(goal) = state.goals.iter_mut().find(|g| g.id == goal_id) {
            apply_toggle(goal, &toggle);
        }
        Ok(toggle)
    }

    // === Check-ins ===

    pub async fn create_check_in(&self, draft: CheckInDraft) -> Result<CheckIn> {
        draft.validate().map_err(Error::validation)?;
        let user = self.require_user().await?;
        let check_in = self.backend.create_check_in(&user, &draft).await?;
        self.state.write().await.check_ins.push(check_in.clone());
        Ok(check_in)
    }

    // === Groups ===

    pub async fn create_group(&self, name: &str) -> Result<Group> {
        let user = self.require_user().await?;
        let group = self.backend.create_group(&user, name).await?;
        let mut state = self.state.write().await;
        state.groups.push(group.clone());
        upsert_users(&mut state.users, vec![user]);
        Ok(group)
    }

    /// Join a group by invite code. `Ok(false)` means the code matched
    /// no group; rejoining a group already joined succeeds.
    pub async fn join_group(&self, invite_code: &str) -> Result<bool> {
        let user = self.require_user().await?;
        let Some(group) = self.backend.join_group(&user, invite_code).await? else {
            return Ok(false);
        };

        let members = match self.backend.fetch_users(&group.members).await {
            Ok(members) => members,
            Err(e) => {
                log::warn!("failed to fetch member profiles after join: {}", e);
                Vec::new()
            }
        };

        let mut state = self.state.write().await;
        if let Some(existing) = state.groups.iter_mut().find(|g| g.id == group.id) {
            *existing = group;
        } else {
            state.groups.push(group);
        }
        upsert_users(&mut state.users, members);
        Ok(true)
    }

    pub async fn leave_group(&self, group_id: &str) -> Result<()> {
        let user = self.require_user().await?;
        self.backend.leave_group(&user, group_id).await?;
        self.state.write().await.groups.retain(|g| g.id != group_id);
        Ok(())
    }

    /// Delete a group the caller created. The backend enforces this
    /// too; checking here gives a clean error without a round trip.
    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        let user = self.require_user().await?;
        {
            let state = self.state.read().await;
            if let Some(group) = state.groups.iter().find(|g| g.id == group_id) {
                if group.created_by != user.id {
                    return Err(Error::auth("Only the group creator can delete the group"));
                }
            }
        }
        self.backend.delete_group(&user, group_id).await?;

        let mut state = self.state.write().await;
        state.groups.retain(|g| g.id != group_id);
        for goal in &mut state.goals {
            goal.visible_to_groups.retain(|id| id != group_id);
        }
        for check_in in &mut state.check_ins {
            check_in.visible_to_groups.retain(|id| id != group_id);
        }
        Ok(())
    }
}

/// Merge profiles into the known-user list by id, replacing stale
/// entries and keeping everyone already known
fn upsert_users(known: &mut Vec<User>, incoming: Vec<User>) {
    for user in incoming {
        if let Some(existing) = known.iter_mut().find(|u| u.id == user.id) {
            *existing = user;
        } else {
            known.push(user);
        }
    }
}

/// Apply a backend-confirmed toggle to the cached goal
fn apply_toggle(goal: &mut Goal, toggle: &CompletionToggle) {
    if toggle.completed {
        if !goal.is_completed_on(toggle.date) {
            goal.completions.push(Completion {
                date: toggle.date,
                reflection: toggle.reflection.clone(),
            });
        }
    } else {
        goal.completions.retain(|c| c.date != toggle.date);
    }
}
