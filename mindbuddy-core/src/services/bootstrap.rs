//! Session bootstrap
//!
//! Runs once at startup: restore any persisted session, load the
//! initial snapshot, and flip the store to ready. Restoration is
//! bounded by a fixed timeout; when it cannot be determined in time
//! the app proceeds signed out instead of hanging on a loading screen.

use std::time::Duration;

use crate::domain::User;

use super::store::{AppStore, Readiness};

pub const SESSION_RESTORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Bootstrap the store. Always leaves readiness at `Ready`, whatever
/// the session restoration outcome.
pub async fn bootstrap(store: &AppStore) -> Option<User> {
    store.advance_readiness(Readiness::Bootstrapping);

    let user = match tokio::time::timeout(SESSION_RESTORE_TIMEOUT, store.restore_session()).await {
        Ok(Ok(user)) => user,
        Ok(Err(e)) => {
            log::warn!("session restore failed, continuing signed out: {}", e);
            None
        }
        Err(_) => {
            log::warn!(
                "session restore still outstanding after {:?}, continuing signed out",
                SESSION_RESTORE_TIMEOUT
            );
            None
        }
    };

    store.advance_readiness(Readiness::Ready);
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::domain::result::{Error, Result};
    use crate::domain::{CheckIn, CheckInDraft, Goal, GoalDraft, GoalUpdate, Group, User};
    use crate::ports::{CompletionToggle, GroupsSnapshot, Persistence};

    /// Backend whose session restore never answers
    struct StalledBackend;

    #[async_trait]
    impl Persistence for StalledBackend {
        fn name(&self) -> &str {
            "stalled"
        }
        async fn restore_session(&self) -> Result<Option<User>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
        async fn login(&self, _: &str, _: &str) -> Result<User> {
            Err(Error::Unreachable)
        }
        async fn signup(&self, _: &str, _: &str, _: &str) -> Result<User> {
            Err(Error::Unreachable)
        }
        async fn logout(&self) -> Result<()> {
            Ok(())
        }
        async fn fetch_goals(&self) -> Result<Vec<Goal>> {
            Err(Error::Unreachable)
        }
        async fn create_goal(&self, _: &User, _: &GoalDraft) -> Result<Goal> {
            Err(Error::Unreachable)
        }
        async fn update_goal(&self, _: &str, _: &GoalUpdate) -> Result<Goal> {
            Err(Error::Unreachable)
        }
        async fn delete_goal(&self, _: &str) -> Result<()> {
            Err(Error::Unreachable)
        }
        async fn toggle_completion(
            &self,
            _: &str,
            _: NaiveDate,
            _: Option<&str>,
        ) -> Result<CompletionToggle> {
            Err(Error::Unreachable)
        }
        async fn fetch_check_ins(&self) -> Result<Vec<CheckIn>> {
            Err(Error::Unreachable)
        }
        async fn create_check_in(&self, _: &User, _: &CheckInDraft) -> Result<CheckIn> {
            Err(Error::Unreachable)
        }
        async fn fetch_groups(&self) -> Result<GroupsSnapshot> {
            Err(Error::Unreachable)
        }
        async fn create_group(&self, _: &User, _: &str) -> Result<Group> {
            Err(Error::Unreachable)
        }
        async fn join_group(&self, _: &User, _: &str) -> Result<Option<Group>> {
            Err(Error::Unreachable)
        }
        async fn leave_group(&self, _: &User, _: &str) -> Result<()> {
            Err(Error::Unreachable)
        }
        async fn delete_group(&self, _: &User, _: &str) -> Result<()> {
            Err(Error::Unreachable)
        }
        async fn fetch_users(&self, _: &[String]) -> Result<Vec<User>> {
            Err(Error::Unreachable)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_session_restore_still_reaches_ready() {
        let store = AppStore::new(Arc::new(StalledBackend));
        let user = bootstrap(&store).await;

        assert!(user.is_none());
        assert_eq!(store.readiness(), Readiness::Ready);
        assert!(store.current_user().await.is_none());
    }
}
