//! Local file adapter (demo mode)
//!
//! Stores every collection as a JSON file in the data directory, with
//! no network and no passwords. Collections are shared device state:
//! they survive a sign-out, and visibility is resolved against them
//! directly. The first run seeds demo users, a demo group joinable
//! with code DEMO99, and a few days of activity.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    CheckIn, CheckInDraft, Completion, Frequency, Goal, GoalDraft, GoalUpdate, Group, User,
};
use crate::ports::{CompletionToggle, GroupsSnapshot, Persistence};

const INIT_MARKER: &str = "hasInitialized";

#[derive(Debug, Default)]
struct Collections {
    users: Vec<User>,
    goals: Vec<Goal>,
    check_ins: Vec<CheckIn>,
    groups: Vec<Group>,
    current_user: Option<User>,
}

pub struct LocalPersistence {
    data_dir: PathBuf,
    state: Mutex<Collections>,
}

impl LocalPersistence {
    /// Open (or initialize) the on-device store under `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let adapter = Self {
            data_dir: data_dir.to_path_buf(),
            state: Mutex::new(Collections::default()),
        };

        {
            let mut state = adapter.lock();
            if !adapter.data_dir.join(INIT_MARKER).exists() {
                *state = Self::demo_seed();
                adapter.persist_all(&state)?;
                std::fs::write(adapter.data_dir.join(INIT_MARKER), b"1")?;
                log::info!("seeded demo data in {}", adapter.data_dir.display());
            } else {
                state.users = adapter.load("users.json")?;
                state.goals = adapter.load("goals.json")?;
                state.check_ins = adapter.load("checkIns.json")?;
                state.groups = adapter.load("groups.json")?;
                state.current_user = adapter.load_optional("currentUser.json")?;
            }
        }

        Ok(adapter)
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load<T: serde::de::DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let path = self.data_dir.join(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn load_optional<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.data_dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        std::fs::write(self.data_dir.join(file), raw)?;
        Ok(())
    }

    fn persist_all(&self, state: &Collections) -> Result<()> {
        self.save("users.json", &state.users)?;
        self.save("goals.json", &state.goals)?;
        self.save("checkIns.json", &state.check_ins)?;
        self.save("groups.json", &state.groups)?;
        self.persist_current_user(state)
    }

    fn persist_current_user(&self, state: &Collections) -> Result<()> {
        let path = self.data_dir.join("currentUser.json");
        match &state.current_user {
            Some(user) => self.save("currentUser.json", user),
            None => match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn require_user(state: &Collections) -> Result<User> {
        state
            .current_user
            .clone()
            .ok_or_else(|| Error::auth("Not signed in"))
    }

    /// The group ids the user belongs to
    fn group_ids_of(state: &Collections, user_id: &str) -> HashSet<String> {
        state
            .groups
            .iter()
            .filter(|g| g.is_member(user_id))
            .map(|g| g.id.clone())
            .collect()
    }

    fn demo_seed() -> Collections {
        let today = Local::now().date_naive();
        let yesterday = today - Duration::days(1);
        let two_days_ago = today - Duration::days(2);
        let now = Utc::now();

        let users = vec![
            demo_user("demo_user_1", "alex@example.com", "Alex"),
            demo_user("demo_user_2", "sam@example.com", "Sam"),
            demo_user("demo_user_3", "jordan@example.com", "Jordan"),
        ];

        let groups = vec![Group {
            id: "demo_group_1".to_string(),
            name: "Wellness Warriors".to_string(),
            invite_code: "DEMO99".to_string(),
            members: vec![
                "demo_user_1".to_string(),
                "demo_user_2".to_string(),
                "demo_user_3".to_string(),
            ],
            created_by: "demo_user_1".to_string(),
            created_at: now,
        }];

        let goals = vec![
            Goal {
                id: "demo_goal_1".to_string(),
                user_id: "demo_user_1".to_string(),
                title: "Morning Meditation".to_string(),
                description: "10 minutes of mindfulness".to_string(),
                frequency: Frequency::Daily,
                custom_days: None,
                checklist: None,
                start_date: None,
                end_date: None,
                completions: vec![
                    Completion { date: today, reflection: None },
                    Completion { date: yesterday, reflection: None },
                    Completion { date: two_days_ago, reflection: None },
                ],
                visible_to_groups: vec!["demo_group_1".to_string()],
                created_at: now - Duration::days(2),
            },
            Goal {
                id: "demo_goal_2".to_string(),
                user_id: "demo_user_2".to_string(),
                title: "Gratitude Journal".to_string(),
                description: "Write 3 things I'm grateful for".to_string(),
                frequency: Frequency::Daily,
                custom_days: None,
                checklist: None,
                start_date: None,
                end_date: None,
                completions: vec![
                    Completion {
                        date: today,
                        reflection: Some("Feeling thankful for my friends today".to_string()),
                    },
                    Completion { date: yesterday, reflection: None },
                ],
                visible_to_groups: vec!["demo_group_1".to_string()],
                created_at: now - Duration::days(1),
            },
        ];

        let check_ins = vec![
            CheckIn {
                id: "demo_checkin_1".to_string(),
                user_id: "demo_user_1".to_string(),
                date: today,
                mood: 4,
                reflection: "Had a productive morning! Feeling good.".to_string(),
                visible_to_groups: vec!["demo_group_1".to_string()],
            },
            CheckIn {
                id: "demo_checkin_2".to_string(),
                user_id: "demo_user_2".to_string(),
                date: today,
                mood: 5,
                reflection: "Great day with lots of positive energy".to_string(),
                visible_to_groups: vec!["demo_group_1".to_string()],
            },
        ];

        Collections {
            users,
            goals,
            check_ins,
            groups,
            current_user: None,
        }
    }
}

fn demo_user(id: &str, email: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        avatar: None,
    }
}

#[async_trait]
impl Persistence for LocalPersistence {
    fn name(&self) -> &str {
        "local"
    }

    fn shares_device_state(&self) -> bool {
        true
    }

    async fn restore_session(&self) -> Result<Option<User>> {
        Ok(self.lock().current_user.clone())
    }

    /// No passwords in demo mode; the email alone selects the account
    async fn login(&self, email: &str, _password: &str) -> Result<User> {
        let mut state = self.lock();
        let email = User::normalize_email(email);
        let user = state
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| Error::auth("User not found"))?;
        state.current_user = Some(user.clone());
        self.persist_current_user(&state)?;
        Ok(user)
    }

    async fn signup(&self, email: &str, _password: &str, name: &str) -> Result<User> {
        let mut state = self.lock();
        let email = User::normalize_email(email);
        if state.users.iter().any(|u| u.email == email) {
            return Err(Error::auth("User already exists"));
        }
        let user = User {
            id: format!("user_{}", Uuid::new_v4()),
            email,
            name: name.to_string(),
            avatar: None,
        };
        state.users.push(user.clone());
        state.current_user = Some(user.clone());
        self.save("users.json", &state.users)?;
        self.persist_current_user(&state)?;
        Ok(user)
    }

    /// Signing out only clears the session; device collections stay
    async fn logout(&self) -> Result<()> {
        let mut state = self.lock();
        state.current_user = None;
        self.persist_current_user(&state)
    }

    async fn fetch_goals(&self) -> Result<Vec<Goal>> {
        let state = self.lock();
        let user = Self::require_user(&state)?;
        let my_groups = Self::group_ids_of(&state, &user.id);
        Ok(state
            .goals
            .iter()
            .filter(|g| {
                g.user_id == user.id
                    || g.visible_to_groups.iter().any(|id| my_groups.contains(id))
            })
            .cloned()
            .collect())
    }

    async fn create_goal(&self, owner: &User, draft: &GoalDraft) -> Result<Goal> {
        draft.validate().map_err(Error::validation)?;
        let mut state = self.lock();
        let goal = Goal {
            id: format!("goal_{}", Uuid::new_v4()),
            user_id: owner.id.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            frequency: draft.frequency,
            custom_days: draft.custom_days.clone(),
            checklist: draft.checklist.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            completions: Vec::new(),
            visible_to_groups: draft.visible_to_groups.clone(),
            created_at: Utc::now(),
        };
        state.goals.push(goal.clone());
        self.save("goals.json", &state.goals)?;
        Ok(goal)
    }

    async fn update_goal(&self, id: &str, updates: &GoalUpdate) -> Result<Goal> {
        let mut state = self.lock();
        let goal = state
            .goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| Error::not_found("Goal not found"))?;
        goal.apply(updates);
        goal.validate().map_err(Error::validation)?;
        let updated = goal.clone();
        self.save("goals.json", &state.goals)?;
        Ok(updated)
    }

    async fn delete_goal(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        let before = state.goals.len();
        state.goals.retain(|g| g.id != id);
        if state.goals.len() == before {
            return Err(Error::not_found("Goal not found"));
        }
        self.save("goals.json", &state.goals)
    }

    async fn toggle_completion(
        &self,
        goal_id: &str,
        date: NaiveDate,
        reflection: Option<&str>,
    ) -> Result<CompletionToggle> {
        let mut state = self.lock();
        let goal = state
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or_else(|| Error::not_found("Goal not found"))?;
        let completed = goal.toggle_completion(date, reflection.map(str::to_string));
        self.save("goals.json", &state.goals)?;
        Ok(CompletionToggle {
            completed,
            date,
            reflection: if completed {
                reflection.map(str::to_string)
            } else {
                None
            },
        })
    }

    async fn fetch_check_ins(&self) -> Result<Vec<CheckIn>> {
        let state = self.lock();
        let user = Self::require_user(&state)?;
        let my_groups = Self::group_ids_of(&state, &user.id);
        Ok(state
            .check_ins
            .iter()
            .filter(|c| {
                c.user_id == user.id
                    || c.visible_to_groups.iter().any(|id| my_groups.contains(id))
            })
            .cloned()
            .collect())
    }

    async fn create_check_in(&self, owner: &User, draft: &CheckInDraft) -> Result<CheckIn> {
        draft.validate().map_err(Error::validation)?;
        let mut state = self.lock();
        let check_in = CheckIn {
            id: format!("checkin_{}", Uuid::new_v4()),
            user_id: owner.id.clone(),
            date: draft.date,
            mood: draft.mood,
            reflection: draft.reflection.clone(),
            visible_to_groups: draft.visible_to_groups.clone(),
        };
        state.check_ins.push(check_in.clone());
        self.save("checkIns.json", &state.check_ins)?;
        Ok(check_in)
    }

    async fn fetch_groups(&self) -> Result<GroupsSnapshot> {
        let state = self.lock();
        let user = Self::require_user(&state)?;
        let groups: Vec<Group> = state
            .groups
            .iter()
            .filter(|g| g.is_member(&user.id))
            .cloned()
            .collect();

        let member_ids: HashSet<&String> =
            groups.iter().flat_map(|g| g.members.iter()).collect();
        let members = state
            .users
            .iter()
            .filter(|u| member_ids.contains(&u.id))
            .cloned()
            .collect();

        Ok(GroupsSnapshot { groups, members })
    }

    async fn create_group(&self, creator: &User, name: &str) -> Result<Group> {
        if name.trim().is_empty() {
            return Err(Error::validation("group name cannot be empty"));
        }
        let mut state = self.lock();

        let existing: HashSet<String> =
            state.groups.iter().map(|g| g.invite_code.clone()).collect();
        let mut invite_code = Group::generate_invite_code();
        while existing.contains(&invite_code) {
            invite_code = Group::generate_invite_code();
        }

        let group = Group {
            id: format!("group_{}", Uuid::new_v4()),
            name: name.trim().to_string(),
            invite_code,
            members: vec![creator.id.clone()],
            created_by: creator.id.clone(),
            created_at: Utc::now(),
        };
        state.groups.push(group.clone());
        self.save("groups.json", &state.groups)?;
        Ok(group)
    }

    async fn join_group(&self, user: &User, invite_code: &str) -> Result<Option<Group>> {
        let code = Group::normalize_invite_code(invite_code);
        let mut state = self.lock();
        let Some(group) = state.groups.iter_mut().find(|g| g.invite_code == code) else {
            return Ok(None);
        };
        group.add_member(&user.id);
        let joined = group.clone();
        self.save("groups.json", &state.groups)?;
        Ok(Some(joined))
    }

    async fn leave_group(&self, user: &User, group_id: &str) -> Result<()> {
        let mut state = self.lock();
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| Error::not_found("Group not found"))?;
        group.remove_member(&user.id);
        self.save("groups.json", &state.groups)
    }

    async fn delete_group(&self, user: &User, group_id: &str) -> Result<()> {
        let mut state = self.lock();
        let group = state
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or_else(|| Error::not_found("Group not found"))?;
        if group.created_by != user.id {
            return Err(Error::auth("Only the group creator can delete the group"));
        }

        state.groups.retain(|g| g.id != group_id);
        // Scrub the dead group id from visibility sets
        for goal in &mut state.goals {
            goal.visible_to_groups.retain(|id| id != group_id);
        }
        for check_in in &mut state.check_ins {
            check_in.visible_to_groups.retain(|id| id != group_id);
        }
        self.save("groups.json", &state.groups)?;
        self.save("goals.json", &state.goals)?;
        self.save("checkIns.json", &state.check_ins)
    }

    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        let state = self.lock();
        Ok(state
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn signed_in(dir: &TempDir) -> (LocalPersistence, User) {
        let local = LocalPersistence::new(dir.path()).unwrap();
        let user = local.login("alex@example.com", "").await.unwrap();
        (local, user)
    }

    #[tokio::test]
    async fn test_first_run_seeds_demo_data() {
        let dir = TempDir::new().unwrap();
        let (local, user) = signed_in(&dir).await;

        assert_eq!(user.id, "demo_user_1");
        let goals = local.fetch_goals().await.unwrap();
        assert_eq!(goals.len(), 2);
        let snapshot = local.fetch_groups().await.unwrap();
        assert_eq!(snapshot.groups[0].invite_code, "DEMO99");
        assert_eq!(snapshot.members.len(), 3);
    }

    #[tokio::test]
    async fn test_seed_runs_once() {
        let dir = TempDir::new().unwrap();
        {
            let (local, user) = signed_in(&dir).await;
            let draft = GoalDraft::new("Read", Frequency::Daily);
            local.create_goal(&user, &draft).await.unwrap();
        }
        // Reopening must not re-seed or drop the added goal
        let (local, _) = signed_in(&dir).await;
        let goals = local.fetch_goals().await.unwrap();
        assert_eq!(goals.len(), 3);
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let dir = TempDir::new().unwrap();
        let local = LocalPersistence::new(dir.path()).unwrap();
        let err = local.login("nobody@example.com", "").await.unwrap_err();
        assert_eq!(err.to_string(), "User not found");
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let dir = TempDir::new().unwrap();
        let local = LocalPersistence::new(dir.path()).unwrap();
        let err = local
            .signup("Alex@Example.com", "pw", "Imposter")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already exists");
    }

    #[tokio::test]
    async fn test_logout_keeps_device_collections() {
        let dir = TempDir::new().unwrap();
        let (local, _) = signed_in(&dir).await;
        local.logout().await.unwrap();

        assert!(local.restore_session().await.unwrap().is_none());
        let (reopened, _) = signed_in(&dir).await;
        assert_eq!(reopened.fetch_goals().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_toggle_is_idempotent_per_date() {
        let dir = TempDir::new().unwrap();
        let (local, _) = signed_in(&dir).await;
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        let on = local
            .toggle_completion("demo_goal_1", date, Some("done"))
            .await
            .unwrap();
        assert!(on.completed);
        let off = local.toggle_completion("demo_goal_1", date, None).await.unwrap();
        assert!(!off.completed);

        let goals = local.fetch_goals().await.unwrap();
        let goal = goals.iter().find(|g| g.id == "demo_goal_1").unwrap();
        assert!(!goal.is_completed_on(date));
    }

    #[tokio::test]
    async fn test_join_group_case_insensitive_and_dedup() {
        let dir = TempDir::new().unwrap();
        let local = LocalPersistence::new(dir.path()).unwrap();
        let user = local.signup("new@example.com", "pw", "Newbie").await.unwrap();

        let group = local.join_group(&user, " demo99 ").await.unwrap().unwrap();
        assert!(group.is_member(&user.id));
        let again = local.join_group(&user, "DEMO99").await.unwrap().unwrap();
        assert_eq!(
            again.members.iter().filter(|m| *m == &user.id).count(),
            1
        );

        assert!(local.join_group(&user, "XXXXXX").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_group_is_creator_only_and_scrubs_visibility() {
        let dir = TempDir::new().unwrap();
        let local = LocalPersistence::new(dir.path()).unwrap();

        let sam = local.login("sam@example.com", "").await.unwrap();
        assert!(local.delete_group(&sam, "demo_group_1").await.is_err());

        let alex = local.login("alex@example.com", "").await.unwrap();
        local.delete_group(&alex, "demo_group_1").await.unwrap();

        let goals = local.fetch_goals().await.unwrap();
        for goal in goals {
            assert!(goal.visible_to_groups.is_empty());
        }
    }
}
