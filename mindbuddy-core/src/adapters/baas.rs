//! Hosted BaaS adapter
//!
//! Talks to a hosted Postgres-over-REST backend with row-level
//! security. Auth is delegated to a [`SessionProvider`]; data access
//! goes through the `/rest/v1` table endpoints and remote procedures,
//! with the session's bearer token scoping every query to the caller's
//! rows.
//!
//! Shared data (other members' goals and check-ins) comes from remote
//! procedures that bypass row-level security server-side. The richer
//! procedures inline visibility ids; older deployments only have the
//! legacy ones, so a missing procedure falls back to the legacy call
//! plus a visibility join fetch.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};

use crate::domain::result::{Error, Result};
use crate::domain::{CheckIn, CheckInDraft, Goal, GoalDraft, GoalUpdate, Group, User};
use crate::ports::{CompletionToggle, GroupsSnapshot, Persistence, Session, SessionProvider};

use super::rows::{
    attach_completions, check_in_visibility_map, fold_group_members, goal_visibility_map,
    merge_shared_check_ins, merge_shared_goals, CheckInRow, CheckInVisibilityRow, GoalCompletionRow,
    GoalRow, GoalVisibilityRow, GroupMemberRow, GroupRow, ProfileRow, SharedCheckInRow,
    SharedGoalRow,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Attempts at generating a collision-free invite code before giving up
const INVITE_CODE_ATTEMPTS: usize = 5;

pub struct BaasPersistence {
    client: Client,
    base_url: String,
    anon_key: String,
    sessions: Arc<dyn SessionProvider>,
    current: RwLock<Option<Session>>,
}

impl BaasPersistence {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        sessions: Arc<dyn SessionProvider>,
    ) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::validation("BaaS base URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            sessions,
            current: RwLock::new(None),
        })
    }

    /// The cached session, or an auth error when signed out
    fn session(&self) -> Result<Session> {
        self.current
            .read()
            .map_err(|_| Error::storage("session cache lock poisoned"))?
            .clone()
            .ok_or_else(|| Error::auth("Not signed in"))
    }

    fn set_session(&self, session: Option<Session>) -> Result<()> {
        *self
            .current
            .write()
            .map_err(|_| Error::storage("session cache lock poisoned"))? = session;
        Ok(())
    }

    fn map_request_error(error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else if error.is_connect() {
            Error::Unreachable
        } else {
            Error::Other(format!("Request failed: {}", error))
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
        prefer: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let token = self
            .current
            .read()
            .map_err(|_| Error::storage("session cache lock poisoned"))?
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());

        let mut request = self
            .client
            .request(method, &url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .header("Content-Type", "application/json");
        if let Some(prefer) = prefer {
            request = request.header("Prefer", prefer);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(Self::map_request_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // PostgREST error bodies carry { "message": ..., "code": ... }
        let body = response.json::<JsonValue>().await.unwrap_or(JsonValue::Null);
        let message = body
            .get("message")
            .or_else(|| body.get("msg"))
            .or_else(|| body.get("error_description"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed: {}", status.as_u16()));
        let code = body
            .get("code")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::BAD_REQUEST => Error::Validation(message),
            StatusCode::CONFLICT => Error::Storage(format!("{} ({})", message, code)),
            _ => Error::Other(message),
        })
    }

    async fn select<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>> {
        let response = self
            .send(Method::GET, &format!("/rest/v1/{}", query), None, None)
            .await?;
        response
            .json()
            .await
            .map_err(|e| Error::other(format!("Invalid response body: {}", e)))
    }

    /// Insert returning the created row
    async fn insert<T: DeserializeOwned>(&self, table: &str, body: JsonValue) -> Result<T> {
        let response = self
            .send(
                Method::POST,
                &format!("/rest/v1/{}", table),
                Some(body),
                Some("return=representation"),
            )
            .await?;
        let mut rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| Error::other(format!("Invalid response body: {}", e)))?;
        if rows.is_empty() {
            return Err(Error::storage(format!("insert into {} returned no row", table)));
        }
        Ok(rows.remove(0))
    }

    async fn insert_void(&self, table: &str, body: JsonValue) -> Result<()> {
        self.send(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(body),
            Some("return=minimal"),
        )
        .await?;
        Ok(())
    }

    async fn patch<T: DeserializeOwned>(&self, query: &str, body: JsonValue) -> Result<T> {
        let response = self
            .send(
                Method::PATCH,
                &format!("/rest/v1/{}", query),
                Some(body),
                Some("return=representation"),
            )
            .await?;
        let mut rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| Error::other(format!("Invalid response body: {}", e)))?;
        if rows.is_empty() {
            return Err(Error::not_found("no matching row to update"));
        }
        Ok(rows.remove(0))
    }

    async fn delete_where(&self, query: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("/rest/v1/{}", query), None, None)
            .await?;
        Ok(())
    }

    async fn rpc<T: DeserializeOwned>(&self, function: &str, args: JsonValue) -> Result<T> {
        let response = self
            .send(
                Method::POST,
                &format!("/rest/v1/rpc/{}", function),
                Some(args),
                None,
            )
            .await?;
        response
            .json()
            .await
            .map_err(|e| Error::other(format!("Invalid response body: {}", e)))
    }

    /// Postgres unique-violation surfaced through PostgREST
    fn is_unique_violation(error: &Error) -> bool {
        match error {
            Error::Storage(msg) => msg.contains("23505") || msg.contains("duplicate key"),
            _ => false,
        }
    }

    /// Profile lookup for a signed-in user. A missing profile row is
    /// synthesized from session data and written back best-effort, so a
    /// half-finished signup still produces a usable user.
    async fn resolve_profile(&self, session: &Session) -> Result<User> {
        let rows: Vec<ProfileRow> = self
            .select(&format!(
                "profiles?select=id,email,name,avatar&id=eq.{}",
                session.user_id
            ))
            .await?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(row.into_user());
        }

        let user = session.to_user(None);
        if let Err(e) = self
            .insert_void(
                "profiles",
                json!([{ "id": user.id, "email": user.email, "name": user.name }]),
            )
            .await
        {
            log::warn!("failed to create missing profile row: {}", e);
        }
        Ok(user)
    }

    /// Shared goals via remote procedure, falling back to the legacy
    /// procedure plus a visibility join when the richer one is absent
    async fn fetch_shared_goals(&self, session: &Session) -> Result<Vec<Goal>> {
        let args = json!({ "p_user_id": session.user_id });

        match self
            .rpc::<Vec<SharedGoalRow>>("get_shared_goals_with_visibility", args.clone())
            .await
        {
            Ok(rows) => Ok(rows.into_iter().map(SharedGoalRow::into_goal).collect()),
            Err(e) if !e.is_transport() => {
                log::warn!("shared-goals procedure with visibility unavailable, using legacy: {}", e);
                let rows: Vec<SharedGoalRow> = self.rpc("get_shared_goals", args).await?;
                let mut goals: Vec<Goal> =
                    rows.into_iter().map(SharedGoalRow::into_goal).collect();
                self.backfill_goal_visibility(&mut goals).await?;
                Ok(goals)
            }
            Err(e) => Err(e),
        }
    }

    /// Legacy shared-goal rows carry no visibility ids; look them up in
    /// one batched join-table query
    async fn backfill_goal_visibility(&self, goals: &mut [Goal]) -> Result<()> {
        if goals.is_empty() {
            return Ok(());
        }
        let ids: Vec<&str> = goals.iter().map(|g| g.id.as_str()).collect();
        let rows: Vec<GoalVisibilityRow> = self
            .select(&format!(
                "goal_visibility?select=goal_id,group_id&goal_id=in.({})",
                ids.join(",")
            ))
            .await?;
        let mut map = goal_visibility_map(rows);
        for goal in goals {
            if let Some(groups) = map.remove(&goal.id) {
                goal.visible_to_groups = groups;
            }
        }
        Ok(())
    }

    async fn fetch_shared_check_ins(&self, session: &Session) -> Result<Vec<CheckIn>> {
        let args = json!({ "p_user_id": session.user_id });

        match self
            .rpc::<Vec<SharedCheckInRow>>("get_shared_check_ins_with_visibility", args.clone())
            .await
        {
            Ok(rows) => Ok(rows.into_iter().map(SharedCheckInRow::into_check_in).collect()),
            Err(e) if !e.is_transport() => {
                log::warn!(
                    "shared-check-ins procedure with visibility unavailable, using legacy: {}",
                    e
                );
                let rows: Vec<SharedCheckInRow> = self.rpc("get_shared_check_ins", args).await?;
                let mut check_ins: Vec<CheckIn> =
                    rows.into_iter().map(SharedCheckInRow::into_check_in).collect();
                self.backfill_check_in_visibility(&mut check_ins).await?;
                Ok(check_ins)
            }
            Err(e) => Err(e),
        }
    }

    async fn backfill_check_in_visibility(&self, check_ins: &mut [CheckIn]) -> Result<()> {
        if check_ins.is_empty() {
            return Ok(());
        }
        let ids: Vec<&str> = check_ins.iter().map(|c| c.id.as_str()).collect();
        let rows: Vec<CheckInVisibilityRow> = self
            .select(&format!(
                "check_in_visibility?select=check_in_id,group_id&check_in_id=in.({})",
                ids.join(",")
            ))
            .await?;
        let mut map = check_in_visibility_map(rows);
        for check_in in check_ins {
            if let Some(groups) = map.remove(&check_in.id) {
                check_in.visible_to_groups = groups;
            }
        }
        Ok(())
    }

    /// Replace a goal's visibility rows with the given set
    async fn write_goal_visibility(&self, goal_id: &str, group_ids: &[String]) -> Result<()> {
        self.delete_where(&format!("goal_visibility?goal_id=eq.{}", goal_id))
            .await?;
        if group_ids.is_empty() {
            return Ok(());
        }
        let rows: Vec<JsonValue> = group_ids
            .iter()
            .map(|g| json!({ "goal_id": goal_id, "group_id": g }))
            .collect();
        self.insert_void("goal_visibility", JsonValue::Array(rows)).await
    }

    fn goal_insert_body(user_id: &str, draft: &GoalDraft) -> JsonValue {
        json!({
            "user_id": user_id,
            "title": draft.title,
            "description": draft.description,
            "frequency": draft.frequency,
            "custom_days": draft.custom_days,
            "checklist": draft.checklist,
            "start_date": draft.start_date,
            "end_date": draft.end_date,
        })
    }

    /// Snake-case column map with only the fields actually set
    fn goal_update_body(updates: &GoalUpdate) -> JsonValue {
        let mut body = serde_json::Map::new();
        if let Some(v) = &updates.title {
            body.insert("title".into(), json!(v));
        }
        if let Some(v) = &updates.description {
            body.insert("description".into(), json!(v));
        }
        if let Some(v) = updates.frequency {
            body.insert("frequency".into(), json!(v));
        }
        if let Some(v) = &updates.custom_days {
            body.insert("custom_days".into(), json!(v));
        }
        if let Some(v) = &updates.checklist {
            body.insert("checklist".into(), json!(v));
        }
        if let Some(v) = updates.start_date {
            body.insert("start_date".into(), json!(v));
        }
        if let Some(v) = updates.end_date {
            body.insert("end_date".into(), json!(v));
        }
        JsonValue::Object(body)
    }
}

const GOAL_SELECT: &str = "select=*,goal_completions(date,reflection),goal_visibility(group_id)";
const CHECK_IN_SELECT: &str = "select=*,check_in_visibility(group_id)";
const GROUP_JOIN_SELECT: &str =
    "select=group_id,user_id,groups(id,name,invite_code,created_by,created_at)";

#[async_trait]
impl Persistence for BaasPersistence {
    fn name(&self) -> &str {
        "baas"
    }

    async fn restore_session(&self) -> Result<Option<User>> {
        let Some(session) = self.sessions.restore().await? else {
            return Ok(None);
        };
        self.set_session(Some(session.clone()))?;
        Ok(Some(self.resolve_profile(&session).await?))
    }

    async fn login(&self, email: &str, password: &str) -> Result<User> {
        let session = self.sessions.sign_in(email, password).await?;
        self.set_session(Some(session.clone()))?;
        self.resolve_profile(&session).await
    }

    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let session = self.sessions.sign_up(email, password, name).await?;
        self.set_session(Some(session.clone()))?;

        let user = session.to_user(Some(name));
        // The profile row renders the user to group members; its
        // absence is tolerable and repaired on the next session restore.
        if let Err(e) = self
            .insert_void(
                "profiles",
                json!([{ "id": user.id, "email": user.email, "name": user.name }]),
            )
            .await
        {
            log::warn!("failed to create profile at signup: {}", e);
        }
        Ok(user)
    }

    async fn logout(&self) -> Result<()> {
        self.sessions.sign_out().await?;
        self.set_session(None)
    }

    async fn fetch_goals(&self) -> Result<Vec<Goal>> {
        let session = self.session()?;
        let rows: Vec<GoalRow> = self
            .select(&format!(
                "goals?{}&user_id=eq.{}&order=created_at.desc",
                GOAL_SELECT, session.user_id
            ))
            .await?;
        let mut goals: Vec<Goal> = rows.into_iter().map(GoalRow::into_goal).collect();

        // Shared goals enrich the view; their failure never hides the
        // user's own data.
        match self.fetch_shared_goals(&session).await {
            Ok(shared) => {
                let appended = merge_shared_goals(&mut goals, shared);
                if !appended.is_empty() {
                    let ids: Vec<&str> = appended.iter().map(String::as_str).collect();
                    match self
                        .select::<GoalCompletionRow>(&format!(
                            "goal_completions?select=goal_id,date,reflection&goal_id=in.({})",
                            ids.join(",")
                        ))
                        .await
                    {
                        Ok(rows) => attach_completions(&mut goals, rows),
                        Err(e) => log::warn!("failed to back-fill shared completions: {}", e),
                    }
                }
            }
            Err(e) => log::warn!("failed to fetch shared goals: {}", e),
        }

        Ok(goals)
    }

    async fn create_goal(&self, owner: &User, draft: &GoalDraft) -> Result<Goal> {
        let row: GoalRow = self
            .insert("goals", json!([Self::goal_insert_body(&owner.id, draft)]))
            .await?;
        let mut goal = row.into_goal();

        // Visibility rows land in a second round trip. A failure here
        // leaves the goal private rather than failing the creation.
        if !draft.visible_to_groups.is_empty() {
            let rows: Vec<JsonValue> = draft
                .visible_to_groups
                .iter()
                .map(|g| json!({ "goal_id": goal.id, "group_id": g }))
                .collect();
            match self.insert_void("goal_visibility", JsonValue::Array(rows)).await {
                Ok(()) => goal.visible_to_groups = draft.visible_to_groups.clone(),
                Err(e) => log::warn!("failed to write goal visibility: {}", e),
            }
        }
        Ok(goal)
    }

    async fn update_goal(&self, id: &str, updates: &GoalUpdate) -> Result<Goal> {
        let body = Self::goal_update_body(updates);
        let row: GoalRow = if body.as_object().is_some_and(|m| !m.is_empty()) {
            self.patch(&format!("goals?id=eq.{}&{}", id, GOAL_SELECT), body)
                .await?
        } else {
            let mut rows: Vec<GoalRow> = self
                .select(&format!("goals?{}&id=eq.{}", GOAL_SELECT, id))
                .await?;
            if rows.is_empty() {
                return Err(Error::not_found("Goal not found"));
            }
            rows.remove(0)
        };
        let mut goal = row.into_goal();

        if let Some(groups) = &updates.visible_to_groups {
            self.write_goal_visibility(id, groups).await?;
            goal.visible_to_groups = groups.clone();
        }
        Ok(goal)
    }

    async fn delete_goal(&self, id: &str) -> Result<()> {
        self.delete_where(&format!("goal_completions?goal_id=eq.{}", id))
            .await?;
        self.delete_where(&format!("goal_visibility?goal_id=eq.{}", id))
            .await?;
        self.delete_where(&format!("goals?id=eq.{}", id)).await
    }

    async fn toggle_completion(
        &self,
        goal_id: &str,
        date: NaiveDate,
        reflection: Option<&str>,
    ) -> Result<CompletionToggle> {
        let existing: Vec<GoalCompletionRow> = self
            .select(&format!(
                "goal_completions?select=goal_id,date,reflection&goal_id=eq.{}&date=eq.{}",
                goal_id, date
            ))
            .await?;

        if existing.is_empty() {
            self.insert_void(
                "goal_completions",
                json!([{ "goal_id": goal_id, "date": date, "reflection": reflection }]),
            )
            .await?;
            Ok(CompletionToggle {
                completed: true,
                date,
                reflection: reflection.map(str::to_string),
            })
        } else {
            self.delete_where(&format!(
                "goal_completions?goal_id=eq.{}&date=eq.{}",
                goal_id, date
            ))
            .await?;
            Ok(CompletionToggle {
                completed: false,
                date,
                reflection: None,
            })
        }
    }

    async fn fetch_check_ins(&self) -> Result<Vec<CheckIn>> {
        let session = self.session()?;
        let rows: Vec<CheckInRow> = self
            .select(&format!(
                "check_ins?{}&user_id=eq.{}&order=date.desc",
                CHECK_IN_SELECT, session.user_id
            ))
            .await?;
        let mut check_ins: Vec<CheckIn> =
            rows.into_iter().map(CheckInRow::into_check_in).collect();

        match self.fetch_shared_check_ins(&session).await {
            Ok(shared) => merge_shared_check_ins(&mut check_ins, shared),
            Err(e) => log::warn!("failed to fetch shared check-ins: {}", e),
        }

        Ok(check_ins)
    }

    async fn create_check_in(&self, owner: &User, draft: &CheckInDraft) -> Result<CheckIn> {
        let row: CheckInRow = self
            .insert(
                "check_ins",
                json!([{
                    "user_id": owner.id,
                    "date": draft.date,
                    "mood": draft.mood,
                    "reflection": draft.reflection,
                }]),
            )
            .await?;
        let mut check_in = row.into_check_in();

        if !draft.visible_to_groups.is_empty() {
            let rows: Vec<JsonValue> = draft
                .visible_to_groups
                .iter()
                .map(|g| json!({ "check_in_id": check_in.id, "group_id": g }))
                .collect();
            match self
                .insert_void("check_in_visibility", JsonValue::Array(rows))
                .await
            {
                Ok(()) => check_in.visible_to_groups = draft.visible_to_groups.clone(),
                Err(e) => log::warn!("failed to write check-in visibility: {}", e),
            }
        }
        Ok(check_in)
    }

    async fn fetch_groups(&self) -> Result<GroupsSnapshot> {
        let session = self.session()?;

        #[derive(serde::Deserialize)]
        struct MembershipRow {
            group_id: String,
        }
        let own: Vec<MembershipRow> = self
            .select(&format!(
                "group_members?select=group_id&user_id=eq.{}",
                session.user_id
            ))
            .await?;
        let mut group_ids: Vec<String> = own.into_iter().map(|m| m.group_id).collect();
        group_ids.sort();
        group_ids.dedup();
        if group_ids.is_empty() {
            return Ok(GroupsSnapshot::default());
        }

        let rows: Vec<GroupMemberRow> = self
            .select(&format!(
                "group_members?{}&group_id=in.({})",
                GROUP_JOIN_SELECT,
                group_ids.join(",")
            ))
            .await?;
        let groups = fold_group_members(rows);

        let mut member_ids: Vec<String> =
            groups.iter().flat_map(|g| g.members.clone()).collect();
        member_ids.sort();
        member_ids.dedup();
        let members = self.fetch_users(&member_ids).await?;

        Ok(GroupsSnapshot { groups, members })
    }

    async fn create_group(&self, creator: &User, name: &str) -> Result<Group> {
        if name.trim().is_empty() {
            return Err(Error::validation("group name cannot be empty"));
        }

        // Codes are unique-constrained; regenerate on collision
        let mut last_err = None;
        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = Group::generate_invite_code();
            match self
                .insert::<GroupRow>(
                    "groups",
                    json!([{
                        "name": name.trim(),
                        "invite_code": code,
                        "created_by": creator.id,
                    }]),
                )
                .await
            {
                Ok(row) => {
                    self.insert_void(
                        "group_members",
                        json!([{ "group_id": row.id, "user_id": creator.id }]),
                    )
                    .await?;
                    return Ok(row.into_group(vec![creator.id.clone()]));
                }
                Err(e) if Self::is_unique_violation(&e) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::storage("could not allocate an invite code")))
    }

    async fn join_group(&self, user: &User, invite_code: &str) -> Result<Option<Group>> {
        let code = Group::normalize_invite_code(invite_code);
        let rows: Vec<GroupRow> = self
            .select(&format!(
                "groups?select=id,name,invite_code,created_by,created_at&invite_code=eq.{}&limit=1",
                code
            ))
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        match self
            .insert_void(
                "group_members",
                json!([{ "group_id": row.id, "user_id": user.id }]),
            )
            .await
        {
            Ok(()) => {}
            // Already a member: joining is idempotent
            Err(e) if Self::is_unique_violation(&e) => {}
            Err(e) => return Err(e),
        }

        #[derive(serde::Deserialize)]
        struct MembershipRow {
            user_id: String,
        }
        let members: Vec<MembershipRow> = self
            .select(&format!(
                "group_members?select=user_id&group_id=eq.{}",
                row.id
            ))
            .await?;
        let mut member_ids: Vec<String> = members.into_iter().map(|m| m.user_id).collect();
        if !member_ids.contains(&user.id) {
            member_ids.push(user.id.clone());
        }

        Ok(Some(row.into_group(member_ids)))
    }

    async fn leave_group(&self, user: &User, group_id: &str) -> Result<()> {
        self.delete_where(&format!(
            "group_members?group_id=eq.{}&user_id=eq.{}",
            group_id, user.id
        ))
        .await
    }

    async fn delete_group(&self, user: &User, group_id: &str) -> Result<()> {
        // Row-level security restricts the final delete to the creator;
        // the created_by filter keeps the client honest regardless.
        self.delete_where(&format!("goal_visibility?group_id=eq.{}", group_id))
            .await?;
        self.delete_where(&format!("check_in_visibility?group_id=eq.{}", group_id))
            .await?;
        self.delete_where(&format!("group_members?group_id=eq.{}", group_id))
            .await?;
        self.delete_where(&format!(
            "groups?id=eq.{}&created_by=eq.{}",
            group_id, user.id
        ))
        .await
    }

    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ProfileRow> = self
            .select(&format!(
                "profiles?select=id,email,name,avatar&id=in.({})",
                ids.join(",")
            ))
            .await?;
        Ok(rows.into_iter().map(ProfileRow::into_user).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_update_body_contains_only_set_columns() {
        let body = BaasPersistence::goal_update_body(&GoalUpdate {
            title: Some("Run".to_string()),
            end_date: Some(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            visible_to_groups: Some(vec!["grp1".to_string()]),
            ..Default::default()
        });
        let map = body.as_object().unwrap();
        // visibility is a join table, never a goals column
        assert_eq!(map.len(), 2);
        assert_eq!(map["title"], "Run");
        assert_eq!(map["end_date"], "2025-06-01");
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(BaasPersistence::is_unique_violation(&Error::storage(
            "duplicate key value violates unique constraint (23505)"
        )));
        assert!(!BaasPersistence::is_unique_violation(&Error::auth("nope")));
    }
}
