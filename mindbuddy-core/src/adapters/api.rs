//! REST API adapter
//!
//! Talks to the MindBuddy API server: JSON in/out against a single base
//! URL, with the bearer token from durable local storage attached to
//! every request once held. The server emits canonical camelCase
//! bodies, so responses deserialize straight into the domain types.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::{CheckIn, CheckInDraft, Goal, GoalDraft, GoalUpdate, Group, User};
use crate::ports::{CompletionToggle, GroupsSnapshot, Persistence, TokenStore};

/// Fixed per-request timeout; an expired timer aborts the call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// File-backed token store
// =============================================================================

/// Bearer token persisted as a single file in the data directory
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("token"),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn set(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct AuthResponse {
    user: User,
    token: String,
}

// =============================================================================
// API client
// =============================================================================

pub struct ApiPersistence {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiPersistence {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::validation("API base URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Map request-level failures to the distinguished transport errors
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
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json");
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(Self::map_request_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Error bodies are { "error": "..." }; an unparseable body is
        // tolerated and a generic message synthesized from the status.
        let message = response
            .json::<JsonValue>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(JsonValue::as_str).map(str::to_string))
            .unwrap_or_else(|| format!("Request failed: {}", status.as_u16()));

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::BAD_REQUEST => Error::Validation(message),
            _ => Error::Other(message),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None).await?;
        response
            .json()
            .await
            .map_err(|e| Error::other(format!("Invalid response body: {}", e)))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: JsonValue) -> Result<T> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        response
            .json()
            .await
            .map_err(|e| Error::other(format!("Invalid response body: {}", e)))
    }

    async fn patch_json<T: DeserializeOwned>(&self, path: &str, body: JsonValue) -> Result<T> {
        let response = self.send(Method::PATCH, path, Some(body)).await?;
        response
            .json()
            .await
            .map_err(|e| Error::other(format!("Invalid response body: {}", e)))
    }

    /// POST where the server answers 204 or a body we ignore
    async fn post_no_content(&self, path: &str) -> Result<()> {
        self.send(Method::POST, path, None).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }
}

#[async_trait]
impl Persistence for ApiPersistence {
    fn name(&self) -> &str {
        "api"
    }

    async fn restore_session(&self) -> Result<Option<User>> {
        if self.tokens.get().is_none() {
            return Ok(None);
        }
        match self.get_json::<User>("/api/auth/me").await {
            Ok(user) => Ok(Some(user)),
            // Stale or revoked token: drop it and continue signed out
            Err(Error::Auth(_)) | Err(Error::NotFound(_)) => {
                self.tokens.clear()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<User> {
        let auth: AuthResponse = self
            .post_json(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        self.tokens.set(&auth.token)?;
        Ok(auth.user)
    }

    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let auth: AuthResponse = self
            .post_json(
                "/api/auth/signup",
                serde_json::json!({ "email": email, "password": password, "name": name }),
            )
            .await?;
        self.tokens.set(&auth.token)?;
        Ok(auth.user)
    }

    async fn logout(&self) -> Result<()> {
        self.tokens.clear()
    }

    async fn fetch_goals(&self) -> Result<Vec<Goal>> {
        self.get_json("/api/goals").await
    }

    async fn create_goal(&self, _owner: &User, draft: &GoalDraft) -> Result<Goal> {
        self.post_json("/api/goals", serde_json::to_value(draft)?).await
    }

    async fn update_goal(&self, id: &str, updates: &GoalUpdate) -> Result<Goal> {
        self.patch_json(&format!("/api/goals/{}", id), serde_json::to_value(updates)?)
            .await
    }

    async fn delete_goal(&self, id: &str) -> Result<()> {
        self.delete(&format!("/api/goals/{}", id)).await
    }

    async fn toggle_completion(
        &self,
        goal_id: &str,
        date: NaiveDate,
        reflection: Option<&str>,
    ) -> Result<CompletionToggle> {
        self.post_json(
            &format!("/api/goals/{}/complete", goal_id),
            serde_json::json!({ "date": date, "reflection": reflection }),
        )
        .await
    }

    async fn fetch_check_ins(&self) -> Result<Vec<CheckIn>> {
        self.get_json("/api/check-ins").await
    }

    async fn create_check_in(&self, _owner: &User, draft: &CheckInDraft) -> Result<CheckIn> {
        self.post_json("/api/check-ins", serde_json::to_value(draft)?).await
    }

    async fn fetch_groups(&self) -> Result<GroupsSnapshot> {
        let groups: Vec<Group> = self.get_json("/api/groups").await?;

        let mut ids: Vec<String> = groups.iter().flat_map(|g| g.members.clone()).collect();
        ids.sort();
        ids.dedup();
        let members = if ids.is_empty() {
            Vec::new()
        } else {
            self.fetch_users(&ids).await?
        };

        Ok(GroupsSnapshot { groups, members })
    }

    async fn create_group(&self, _creator: &User, name: &str) -> Result<Group> {
        self.post_json("/api/groups", serde_json::json!({ "name": name }))
            .await
    }

    async fn join_group(&self, _user: &User, invite_code: &str) -> Result<Option<Group>> {
        let result: Result<Group> = self
            .post_json(
                "/api/groups/join",
                serde_json::json!({ "inviteCode": invite_code }),
            )
            .await;
        match result {
            Ok(group) => Ok(Some(group)),
            // Unknown code is the expected not-found path
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn leave_group(&self, _user: &User, group_id: &str) -> Result<()> {
        self.post_no_content(&format!("/api/groups/{}/leave", group_id))
            .await
    }

    async fn delete_group(&self, _user: &User, group_id: &str) -> Result<()> {
        self.delete(&format!("/api/groups/{}", group_id)).await
    }

    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_json(&format!("/api/users?ids={}", ids.join(",")))
            .await
    }
}
