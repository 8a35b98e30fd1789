//! Session provider port - externally-managed auth for the hosted backend

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;
use crate::domain::User;

/// An authenticated session issued by the hosted backend's auth service
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    /// Bearer token attached to row-level-security queries
    pub access_token: String,
    /// Free-form user metadata recorded at signup (e.g. display name)
    pub metadata: JsonValue,
}

impl Session {
    /// Display name from signup metadata, if present
    pub fn display_name(&self) -> Option<String> {
        self.metadata
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// Synthesize a user from session data alone, for when no profile
    /// row exists yet
    pub fn to_user(&self, fallback_name: Option<&str>) -> User {
        User {
            id: self.user_id.clone(),
            email: self.email.clone().unwrap_or_default(),
            name: self
                .display_name()
                .or_else(|| fallback_name.map(str::to_string))
                .unwrap_or_else(|| "User".to_string()),
            avatar: None,
        }
    }
}

/// Auth/session lifecycle owned by the hosted backend
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Restore a persisted session, if one exists
    async fn restore(&self) -> Result<Option<Session>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(metadata: JsonValue) -> Session {
        Session {
            user_id: "au1".to_string(),
            email: Some("alex@example.com".to_string()),
            access_token: "tok".to_string(),
            metadata,
        }
    }

    #[test]
    fn test_to_user_prefers_metadata_name() {
        let user = session(serde_json::json!({ "name": "Alex" })).to_user(Some("Fallback"));
        assert_eq!(user.name, "Alex");
        assert_eq!(user.email, "alex@example.com");
    }

    #[test]
    fn test_to_user_falls_back() {
        let user = session(JsonValue::Null).to_user(Some("Sam"));
        assert_eq!(user.name, "Sam");
        let anon = session(JsonValue::Null).to_user(None);
        assert_eq!(anon.name, "User");
    }
}
