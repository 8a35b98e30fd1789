//! User identity model

use serde::{Deserialize, Serialize};

/// A registered user.
///
/// Ids are opaque strings assigned by the active backend and stable for
/// its lifetime. Only name and avatar ever change after signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            avatar: None,
        }
    }

    /// Normalize an email for lookup and storage
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization() {
        assert_eq!(User::normalize_email(" Alex@Example.COM "), "alex@example.com");
    }

    #[test]
    fn test_camel_case_wire_shape() {
        let user = User::new("u1", "alex@example.com", "Alex");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "u1");
        assert_eq!(json["email"], "alex@example.com");
        assert!(json.get("avatar").is_none());
    }
}
