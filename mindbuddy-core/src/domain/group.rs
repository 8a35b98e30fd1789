//! Group domain model
//!
//! Groups are joined through a human-shareable invite code. The code is
//! case-normalized to uppercase on both creation and lookup, so
//! "demo99" and "DEMO99" resolve to the same group.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const INVITE_CODE_LEN: usize = 6;

/// Uppercase alphanumerics without the ambiguous 0/O/1/I glyphs
const INVITE_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A named collection of users sharing progress with each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    /// Member user ids; the creator is always present
    #[serde(default)]
    pub members: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Normalize an invite code for lookup: trimmed, uppercase
    pub fn normalize_invite_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Generate a fresh invite code. Uniqueness is the caller's job
    /// (retry against the stored set or rely on a unique constraint).
    pub fn generate_invite_code() -> String {
        let mut rng = rand::thread_rng();
        (0..INVITE_CODE_LEN)
            .map(|_| INVITE_CODE_CHARS[rng.gen_range(0..INVITE_CODE_CHARS.len())] as char)
            .collect()
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Add a member if not already present
    pub fn add_member(&mut self, user_id: &str) {
        if !self.is_member(user_id) {
            self.members.push(user_id.to_string());
        }
    }

    pub fn remove_member(&mut self, user_id: &str) {
        self.members.retain(|m| m != user_id);
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("group name cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_group() -> Group {
        Group {
            id: "grp1".to_string(),
            name: "Wellness Warriors".to_string(),
            invite_code: "DEMO99".to_string(),
            members: vec!["u1".to_string()],
            created_by: "u1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_invite_code_normalization() {
        assert_eq!(Group::normalize_invite_code("demo99"), "DEMO99");
        assert_eq!(Group::normalize_invite_code("  abC123 "), "ABC123");
    }

    #[test]
    fn test_generated_codes_are_uppercase_fixed_length() {
        for _ in 0..100 {
            let code = Group::generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert_eq!(code, code.to_uppercase());
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_add_member_deduplicates() {
        let mut group = test_group();
        group.add_member("u2");
        group.add_member("u2");
        assert_eq!(group.members, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[test]
    fn test_remove_member_leaves_group_intact() {
        let mut group = test_group();
        group.add_member("u2");
        group.remove_member("u1");
        assert_eq!(group.members, vec!["u2".to_string()]);
        assert_eq!(group.created_by, "u1");
    }
}
