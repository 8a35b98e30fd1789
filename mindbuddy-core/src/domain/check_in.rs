//! Daily mood check-in model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MOOD_MIN: i32 = 1;
pub const MOOD_MAX: i32 = 5;

/// A daily mood/reflection entry owned by one user.
///
/// The UI records at most one per day by convention, but the model does
/// not enforce uniqueness; multiple entries per day are representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    /// 1 (low) to 5 (high)
    pub mood: i32,
    /// Free text, may be empty, never null
    #[serde(default)]
    pub reflection: String,
    #[serde(default)]
    pub visible_to_groups: Vec<String>,
}

impl CheckIn {
    /// Clamp an arbitrary mood value into the valid range
    pub fn clamp_mood(mood: i64) -> i32 {
        mood.clamp(MOOD_MIN as i64, MOOD_MAX as i64) as i32
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !(MOOD_MIN..=MOOD_MAX).contains(&self.mood) {
            return Err("mood must be between 1 and 5");
        }
        Ok(())
    }
}

/// Caller-supplied fields for a new check-in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInDraft {
    pub date: NaiveDate,
    pub mood: i32,
    #[serde(default)]
    pub reflection: String,
    #[serde(default)]
    pub visible_to_groups: Vec<String>,
}

impl CheckInDraft {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(MOOD_MIN..=MOOD_MAX).contains(&self.mood) {
            return Err("mood must be between 1 and 5");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_clamping() {
        assert_eq!(CheckIn::clamp_mood(0), 1);
        assert_eq!(CheckIn::clamp_mood(3), 3);
        assert_eq!(CheckIn::clamp_mood(99), 5);
    }

    #[test]
    fn test_validation_rejects_out_of_range_mood() {
        let draft = CheckInDraft {
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            mood: 6,
            reflection: String::new(),
            visible_to_groups: Vec::new(),
        };
        assert!(draft.validate().is_err());
    }
}
