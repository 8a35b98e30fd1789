//! Goal domain model
//!
//! A goal is a tracked habit owned by exactly one user. Completions are
//! keyed by calendar date: a date appears at most once, and toggling a
//! date that is already completed removes the completion instead of
//! duplicating it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How often a goal is meant to be completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Custom,
}

impl Default for Frequency {
    fn default() -> Self {
        Self::Daily
    }
}

/// A single day's completion of a goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}

/// A tracked habit owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Never null in the canonical model; empty string when unset
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Frequency,
    /// Weekday indices, only meaningful when frequency is custom
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_days: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub completions: Vec<Completion>,
    /// Group ids this goal is shared into, independent of membership
    #[serde(default)]
    pub visible_to_groups: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Whether a completion exists for the given calendar date
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completions.iter().any(|c| c.date == date)
    }

    /// Toggle the completion for a calendar date.
    ///
    /// Returns `true` when the date is now completed, `false` when an
    /// existing completion was removed. A date never appears twice.
    pub fn toggle_completion(&mut self, date: NaiveDate, reflection: Option<String>) -> bool {
        if let Some(pos) = self.completions.iter().position(|c| c.date == date) {
            self.completions.remove(pos);
            false
        } else {
            self.completions.push(Completion { date, reflection });
            true
        }
    }

    /// Apply a partial update; `None` fields are left untouched
    pub fn apply(&mut self, updates: &GoalUpdate) {
        if let Some(title) = &updates.title {
            self.title = title.clone();
        }
        if let Some(description) = &updates.description {
            self.description = description.clone();
        }
        if let Some(frequency) = updates.frequency {
            self.frequency = frequency;
        }
        if let Some(custom_days) = &updates.custom_days {
            self.custom_days = Some(custom_days.clone());
        }
        if let Some(checklist) = &updates.checklist {
            self.checklist = Some(checklist.clone());
        }
        if let Some(start_date) = updates.start_date {
            self.start_date = Some(start_date);
        }
        if let Some(end_date) = updates.end_date {
            self.end_date = Some(end_date);
        }
        if let Some(groups) = &updates.visible_to_groups {
            self.visible_to_groups = groups.clone();
        }
    }

    /// Validate goal data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("goal title cannot be empty");
        }
        Ok(())
    }
}

/// Caller-supplied fields for a new goal; id, owner, completions and
/// creation time are assigned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_days: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub visible_to_groups: Vec<String>,
}

impl GoalDraft {
    pub fn new(title: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            frequency,
            custom_days: None,
            checklist: None,
            start_date: None,
            end_date: None,
            visible_to_groups: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("goal title cannot be empty");
        }
        Ok(())
    }
}

/// Partial goal update. `visible_to_groups: Some(vec![])` clears the
/// visibility set; `None` leaves it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_days: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_to_groups: Option<Vec<String>>,
}
