//! Row normalizers - map backend row shapes onto the canonical model
//!
//! Pure functions shared by the network adapters. Nullable columns map
//! to defaults (description null -> ""), nested join arrays project to
//! the flat canonical shapes, and the heterogeneous `group_ids`
//! encoding of the shared-data remote procedures parses without ever
//! surfacing an error. Only missing identity fields (id, owning user
//! id) are fatal, and those fail at deserialization.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::domain::{CheckIn, Completion, Frequency, Goal, Group};

// =============================================================================
// Goal rows
// =============================================================================

/// Goal row with its nested completion and visibility joins
#[derive(Debug, Clone, Deserialize)]
pub struct GoalRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub custom_days: Option<Vec<u32>>,
    #[serde(default)]
    pub checklist: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub goal_completions: Vec<CompletionRow>,
    #[serde(default)]
    pub goal_visibility: Option<Vec<VisibilityRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRow {
    pub date: NaiveDate,
    #[serde(default)]
    pub reflection: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityRow {
    pub group_id: String,
}

impl GoalRow {
    pub fn into_goal(self) -> Goal {
        Goal {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            frequency: self.frequency,
            custom_days: self.custom_days,
            checklist: self.checklist,
            start_date: self.start_date,
            end_date: self.end_date,
            completions: self
                .goal_completions
                .into_iter()
                .map(|c| Completion {
                    date: c.date,
                    reflection: c.reflection,
                })
                .collect(),
            visible_to_groups: self
                .goal_visibility
                .unwrap_or_default()
                .into_iter()
                .map(|v| v.group_id)
                .collect(),
            created_at: self.created_at,
        }
    }
}

/// Shared-goal row from the remote procedures. The richer procedure
/// inlines `group_ids`; the legacy one omits it, leaving visibility to
/// a join-table lookup. Completions are always back-filled separately.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedGoalRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub custom_days: Option<Vec<u32>>,
    #[serde(default)]
    pub checklist: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// UUID[] may arrive as a native array or as a string
    #[serde(default)]
    pub group_ids: JsonValue,
}

impl SharedGoalRow {
    pub fn into_goal(self) -> Goal {
        Goal {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            frequency: self.frequency,
            custom_days: self.custom_days,
            checklist: self.checklist,
            start_date: self.start_date,
            end_date: self.end_date,
            completions: Vec::new(),
            visible_to_groups: normalize_group_ids(&self.group_ids),
            created_at: self.created_at,
        }
    }
}

/// Flat completion row keyed by goal id, used to back-fill completions
/// of shared goals fetched in one batched query
#[derive(Debug, Clone, Deserialize)]
pub struct GoalCompletionRow {
    pub goal_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub reflection: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoalVisibilityRow {
    pub goal_id: String,
    pub group_id: String,
}

// =============================================================================
// Check-in rows
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInRow {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub mood: i32,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default)]
    pub check_in_visibility: Vec<VisibilityRow>,
}

impl CheckInRow {
    pub fn into_check_in(self) -> CheckIn {
        CheckIn {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            mood: self.mood,
            reflection: self.reflection.unwrap_or_default(),
            visible_to_groups: self
                .check_in_visibility
                .into_iter()
                .map(|v| v.group_id)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharedCheckInRow {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub mood: i32,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default)]
    pub group_ids: JsonValue,
}

impl SharedCheckInRow {
    pub fn into_check_in(self) -> CheckIn {
        CheckIn {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            mood: self.mood,
            reflection: self.reflection.unwrap_or_default(),
            visible_to_groups: normalize_group_ids(&self.group_ids),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInVisibilityRow {
    pub check_in_id: String,
    pub group_id: String,
}

// =============================================================================
// Group and profile rows
// =============================================================================

/// Membership row with its embedded group join
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMemberRow {
    pub group_id: String,
    pub user_id: String,
    #[serde(default)]
    pub groups: Option<GroupRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub created_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl GroupRow {
    pub fn into_group(self, members: Vec<String>) -> Group {
        Group {
            id: self.id,
            name: self.name,
            invite_code: self.invite_code,
            members,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Fold denormalized membership rows into groups, preserving row order
/// and collecting each group's member ids. Rows whose group join is
/// missing are skipped.
pub fn fold_group_members(rows: Vec<GroupMemberRow>) -> Vec<Group> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, Group> = HashMap::new();

    for row in rows {
        let Some(group_row) = row.groups else {
            continue;
        };
        let group = by_id.entry(group_row.id.clone()).or_insert_with(|| {
            order.push(group_row.id.clone());
            group_row.into_group(Vec::new())
        });
        if !group.members.contains(&row.user_id) {
            group.members.push(row.user_id);
        }
    }

    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

/// Profile row from the hosted backend's profiles table
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ProfileRow {
    pub fn into_user(self) -> crate::domain::User {
        crate::domain::User {
            id: self.id,
            email: self.email.unwrap_or_default(),
            name: self.name.unwrap_or_else(|| "User".to_string()),
            avatar: self.avatar,
        }
    }
}

// =============================================================================
// Group-id normalization and shared-record merging
// =============================================================================

/// Normalize a `group_ids` remote-procedure field.
///
/// The value may arrive as a native array, a JSON-encoded string, or a
/// comma-joined string with individually quoted items. Unparseable
/// input normalizes to empty, never an error.
pub fn normalize_group_ids(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::Array(items) => items.iter().filter_map(element_to_id).collect(),
        JsonValue::String(s) => normalize_group_ids_str(s),
        _ => Vec::new(),
    }
}

fn element_to_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::String(_) | JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

fn normalize_group_ids_str(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    if raw.starts_with('[') {
        return match serde_json::from_str::<Vec<JsonValue>>(raw) {
            Ok(items) => items.iter().filter_map(element_to_id).collect(),
            Err(_) => Vec::new(),
        };
    }
    if raw.contains(',') {
        return raw
            .split(',')
            .map(|part| part.trim().trim_matches('"').to_string())
            .filter(|part| !part.is_empty())
            .collect();
    }
    vec![raw.trim_matches('"').to_string()]
}

/// Append shared goals whose ids are not already present; records
/// already fetched directly keep their original data. Returns the ids
/// actually appended, for the follow-up completion back-fill.
pub fn merge_shared_goals(own: &mut Vec<Goal>, shared: Vec<Goal>) -> Vec<String> {
    let existing: std::collections::HashSet<String> =
        own.iter().map(|g| g.id.clone()).collect();
    let mut appended = Vec::new();
    for goal in shared {
        if existing.contains(&goal.id) {
            continue;
        }
        appended.push(goal.id.clone());
        own.push(goal);
    }
    appended
}

/// Append shared check-ins whose ids are not already present
pub fn merge_shared_check_ins(own: &mut Vec<CheckIn>, shared: Vec<CheckIn>) {
    let existing: std::collections::HashSet<String> =
        own.iter().map(|c| c.id.clone()).collect();
    for check_in in shared {
        if !existing.contains(&check_in.id) {
            own.push(check_in);
        }
    }
}

/// Back-fill completions of freshly appended shared goals from a
/// batched flat fetch
pub fn attach_completions(goals: &mut [Goal], rows: Vec<GoalCompletionRow>) {
    for row in rows {
        if let Some(goal) = goals.iter_mut().find(|g| g.id == row.goal_id) {
            if !goal.is_completed_on(row.date) {
                goal.completions.push(Completion {
                    date: row.date,
                    reflection: row.reflection,
                });
            }
        }
    }
}

/// Index visibility join rows by goal id
pub fn goal_visibility_map(rows: Vec<GoalVisibilityRow>) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        map.entry(row.goal_id).or_default().push(row.group_id);
    }
    map
}

/// Index visibility join rows by check-in id
pub fn check_in_visibility_map(rows: Vec<CheckInVisibilityRow>) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        map.entry(row.check_in_id).or_default().push(row.group_id);
    }
    map
}
