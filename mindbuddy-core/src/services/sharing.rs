//! Visibility/sharing resolver
//!
//! Pure projections over the current snapshot: which of a member's
//! goals and check-ins are visible inside a given group. Nothing here
//! mutates the collections; membership makes a group "mine", the
//! visibility set makes a record show up inside it.

use chrono::NaiveDate;

use crate::domain::{CheckIn, Goal};

/// Most recent check-ins shown per member in a group view
pub const GROUP_CHECK_IN_LIMIT: usize = 3;

/// A member's goals shared into the given group
pub fn member_goals<'a>(goals: &'a [Goal], user_id: &str, group_id: &str) -> Vec<&'a Goal> {
    goals
        .iter()
        .filter(|g| g.user_id == user_id && g.visible_to_groups.iter().any(|id| id == group_id))
        .collect()
}

/// A member's check-ins shared into the given group, newest first,
/// capped to [`GROUP_CHECK_IN_LIMIT`]
pub fn member_check_ins<'a>(
    check_ins: &'a [CheckIn],
    user_id: &str,
    group_id: &str,
) -> Vec<&'a CheckIn> {
    let mut visible: Vec<&CheckIn> = check_ins
        .iter()
        .filter(|c| c.user_id == user_id && c.visible_to_groups.iter().any(|id| id == group_id))
        .collect();
    visible.sort_by(|a, b| b.date.cmp(&a.date));
    visible.truncate(GROUP_CHECK_IN_LIMIT);
    visible
}

/// Consecutive completed days ending today. A goal not completed today
/// has a streak of zero.
pub fn current_streak(goal: &Goal, today: NaiveDate) -> u32 {
    let mut dates: Vec<NaiveDate> = goal.completions.iter().map(|c| c.date).collect();
    dates.sort_by(|a, b| b.cmp(a));
    dates.dedup();

    let mut streak = 0u32;
    for date in dates {
        let expected = today - chrono::Duration::days(streak as i64);
        if date == expected {
            streak += 1;
        } else if date < expected {
            break;
        }
    }
    streak
}
