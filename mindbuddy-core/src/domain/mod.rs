//! Core domain entities
//!
//! The canonical, backend-agnostic model. These are pure data structures
//! with validation logic - no I/O or external dependencies. Optional
//! fields that are semantically "empty" default instead of being absent
//! (a goal description is `""`, never null).

mod check_in;
mod goal;
mod group;
mod user;
pub mod result;

pub use check_in::{CheckIn, CheckInDraft, MOOD_MAX, MOOD_MIN};
pub use goal::{Completion, Frequency, Goal, GoalDraft, GoalUpdate};
pub use group::{Group, INVITE_CODE_LEN};
pub use user::User;
