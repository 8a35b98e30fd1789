//! Integration tests for mindbuddy-core services
//!
//! These tests exercise the state store against the real local file
//! backend; every operation round-trips through JSON files on disk.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use mindbuddy_core::adapters::LocalPersistence;
use mindbuddy_core::services::{sharing, AppStore, Readiness};
use mindbuddy_core::{Frequency, GoalDraft, GoalUpdate};

// ============================================================================
// Test Helpers
// ============================================================================

fn create_test_store(temp_dir: &TempDir) -> AppStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = LocalPersistence::new(temp_dir.path()).expect("Failed to create local backend");
    AppStore::new(Arc::new(backend))
}

async fn sign_in(store: &AppStore, email: &str) {
    store.login(email, "").await.expect("Failed to sign in");
}

// ============================================================================
// Bootstrap and demo seeding
// ============================================================================

/// Fresh local bootstrap seeds exactly the demo data; a second
/// bootstrap from the same directory does not reseed.
#[tokio::test]
async fn test_demo_seed_is_exact_and_runs_once() {
    let temp_dir = TempDir::new().unwrap();

    let store = create_test_store(&temp_dir);
    mindbuddy_core::services::bootstrap(&store).await;
    assert_eq!(store.readiness(), Readiness::Ready);

    sign_in(&store, "alex@example.com").await;
    store.refresh_all().await;
    let snapshot = store.snapshot().await;

    assert_eq!(snapshot.users.len(), 3);
    assert_eq!(snapshot.groups.len(), 1);
    let group = &snapshot.groups[0];
    assert_eq!(group.invite_code, "DEMO99");
    assert_eq!(group.members.len(), 3);
    assert_eq!(snapshot.goals.len(), 2);
    assert_eq!(snapshot.check_ins.len(), 2);

    let meditation = snapshot
        .goals
        .iter()
        .find(|g| g.title == "Morning Meditation")
        .unwrap();
    assert_eq!(meditation.completions.len(), 3);

    // Reopen the same directory: nothing is reseeded
    drop(store);
    let store = create_test_store(&temp_dir);
    sign_in(&store, "alex@example.com").await;
    store
        .create_goal(GoalDraft::new("Read", Frequency::Daily))
        .await
        .unwrap();
    drop(store);

    let store = create_test_store(&temp_dir);
    sign_in(&store, "alex@example.com").await;
    store.refresh_all().await;
    assert_eq!(store.snapshot().await.goals.len(), 3);
}

// ============================================================================
// Visibility lifecycle
// ============================================================================

/// A creates a private goal, shares it into G1, B sees it, A unshares,
/// B no longer sees it.
#[tokio::test]
async fn test_goal_visibility_lifecycle_across_members() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    sign_in(&store, "alex@example.com").await;
    let goal = store
        .create_goal(GoalDraft::new("Evening Walk", Frequency::Daily))
        .await
        .unwrap();
    assert!(goal.visible_to_groups.is_empty());

    // Share into the demo group
    store
        .update_goal(
            &goal.id,
            GoalUpdate {
                visible_to_groups: Some(vec!["demo_group_1".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    store.logout().await.unwrap();

    // Sam, a member of the group, now sees it in the group view
    sign_in(&store, "sam@example.com").await;
    store.refresh_all().await;
    let snapshot = store.snapshot().await;
    let visible = sharing::member_goals(&snapshot.goals, "demo_user_1", "demo_group_1");
    assert!(visible.iter().any(|g| g.id == goal.id));
    store.logout().await.unwrap();

    // Alex unshares
    sign_in(&store, "alex@example.com").await;
    store.refresh_all().await;
    store
        .update_goal(
            &goal.id,
            GoalUpdate {
                visible_to_groups: Some(Vec::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    store.logout().await.unwrap();

    sign_in(&store, "sam@example.com").await;
    store.refresh_all().await;
    let snapshot = store.snapshot().await;
    let visible = sharing::member_goals(&snapshot.goals, "demo_user_1", "demo_group_1");
    assert!(!visible.iter().any(|g| g.id == goal.id));
}

// ============================================================================
// Signup and session
// ============================================================================

#[tokio::test]
async fn test_duplicate_signup_leaves_store_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let err = store
        .signup("alex@example.com", "pw", "Imposter")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "User already exists");
    assert!(store.current_user().await.is_none());
}

#[tokio::test]
async fn test_failed_login_leaves_no_current_user() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let err = store.login("ghost@example.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "User not found");
    assert!(store.current_user().await.is_none());
}

// ============================================================================
// Groups
// ============================================================================

#[tokio::test]
async fn test_join_group_is_case_insensitive_and_rejoin_safe() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    store
        .signup("newbie@example.com", "pw", "Newbie")
        .await
        .unwrap();

    assert!(store.join_group("  demo99 ").await.unwrap());
    assert!(store.join_group("DEMO99").await.unwrap());
    assert!(!store.join_group("NOCODE").await.unwrap());

    let snapshot = store.snapshot().await;
    let group = &snapshot.groups[0];
    let me = store.current_user().await.unwrap();
    assert_eq!(group.members.iter().filter(|m| **m == me.id).count(), 1);
    // Member profiles were fetched alongside the join
    assert!(snapshot.users.iter().any(|u| u.id == "demo_user_2"));
}

#[tokio::test]
async fn test_delete_group_authorization_boundary() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    // Sam is a member but not the creator
    sign_in(&store, "sam@example.com").await;
    store.refresh_all().await;
    let err = store.delete_group("demo_group_1").await.unwrap_err();
    assert!(err.to_string().contains("creator"));
    assert_eq!(store.snapshot().await.groups.len(), 1);

    // The creator leaving removes only their own membership
    store.logout().await.unwrap();
    sign_in(&store, "alex@example.com").await;
    store.refresh_all().await;
    store.leave_group("demo_group_1").await.unwrap();
    store.logout().await.unwrap();

    sign_in(&store, "sam@example.com").await;
    store.refresh_all().await;
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.groups.len(), 1);
    assert!(!snapshot.groups[0].members.contains(&"demo_user_1".to_string()));
}

#[tokio::test]
async fn test_create_group_returns_confirmed_group() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    sign_in(&store, "jordan@example.com").await;

    let group = store.create_group("Book Club").await.unwrap();
    assert_eq!(group.invite_code.len(), 6);
    assert_eq!(group.created_by, "demo_user_3");
    assert_eq!(group.members, vec!["demo_user_3".to_string()]);
    assert!(store.snapshot().await.groups.iter().any(|g| g.id == group.id));
}

// ============================================================================
// Completion toggling
// ============================================================================

#[tokio::test]
async fn test_toggle_twice_nets_to_original_state() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    sign_in(&store, "alex@example.com").await;
    store.refresh_all().await;

    let date = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
    let on = store
        .toggle_completion("demo_goal_1", date, Some("fireworks"))
        .await
        .unwrap();
    assert!(on.completed);
    assert_eq!(on.reflection.as_deref(), Some("fireworks"));

    let off = store
        .toggle_completion("demo_goal_1", date, Some("again"))
        .await
        .unwrap();
    assert!(!off.completed);

    let snapshot = store.snapshot().await;
    let goal = snapshot.goals.iter().find(|g| g.id == "demo_goal_1").unwrap();
    assert!(!goal.is_completed_on(date));

    let mut dates: Vec<_> = goal.completions.iter().map(|c| c.date).collect();
    dates.sort();
    dates.dedup();
    assert_eq!(dates.len(), goal.completions.len());
}

#[tokio::test]
async fn test_delete_goal_is_owner_only() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    // demo_goal_2 belongs to Sam; Alex sees it through the shared group
    sign_in(&store, "alex@example.com").await;
    store.refresh_all().await;
    let err = store.delete_goal("demo_goal_2").await.unwrap_err();
    assert!(err.to_string().contains("owner"));

    store.delete_goal("demo_goal_1").await.unwrap();
    let snapshot = store.snapshot().await;
    assert!(!snapshot.goals.iter().any(|g| g.id == "demo_goal_1"));
    assert!(snapshot.goals.iter().any(|g| g.id == "demo_goal_2"));
}
