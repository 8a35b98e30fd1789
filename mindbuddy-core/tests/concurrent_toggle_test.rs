//! Concurrent mutation tests
//!
//! Rapid double-toggles of the same goal completion are the classic
//! race: two in-flight calls for the same date must resolve as
//! toggle-then-toggle, never as two duplicate completions.

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use mindbuddy_core::adapters::LocalPersistence;
use mindbuddy_core::services::AppStore;
use mindbuddy_core::{Frequency, GoalDraft};

async fn signed_in_store(temp_dir: &TempDir) -> Arc<AppStore> {
    let backend = LocalPersistence::new(temp_dir.path()).expect("Failed to create local backend");
    let store = Arc::new(AppStore::new(Arc::new(backend)));
    store.login("alex@example.com", "").await.unwrap();
    store.refresh_all().await;
    store
}

#[tokio::test]
async fn test_rapid_double_toggle_serializes_per_goal() {
    let temp_dir = TempDir::new().unwrap();
    let store = signed_in_store(&temp_dir).await;
    let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();

    let a = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.toggle_completion("demo_goal_1", date, None).await })
    };
    let b = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.toggle_completion("demo_goal_1", date, None).await })
    };

    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();

    // One call added, the other removed, in either order
    assert_ne!(first.completed, second.completed);

    let snapshot = store.snapshot().await;
    let goal = snapshot.goals.iter().find(|g| g.id == "demo_goal_1").unwrap();
    assert!(!goal.is_completed_on(date));

    let mut dates: Vec<_> = goal.completions.iter().map(|c| c.date).collect();
    dates.sort();
    dates.dedup();
    assert_eq!(dates.len(), goal.completions.len(), "duplicate completion date");
}

#[tokio::test]
async fn test_many_concurrent_toggles_keep_dates_unique() {
    let temp_dir = TempDir::new().unwrap();
    let store = signed_in_store(&temp_dir).await;
    let date = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.toggle_completion("demo_goal_1", date, None).await
        }));
    }
    let mut added = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().completed {
            added += 1;
        }
    }
    // An even number of toggles nets to the original (absent) state
    assert_eq!(added, 8);

    let snapshot = store.snapshot().await;
    let goal = snapshot.goals.iter().find(|g| g.id == "demo_goal_1").unwrap();
    assert!(!goal.is_completed_on(date));
}

#[tokio::test]
async fn test_toggles_on_different_goals_do_not_block_each_other() {
    let temp_dir = TempDir::new().unwrap();
    let store = signed_in_store(&temp_dir).await;
    let date = NaiveDate::from_ymd_opt(2025, 8, 3).unwrap();

    let other = store
        .create_goal(GoalDraft::new("Stretch", Frequency::Daily))
        .await
        .unwrap();

    let a = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.toggle_completion("demo_goal_1", date, None).await })
    };
    let b = {
        let store = Arc::clone(&store);
        let id = other.id.clone();
        tokio::spawn(async move { store.toggle_completion(&id, date, None).await })
    };

    assert!(a.await.unwrap().unwrap().completed);
    assert!(b.await.unwrap().unwrap().completed);

    let snapshot = store.snapshot().await;
    assert!(snapshot
        .goals
        .iter()
        .find(|g| g.id == "demo_goal_1")
        .unwrap()
        .is_completed_on(date));
    assert!(snapshot
        .goals
        .iter()
        .find(|g| g.id == other.id)
        .unwrap()
        .is_completed_on(date));
}
