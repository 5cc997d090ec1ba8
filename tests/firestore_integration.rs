// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running with
//! FIRESTORE_EMULATOR_HOST set. They are skipped otherwise.

use serde_json::json;
use travel_planner::middleware::Identity;
use travel_planner::models::{Activity, BudgetRange, Itinerary, ItineraryDay, StoredExpense, UserPreference};
use travel_planner::services::StorageService;

mod common;
use common::test_db;

/// Generate a unique user ID for test isolation.
fn unique_user() -> Identity {
    Identity {
        user_id: format!("user-{}", uuid::Uuid::new_v4()),
    }
}

fn itinerary() -> Itinerary {
    Itinerary {
        id: "local_itinerary_1".to_string(),
        title: "北京旅行计划".to_string(),
        destination: "北京".to_string(),
        start_date: "2025-11-10".to_string(),
        end_date: "2025-11-11".to_string(),
        budget: 5000.0,
        estimated_cost: 4000.0,
        days: vec![
            ItineraryDay {
                day: 1,
                date: "2025-11-10".to_string(),
                activities: vec![Activity {
                    time: "09:00".to_string(),
                    title: "故宫博物院".to_string(),
                    location: "故宫博物院".to_string(),
                    cost: Some(60.0),
                    ..Default::default()
                }],
            },
            ItineraryDay {
                day: 2,
                date: "2025-11-11".to_string(),
                activities: vec![Activity {
                    time: "10:00".to_string(),
                    title: "颐和园".to_string(),
                    location: "颐和园".to_string(),
                    cost: None,
                    ..Default::default()
                }],
            },
        ],
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ITINERARY TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_itinerary_lifecycle() {
    require_emulator!();

    let storage = StorageService::new(test_db().await);
    let user = unique_user();

    let saved = storage.save_itinerary(Some(&user), &itinerary()).await;
    assert!(!saved.is_degraded());
    let id = saved.value;
    assert!(!id.starts_with("local_"));

    let loaded = storage.get_itinerary(Some(&user), &id).await;
    let loaded = loaded.value.expect("itinerary stored");
    assert_eq!(loaded.id, id);
    // Recomputed from the activities, not the submitted value.
    assert_eq!(loaded.estimated_cost, 60.0);
    assert_eq!(loaded.days[1].activities[0].cost, None);

    let list = storage.list_itineraries(Some(&user)).await;
    assert_eq!(list.value.len(), 1);
    assert_eq!(list.value[0].user_id, user.user_id);

    let updated = storage
        .update_itinerary(Some(&user), &id, &json!({"title": "北京两日游"}))
        .await;
    let updated = updated.value.expect("itinerary updated");
    assert_eq!(updated.title, "北京两日游");
    assert_eq!(updated.destination, "北京");

    let deleted = storage.delete_itinerary(Some(&user), &id).await;
    assert!(!deleted.is_degraded());
    assert!(deleted.value);
    assert!(storage.get_itinerary(Some(&user), &id).await.value.is_none());
}

#[tokio::test]
async fn test_resave_keeps_creation_time() {
    require_emulator!();

    let db = test_db().await;
    let storage = StorageService::new(db.clone());
    let user = unique_user();

    let id = storage.save_itinerary(Some(&user), &itinerary()).await.value;
    let first = db.get_itinerary(&id).await.unwrap().unwrap();

    let mut changed = first.to_itinerary();
    changed.title = "改名".to_string();
    let second_id = storage.save_itinerary(Some(&user), &changed).await.value;
    assert_eq!(second_id, id);

    let second = db.get_itinerary(&id).await.unwrap().unwrap();
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.title, "改名");
}

#[tokio::test]
async fn test_update_missing_itinerary() {
    require_emulator!();

    let storage = StorageService::new(test_db().await);
    let user = unique_user();

    let outcome = storage
        .update_itinerary(Some(&user), "does-not-exist", &json!({"title": "x"}))
        .await;
    assert!(outcome.value.is_none());
    assert!(!outcome.is_degraded());
}

#[tokio::test]
async fn test_other_users_itinerary_is_invisible() {
    require_emulator!();

    let db = test_db().await;
    let storage = StorageService::new(db.clone());
    let owner = unique_user();
    let other = unique_user();

    let id = storage.save_itinerary(Some(&owner), &itinerary()).await.value;

    let read = storage.get_itinerary(Some(&other), &id).await;
    assert!(read.value.is_none());
    assert!(!read.is_degraded());

    let patched = storage
        .update_itinerary(Some(&other), &id, &json!({"title": "被改了"}))
        .await;
    assert!(patched.value.is_none());

    let deleted = storage.delete_itinerary(Some(&other), &id).await;
    assert!(!deleted.value);

    // Saving under someone else's ID creates a separate document.
    let mut copy = db.get_itinerary(&id).await.unwrap().unwrap().to_itinerary();
    copy.title = "抢占".to_string();
    let copy_id = storage.save_itinerary(Some(&other), &copy).await.value;
    assert_ne!(copy_id, id);
    assert!(!copy_id.starts_with("local_"));

    let original = db.get_itinerary(&id).await.unwrap().unwrap();
    assert_eq!(original.user_id, owner.user_id);
    assert_eq!(original.title, "北京旅行计划");
    let copied = db.get_itinerary(&copy_id).await.unwrap().unwrap();
    assert_eq!(copied.user_id, other.user_id);
}

// ═══════════════════════════════════════════════════════════════════════════
// PREFERENCE AND EXPENSE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_preferences_round_trip() {
    require_emulator!();

    let storage = StorageService::new(test_db().await);
    let user = unique_user();

    let preferences = UserPreference {
        preferences: vec!["美食".to_string(), "历史".to_string()],
        budget_range: BudgetRange {
            min: 1000.0,
            max: 5000.0,
        },
        ..Default::default()
    };
    assert!(!storage.save_preferences(Some(&user), &preferences).await.is_degraded());

    let loaded = storage.get_preferences(Some(&user)).await.value.unwrap();
    assert_eq!(loaded.user_id, user.user_id);
    assert_eq!(loaded.preferences, preferences.preferences);
    assert!(!loaded.updated_at.is_empty());
}

#[tokio::test]
async fn test_expenses_by_itinerary() {
    require_emulator!();

    let storage = StorageService::new(test_db().await);
    let user = unique_user();

    let expense = |name: &str, date: &str, itinerary_id: &str| StoredExpense {
        id: String::new(),
        name: name.to_string(),
        amount: 50.0,
        date: date.to_string(),
        category: "餐饮".to_string(),
        user_id: String::new(),
        itinerary_id: itinerary_id.to_string(),
        created_at: String::new(),
    };

    storage.save_expense(Some(&user), &expense("早餐", "2025-11-10", "trip-a")).await;
    storage.save_expense(Some(&user), &expense("晚餐", "2025-11-11", "trip-a")).await;
    storage.save_expense(Some(&user), &expense("午餐", "2025-11-10", "trip-b")).await;

    let listed = storage.list_expenses(Some(&user), "trip-a").await.value;
    let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["晚餐", "早餐"]);

    let other = unique_user();
    assert!(!storage.delete_expense(Some(&other), &listed[0].id).await.value);
    assert_eq!(storage.list_expenses(Some(&user), "trip-a").await.value.len(), 2);

    assert!(storage.delete_expense(Some(&user), &listed[0].id).await.value);
    assert_eq!(storage.list_expenses(Some(&user), "trip-a").await.value.len(), 1);
}
