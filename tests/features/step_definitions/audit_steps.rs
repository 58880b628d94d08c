//! Audit trail step definitions

use chrono::{DateTime, Utc};
use cucumber::{then, when};

use exchange_portal::models::AuditLogQuery;

use crate::features::support::TestWorld;

async fn count_entries(world: &TestWorld, entity_id: String, action: &str) -> usize {
    world
        .state
        .audit
        .list(&AuditLogQuery {
            entity_id: Some(entity_id),
            action: Some(action.to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .count
}

#[then(expr = "there should be {int} {string} audit entry/entries for institution {string}")]
async fn institution_entries(world: &mut TestWorld, expected: usize, action: String, name: String) {
    let id = world.institution_id(&name);
    assert_eq!(count_entries(world, id, &action).await, expected);
}

#[then(expr = "there should be {int} {string} audit entry/entries for request {string}")]
async fn request_entries(world: &mut TestWorld, expected: usize, action: String, title: String) {
    let id = world.request_id(&title);
    assert_eq!(count_entries(world, id, &action).await, expected);
}

#[then(expr = "there should be no audit entries for request {string} other than its creation")]
async fn only_creation(world: &mut TestWorld, title: String) {
    let id = world.request_id(&title);
    let entries = world
        .state
        .audit
        .list(&AuditLogQuery {
            entity_id: Some(id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(entries.count, 1);
    assert_eq!(entries.data[0].action.as_str(), "CREATE_REQUEST");
}

#[when(expr = "I list audit entries for actor {string} in ascending order")]
async fn list_for_actor(world: &mut TestWorld, actor: String) {
    world
        .send(
            "GET",
            &format!("/api/v1/audit-logs?userId={}&order=asc", actor),
            None,
        )
        .await;
}

#[then(expr = "every listed entry should belong to {string}")]
async fn entries_belong_to(world: &mut TestWorld, actor: String) {
    let data = world.response().body["data"].as_array().unwrap();
    assert!(!data.is_empty());
    assert!(data.iter().all(|e| e["userId"] == actor.as_str()));
}

#[then("the listed entries should be in chronological order")]
async fn chronological(world: &mut TestWorld) {
    let timestamps: Vec<DateTime<Utc>> = world.response().body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["timestamp"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
}
