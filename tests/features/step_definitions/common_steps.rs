//! Common step definitions used across features

use cucumber::then;

use crate::features::support::TestWorld;

#[then(expr = "the response status should be {int}")]
async fn response_status(world: &mut TestWorld, status: u16) {
    let response = world.response();
    assert_eq!(response.status, status, "body: {}", response.body);
}

#[then(expr = "the response error should be {string}")]
async fn response_error(world: &mut TestWorld, kind: String) {
    assert_eq!(world.response().body["error"], kind.as_str());
}

#[then(expr = "the list should contain {int} record(s) with count {int}")]
async fn list_size(world: &mut TestWorld, records: usize, count: usize) {
    let body = &world.response().body;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(records));
    assert_eq!(body["count"], count);
}
