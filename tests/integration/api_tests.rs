//! API endpoint integration tests

use axum::http::StatusCode;
use rstest::rstest;
use serde_json::{json, Value};

use crate::common::{actors, contact_email, user_payload, TestApp};

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = TestApp::new().await;

        let response = app.get("/api/v1/health").await;
        response.assert_ok();
        assert_eq!(response.json::<Value>()["status"], "healthy");

        app.get("/api/v1/health/live").await.assert_ok();
        app.get("/api/v1/health/ready").await.assert_ok();
    }

    #[tokio::test]
    async fn test_detailed_health_reports_backend() {
        let app = TestApp::with_sqlite().await;

        let response = app.get("/api/v1/health/detailed").await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["components"]["repository"]["backend"], "sqlite");
        assert_eq!(body["components"]["repository"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_responses_carry_security_and_cache_headers() {
        let app = TestApp::new().await;

        let response = app.get("/api/v1/institutions").await;
        response.assert_ok();
        assert_eq!(response.headers.get("x-content-type-options").unwrap(), "nosniff");
        assert!(response
            .headers
            .get("cache-control")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("no-store"));
    }
}

mod institutions {
    use super::*;

    #[tokio::test]
    async fn test_register_institution_starts_pending() {
        let app = TestApp::new().await;

        let id = app.register_institution("North University").await;

        let response = app.get(&format!("/api/v1/institutions/{}", id)).await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "pending");
        assert_eq!(body["name"], "North University");
        assert!(body.get("reviewedAt").is_none());
    }

    #[tokio::test]
    async fn test_register_institution_requires_name() {
        let app = TestApp::new().await;

        let mut payload = crate::common::institution_payload("Nameless");
        payload["name"] = json!("   ");

        let response = app.post_json("/api/v1/institutions", payload).await;
        response.assert_bad_request();
        assert_eq!(response.error_kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_get_unknown_institution_is_not_found() {
        let app = TestApp::new().await;

        let response = app.get("/api/v1/institutions/does-not-exist").await;
        response.assert_not_found();
        assert_eq!(response.error_kind(), "not_found");
    }

    #[tokio::test]
    async fn test_approve_institution_notifies_contact_once() {
        let app = TestApp::new().await;
        let id = app.register_institution("West College").await;

        let response = app
            .patch_json(
                &format!("/api/v1/institutions/{}", id),
                json!({ "status": "approved", "userId": actors::REVIEWER }),
            )
            .await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "approved");
        assert!(body["reviewedAt"].is_string());

        let audit: Value = app
            .get(&format!(
                "/api/v1/audit-logs?entityId={}&action=APPROVE_INSTITUTION",
                id
            ))
            .await
            .json();
        assert_eq!(audit["count"], 1);
        assert_eq!(audit["data"][0]["userId"], actors::REVIEWER);

        let notifications: Value = app
            .get(&format!(
                "/api/v1/notifications?userId={}",
                contact_email("West College")
            ))
            .await
            .json();
        assert_eq!(notifications["count"], 1);
        assert_eq!(notifications["data"][0]["type"], "success");
    }

    #[tokio::test]
    async fn test_reapproving_institution_is_conflict() {
        let app = TestApp::new().await;
        let id = app.approved_institution("East Institute").await;

        let response = app
            .patch_json(
                &format!("/api/v1/institutions/{}", id),
                json!({ "status": "rejected", "userId": actors::ADMIN }),
            )
            .await;
        response.assert_conflict();
        assert_eq!(response.error_kind(), "invalid_transition");

        let body: Value = app
            .get(&format!("/api/v1/institutions/{}", id))
            .await
            .json();
        assert_eq!(body["status"], "approved");
    }

    #[rstest]
    #[case("archived")]
    #[case("")]
    #[case("APPROVED!")]
    #[tokio::test]
    async fn test_unknown_status_is_validation_error(#[case] status: &str) {
        let app = TestApp::new().await;
        let id = app.register_institution("South Academy").await;

        let response = app
            .patch_json(
                &format!("/api/v1/institutions/{}", id),
                json!({ "status": status, "userId": actors::ADMIN }),
            )
            .await;
        response.assert_bad_request();
        assert_eq!(response.error_kind(), "validation_error");

        let audit: Value = app
            .get(&format!("/api/v1/audit-logs?entityId={}", id))
            .await
            .json();
        // Only the registration
        assert_eq!(audit["count"], 1);
    }

    #[tokio::test]
    async fn test_list_institutions_by_status() {
        let app = TestApp::new().await;
        app.register_institution("Alpha").await;
        app.register_institution("Beta").await;
        app.approved_institution("Gamma").await;

        let response = app.get("/api/v1/institutions?status=pending").await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["count"], 2);
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_list_institutions_paginates_with_full_count() {
        let app = TestApp::new().await;
        for name in ["One", "Two", "Three"] {
            app.register_institution(name).await;
        }

        let body: Value = app
            .get("/api/v1/institutions?limit=1&offset=1")
            .await
            .json();
        assert_eq!(body["count"], 3);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Two");
    }

    #[tokio::test]
    async fn test_profile_update_keeps_status() {
        let app = TestApp::new().await;
        let id = app.approved_institution("Profile Uni").await;

        let response = app
            .put_json(
                &format!("/api/v1/institutions/{}", id),
                json!({ "description": "Updated description", "userId": actors::ADMIN }),
            )
            .await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["description"], "Updated description");
        assert_eq!(body["status"], "approved");
    }
}

mod malformed_input {
    use super::*;

    #[tokio::test]
    async fn test_non_string_status_is_validation_error() {
        let app = TestApp::new().await;
        let consumer = app.approved_institution("Typed Consumer").await;
        let provider = app.approved_institution("Typed Provider").await;
        let id = app.submit_request(&consumer, &provider, "Typed").await;

        let response = app
            .patch_json(&format!("/api/v1/requests/{}", id), json!({ "status": 5 }))
            .await;
        response.assert_bad_request();
        assert_eq!(response.error_kind(), "validation_error");

        let body: Value = app.get(&format!("/api/v1/requests/{}", id)).await.json();
        assert_eq!(body["status"], "pending");
    }

    #[tokio::test]
    async fn test_unparsable_query_is_validation_error() {
        let app = TestApp::new().await;

        let response = app.get("/api/v1/institutions?limit=abc").await;
        response.assert_bad_request();
        assert_eq!(response.error_kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_validation_error() {
        let app = TestApp::new().await;

        let response = app
            .request(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/institutions")
                    .header("Content-Type", "application/json")
                    .body(axum::body::Body::from("{\"name\": "))
                    .unwrap(),
            )
            .await;
        response.assert_bad_request();
        assert_eq!(response.error_kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_non_boolean_read_flag_is_validation_error() {
        let app = TestApp::new().await;

        let response = app
            .put_json("/api/v1/notifications/any/read", json!({ "read": "yes" }))
            .await;
        response.assert_bad_request();
        assert_eq!(response.error_kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_blank_api_endpoint_is_accepted() {
        let app = TestApp::new().await;

        let mut payload = crate::common::institution_payload("Endpointless");
        payload["apiEndpoint"] = json!("");

        let response = app.post_json("/api/v1/institutions", payload).await;
        response.assert_created();
        assert!(response.json::<Value>().get("apiEndpoint").is_none());
    }
}

mod requests {
    use super::*;

    async fn pair(app: &TestApp) -> (String, String) {
        let consumer = app.approved_institution("Consumer Agency").await;
        let provider = app.approved_institution("Provider Registry").await;
        (consumer, provider)
    }

    #[tokio::test]
    async fn test_submit_request_is_pending_without_response_date() {
        let app = TestApp::new().await;
        let (consumer, provider) = pair(&app).await;

        let id = app.submit_request(&consumer, &provider, "X").await;

        let body: Value = app.get(&format!("/api/v1/requests/{}", id)).await.json();
        assert_eq!(body["status"], "pending");
        assert_eq!(body["title"], "X");
        assert!(body.get("responseDate").is_none());
    }

    #[tokio::test]
    async fn test_submit_request_with_unknown_provider_fails() {
        let app = TestApp::new().await;
        let consumer = app.approved_institution("Lonely Consumer").await;

        let response = app
            .post_json(
                "/api/v1/requests",
                crate::common::request_payload(&consumer, "missing-provider", "Orphan"),
            )
            .await;
        response.assert_bad_request();

        let list: Value = app.get("/api/v1/requests").await.json();
        assert_eq!(list["count"], 0);
    }

    #[tokio::test]
    async fn test_reject_records_reason_and_response_date() {
        let app = TestApp::new().await;
        let (consumer, provider) = pair(&app).await;
        let id = app.submit_request(&consumer, &provider, "X").await;

        let response = app
            .patch_json(
                &format!("/api/v1/requests/{}", id),
                json!({ "status": "rejected", "userId": actors::REVIEWER, "reason": "missing fields" }),
            )
            .await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "rejected");
        assert_eq!(body["rejectionReason"], "missing fields");
        assert!(body["responseDate"].is_string());

        let audit: Value = app
            .get(&format!(
                "/api/v1/audit-logs?entityId={}&action=REJECT_REQUEST",
                id
            ))
            .await
            .json();
        assert_eq!(audit["count"], 1);
    }

    #[tokio::test]
    async fn test_reject_without_reason_changes_nothing() {
        let app = TestApp::new().await;
        let (consumer, provider) = pair(&app).await;
        let id = app.submit_request(&consumer, &provider, "X").await;

        let response = app
            .patch_json(
                &format!("/api/v1/requests/{}", id),
                json!({ "status": "rejected", "userId": actors::REVIEWER }),
            )
            .await;
        response.assert_bad_request();

        let body: Value = app.get(&format!("/api/v1/requests/{}", id)).await.json();
        assert_eq!(body["status"], "pending");

        let audit: Value = app
            .get(&format!("/api/v1/audit-logs?entityId={}", id))
            .await
            .json();
        assert_eq!(audit["count"], 1);
        assert_eq!(audit["data"][0]["action"], "CREATE_REQUEST");
    }

    #[tokio::test]
    async fn test_approve_twice_is_conflict() {
        let app = TestApp::new().await;
        let (consumer, provider) = pair(&app).await;
        let id = app.submit_request(&consumer, &provider, "Twice").await;
        let uri = format!("/api/v1/requests/{}", id);

        let first = app
            .patch_json(&uri, json!({ "status": "approved", "userId": actors::ADMIN }))
            .await;
        first.assert_ok();
        let body: Value = first.json();
        assert_eq!(
            body["apiEndpoint"],
            "https://provider-registry.example.org/api"
        );

        let second = app
            .patch_json(&uri, json!({ "status": "approved", "userId": actors::ADMIN }))
            .await;
        second.assert_conflict();

        let body: Value = app.get(&uri).await.json();
        assert_eq!(body["status"], "approved");
    }

    #[tokio::test]
    async fn test_unknown_request_status_is_validation_error() {
        let app = TestApp::new().await;
        let (consumer, provider) = pair(&app).await;
        let id = app.submit_request(&consumer, &provider, "Odd").await;

        let response = app
            .patch_json(
                &format!("/api/v1/requests/{}", id),
                json!({ "status": "cancelled", "userId": actors::ADMIN }),
            )
            .await;
        response.assert_bad_request();
        assert_eq!(response.error_kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_list_requests_filters_by_provider() {
        let app = TestApp::new().await;
        let (consumer, provider) = pair(&app).await;
        let other = app.approved_institution("Other Provider").await;
        app.submit_request(&consumer, &provider, "First").await;
        app.submit_request(&consumer, &other, "Second").await;

        let body: Value = app
            .get(&format!("/api/v1/requests?providerId={}", provider))
            .await
            .json();
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["title"], "First");
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn test_notification_read_toggle_and_stats() {
        let app = TestApp::new().await;

        let created = app
            .post_json(
                "/api/v1/notifications",
                json!({
                    "userId": "u-1",
                    "title": "Hello",
                    "message": "Welcome to the portal",
                    "type": "info"
                }),
            )
            .await;
        created.assert_created();
        let id = created.json::<Value>()["id"].as_str().unwrap().to_string();

        for _ in 0..2 {
            let response = app
                .put_json(
                    &format!("/api/v1/notifications/{}/read", id),
                    json!({ "read": true }),
                )
                .await;
            response.assert_ok();
            assert_eq!(response.json::<Value>()["read"], true);
        }

        let stats: Value = app.get("/api/v1/notifications/stats?userId=u-1").await.json();
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["unread"], 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_changes() {
        let app = TestApp::new().await;
        for title in ["a", "b", "c"] {
            app.post_json(
                "/api/v1/notifications",
                json!({ "userId": "u-2", "title": title, "message": "m", "type": "warning" }),
            )
            .await
            .assert_created();
        }

        let response = app
            .post_json("/api/v1/notifications/mark-all-read", json!({ "userId": "u-2" }))
            .await;
        response.assert_ok();
        assert_eq!(response.json::<Value>()["count"], 3);

        let unread: Value = app
            .get("/api/v1/notifications?userId=u-2&unreadOnly=true")
            .await
            .json();
        assert_eq!(unread["count"], 0);
    }

    #[tokio::test]
    async fn test_listing_requires_user() {
        let app = TestApp::new().await;

        let response = app.get("/api/v1/notifications").await;
        response.assert_bad_request();
    }

    #[tokio::test]
    async fn test_unknown_notification_is_not_found() {
        let app = TestApp::new().await;

        app.put_json("/api/v1/notifications/nope/read", json!({ "read": true }))
            .await
            .assert_not_found();
    }
}

mod users_and_stats {
    use super::*;

    #[tokio::test]
    async fn test_register_user_and_route_institution_notifications() {
        let app = TestApp::new().await;
        let institution = app.register_institution("Staffed University").await;

        let response = app
            .post_json(
                "/api/v1/users",
                user_payload("Ana Staff", "provider", Some(&institution)),
            )
            .await;
        response.assert_created();
        let user_id = response.json::<Value>()["id"].as_str().unwrap().to_string();

        app.patch_json(
            &format!("/api/v1/institutions/{}", institution),
            json!({ "status": "approved", "userId": actors::ADMIN }),
        )
        .await
        .assert_ok();

        let notifications: Value = app
            .get(&format!("/api/v1/notifications?userId={}", user_id))
            .await
            .json();
        assert_eq!(notifications["count"], 1);
    }

    #[tokio::test]
    async fn test_duplicate_user_email_is_rejected() {
        let app = TestApp::new().await;

        app.post_json("/api/v1/users", user_payload("Sam Admin", "admin", None))
            .await
            .assert_created();
        let response = app
            .post_json("/api/v1/users", user_payload("Sam Admin", "admin", None))
            .await;
        response.assert_bad_request();
    }

    #[tokio::test]
    async fn test_portal_stats() {
        let app = TestApp::new().await;
        app.register_institution("Pending One").await;
        app.approved_institution("Approved One").await;

        let response = app.get("/api/v1/stats").await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["institutions"]["total"], 2);
        assert_eq!(body["institutions"]["byStatus"]["pending"], 1);
        assert_eq!(body["institutions"]["byStatus"]["approved"], 1);
        assert_eq!(body["requests"]["total"], 0);
    }
}

mod audit {
    use super::*;

    #[tokio::test]
    async fn test_audit_filter_by_actor_is_chronological() {
        let app = TestApp::new().await;
        let first = app.register_institution("First Inst").await;
        let second = app.register_institution("Second Inst").await;

        for id in [&first, &second] {
            app.patch_json(
                &format!("/api/v1/institutions/{}", id),
                json!({ "status": "approved", "userId": actors::REVIEWER }),
            )
            .await
            .assert_ok();
        }

        let response = app
            .get(&format!(
                "/api/v1/audit-logs?userId={}&order=asc",
                actors::REVIEWER
            ))
            .await;
        response.assert_ok();
        let body: Value = response.json();
        assert_eq!(body["count"], 2);
        let entries = body["data"].as_array().unwrap();
        assert!(entries.iter().all(|e| e["userId"] == actors::REVIEWER));
        assert_eq!(entries[0]["entityId"], first.as_str());
        assert_eq!(entries[1]["entityId"], second.as_str());
    }

    #[tokio::test]
    async fn test_invalid_audit_action_filter() {
        let app = TestApp::new().await;

        let response = app.get("/api/v1/audit-logs?action=DELETE_EVERYTHING").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}

mod sqlite_backend {
    use super::*;

    #[tokio::test]
    async fn test_full_flow_on_sqlite() {
        let app = TestApp::with_sqlite().await;
        let consumer = app.approved_institution("Sql Consumer").await;
        let provider = app.approved_institution("Sql Provider").await;
        let id = app.submit_request(&consumer, &provider, "Sql request").await;

        app.patch_json(
            &format!("/api/v1/requests/{}", id),
            json!({ "status": "approved", "userId": actors::ADMIN }),
        )
        .await
        .assert_ok();

        let body: Value = app
            .get("/api/v1/requests?status=approved")
            .await
            .json();
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["attributes"], json!(["name", "enrollmentYear"]));

        let notifications: Value = app
            .get(&format!(
                "/api/v1/notifications?userId={}",
                contact_email("Sql Consumer")
            ))
            .await
            .json();
        // Institution approval + request approval
        assert_eq!(notifications["count"], 2);
    }
}
