//! End-to-end request pipeline through the in-process router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};

use saakra_gateway::observability::AuditStatus;

mod common;

use common::{test_config, TestGateway};

fn gateway() -> TestGateway {
    TestGateway::new(test_config())
}

async fn complete_course(gw: &TestGateway, user: &str, course: &str) {
    let reply = gw
        .post(
            "/api/progress",
            Some(user),
            json!({ "courseId": course, "moduleId": "m1", "percentage": 100 }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_body_reports_every_failing_field() {
    let gw = gateway();
    let reply = gw
        .post("/api/progress", Some("u1"), json!({ "percentage": 150 }))
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Validation error");
    let errors = reply.body["validationErrors"].as_object().unwrap();
    assert_eq!(errors["courseId"], "courseId is required");
    assert_eq!(errors["moduleId"], "moduleId is required");
    assert_eq!(errors["percentage"], "percentage must not exceed 100");
    assert_eq!(errors.len(), 3);
}

#[tokio::test]
async fn test_short_assessment_title_is_rejected() {
    let gw = gateway();
    let reply = gw
        .post(
            "/api/assessments",
            Some("instructor-1"),
            json!({ "courseId": "c1", "title": "Hi", "type": "quiz" }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["validationErrors"]["title"],
        "title must be at least 3 characters"
    );
}

#[tokio::test]
async fn test_unknown_fields_pass_and_bodies_are_sanitized() {
    let gw = gateway();
    let reply = gw
        .post(
            "/api/progress",
            Some("u1"),
            json!({
                "courseId": "  <b>c1</b> ",
                "moduleId": "m1",
                "percentage": 40,
                "extra": "ignored",
            }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["courseId"], "bc1/b");
    assert_eq!(reply.body["coursePercentage"], 40.0);
}

#[tokio::test]
async fn test_malformed_json_is_normalized() {
    let gw = gateway();
    let request = Request::post("/api/progress")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "u1")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = gw.send(request).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Bad Request");
    assert!(reply.body["timestamp"].is_string());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = test_config();
    config.security.max_body_size = 64;
    let gw = TestGateway::new(config);

    let reply = gw
        .post(
            "/api/progress",
            Some("u1"),
            json!({ "courseId": "c".repeat(200), "moduleId": "m1", "percentage": 1 }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let gw = gateway();
    let reply = gw
        .post(
            "/api/progress",
            None,
            json!({ "courseId": "c1", "moduleId": "m1", "percentage": 10 }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Unauthorized");
    assert_eq!(reply.body["message"], "Authentication required");

    let events = gw.audit_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "updateProgress");
    assert_eq!(events[0].resource, "c1/m1");
    assert_eq!(events[0].status, AuditStatus::Failure);
    assert_eq!(events[0].user_id, None);
    assert_eq!(events[0].details["status"], 401);
}

#[tokio::test]
async fn test_unknown_assessment_is_normalized_not_found() {
    let gw = gateway();
    let reply = gw
        .post(
            "/api/assessments/submit",
            Some("u1"),
            json!({ "assessmentId": "missing", "answers": ["a"] }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "Not Found");
    assert_eq!(reply.body["message"], "Assessment not found");
    assert_eq!(reply.body["details"]["assessmentId"], "missing");

    let events = gw.audit_events().await;
    let event = events.iter().find(|e| e.action == "submitAssessment").unwrap();
    assert_eq!(event.status, AuditStatus::Failure);
    assert_eq!(event.user_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn test_rate_limit_window() {
    let mut config = test_config();
    config.rate_limit.max_requests = 3;
    config.rate_limit.window_ms = 60_000;
    let gw = TestGateway::new(config);

    for _ in 0..3 {
        let reply = gw.get("/api/courses/c1/eligibility", Some("u1")).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let reply = gw.get("/api/courses/c1/eligibility", Some("u1")).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.body["error"], "Too many requests");
    assert_eq!(reply.body["retryAfter"], 60);
    assert_eq!(reply.headers[header::RETRY_AFTER], "60");

    // Other callers have their own window.
    let reply = gw.get("/api/courses/c1/eligibility", Some("u2")).await;
    assert_eq!(reply.status, StatusCode::OK);

    // Health checks are never limited.
    assert_eq!(gw.get("/health", Some("u1")).await.status, StatusCode::OK);

    gw.clock.set(61_000);
    let reply = gw.get("/api/courses/c1/eligibility", Some("u1")).await;
    assert_eq!(reply.status, StatusCode::OK);

    let limiter = &gw.server.state().rate_limiter;
    assert_eq!(limiter.rejected_total(), 1);
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let mut config = test_config();
    config.rate_limit.enabled = false;
    config.rate_limit.max_requests = 1;
    let gw = TestGateway::new(config);

    for _ in 0..5 {
        let reply = gw.get("/api/courses/c1/eligibility", Some("u1")).await;
        assert_eq!(reply.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_certificate_lifecycle() {
    let gw = gateway();

    let reply = gw
        .post("/api/certificates", Some("u1"), json!({ "courseId": "c1" }))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["details"]["eligible"], false);

    complete_course(&gw, "u1", "c1").await;

    let reply = gw
        .post("/api/certificates", Some("u1"), json!({ "courseId": "c1" }))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let certificate_id = reply.body["id"].as_str().unwrap().to_string();
    assert!(certificate_id.starts_with("CERT-"));

    let reply = gw
        .post(
            "/api/certificates/verify",
            None,
            json!({ "certificateId": certificate_id }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["valid"], true);

    let revoke = json!({ "certificateId": certificate_id, "reason": "Issued in error by staff" });
    let reply = gw
        .post("/api/certificates/revoke", Some("admin"), revoke.clone())
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["revocation"]["revokedBy"], "admin");

    let reply = gw
        .post(
            "/api/certificates/verify",
            None,
            json!({ "certificateId": certificate_id }),
        )
        .await;
    assert_eq!(reply.body["valid"], false);

    let reply = gw.post("/api/certificates/revoke", Some("admin"), revoke).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["message"], "Certificate already revoked");
}

#[tokio::test]
async fn test_malformed_certificate_id_fails_pattern() {
    let gw = gateway();
    let reply = gw
        .post(
            "/api/certificates/verify",
            None,
            json!({ "certificateId": "not-a-cert" }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["validationErrors"]["certificateId"],
        "certificateId format is invalid"
    );
}

#[tokio::test]
async fn test_assessment_flow_feeds_eligibility() {
    let gw = gateway();
    let reply = gw
        .post(
            "/api/assessments",
            Some("instructor-1"),
            json!({
                "courseId": "c1",
                "title": "Final exam",
                "type": "exam",
                "passingScore": 50,
                "questions": [{ "correctAnswer": "a" }, { "correctAnswer": 2 }],
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let assessment_id = reply.body["id"].as_str().unwrap().to_string();

    complete_course(&gw, "u1", "c1").await;
    let reply = gw.get("/api/courses/c1/eligibility", Some("u1")).await;
    assert_eq!(reply.body["eligible"], false);

    let reply = gw
        .post(
            "/api/assessments/submit",
            Some("u1"),
            json!({ "assessmentId": assessment_id, "answers": ["a", 3] }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["score"], 50.0);
    assert_eq!(reply.body["passed"], true);

    let reply = gw.get("/api/courses/c1/eligibility", Some("u1")).await;
    assert_eq!(reply.body["eligible"], true);
    assert_eq!(reply.body["passedAssessments"], 1);
}

#[tokio::test]
async fn test_bulk_eligibility_limits() {
    let gw = gateway();
    let too_many: Vec<String> = (0..101).map(|i| format!("u{i}")).collect();
    let reply = gw
        .post(
            "/api/certificates/eligibility/bulk",
            Some("admin"),
            json!({ "courseId": "c1", "userIds": too_many }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["validationErrors"]["userIds"],
        "userIds must contain between 1 and 100 user ids"
    );

    complete_course(&gw, "u2", "c1").await;
    let reply = gw
        .post(
            "/api/certificates/eligibility/bulk",
            Some("admin"),
            json!({ "courseId": "c1", "userIds": ["u1", "u2"] }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let results: &Vec<Value> = reply.body["results"].as_array().unwrap();
    assert_eq!(results[0]["eligible"], false);
    assert_eq!(results[1]["eligible"], true);
}

#[tokio::test]
async fn test_request_ids_are_assigned_and_echoed() {
    let gw = gateway();
    let reply = gw.get("/health", None).await;
    assert!(reply.headers.contains_key("x-request-id"));

    let request = Request::get("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let reply = gw.send(request).await;
    assert_eq!(reply.headers["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_successful_write_is_audited() {
    let gw = gateway();
    complete_course(&gw, "u1", "c1").await;

    let events = gw.audit_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "updateProgress");
    assert_eq!(events[0].resource, "c1/m1");
    assert_eq!(events[0].status, AuditStatus::Success);
}
