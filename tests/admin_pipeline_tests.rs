mod common;

use admin_gateway::{
    auth::Identity,
    create_router,
    gateway::{AuditEvent, AuditedOperation, RequestResponseAuditor, audit_invocation},
    routes::admin::admin_routes,
};
use axum::{Extension, Router, http::StatusCode, middleware, routing::delete};
use common::{
    ADMIN_ID, MockRepo, TestContext, UNKNOWN_ID, USER_ID, admin_request, body_json,
    default_context, test_context,
};
use serde_json::{Value, json};
use std::sync::atomic::Ordering;
use tower::ServiceExt;
use tracing::Level;

// --- Scenario A: non-admin calls change-user-role ---

#[tokio::test]
async fn test_user_role_change_is_forbidden_and_never_reaches_handler() {
    let ctx = default_context();
    let app = create_router(ctx.state.clone());
    let uri = format!("/admin/users/{}", USER_ID);

    let response = app
        .oneshot(admin_request("PATCH", &uri, Some(USER_ID), Some(r#"{"role":"admin"}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], 403);
    assert!(body["message"].as_str().unwrap().contains("Administrator"));

    assert_eq!(ctx.repo.role_change_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.sink.count_at(Level::WARN), 1);
    assert_eq!(ctx.sink.events().len(), 1);
    assert_eq!(ctx.sink.events()[0].url(), uri);
    assert!(ctx.sink.records().is_empty());
}

#[tokio::test]
async fn test_repeated_denials_are_independent() {
    let ctx = default_context();
    let uri = format!("/admin/users/{}", USER_ID);

    for _ in 0..2 {
        let response = create_router(ctx.state.clone())
            .oneshot(admin_request("PATCH", &uri, Some(USER_ID), Some(r#"{"role":"admin"}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    assert_eq!(ctx.repo.role_change_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.sink.count_at(Level::WARN), 2);
    let events = ctx.sink.events();
    let (AuditEvent::AccessDenied { timestamp: first, .. }, AuditEvent::AccessDenied { timestamp: second, .. }) =
        (&events[0], &events[1])
    else {
        panic!("expected two denials, got {events:?}");
    };
    assert!(first <= second);
}

// --- Scenario B: admin deletes a comment ---

#[tokio::test]
async fn test_admin_delete_comment_is_audited_once() {
    let ctx = default_context();
    let app = create_router(ctx.state.clone());

    let response = app
        .oneshot(admin_request("DELETE", "/admin/comments/1", Some(ADMIN_ID), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["body"], 1);
    assert_eq!(body["message"], "Comment deleted");

    assert_eq!(ctx.repo.delete_calls.load(Ordering::SeqCst), 1);

    // Gate INFO line, then the audit record.
    let events = ctx.sink.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], AuditEvent::AccessGranted { .. }));

    let records = ctx.sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.identity, ADMIN_ID);
    assert_eq!(record.url, "/admin/comments/1");
    assert_eq!(record.request_payload, None);
    assert_eq!(record.response_payload.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_admin_role_change_records_request_and_response_bodies() {
    let ctx = default_context();
    let app = create_router(ctx.state.clone());
    let uri = format!("/admin/users/{}", USER_ID);

    let response = app
        .oneshot(admin_request("PATCH", &uri, Some(ADMIN_ID), Some(r#"{"role":"admin"}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["body"]["role"], "admin");
    assert_eq!(ctx.repo.role_change_calls.load(Ordering::SeqCst), 1);

    let records = ctx.sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.identity, ADMIN_ID);
    assert_eq!(record.url, uri);
    assert_eq!(record.request_payload.as_deref(), Some(r#"{"role":"admin"}"#));

    let response_payload: Value =
        serde_json::from_str(record.response_payload.as_deref().unwrap()).unwrap();
    assert_eq!(
        response_payload,
        json!({ "id": USER_ID, "email": "user1@example.com", "role": "admin" })
    );
}

#[tokio::test]
async fn test_role_change_records_only_the_bound_request_fields() {
    let ctx = default_context();
    let app = create_router(ctx.state.clone());
    let uri = format!("/admin/users/{}", USER_ID);

    let response = app
        .oneshot(admin_request(
            "PATCH",
            &uri,
            Some(ADMIN_ID),
            Some(r#"{"role":"admin","password":"hunter2","zz":1.0}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let records = ctx.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].request_payload.as_deref(), Some(r#"{"role":"admin"}"#));
}

// --- Failure path: request payload is taken first, but nothing is recorded ---

#[tokio::test]
async fn test_failed_delete_emits_no_audit_record() {
    let ctx = default_context();
    let app = create_router(ctx.state.clone());

    let response = app
        .oneshot(admin_request("DELETE", "/admin/comments/42", Some(ADMIN_ID), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Comment not found");
    assert_eq!(ctx.repo.delete_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.sink.records().is_empty());
}

#[tokio::test]
async fn test_failed_role_change_discards_extracted_request_payload() {
    let ctx = default_context();
    let app = create_router(ctx.state.clone());
    let uri = format!("/admin/users/{}", USER_ID);

    let response = app
        .oneshot(admin_request("PATCH", &uri, Some(ADMIN_ID), Some(r#"{"role":"overlord"}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.repo.role_change_calls.load(Ordering::SeqCst), 0);
    assert!(ctx.sink.records().is_empty());
    // Only the gate's INFO line was written.
    assert_eq!(ctx.sink.events().len(), 1);
}

#[tokio::test]
async fn test_role_change_for_missing_user_is_not_audited() {
    let ctx = default_context();
    let app = create_router(ctx.state.clone());
    let uri = format!("/admin/users/{}", UNKNOWN_ID);

    let response = app
        .oneshot(admin_request("PATCH", &uri, Some(ADMIN_ID), Some(r#"{"role":"user"}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.repo.role_change_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.sink.records().is_empty());
}

// --- Success responses the auditor cannot read ---

// Mounts a canned 2xx handler behind the auditor, with the identity already attached.
fn audited_stub(ctx: &TestContext, reply: &'static str) -> Router {
    let auditor = RequestResponseAuditor::new(ctx.state.audit_sink.clone());
    Router::new()
        .route(
            "/admin/comments/{comment_id}",
            delete(move || async move { (StatusCode::OK, reply) }).route_layer(
                middleware::from_fn_with_state(
                    auditor.route(AuditedOperation::DeleteComment),
                    audit_invocation,
                ),
            ),
        )
        .layer(Extension(Identity { user_id: ADMIN_ID }))
}

#[tokio::test]
async fn test_unreadable_success_response_becomes_500_without_record() {
    for reply in ["[1,2", "comment removed", "[1,2]"] {
        let ctx = default_context();

        let response = audited_stub(&ctx, reply)
            .oneshot(admin_request("DELETE", "/admin/comments/1", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "reply {reply:?}");
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(ctx.sink.records().is_empty(), "reply {reply:?}");
    }
}

#[tokio::test]
async fn test_envelope_siblings_of_any_shape_are_ignored() {
    let ctx = default_context();

    let response = audited_stub(&ctx, r#"{"status":"OK","message":5,"body":{"id":7}}"#)
        .oneshot(admin_request("DELETE", "/admin/comments/1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");

    let records = ctx.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity, ADMIN_ID);
    assert_eq!(records[0].response_payload.as_deref(), Some(r#"{"id":7}"#));
}

#[tokio::test]
async fn test_success_without_body_key_records_json_null() {
    let ctx = default_context();

    let response = audited_stub(&ctx, r#"{"status":200,"message":"done"}"#)
        .oneshot(admin_request("DELETE", "/admin/comments/1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let records = ctx.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].response_payload.as_deref(), Some("null"));
}

// --- Routes outside the allow-list ---

#[tokio::test]
async fn test_stats_route_is_gated_but_not_audited() {
    let ctx = default_context();

    let response = create_router(ctx.state.clone())
        .oneshot(admin_request("GET", "/admin/stats", Some(ADMIN_ID), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["body"]["total_users"], 2);

    let response = create_router(ctx.state.clone())
        .oneshot(admin_request("GET", "/admin/stats", Some(USER_ID), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(ctx.repo.stats_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.sink.records().is_empty());
    assert_eq!(ctx.sink.count_at(Level::INFO), 1);
    assert_eq!(ctx.sink.count_at(Level::WARN), 1);
}

// --- Identity resolution edge cases ---

#[tokio::test]
async fn test_identity_unknown_to_directory_is_bad_request() {
    let ctx = default_context();

    let response = create_router(ctx.state.clone())
        .oneshot(admin_request("DELETE", "/admin/comments/1", Some(UNKNOWN_ID), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "User not found");
    assert_eq!(ctx.repo.delete_calls.load(Ordering::SeqCst), 0);
    assert!(ctx.sink.records().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_request_never_reaches_gate() {
    let ctx = default_context();

    let response = create_router(ctx.state.clone())
        .oneshot(admin_request("DELETE", "/admin/comments/1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.repo.delete_calls.load(Ordering::SeqCst), 0);
    assert!(ctx.sink.events().is_empty());
}

// --- Scenario C: identity attribute entirely absent ---

#[tokio::test]
async fn test_missing_identity_is_denied_without_crashing() {
    let ctx = test_context(MockRepo::default(), Default::default());
    // No authentication layer: nothing ever attaches an Identity.
    let app = Router::new()
        .nest("/admin", admin_routes(&ctx.state))
        .with_state(ctx.state.clone());

    let response = app
        .oneshot(admin_request("DELETE", "/admin/comments/1", Some(ADMIN_ID), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.repo.delete_calls.load(Ordering::SeqCst), 0);
    assert!(matches!(
        ctx.sink.events()[0],
        AuditEvent::AccessDenied { identity: None, .. }
    ));
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = default_context();

    let response = create_router(ctx.state.clone())
        .oneshot(admin_request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(ctx.sink.events().is_empty());
}
