use crate::{
    AppState,
    gateway::{
        AccessGate, AuditedOperation, RequestResponseAuditor, audit_invocation, enforce_admin,
    },
    handlers,
};
use axum::{
    Router, middleware,
    routing::{delete, get, patch},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the 'admin' role.
///
/// Layering (outermost first, as seen by a request):
/// 1. `enforce_admin` wraps **every** route below, so no admin handler can run before the
///    role check.
/// 2. `audit_invocation` wraps only the two allow-listed operations, each bound to its
///    declared signature.
///
/// The caller is expected to add authentication outside this router; without it every
/// request arrives with no identity and is denied.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    let gate = AccessGate::new(
        state.directory.clone(),
        state.audit_sink.clone(),
        state.config.directory_timeout,
    );
    let auditor = RequestResponseAuditor::new(state.audit_sink.clone());

    Router::new()
        // GET /admin/stats
        // Dashboard counters. Gated, not audited.
        .route("/stats", get(handlers::get_admin_stats))
        // DELETE /admin/comments/{comment_id}
        // Force-deletes any comment. Audited.
        .route(
            "/comments/{comment_id}",
            delete(handlers::delete_comment).route_layer(middleware::from_fn_with_state(
                auditor.route(AuditedOperation::DeleteComment),
                audit_invocation,
            )),
        )
        // PATCH /admin/users/{user_id}
        // Changes a user's role. Audited, including the request body.
        .route(
            "/users/{user_id}",
            patch(handlers::change_user_role).route_layer(middleware::from_fn_with_state(
                auditor.route(AuditedOperation::ChangeUserRole),
                audit_invocation,
            )),
        )
        .route_layer(middleware::from_fn_with_state(gate, enforce_admin))
}
