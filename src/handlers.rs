use crate::{
    AppState,
    error::{AppError, AppResult, ErrorBody},
    models::{AdminDashboardStats, Envelope, UserResponse, UserRole, UserRoleChangeRequest},
};
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

// --- Admin Handlers ---
//
// Authorization is not checked here. Every handler in this module is mounted behind the
// access gate, and the audited ones additionally behind the request/response auditor.

/// get_admin_stats
///
/// [Admin Route] Dashboard counters. Gated but not audited.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = Envelope<AdminDashboardStats>),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn get_admin_stats(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<AdminDashboardStats>>> {
    let stats = state.repo.get_stats().await?;
    Ok(Json(Envelope::ok("Dashboard statistics", stats)))
}

/// delete_comment
///
/// [Admin Route, audited] Force-deletes any comment. The envelope body is the id of the
/// deleted comment.
#[utoipa::path(
    delete,
    path = "/admin/comments/{comment_id}",
    params(("comment_id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Deleted", body = Envelope<i64>),
        (status = 403, description = "Not an administrator", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<Envelope<i64>>> {
    if !state.repo.delete_comment_admin(comment_id).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }
    Ok(Json(Envelope::ok("Comment deleted", comment_id)))
}

/// change_user_role
///
/// [Admin Route, audited] Assigns a new role to a user. The role string is validated
/// before the repository is touched.
#[utoipa::path(
    patch,
    path = "/admin/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = UserRoleChangeRequest,
    responses(
        (status = 200, description = "Role changed", body = Envelope<UserResponse>),
        (status = 400, description = "Invalid role or unknown user", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn change_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserRoleChangeRequest>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let role: UserRole = payload.role.parse()?;
    let user = state
        .repo
        .change_user_role(user_id, role)
        .await?
        .ok_or_else(|| AppError::InvalidRequest("User not found".to_string()))?;
    Ok(Json(Envelope::ok("User role changed", UserResponse::from(user))))
}
