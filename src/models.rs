use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the user record stored in the `users` table. The role column is kept as raw
/// text; `user_role()` interprets it so that an unrecognised value is never mistaken for
/// an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    // The RBAC field: 'admin' or 'user'.
    pub role: String,
}

impl User {
    pub fn user_role(&self) -> Option<UserRole> {
        self.role.parse().ok()
    }
}

/// UserRole
///
/// The two roles known to the RBAC check. Parsing is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            _ => Err(AppError::InvalidRequest("Invalid user role".to_string())),
        }
    }
}

/// Envelope
///
/// The response wrapper returned by every admin operation on success. The auditor reads
/// the domain payload straight from `body`; `status` and `message` are informational.
/// All fields default when absent so that a response missing `body` decodes with a JSON
/// `null` payload rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default, PartialEq)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, body: T) -> Self {
        Self {
            status: 200,
            message: message.into(),
            body,
        }
    }

    pub fn body(&self) -> &T {
        &self.body
    }
}

/// --- Request Payloads (Input Schemas) ---

/// UserRoleChangeRequest
///
/// Input payload for PATCH /admin/users/{user_id}. The role arrives as free text and is
/// validated by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UserRoleChangeRequest {
    #[schema(example = "admin")]
    pub role: String,
}

/// --- Output Schemas ---

/// UserResponse
///
/// Public view of a user returned after a role change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default, PartialEq)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_comments: i64,
}
