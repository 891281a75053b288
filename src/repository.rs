use crate::error::AppResult;
use crate::models::{AdminDashboardStats, User, UserRole};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// UserDirectory Trait
///
/// The lookup the access gate performs for every admin request. `Ok(None)` means the id
/// resolved by authentication has no matching record; errors are infrastructure failures.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn UserDirectory>`) usable
/// across Axum's asynchronous task boundaries.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
}

/// DirectoryState
///
/// The shared handle the gate is constructed with.
pub type DirectoryState = Arc<dyn UserDirectory>;

/// Repository Trait
///
/// Persistence contract for the administrative operations themselves. Handlers depend on
/// this trait only, so tests can substitute an in-memory mock.
#[async_trait]
pub trait Repository: Send + Sync {
    // Returns the updated user, or None if no user has that id.
    async fn change_user_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>>;

    /// Admin: Delete ANY comment (No ownership check). Returns false if nothing was deleted.
    async fn delete_comment_admin(&self, id: i64) -> AppResult<bool>;

    async fn get_stats(&self) -> AppResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Implements both `UserDirectory` and `Repository` on top of a PostgreSQL pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresRepository {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// change_user_role
    ///
    /// Overwrites the role column and returns the updated row via `RETURNING`.
    async fn change_user_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1 WHERE id = $2 RETURNING id, email, role",
        )
        .bind(role.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_comment_admin(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// get_stats
    ///
    /// Compiles the dashboard counters in two scalar queries.
    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let total_comments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;
        Ok(AdminDashboardStats {
            total_users,
            total_comments,
        })
    }
}
