//! Repository for user data access operations.

use crate::entities::{CreateUserRequest, User, UserRole};
use crate::types::{StoreError, StoreResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for user database operations
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: &CreateUserRequest) -> StoreResult<User> {
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (public_id, name, email, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(request.role.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false)
            {
                StoreError::Duplicate(format!("email {} already registered", request.email))
            } else {
                StoreError::DatabaseError(e.to_string())
            }
        })?;

        let user_id = result.last_insert_rowid();

        info!(
            user_id = user_id,
            public_id = %public_id,
            role = %request.role.to_string(),
            "created new user"
        );

        Ok(User {
            id: user_id,
            public_id,
            name: request.name.clone(),
            email: request.email.clone(),
            role: request.role.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find a user by database ID
    pub async fn find_by_id(&self, user_id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, email, role, created_at, updated_at
             FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        row.map(map_user_row).transpose()
    }

    /// Find a user by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, email, role, created_at, updated_at
             FROM users WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        row.map(map_user_row).transpose()
    }
}

fn map_user_row(row: sqlx::sqlite::SqliteRow) -> StoreResult<User> {
    let role: String = row
        .try_get("role")
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

    Ok(User {
        id: row
            .try_get("id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        email: row
            .try_get("email")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        role: UserRole::from(role.as_str()),
        created_at: row
            .try_get("created_at")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
    })
}
