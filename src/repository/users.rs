//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// List users ordered by ID
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id OFFSET $1 LIMIT $2")
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Check if email already exists, optionally excluding one user
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create a new user
    pub async fn create(&self, user: &CreateUser) -> AppResult<User> {
        if self.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_email_conflict)?;

        Ok(created)
    }

    /// Update an existing user
    pub async fn update(&self, id: i32, user: &UpdateUser) -> AppResult<User> {
        self.get_by_id(id).await?;

        // Updating a user to its own current email is allowed
        if self.email_exists(&user.email, Some(id)).await? {
            return Err(AppError::Conflict(
                "Email is already in use by another user".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET name = $1, email = $2 WHERE id = $3 RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_email_conflict)?;

        Ok(updated)
    }

    /// Delete a user, refused while the user holds active loans
    ///
    /// The user row is locked so a concurrent loan creation for the same
    /// user cannot slip in between the check and the delete.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active_loans > 0 {
            return Err(AppError::InvalidState(
                "User has active loans and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Translate a unique-index violation on the email column into a `Conflict`,
/// covering the race where two inserts pass the pre-check simultaneously
fn map_email_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return AppError::Conflict("Email is already registered".to_string());
        }
    }
    AppError::Database(err)
}
