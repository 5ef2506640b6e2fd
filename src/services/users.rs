//! User management service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        loan::Loan,
        user::{CreateUser, UpdateUser, User},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// List users with pagination
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<Vec<User>> {
        self.repository.users.list(offset, limit).await
    }

    /// Register a new user
    pub async fn create(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;
        tracing::info!(name = %user.name, email = %user.email, "creating user");
        let created = self.repository.users.create(&user).await?;
        tracing::info!(id = created.id, "user created");
        Ok(created)
    }

    /// Update an existing user
    pub async fn update(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        user.validate()?;
        let updated = self.repository.users.update(id, &user).await?;
        tracing::info!(id, "user updated");
        Ok(updated)
    }

    /// Delete a user
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(id, "user deleted");
        Ok(())
    }

    /// All loans for a user, active and returned
    pub async fn loans(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.list_for_user(user_id).await
    }
}
