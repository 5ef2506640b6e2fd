//! Loan lifecycle service

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, Loan, UpdateLoan},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        self.repository.loans.get_by_id(id).await
    }

    /// List loans with pagination, most recent first
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<Vec<Loan>> {
        self.repository.loans.list(offset, limit).await
    }

    /// Borrow a book
    pub async fn create(&self, loan: CreateLoan) -> AppResult<Loan> {
        tracing::info!(user_id = loan.user_id, book_id = loan.book_id, "creating loan");
        let created = self.repository.loans.create(&loan).await?;
        tracing::info!(id = created.id, due_date = %created.due_date, "loan created");
        Ok(created)
    }

    /// Reassign a loan's user and book references
    pub async fn update(&self, id: i32, update: UpdateLoan) -> AppResult<Loan> {
        let updated = self.repository.loans.update(id, &update).await?;
        tracing::info!(id, "loan updated");
        Ok(updated)
    }

    /// Delete a returned loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.loans.delete(id).await?;
        tracing::info!(id, "loan deleted");
        Ok(())
    }

    /// Return a borrowed book, fining late returns
    pub async fn return_loan(&self, id: i32) -> AppResult<Loan> {
        let returned = self.repository.loans.return_loan(id).await?;
        if !returned.fine.is_zero() {
            tracing::info!(id, fine = %returned.fine, "loan returned late");
        } else {
            tracing::info!(id, "loan returned");
        }
        Ok(returned)
    }

    /// Undo a return, reactivating the loan
    pub async fn undo_return(&self, id: i32) -> AppResult<Loan> {
        let reactivated = self.repository.loans.undo_return(id).await?;
        tracing::info!(id, "loan return undone");
        Ok(reactivated)
    }
}
