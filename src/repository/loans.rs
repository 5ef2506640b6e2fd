//! Loans repository for database operations
//!
//! All state transitions run inside a transaction. Availability and
//! per-user limit checks take a `FOR UPDATE` row lock on the book or
//! user row first, so two concurrent borrows of the last copy (or of a
//! user's last allowed slot) serialize instead of both committing.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::loan::{due_date_for, late_fine, CreateLoan, Loan, UpdateLoan, MAX_ACTIVE_LOANS},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// List loans, most recent first
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans ORDER BY loan_date DESC, id DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// All loans for a user, active and returned
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY loan_date DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Create a new loan (borrow a book)
    ///
    /// Checks run in order: user existence, book availability, per-user
    /// limit. A missing book surfaces as not available, matching the
    /// availability endpoint.
    pub async fn create(&self, loan: &CreateLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Lock the user row: serializes the limit check against
        // concurrent borrows and against user deletion
        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(loan.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User with id {} not found", loan.user_id))
            })?;

        // Lock the book row: serializes the availability check
        let quantity: Option<i32> =
            sqlx::query_scalar("SELECT quantity FROM books WHERE id = $1 FOR UPDATE")
                .bind(loan.book_id)
                .fetch_optional(&mut *tx)
                .await?;

        let active_book_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND return_date IS NULL",
        )
        .bind(loan.book_id)
        .fetch_one(&mut *tx)
        .await?;

        let available = quantity.map(|q| i64::from(q) > active_book_loans).unwrap_or(false);
        if !available {
            return Err(AppError::Unavailable(
                "Book is not available for loan".to_string(),
            ));
        }

        let active_user_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(loan.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if active_user_loans >= MAX_ACTIVE_LOANS {
            return Err(AppError::LimitExceeded(format!(
                "User has reached the limit of {} active loans",
                MAX_ACTIVE_LOANS
            )));
        }

        let loan_date = Utc::now().date_naive();
        let due_date = due_date_for(loan_date);

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, loan_date, due_date, fine)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan_date)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Reassign a loan's user and book references
    ///
    /// Dates and fine are untouched; a returned loan is read-only.
    pub async fn update(&self, id: i32, update: &UpdateLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_loan(&mut tx, id).await?;

        if loan.return_date.is_some() {
            return Err(AppError::InvalidState(
                "Cannot edit a loan that has already been returned".to_string(),
            ));
        }

        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1")
            .bind(update.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User with id {} not found", update.user_id))
            })?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1")
            .bind(update.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Book with id {} not found", update.book_id))
            })?;

        let updated = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET user_id = $1, book_id = $2 WHERE id = $3 RETURNING *",
        )
        .bind(update.user_id)
        .bind(update.book_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a loan, refused while it is still in progress
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_loan(&mut tx, id).await?;

        if loan.return_date.is_none() {
            return Err(AppError::InvalidState(
                "Cannot delete a loan in progress; return it first".to_string(),
            ));
        }

        sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Return a borrowed book
    ///
    /// An already-returned or absent loan surfaces uniformly as not
    /// found. A late return is fined per day overdue; an on-time return
    /// leaves the fine at its prior value.
    pub async fn return_loan(&self, id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND return_date IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Loan with id {} not found or already returned", id))
        })?;

        let return_date = Utc::now().date_naive();
        let fine = if return_date > loan.due_date {
            late_fine(loan.due_date, return_date)
        } else {
            loan.fine
        };

        let returned = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET return_date = $1, fine = $2 WHERE id = $3 RETURNING *",
        )
        .bind(return_date)
        .bind(fine)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(returned)
    }

    /// Undo a return, reactivating the loan
    ///
    /// Fails when the book's copies have been borrowed out in the
    /// interim; the book row is locked so the capacity check holds
    /// against concurrent borrows.
    pub async fn undo_return(&self, id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_loan(&mut tx, id).await?;

        if loan.return_date.is_none() {
            return Err(AppError::InvalidState(
                "This loan is not marked as returned".to_string(),
            ));
        }

        let quantity: Option<i32> =
            sqlx::query_scalar("SELECT quantity FROM books WHERE id = $1 FOR UPDATE")
                .bind(loan.book_id)
                .fetch_optional(&mut *tx)
                .await?;

        // This loan is returned, so it is not part of the active count
        let active_book_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND return_date IS NULL",
        )
        .bind(loan.book_id)
        .fetch_one(&mut *tx)
        .await?;

        let available = quantity.map(|q| i64::from(q) > active_book_loans).unwrap_or(false);
        if !available {
            return Err(AppError::Unavailable(
                "The return cannot be undone because the book is no longer available".to_string(),
            ));
        }

        let reactivated = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET return_date = NULL, fine = $1 WHERE id = $2 RETURNING *",
        )
        .bind(Decimal::ZERO)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reactivated)
    }
}

/// Fetch a loan by ID with a row lock, inside an open transaction
async fn lock_loan(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
}
