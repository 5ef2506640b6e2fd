//! Loan model and borrowing policy

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Length of a loan before it is due
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Maximum number of simultaneous active loans per user
pub const MAX_ACTIVE_LOANS: i64 = 3;

/// Loan model from database
///
/// A loan with `return_date = None` is active; the book copy it holds
/// counts against the book's quantity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    #[schema(value_type = f64)]
    pub fine: Decimal,
}

/// Create loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub user_id: i32,
    pub book_id: i32,
}

/// Update loan request (reassigns references only, dates are untouched)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLoan {
    pub user_id: i32,
    pub book_id: i32,
}

/// Fine charged per day overdue, in currency units
fn daily_fine() -> Decimal {
    Decimal::new(200, 2)
}

/// Due date for a loan issued on `loan_date`
pub fn due_date_for(loan_date: NaiveDate) -> NaiveDate {
    loan_date + Duration::days(LOAN_PERIOD_DAYS)
}

/// Fine owed for a loan due on `due_date` and returned on `return_date`
///
/// Zero when returned on or before the due date.
pub fn late_fine(due_date: NaiveDate, return_date: NaiveDate) -> Decimal {
    let overdue_days = (return_date - due_date).num_days();
    if overdue_days > 0 {
        Decimal::from(overdue_days) * daily_fine()
    } else {
        Decimal::ZERO
    }
}
