//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppResult, DetailResponse},
    models::loan::{CreateLoan, Loan, UpdateLoan},
};

use super::ListQuery;

/// List loans with pagination, most recent first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(
        ("offset" = Option<i64>, Query, description = "Number of records to skip"),
        ("limit" = Option<i64>, Query, description = "Maximum number of records to return")
    ),
    responses(
        (status = 200, description = "List of loans ordered by loan date descending", body = Vec<Loan>)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state
        .services
        .loans
        .list(query.offset(), query.limit())
        .await?;
    Ok(Json(loans))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found", body = DetailResponse)
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get_by_id(id).await?;
    Ok(Json(loan))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Book unavailable or loan limit reached", body = DetailResponse),
        (status = 404, description = "User not found", body = DetailResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(loan): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let created = state.services.loans.create(loan).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Reassign a loan's user and book references
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = UpdateLoan,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 400, description = "Loan already returned", body = DetailResponse),
        (status = 404, description = "Loan, user or book not found", body = DetailResponse)
    )
)]
pub async fn update_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(update): Json<UpdateLoan>,
) -> AppResult<Json<Loan>> {
    let updated = state.services.loans.update(id, update).await?;
    Ok(Json(updated))
}

/// Delete a returned loan
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan deleted", body = DetailResponse),
        (status = 400, description = "Loan still in progress", body = DetailResponse),
        (status = 404, description = "Loan not found", body = DetailResponse)
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<DetailResponse>> {
    state.services.loans.delete(id).await?;
    Ok(Json(DetailResponse {
        detail: "Loan deleted".to_string(),
    }))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned, fine applied if late", body = Loan),
        (status = 404, description = "Loan not found or already returned", body = DetailResponse)
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let returned = state.services.loans.return_loan(id).await?;
    Ok(Json(returned))
}

/// Undo a return, reactivating the loan
#[utoipa::path(
    post,
    path = "/loans/{id}/undo-return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Return undone, loan active again", body = Loan),
        (status = 400, description = "Loan not returned or book no longer available", body = DetailResponse),
        (status = 404, description = "Loan not found", body = DetailResponse)
    )
)]
pub async fn undo_loan_return(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let reactivated = state.services.loans.undo_return(id).await?;
    Ok(Json(reactivated))
}
