//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppResult, DetailResponse},
    models::book::{Book, CreateBook, UpdateBook},
};

use super::ListQuery;

/// Availability of a book
#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    /// Book ID
    pub book_id: i32,
    /// Whether a copy is free to borrow
    pub available: bool,
}

/// List books with pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("offset" = Option<i64>, Query, description = "Number of records to skip"),
        ("limit" = Option<i64>, Query, description = "Maximum number of records to return")
    ),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state
        .services
        .books
        .list(query.offset(), query.limit())
        .await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = DetailResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get_by_id(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = DetailResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.books.create(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found", body = DetailResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(book): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    let updated = state.services.books.update(id, book).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted", body = DetailResponse),
        (status = 400, description = "Book has active loans", body = DetailResponse),
        (status = 404, description = "Book not found", body = DetailResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<DetailResponse>> {
    state.services.books.delete(id).await?;
    Ok(Json(DetailResponse {
        detail: "Book deleted".to_string(),
    }))
}

/// Check whether a book is available for loan
///
/// Reports `available: false` rather than 404 for an unknown book.
#[utoipa::path(
    get,
    path = "/books/{id}/availability",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Availability of the book", body = AvailabilityResponse)
    )
)]
pub async fn check_availability(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AvailabilityResponse>> {
    let available = state.services.books.is_available(id).await?;
    Ok(Json(AvailabilityResponse {
        book_id: id,
        available,
    }))
}
