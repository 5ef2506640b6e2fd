//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// List books ordered by ID
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id OFFSET $1 LIMIT $2")
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Create a new book
    ///
    /// There is no uniqueness constraint on title or author.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            "INSERT INTO books (title, author, quantity) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update an existing book
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "UPDATE books SET title = $1, author = $2, quantity = $3 WHERE id = $4 RETURNING *",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.quantity)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book, refused while any of its copies is out on loan
    ///
    /// The book row is locked so a concurrent loan creation against the
    /// same book cannot slip in between the check and the delete.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND return_date IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active_loans > 0 {
            return Err(AppError::InvalidState(
                "This book has active loans and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Check whether a book has a copy free to borrow
    ///
    /// Returns `false`, not an error, when the book does not exist.
    pub async fn is_available(&self, id: i32) -> AppResult<bool> {
        let available: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT b.quantity > (
                SELECT COUNT(*) FROM loans l
                WHERE l.book_id = b.id AND l.return_date IS NULL
            )
            FROM books b
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(available.unwrap_or(false))
    }
}
