//! Book catalog service

use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// List books with pagination
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<Vec<Book>> {
        self.repository.books.list(offset, limit).await
    }

    /// Add a book to the catalog
    pub async fn create(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        tracing::info!(title = %book.title, author = %book.author, quantity = book.quantity, "creating book");
        let created = self.repository.books.create(&book).await?;
        tracing::info!(id = created.id, "book created");
        Ok(created)
    }

    /// Update an existing book
    pub async fn update(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;
        let updated = self.repository.books.update(id, &book).await?;
        tracing::info!(id, "book updated");
        Ok(updated)
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(id, "book deleted");
        Ok(())
    }

    /// Check whether a book has a copy free to borrow
    pub async fn is_available(&self, id: i32) -> AppResult<bool> {
        let available = self.repository.books.is_available(id).await?;
        tracing::debug!(id, available, "checked book availability");
        Ok(available)
    }
}
