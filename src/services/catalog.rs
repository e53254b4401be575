//! Catalog service: books and categories

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{BookDetails, BookQuery, CreateBook, CreateBookOutcome, UpdateBook},
        category::{Category, CreateCategory},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<BookDetails>> {
        self.repository.books.list().await
    }

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a book, merging into an existing one with the same title
    pub async fn create_book(&self, mut book: CreateBook) -> AppResult<CreateBookOutcome> {
        book.title = book.title.trim().to_string();
        book.validate()?;

        let (id, outcome) = self.repository.books.create_or_merge(&book).await?;
        match outcome {
            CreateBookOutcome::Created => tracing::info!(book_id = id, title = %book.title, "Book created"),
            CreateBookOutcome::Merged => {
                tracing::info!(book_id = id, title = %book.title, "Book already catalogued, stock increased")
            }
        }
        Ok(outcome)
    }

    pub async fn update_book(&self, id: i32, mut book: UpdateBook) -> AppResult<()> {
        book.title = book.title.trim().to_string();
        book.validate()?;
        self.repository.books.update(id, &book).await?;
        tracing::info!(book_id = id, "Book updated");
        Ok(())
    }

    pub async fn increase_stock(&self, id: i32) -> AppResult<()> {
        self.repository.books.increase_stock(id).await?;
        tracing::info!(book_id = id, "Stock increased");
        Ok(())
    }

    pub async fn decrease_stock(&self, id: i32) -> AppResult<()> {
        self.repository.books.decrease_stock(id).await?;
        tracing::info!(book_id = id, "Stock decreased");
        Ok(())
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    pub async fn create_category(&self, mut category: CreateCategory) -> AppResult<Category> {
        category.name = category.name.trim().to_string();
        category.validate()?;
        let created = self.repository.categories.create(&category.name).await?;
        tracing::info!(category_id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }
}
