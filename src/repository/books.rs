//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{is_foreign_key_violation, is_unique_violation, AppError, AppResult},
    models::book::{BookDetails, BookQuery, CreateBook, CreateBookOutcome, UpdateBook},
};

/// Unique index enforcing one row per title
const TITLE_INDEX: &str = "books_title_key";

const BOOK_DETAILS_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.category_id, c.name AS category, b.stock, b.created_at
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all books with their category name
    pub async fn list(&self) -> AppResult<Vec<BookDetails>> {
        let books = sqlx::query_as::<_, BookDetails>(&format!("{BOOK_DETAILS_SELECT} ORDER BY b.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Search books by title substring and/or category
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        let mut builder = QueryBuilder::<Postgres>::new(BOOK_DETAILS_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(title) = query.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            builder
                .push(" AND b.title ILIKE ")
                .push_bind(format!("%{}%", escape_like(title)));
        }
        if let Some(category_id) = query.category_id {
            builder.push(" AND b.category_id = ").push_bind(category_id);
        }
        builder.push(" ORDER BY b.title, b.id");

        let books = builder
            .build_query_as::<BookDetails>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BookDetails> {
        sqlx::query_as::<_, BookDetails>(&format!("{BOOK_DETAILS_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(book_not_found)
    }

    /// Insert a book, or add one copy to an existing book with the same title.
    ///
    /// The unique index on `title` decides between the two, so concurrent
    /// creates of a new title produce a single row.
    pub async fn create_or_merge(&self, book: &CreateBook) -> AppResult<(i32, CreateBookOutcome)> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author, category_id, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (title) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.category_id)
        .bind(book.stock)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_category_violation)?;

        let outcome = match inserted {
            Some(id) => (id, CreateBookOutcome::Created),
            None => {
                let id: i32 = sqlx::query_scalar("SELECT id FROM books WHERE title = $1 FOR UPDATE")
                    .bind(&book.title)
                    .fetch_one(&mut *tx)
                    .await?;
                Self::adjust_stock(&mut *tx, id, 1).await?;
                (id, CreateBookOutcome::Merged)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Replace a book's fields
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author = $2, category_id = $3, stock = $4
            WHERE id = $5
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.category_id)
        .bind(book.stock)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_update_violation)?;

        if result.rows_affected() == 0 {
            return Err(book_not_found());
        }
        Ok(())
    }

    /// Add one copy to the shelf
    pub async fn increase_stock(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        if !Self::adjust_stock(&mut *conn, id, 1).await? {
            return Err(book_not_found());
        }
        Ok(())
    }

    /// Remove one copy from the shelf; refused when none are left
    pub async fn decrease_stock(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        if Self::adjust_stock(&mut *conn, id, -1).await? {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        if exists {
            Err(AppError::BusinessRule(
                "Stock is already 0, cannot decrease".to_string(),
            ))
        } else {
            Err(book_not_found())
        }
    }

    /// Delete a book. Refused while borrowings reference it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e, None) {
                    AppError::Conflict("Book has borrowing records".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(book_not_found());
        }
        Ok(())
    }

    /// Lock the book row for the rest of the transaction and return its stock.
    ///
    /// `None` when the book does not exist.
    pub async fn lock_stock(conn: &mut PgConnection, id: i32) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT stock FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Apply `delta` to the book's stock.
    ///
    /// Returns `false` when no row was updated: the book is missing, or the
    /// change would take stock below zero.
    pub async fn adjust_stock(
        conn: &mut PgConnection,
        id: i32,
        delta: i32,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE books SET stock = stock + $2 WHERE id = $1 AND stock + $2 >= 0")
                .bind(id)
                .bind(delta)
                .execute(conn)
                .await?;
        Ok(result.rows_affected() == 1)
    }
}

pub(crate) fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

fn map_update_violation(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err, Some(TITLE_INDEX)) {
        AppError::Conflict("A book with this title already exists".to_string())
    } else {
        map_category_violation(err)
    }
}

fn map_category_violation(err: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&err, None) {
        AppError::Validation("Category not found".to_string())
    } else {
        AppError::Database(err)
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
