//! Borrowings repository: the borrow/return ledger.
//!
//! Borrow and return each run in a single transaction. Every early return
//! drops the transaction, which rolls back whatever was already written.

use chrono::Utc;
use sqlx::{Pool, Postgres};

use super::books::{book_not_found, BooksRepository};
use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::borrowing::{Borrowing, BorrowingDetails, BorrowingDetailsRow},
};

/// Partial unique index allowing one open borrowing per (user, book)
const OPEN_BORROWING_INDEX: &str = "borrowings_one_open_per_user_book";

const BORROWING_COLUMNS: &str = "id, user_id, book_id, borrowed_at, returned_at";

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Lend one copy of `book_id` to `user_id`
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let already_open: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrowings
                WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        let stock = if already_open {
            None
        } else {
            BooksRepository::lock_stock(&mut *tx, book_id).await?
        };
        check_borrowable(already_open, stock)?;

        let borrowing = sqlx::query_as::<_, Borrowing>(&format!(
            "INSERT INTO borrowings (user_id, book_id, borrowed_at) VALUES ($1, $2, $3) RETURNING {BORROWING_COLUMNS}"
        ))
        .bind(user_id)
        .bind(book_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, Some(OPEN_BORROWING_INDEX)) {
                already_borrowed()
            } else {
                AppError::Database(e)
            }
        })?;

        if !BooksRepository::adjust_stock(&mut *tx, book_id, -1).await? {
            return Err(book_not_found());
        }

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Close an open borrowing on behalf of `caller_id` and put the copy back
    pub async fn return_borrowing(&self, borrowing_id: i32, caller_id: i32) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let open = sqlx::query_as::<_, Borrowing>(&format!(
            "SELECT {BORROWING_COLUMNS} FROM borrowings WHERE id = $1 AND returned_at IS NULL FOR UPDATE"
        ))
        .bind(borrowing_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Borrowing record not found or already returned".to_string())
        })?;

        check_owner(&open, caller_id)?;

        let returned = sqlx::query_as::<_, Borrowing>(&format!(
            "UPDATE borrowings SET returned_at = $1 WHERE id = $2 AND returned_at IS NULL RETURNING {BORROWING_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(borrowing_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Borrowing record not found".to_string()))?;

        if !BooksRepository::adjust_stock(&mut *tx, open.book_id, 1).await? {
            return Err(book_not_found());
        }

        tx.commit().await?;
        Ok(returned)
    }

    /// All borrowings of a user, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<BorrowingDetails>> {
        let rows = sqlx::query_as::<_, BorrowingDetailsRow>(
            r#"
            SELECT br.id, br.book_id, b.title AS book_title, b.author,
                   br.borrowed_at, br.returned_at
            FROM borrowings br
            JOIN books b ON b.id = br.book_id
            WHERE br.user_id = $1
            ORDER BY br.borrowed_at DESC, br.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BorrowingDetails::from).collect())
    }
}

fn already_borrowed() -> AppError {
    AppError::BusinessRule("You have already borrowed this book".to_string())
}

/// Pre-insert checks for a borrow, in the order they are reported.
///
/// `stock` is `None` when the book row was not found.
fn check_borrowable(already_open: bool, stock: Option<i32>) -> AppResult<()> {
    if already_open {
        return Err(already_borrowed());
    }
    match stock {
        None => Err(book_not_found()),
        Some(stock) if stock <= 0 => {
            Err(AppError::BusinessRule("Book is not available".to_string()))
        }
        Some(_) => Ok(()),
    }
}

fn check_owner(borrowing: &Borrowing, caller_id: i32) -> AppResult<()> {
    if borrowing.user_id != caller_id {
        return Err(AppError::Authorization(
            "You can only return your own borrowed books".to_string(),
        ));
    }
    Ok(())
}
