//! Borrowing service

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{Borrowing, BorrowingDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
}

impl BorrowingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow one copy of a book
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Borrowing> {
        let result = self.repository.borrowings.borrow(user_id, book_id).await;
        match &result {
            Ok(borrowing) => tracing::info!(
                user_id,
                book_id,
                borrowing_id = borrowing.id,
                "Book borrowed"
            ),
            Err(e) => log_rejection("borrow", user_id, book_id, e),
        }
        result
    }

    /// Return a borrowed book. Only the borrower may return it.
    pub async fn return_book(&self, borrowing_id: i32, caller_id: i32) -> AppResult<Borrowing> {
        let result = self
            .repository
            .borrowings
            .return_borrowing(borrowing_id, caller_id)
            .await;
        match &result {
            Ok(borrowing) => tracing::info!(
                user_id = caller_id,
                book_id = borrowing.book_id,
                borrowing_id,
                "Book returned"
            ),
            Err(e) => log_rejection("return", caller_id, borrowing_id, e),
        }
        result
    }

    /// Borrowing history of a user, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<BorrowingDetails>> {
        self.repository.borrowings.list_for_user(user_id).await
    }
}

fn log_rejection(operation: &str, user_id: i32, target_id: i32, err: &AppError) {
    match err {
        // Logged with their cause by the error response
        AppError::Database(_) | AppError::Internal(_) => {}
        AppError::Authorization(_) => {
            tracing::warn!(operation, user_id, target_id, "Borrowing rejected: {}", err)
        }
        _ => tracing::info!(operation, user_id, target_id, "Borrowing rejected: {}", err),
    }
}
