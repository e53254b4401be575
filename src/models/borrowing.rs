//! Borrowing (ledger) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Borrowing row from database. Open while `returned_at` is null.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Borrowed,
    Returned,
}

impl BorrowingStatus {
    pub fn from_returned_at(returned_at: Option<DateTime<Utc>>) -> Self {
        match returned_at {
            Some(_) => BorrowingStatus::Returned,
            None => BorrowingStatus::Borrowed,
        }
    }
}

/// Internal row structure for the borrowing history query
#[derive(Debug, Clone, FromRow)]
pub struct BorrowingDetailsRow {
    id: i32,
    book_id: i32,
    book_title: String,
    author: String,
    borrowed_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
}

impl From<BorrowingDetailsRow> for BorrowingDetails {
    fn from(row: BorrowingDetailsRow) -> Self {
        BorrowingDetails {
            id: row.id,
            book_id: row.book_id,
            book_title: row.book_title,
            author: row.author,
            borrowed_at: row.borrowed_at,
            returned_at: row.returned_at,
            status: BorrowingStatus::from_returned_at(row.returned_at),
        }
    }
}

/// Borrowing with book details for the caller's history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub author: String,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
}
