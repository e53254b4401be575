//! Data models for the library server

pub mod book;
pub mod borrowing;
pub mod category;
pub mod user;

// Re-export commonly used types
pub use book::BookDetails;
pub use borrowing::{Borrowing, BorrowingDetails, BorrowingStatus};
pub use category::Category;
pub use user::{Role, User};
