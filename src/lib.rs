//! Library Server
//!
//! REST JSON API for a small library: user registration and login, a catalog
//! of books and categories, and a transactional borrow/return ledger that
//! keeps shelf stock consistent.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
