//! API handlers for the library REST endpoints

pub mod auth;
pub mod books;
pub mod borrowings;
pub mod categories;
pub mod health;
pub mod openapi;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{
    auth::{authenticate, require_admin},
    AppState,
};

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Catalog administration
    let admin = Router::new()
        .route("/create-book", post(books::create_book))
        .route("/books/:id", put(books::update_book))
        .route("/books/:id/increase-stock", put(books::increase_stock))
        .route("/books/:id/decrease-stock", put(books::decrease_stock))
        .route("/books/:id/delete", delete(books::delete_book))
        .route("/create-category", post(categories::create_category))
        .route("/delete-category/:id", delete(categories::delete_category))
        .route_layer(middleware::from_fn(require_admin));

    // Any authenticated user
    let protected = Router::new()
        .route("/books", get(books::list_books))
        .route("/books/search", get(books::search_books))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/borrow", post(borrowings::borrow_book))
        .route("/borrowings/:id/return", put(borrowings::return_book))
        .route("/my-borrowings", get(borrowings::my_borrowings))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            state.services.tokens.clone(),
            authenticate,
        ));

    let api = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api)
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
