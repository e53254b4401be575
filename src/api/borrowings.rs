//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::borrowing::BorrowingDetails,
};

use super::MessageResponse;

/// Borrow one copy of a book
#[utoipa::path(
    post,
    path = "/api/books/{id}/borrow",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 201, description = "Book borrowed", body = MessageResponse),
        (status = 400, description = "Already borrowed or not available", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    WithRejection(Path(book_id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.borrowings.borrow(user.user_id, book_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Book borrowed successfully")),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/api/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Book returned", body = MessageResponse),
        (status = 403, description = "Borrowing belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrowing not found or already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    WithRejection(Path(borrowing_id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .borrowings
        .return_book(borrowing_id, user.user_id)
        .await?;
    Ok(Json(MessageResponse::new("Book returned successfully")))
}

/// Borrowing history of the caller, newest first
#[utoipa::path(
    get,
    path = "/api/my-borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's borrowings", body = Vec<BorrowingDetails>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state.services.borrowings.list_for_user(user.user_id).await?;
    Ok(Json(borrowings))
}
