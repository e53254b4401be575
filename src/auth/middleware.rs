//! Request gate for protected routes.
//!
//! Two stages, applied as axum middleware in this order:
//!
//! 1. [`authenticate`] verifies the `Authorization: Bearer <token>` header and
//!    stores the caller's [`CurrentUser`] in the request extensions.
//! 2. [`require_admin`] rejects callers whose role is not admin.
//!
//! Handlers learn who is calling only through [`AuthenticatedUser`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use super::{CurrentUser, TokenService};
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticate the request and attach the caller's identity
pub async fn authenticate(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_identity(&tokens, &request)?;
    tracing::debug!(user_id = user.user_id, role = %user.role, "Request authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Require an authenticated admin. Must be layered inside [`authenticate`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Authentication("User context not found".to_string()))?;

    if !user.is_admin() {
        tracing::warn!(
            user_id = user.user_id,
            path = %request.uri().path(),
            "Admin route refused"
        );
        return Err(AppError::Authorization("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

fn resolve_identity(tokens: &TokenService, request: &Request) -> Result<CurrentUser, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Authentication("Authorization header required".to_string()))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| AppError::Authentication("Invalid authorization format".to_string()))?;

    if token.is_empty() {
        return Err(AppError::Authentication("Token required".to_string()));
    }

    let claims = tokens.verify(token).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        AppError::Authentication("Invalid token".to_string())
    })?;

    Ok(claims.into())
}

/// Extractor for the identity attached by [`authenticate`]
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError::Authentication("User context not found".to_string()))
    }
}
