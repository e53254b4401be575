//! Authentication and authorization
//!
//! - [`password`]: argon2 credential hashing
//! - [`token`]: signed, time-limited access tokens
//! - [`middleware`]: request gate that authenticates the bearer token and
//!   optionally requires the admin role

pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::user::Role;

pub use middleware::{authenticate, require_admin, AuthenticatedUser};
pub use token::{TokenClaims, TokenService};

/// Identity of the caller, resolved from a verified token.
///
/// Inserted into the request extensions by [`authenticate`]; handlers read it
/// through [`AuthenticatedUser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<TokenClaims> for CurrentUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            role: claims.role,
        }
    }
}
