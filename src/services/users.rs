//! User registration and authentication service

use validator::Validate;

use crate::{
    auth::{
        password::{hash_password, verify_password},
        TokenService,
    },
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterRequest, Role, User, MAX_USERNAME_LEN},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    tokens: TokenService,
}

impl UsersService {
    pub fn new(repository: Repository, tokens: TokenService) -> Self {
        Self { repository, tokens }
    }

    /// Register a new member account
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;
        let username = normalize_username(&request.username)?;

        if self.repository.users.username_exists(&username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&username, &hash, Role::Member)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check credentials and issue an access token
    pub async fn login(&self, request: LoginRequest) -> AppResult<String> {
        request.validate()?;

        let user = self
            .repository
            .users
            .get_by_username(request.username.trim())
            .await?
            .ok_or_else(|| {
                tracing::info!(username = %request.username, "Login failed: unknown user");
                invalid_credentials()
            })?;

        verify_password(&user.password, &request.password).map_err(|e| {
            tracing::info!(user_id = user.id, "Login failed: {}", e);
            AppError::from(e)
        })?;

        let token = self.tokens.issue(user.id, &user.username, user.role)?;
        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok(token)
    }

    /// Create the configured admin account if it does not exist yet.
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> AppResult<bool> {
        let username = normalize_username(username)?;
        if password.is_empty() {
            return Err(AppError::Validation("Admin password must not be empty".to_string()));
        }

        if self.repository.users.username_exists(&username).await? {
            tracing::debug!(username = %username, "Bootstrap admin already exists");
            return Ok(false);
        }

        let hash = hash_password(password)?;
        let user = self
            .repository
            .users
            .create(&username, &hash, Role::Admin)
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
        Ok(true)
    }
}

fn invalid_credentials() -> AppError {
    AppError::Authentication("invalid credentials".to_string())
}

fn normalize_username(raw: &str) -> AppResult<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    Ok(username.to_string())
}
