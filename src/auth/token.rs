//! Access token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying `{userId, username, role, exp}`. There is no
//! server-side revocation: validity depends only on signature and expiry, so a
//! role change takes effect once the user's current token expires.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AuthConfig, MAX_TOKEN_LIFETIME_HOURS},
    models::user::Role,
};

/// Algorithms a token header may declare. Anything else (`none`, RSA, EC)
/// is rejected before the signature is looked at.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token service misconfigured: {0}")]
    Configuration(&'static str),
    #[error("failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
    #[error("token signature or algorithm is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

/// Claim set embedded in every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "userId")]
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    /// Expiration (Unix timestamp, seconds)
    pub exp: i64,
}

/// Stateless token issuer/verifier built once from [`AuthConfig`].
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Result<Self, TokenError> {
        if config.jwt_secret.trim().is_empty() {
            return Err(TokenError::Configuration("signing secret is empty"));
        }
        let lifetime = Some(config.jwt_expiration_hours)
            .filter(|hours| *hours <= MAX_TOKEN_LIFETIME_HOURS)
            .and_then(|hours| i64::try_from(hours).ok())
            .and_then(Duration::try_hours)
            .ok_or(TokenError::Configuration("token lifetime is out of range"))?;
        let secret = config.jwt_secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        })
    }

    /// Issue a token for the given identity, valid for the configured lifetime
    pub fn issue(&self, user_id: i32, username: &str, role: Role) -> Result<String, TokenError> {
        let claims = TokenClaims {
            user_id,
            username: username.to_string(),
            role,
            exp: (Utc::now() + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Verify signature, algorithm family, expiry and claim shape
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let algorithm = header_algorithm(token).ok_or(TokenError::Malformed)?;
        if !matches!(algorithm.parse::<Algorithm>(), Ok(alg) if HMAC_ALGORITHMS.contains(&alg)) {
            return Err(TokenError::InvalidSignature);
        }

        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}

/// Read the raw `alg` value from the token header.
///
/// `jsonwebtoken` cannot parse headers whose algorithm it does not know (such
/// as `none`), so the header segment is inspected directly.
fn header_algorithm(token: &str) -> Option<String> {
    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    let header: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    header.get("alg")?.as_str().map(str::to_string)
}
