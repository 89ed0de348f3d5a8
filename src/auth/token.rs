use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{error::AppError, models::User};

/// Session lifetime: seven days, in seconds. Also used as the cookie Max-Age.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Claims
///
/// Payload of a session token, signed with HS256 under `JWT_SECRET`. The role is
/// carried in the token, so the gate can decide without a datastore lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,
    #[error("Token has expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Unauthenticated(err.to_string())
    }
}

/// issue_token
///
/// Signs a token for `user` that expires `TOKEN_TTL_SECS` from now.
pub fn issue_token(user: &User, secret: &str) -> Result<String, AppError> {
    issue_token_at(user, secret, Utc::now())
}

/// Same as `issue_token` with an explicit issue time.
pub fn issue_token_at(
    user: &User,
    secret: &str,
    issued_at: DateTime<Utc>,
) -> Result<String, AppError> {
    let iat = issued_at.timestamp();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        iat: iat.max(0) as usize,
        exp: (iat + TOKEN_TTL_SECS).max(0) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))
}

/// verify_token
///
/// Checks the signature and expiry. A bad signature or malformed token is
/// `Invalid`; a token past its expiry is `Expired`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}
