use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use crate::{config::AppConfig, error::AppError, models::Role};

pub mod google;
pub mod password;
pub mod roles;
pub mod token;

pub use google::{
    GoogleIdentity, GoogleTokenInfoVerifier, IdentityState, IdentityVerifier,
    StaticIdentityVerifier,
};
pub use password::{dummy_password_hash, hash_password, reject_password, verify_password};
pub use roles::RolePolicy;
pub use token::{Claims, TOKEN_TTL_SECS, TokenError, issue_token, verify_token};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// AuthUser
///
/// The verified identity of a request, taken from the session token alone.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    // Role name as carried in the token; compared case-insensitively.
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Usable as a handler argument on any route that needs a session. The token is
/// read with `extract_token` and verified against the configured secret; there is
/// no datastore lookup.
///
/// Rejection: `AppError::Unauthenticated` (401) on a missing, malformed or
/// expired token.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))?;

        let claims = verify_token(&token, &config.jwt_secret).inspect_err(|e| {
            warn!(reason = %e, path = %parts.uri.path(), "rejected session token");
        })?;

        Ok(AuthUser::from(claims))
    }
}

/// extract_token
///
/// The one place a session token is read from a request: the `token` cookie
/// first, then an `Authorization: Bearer` header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string());

    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| {
            let (scheme, token) = raw.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// authorize
///
/// The role gate predicate: passes when the user's role matches one of
/// `allowed` (case-insensitive), otherwise `Forbidden`.
pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed
        .iter()
        .any(|role| user.role.eq_ignore_ascii_case(role.as_str()))
    {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = %user.role, "role gate denied request");
        Err(AppError::Forbidden)
    }
}

/// require_admin
///
/// Route-layer middleware guarding every mutating route. It runs before the
/// body is read: a missing session is rejected by the `AuthUser` extractor with
/// 401, a non-admin session with 403.
pub async fn require_admin(user: AuthUser, request: Request, next: Next) -> Result<Response, AppError> {
    authorize(&user, &[Role::Admin])?;
    Ok(next.run(request).await)
}

/// Builds the `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, secure: bool) -> Result<HeaderValue, AppError> {
    cookie_header(token, TOKEN_TTL_SECS, secure)
}

/// Builds the `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    cookie_header("", 0, secure)
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; HttpOnly; Path=/; Max-Age={max_age}; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("invalid session cookie: {e}")))
}
