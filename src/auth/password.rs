use std::sync::LazyLock;

use crate::error::AppError;

// Compared against when an account has no password, so every rejected sign-in
// pays for one bcrypt verification.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    bcrypt::hash("portfolio-api-placeholder", bcrypt::DEFAULT_COST).unwrap_or_default()
});

/// hash_password
///
/// Salted bcrypt hash at `bcrypt::DEFAULT_COST`. Runs on the blocking pool so a
/// slow hash does not stall the async workers.
pub async fn hash_password(plaintext: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// A malformed stored hash verifies as `false` rather than erroring.
pub async fn verify_password(plaintext: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// dummy_password_hash
///
/// Bcrypt hash at `DEFAULT_COST` that no submitted password is expected to
/// match. Computed on first use.
pub fn dummy_password_hash() -> &'static str {
    DUMMY_HASH.as_str()
}

/// reject_password
///
/// Runs the same bcrypt verification as `verify_password` against the dummy
/// hash and always answers `false`. Used when the account is unknown or has
/// no password hash.
pub async fn reject_password(plaintext: String) -> bool {
    tokio::task::spawn_blocking(move || {
        let _ = bcrypt::verify(plaintext, dummy_password_hash());
    })
    .await
    .ok();
    false
}
