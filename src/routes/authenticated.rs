use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Endpoints for any signed-in user regardless of role. The session is checked
/// by the route layer in `create_router`, and the handlers take `AuthUser` to
/// learn who is calling.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(handlers::auth::me))
        // POST /auth/logout
        // Clears the session cookie.
        .route("/auth/logout", post(handlers::auth::logout))
        // POST /auth/change-password
        // Verifies the current password before storing a new hash.
        .route(
            "/auth/change-password",
            post(handlers::auth::change_password),
        )
}
