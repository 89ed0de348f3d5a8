use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints: the read side of every content type, the health
/// probe and the sign-in flows.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; never touches the datastore.
        .route("/health", get(handlers::health))
        // --- Identity ---
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/signin", post(handlers::auth::signin))
        .route("/auth/google", post(handlers::auth::google_signin))
        // GET /auth/admins
        // Public list of admins (id, name, avatar) for contributor pickers.
        .route("/auth/admins", get(handlers::auth::list_admins))
        // --- Content (read-only) ---
        .route("/projects", get(handlers::projects::list_projects))
        .route("/projects/{id}", get(handlers::projects::get_project))
        .route(
            "/achievements",
            get(handlers::achievements::list_achievements),
        )
        .route(
            "/achievements/{id}",
            get(handlers::achievements::get_achievement),
        )
        // GET /team lists active members only; GET /team/{id} also finds
        // deactivated ones.
        .route("/team", get(handlers::team::list_team_members))
        .route("/team/{id}", get(handlers::team::get_team_member))
        .route("/courses", get(handlers::courses::list_courses))
        .route("/courses/{id}", get(handlers::courses::get_course))
}
