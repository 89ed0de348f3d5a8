use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Every mutating content route. The whole router is wrapped in the
/// `require_admin` route layer, which rejects missing sessions (401) and
/// non-admin roles (403) before the body is read or any handler runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(handlers::projects::create_project))
        .route(
            "/projects/{id}",
            put(handlers::projects::update_project).delete(handlers::projects::delete_project),
        )
        .route(
            "/achievements",
            post(handlers::achievements::create_achievement),
        )
        .route(
            "/achievements/{id}",
            put(handlers::achievements::update_achievement)
                .delete(handlers::achievements::delete_achievement),
        )
        .route("/team", post(handlers::team::create_team_member))
        // DELETE /team/{id} deactivates the member instead of removing the row.
        .route(
            "/team/{id}",
            put(handlers::team::update_team_member).delete(handlers::team::delete_team_member),
        )
        .route("/courses", post(handlers::courses::create_course))
        .route(
            "/courses/{id}",
            put(handlers::courses::update_course).delete(handlers::courses::delete_course),
        )
}
