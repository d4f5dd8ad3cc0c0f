use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Content management, moderation assignments, roles, users and token issuance.
/// Mounted under `/admin` behind the hard gate and the `Admin` capability guard.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/content/{kind}
        // Creates an item with its translations in one transaction.
        .route("/content/{kind}", post(handlers::create_content))
        // Item-level operations are keyed by id alone.
        .route("/items/{id}/publish", put(handlers::set_content_published))
        .route("/items/{id}", delete(handlers::delete_content))
        .route("/comments/{id}/moderator", put(handlers::assign_moderator))
        .route("/roles", get(handlers::list_roles))
        .route("/roles/{id}", put(handlers::update_role))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/users/{id}/role", put(handlers::set_user_role))
        // POST /admin/tokens
        // Mints a bearer token from the user's current role flags.
        .route("/tokens", post(handlers::issue_token))
}
