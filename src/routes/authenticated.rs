use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Endpoints for signed-in citizens and moderators. The whole router is wrapped in the
/// hard gate by `create_router`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // PUT /comments/{id}/approve
        // Moderator-or-admin check happens in the handler.
        .route("/comments/{id}/approve", put(handlers::approve_comment))
}

/// Comment posting shares its path with the public comment listing, so it is mounted
/// without a route layer: a layered router would also wrap the path's 405 fallback.
/// The handler's `VerifiedActor` extractor is the hard gate and it checks app access
/// itself.
pub fn comment_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /content/{kind}/{id}/comments
        // New comments stay hidden until approved.
        .route("/content/{kind}/{id}/comments", post(handlers::add_comment))
}
