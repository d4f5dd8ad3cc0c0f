use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints for the portal front page and content modules. Unpublished
/// items are hidden unless the request actor is an administrator.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /content/{kind}?lang=az
        // News, documents, events or slider entries in the requested locale.
        .route("/content/{kind}", get(handlers::list_content))
        .route("/content/{kind}/{id}", get(handlers::get_content))
        // GET /content/{kind}/{id}/translations
        // All locales at once, for language switchers.
        .route(
            "/content/{kind}/{id}/translations",
            get(handlers::get_content_translations),
        )
        .route("/content/{kind}/{id}/comments", get(handlers::get_comments))
        // GET /events?from=...&to=...
        .route("/events", get(handlers::get_calendar))
}
