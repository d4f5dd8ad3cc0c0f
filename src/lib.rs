use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod localization;
pub mod models;
pub mod repository;
pub mod roles;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::{Capability, RoleGuard, TokenVerifierState, VerifiedActor};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use localization::LocalizationResolver;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_content, handlers::get_content, handlers::get_content_translations,
        handlers::get_calendar, handlers::get_comments, handlers::get_me,
        handlers::add_comment, handlers::approve_comment, handlers::create_content,
        handlers::set_content_published, handlers::delete_content, handlers::assign_moderator,
        handlers::list_roles, handlers::update_role, handlers::list_users,
        handlers::create_user, handlers::set_user_role, handlers::issue_token
    ),
    components(
        schemas(
            models::ContentKind, models::ContentItem, models::LocalizedContent, models::Comment,
            models::User, models::TranslationInput, models::CreateContentRequest,
            models::CreateCommentRequest, models::AssignModeratorRequest,
            models::UpdateRoleRequest, models::CreateUserRequest, models::AssignRoleRequest,
            models::IssueTokenRequest, models::IssueTokenResponse, models::ContentView,
            models::TranslationsView, localization::Locale, roles::RoleId, roles::Role,
            auth::Accountability,
        )
    ),
    tags(
        (name = "gov-portal", description = "Government Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state handed to every router. Cheap to clone: services sit
/// behind `Arc`s and the rest is small configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Signs and verifies bearer tokens with the shared secret.
    pub verifier: TokenVerifierState,
    /// Fallback chain for localized content.
    pub localizer: LocalizationResolver,
}

impl AppState {
    /// Assembles the state from a repository and a loaded configuration.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let verifier: TokenVerifierState = Arc::new(auth::TokenVerifier::from_config(&config));
        let localizer = LocalizationResolver::new(config.default_locale);
        Self {
            repo,
            config,
            verifier,
            localizer,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenVerifierState {
    fn from_ref(app_state: &AppState) -> TokenVerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for LocalizationResolver {
    fn from_ref(app_state: &AppState) -> LocalizationResolver {
        app_state.localizer
    }
}

/// auth_middleware
///
/// Hard gate for protected routers. `VerifiedActor` rejects with 401 before the handler
/// runs unless the bearer token verifies against the shared secret.
async fn auth_middleware(_actor: VerifiedActor, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, applies scoped and global middleware, and registers the
/// application state.
///
/// Per request: accountability is attached first (never rejects), then protected
/// routers run the hard gate, then admin routes check the `Admin` capability.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::comment_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // route_layer order: the last one added runs first, so the hard gate answers
        // 401 before the capability guard can answer 403.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(
                    RoleGuard::new(Capability::Admin),
                    auth::require_capability,
                ))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        .layer(middleware::from_fn(auth::attach_accountability))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set by the layer above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
