use std::{collections::HashMap, time::SystemTime};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{Accountability, AuthError, Capability, OptionalActor, RoleGuard, VerifiedActor},
    localization::{self, LocaleTag},
    models::{
        AssignModeratorRequest, AssignRoleRequest, Comment, ContentItem, ContentKind,
        ContentView, CreateCommentRequest, CreateContentRequest, CreateUserRequest,
        IssueTokenRequest, IssueTokenResponse, LocalizedContent, TranslationsView,
        UpdateRoleRequest, User,
    },
    repository::CreateUserError,
    roles::{Role, RoleId},
};

// --- Query Structs ---

/// LangQuery
///
/// `?lang=` selects the translation to render. Missing or empty means the default locale.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct LangQuery {
    /// Requested locale code, e.g. `en`.
    pub lang: Option<String>,
}

/// CalendarQuery
///
/// Window for the events calendar; either bound may be omitted.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CalendarQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub lang: Option<String>,
}

// --- Rendering ---

fn is_admin(actor: &Option<Accountability>) -> bool {
    actor.as_ref().is_some_and(|actor| actor.is_admin)
}

/// Renders one item in the requested locale following the fallback chain.
fn render(
    state: &AppState,
    item: ContentItem,
    rows: &[LocalizedContent],
    requested: &LocaleTag,
) -> ContentView {
    let translation = state.localizer.resolve(rows, requested).cloned();
    ContentView {
        id: item.id,
        kind: item.kind,
        image_url: item.image_key.as_deref().map(|key| state.config.media_url(key)),
        starts_at: item.starts_at,
        ends_at: item.ends_at,
        published: item.published,
        created_at: item.created_at,
        translation,
        available_locales: localization::available_locales(rows),
    }
}

/// Loads translations for a page of items in one query and renders each item.
async fn render_many(
    state: &AppState,
    items: Vec<ContentItem>,
    requested: &LocaleTag,
) -> Vec<ContentView> {
    let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
    let mut grouped: HashMap<Uuid, Vec<LocalizedContent>> = HashMap::new();
    for row in state.repo.get_translations_for(&ids).await {
        grouped.entry(row.item_id).or_default().push(row);
    }

    items
        .into_iter()
        .map(|item| {
            let rows = grouped.remove(&item.id).unwrap_or_default();
            render(state, item, &rows, requested)
        })
        .collect()
}

/// Fetches an item of the given kind that the actor is allowed to see.
async fn visible_item(
    state: &AppState,
    kind: ContentKind,
    id: Uuid,
    actor: &Option<Accountability>,
) -> Result<ContentItem, StatusCode> {
    match state.repo.get_item(id).await {
        Some(item) if item.kind == kind && (item.published || is_admin(actor)) => Ok(item),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

// --- Public Handlers ---

/// list_content
///
/// [Public Route] Lists items of one kind, each rendered in the requested locale.
/// Administrators (per the request actor) also see unpublished items.
#[utoipa::path(
    get,
    path = "/content/{kind}",
    params(("kind" = ContentKind, Path, description = "Content module"), LangQuery),
    responses((status = 200, description = "Localized items", body = [ContentView]))
)]
pub async fn list_content(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
    Path(kind): Path<ContentKind>,
    Query(query): Query<LangQuery>,
) -> Json<Vec<ContentView>> {
    let requested = state.localizer.requested(query.lang.as_deref());
    let items = state.repo.list_items(kind, is_admin(&actor)).await;
    Json(render_many(&state, items, &requested).await)
}

/// get_content
///
/// [Public Route] One item in the requested locale. Falls back to the default locale,
/// then to any available translation.
#[utoipa::path(
    get,
    path = "/content/{kind}/{id}",
    params(
        ("kind" = ContentKind, Path, description = "Content module"),
        ("id" = Uuid, Path, description = "Item ID"),
        LangQuery
    ),
    responses(
        (status = 200, description = "Found", body = ContentView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_content(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    Query(query): Query<LangQuery>,
) -> Result<Json<ContentView>, StatusCode> {
    let item = visible_item(&state, kind, id, &actor).await?;
    let requested = state.localizer.requested(query.lang.as_deref());
    let rows = state.repo.get_translations(item.id).await;
    Ok(Json(render(&state, item, &rows, &requested)))
}

/// get_content_translations
///
/// [Public Route] Every known locale mapped to its translation or `null`.
#[utoipa::path(
    get,
    path = "/content/{kind}/{id}/translations",
    params(
        ("kind" = ContentKind, Path, description = "Content module"),
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Translations by locale", body = TranslationsView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_content_translations(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
) -> Result<Json<TranslationsView>, StatusCode> {
    let item = visible_item(&state, kind, id, &actor).await?;
    let rows = state.repo.get_translations(item.id).await;

    let translations = localization::resolve_all(&rows)
        .into_iter()
        .map(|(locale, row)| (locale, row.cloned()))
        .collect();

    Ok(Json(TranslationsView {
        item_id: item.id,
        translations,
        available_locales: localization::available_locales(&rows),
    }))
}

/// get_calendar
///
/// [Public Route] Published events overlapping the `[from, to]` window, earliest first.
/// Events without a start date are not on the calendar.
#[utoipa::path(
    get,
    path = "/events",
    params(CalendarQuery),
    responses((status = 200, description = "Calendar", body = [ContentView]))
)]
pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Json<Vec<ContentView>> {
    let requested = state.localizer.requested(query.lang.as_deref());

    let mut events: Vec<ContentItem> = state
        .repo
        .list_items(ContentKind::Event, false)
        .await
        .into_iter()
        .filter(|event| {
            let Some(starts_at) = event.starts_at else {
                return false;
            };
            let ends_at = event.ends_at.unwrap_or(starts_at);
            query.to.is_none_or(|to| starts_at <= to) && query.from.is_none_or(|from| ends_at >= from)
        })
        .collect();
    events.sort_by_key(|event| event.starts_at);

    Json(render_many(&state, events, &requested).await)
}

/// get_comments
///
/// [Public Route] Approved comments of a visible item, oldest first.
#[utoipa::path(
    get,
    path = "/content/{kind}/{id}/comments",
    params(
        ("kind" = ContentKind, Path, description = "Content module"),
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_comments(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
) -> Result<Json<Vec<Comment>>, StatusCode> {
    let item = visible_item(&state, kind, id, &actor).await?;
    Ok(Json(state.repo.get_comments(item.id, false).await))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The verified actor behind the bearer token.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Actor", body = Accountability),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn get_me(VerifiedActor(actor): VerifiedActor) -> Json<Accountability> {
    Json(actor)
}

/// add_comment
///
/// [Authenticated Route] Posts a comment on a published item. Comments start unapproved.
/// The token is verified before the app-access capability is checked.
#[utoipa::path(
    post,
    path = "/content/{kind}/{id}/comments",
    params(
        ("kind" = ContentKind, Path, description = "Content module"),
        ("id" = Uuid, Path, description = "Item ID")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 400, description = "Empty comment"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "No app access"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_comment(
    VerifiedActor(actor): VerifiedActor,
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), Response> {
    RoleGuard::new(Capability::AppAccess)
        .check(Some(&actor))
        .map_err(IntoResponse::into_response)?;

    let body = payload.body.trim();
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }

    // Comments are only accepted on content the public can see.
    let item = visible_item(&state, kind, id, &None)
        .await
        .map_err(IntoResponse::into_response)?;
    match state.repo.add_comment(item.id, actor.id, body.to_string()).await {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment))),
        None => Err(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
    }
}

/// approve_comment
///
/// [Authenticated Route] Approves a pending comment. Only the comment's moderator or
/// an administrator may approve it.
#[utoipa::path(
    put,
    path = "/comments/{id}/approve",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Approved", body = Comment),
        (status = 403, description = "Not moderator"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn approve_comment(
    OptionalActor(actor): OptionalActor,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Comment>, StatusCode> {
    let comment = state.repo.get_comment(id).await.ok_or(StatusCode::NOT_FOUND)?;

    let allowed = actor
        .as_ref()
        .is_some_and(|actor| actor.is_admin || comment.moderator_id == Some(actor.id));
    if !allowed {
        return Err(StatusCode::FORBIDDEN);
    }

    state
        .repo
        .approve_comment(id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// --- Admin Handlers ---
// The admin router is wrapped in the hard gate and the `Admin` capability guard.

/// create_content
///
/// [Admin Route] Creates an item together with its translations. Each known locale
/// may appear at most once.
#[utoipa::path(
    post,
    path = "/admin/content/{kind}",
    params(("kind" = ContentKind, Path, description = "Content module")),
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Created", body = TranslationsView),
        (status = 400, description = "Invalid translations")
    )
)]
pub async fn create_content(
    State(state): State<AppState>,
    Path(kind): Path<ContentKind>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<TranslationsView>), StatusCode> {
    if let Err(reason) = payload.validate() {
        tracing::debug!(?reason, "rejected content payload");
        return Err(StatusCode::BAD_REQUEST);
    }

    let (item, rows) = state
        .repo
        .create_item(kind, payload)
        .await
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(item = %item.id, kind = %kind, "content item created");

    let translations = localization::resolve_all(&rows)
        .into_iter()
        .map(|(locale, row)| (locale, row.cloned()))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(TranslationsView {
            item_id: item.id,
            translations,
            available_locales: localization::available_locales(&rows),
        }),
    ))
}

/// set_content_published
///
/// [Admin Route] Publishes or hides an item.
#[utoipa::path(
    put,
    path = "/admin/items/{id}/publish",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = bool,
    responses(
        (status = 200, description = "Updated", body = ContentItem),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_content_published(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(published): Json<bool>,
) -> Result<Json<ContentItem>, StatusCode> {
    state
        .repo
        .set_item_published(id, published)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// delete_content
///
/// [Admin Route] Deletes an item with its translations and comments.
#[utoipa::path(
    delete,
    path = "/admin/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_content(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.repo.delete_item(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// assign_moderator
///
/// [Admin Route] Assigns the user allowed to approve a comment.
#[utoipa::path(
    put,
    path = "/admin/comments/{id}/moderator",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = AssignModeratorRequest,
    responses(
        (status = 200, description = "Assigned", body = Comment),
        (status = 404, description = "Not Found")
    )
)]
pub async fn assign_moderator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignModeratorRequest>,
) -> Result<Json<Comment>, StatusCode> {
    state
        .repo
        .set_comment_moderator(id, payload.moderator_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[utoipa::path(
    get,
    path = "/admin/roles",
    responses((status = 200, description = "Roles", body = [Role]))
)]
pub async fn list_roles(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.repo.get_roles().await)
}

/// update_role
///
/// [Admin Route] Changes a role's capability flags. Tokens already issued keep the
/// flags they were minted with until they expire.
#[utoipa::path(
    put,
    path = "/admin/roles/{id}",
    params(("id" = RoleId, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated", body = Role),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<Role>, StatusCode> {
    state
        .repo
        .update_role(id, payload)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.repo.get_users().await)
}

/// create_user
///
/// [Admin Route] Registers an account. 409 when the email is taken, 400 when the role
/// does not exist, 500 when the store is unavailable.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Invalid email or unknown role"),
        (status = 409, description = "Duplicate"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), StatusCode> {
    let email = payload.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(StatusCode::BAD_REQUEST);
    }
    match state.repo.create_user(email, payload.role).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user))),
        Err(CreateUserError::DuplicateEmail) => Err(StatusCode::CONFLICT),
        Err(CreateUserError::UnknownRole(role)) => {
            tracing::warn!(role = %role, "user creation refused: role not seeded");
            Err(StatusCode::BAD_REQUEST)
        }
        Err(CreateUserError::Storage) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_user_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> Result<Json<User>, StatusCode> {
    state
        .repo
        .set_user_role(id, payload.role)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// issue_token
///
/// [Admin Route] Mints a bearer token for an existing user, carrying the current
/// capability flags of the user's role.
#[utoipa::path(
    post,
    path = "/admin/tokens",
    request_body = IssueTokenRequest,
    responses(
        (status = 200, description = "Token", body = IssueTokenResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(payload): Json<IssueTokenRequest>,
) -> Result<Json<IssueTokenResponse>, StatusCode> {
    let user = state
        .repo
        .get_user(payload.user_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let role = state
        .repo
        .get_role(user.role)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let scope = payload.scope.unwrap_or_else(|| "portal".to_string());
    let token = state
        .verifier
        .issue(user.id, &role, &scope, SystemTime::now())
        .map_err(|e: AuthError| e.status())?;

    Ok(Json(IssueTokenResponse {
        token,
        expires_in: state.config.token_ttl_secs,
    }))
}
