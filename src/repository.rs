use crate::{
    localization::LocaleTag,
    models::{
        Comment, ContentItem, ContentKind, CreateContentRequest, LocalizedContent,
        UpdateRoleRequest, User,
    },
    roles::{Role, RoleId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;

/// Repository Trait
///
/// The persistence contract the handlers and the role seed depend on. The store
/// loads rows; deciding which translation to show is the localization layer's job.
///
/// Methods log storage failures and degrade to empty/`None`/`false`, so read paths
/// stay available when a single query fails.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Content ---
    async fn list_items(&self, kind: ContentKind, include_unpublished: bool) -> Vec<ContentItem>;
    async fn get_item(&self, id: Uuid) -> Option<ContentItem>;
    /// All translations of one item, in insertion order.
    async fn get_translations(&self, item_id: Uuid) -> Vec<LocalizedContent>;
    /// Translations of several items at once, grouped by item and in insertion order.
    async fn get_translations_for(&self, item_ids: &[Uuid]) -> Vec<LocalizedContent>;
    /// Creates the item and its translations atomically.
    async fn create_item(
        &self,
        kind: ContentKind,
        req: CreateContentRequest,
    ) -> Option<(ContentItem, Vec<LocalizedContent>)>;
    async fn set_item_published(&self, id: Uuid, published: bool) -> Option<ContentItem>;
    /// Deletes the item; translations and comments go with it.
    async fn delete_item(&self, id: Uuid) -> bool;

    // --- Comments & Moderation ---
    async fn add_comment(&self, item_id: Uuid, author_id: Uuid, body: String) -> Option<Comment>;
    async fn get_comments(&self, item_id: Uuid, include_pending: bool) -> Vec<Comment>;
    async fn get_comment(&self, id: i64) -> Option<Comment>;
    async fn approve_comment(&self, id: i64) -> Option<Comment>;
    async fn set_comment_moderator(&self, id: i64, moderator_id: Uuid) -> Option<Comment>;

    // --- Roles ---
    async fn get_role(&self, id: RoleId) -> Option<Role>;
    async fn get_roles(&self) -> Vec<Role>;
    /// Returns true only if a row was inserted; an existing role is a no-op.
    async fn insert_role(&self, role: Role) -> bool;
    async fn update_role(&self, id: RoleId, req: UpdateRoleRequest) -> Option<Role>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_users(&self) -> Vec<User>;
    async fn create_user(&self, email: String, role: RoleId) -> Result<User, CreateUserError>;
    async fn set_user_role(&self, id: Uuid, role: RoleId) -> Option<User>;
}

/// CreateUserError
///
/// Why `create_user` refused to insert. Kept apart so a taken email is not confused
/// with a missing role or an unavailable store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("role {0} does not exist")]
    UnknownRole(RoleId),
    #[error("user could not be stored")]
    Storage,
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row Types ---
// Enumerated columns are stored as TEXT and parsed on the way out.

#[derive(FromRow)]
struct ContentItemRow {
    id: Uuid,
    kind: String,
    image_key: Option<String>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = String;

    fn try_from(row: ContentItemRow) -> Result<Self, Self::Error> {
        Ok(ContentItem {
            id: row.id,
            kind: row.kind.parse()?,
            image_key: row.image_key,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            published: row.published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TranslationRow {
    id: Uuid,
    item_id: Uuid,
    locale: String,
    title: String,
    description: String,
    content: String,
}

impl From<TranslationRow> for LocalizedContent {
    fn from(row: TranslationRow) -> Self {
        LocalizedContent {
            id: row.id,
            item_id: row.item_id,
            // Unknown codes are carried through untouched.
            locale: LocaleTag::from(row.locale),
            title: row.title,
            description: row.description,
            content: row.content,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    item_id: Uuid,
    author_id: Uuid,
    moderator_id: Option<Uuid>,
    body: String,
    approved: bool,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            item_id: row.item_id,
            author_id: row.author_id,
            moderator_id: row.moderator_id,
            body: row.body,
            approved: row.approved,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: String,
    app_access: bool,
    admin_access: bool,
}

impl TryFrom<RoleRow> for Role {
    type Error = String;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Role {
            id: row.id.parse()?,
            app_access: row.app_access,
            admin_access: row.admin_access,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            role: row.role.parse()?,
        })
    }
}

/// Converts fetched rows, logging and dropping any row with an unparsable enum column.
fn convert_rows<R, T>(rows: Vec<R>, context: &str) -> Vec<T>
where
    T: TryFrom<R, Error = String>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("{} skipped row: {}", context, e);
                None
            }
        })
        .collect()
}

fn convert_row<R, T>(row: Option<R>, context: &str) -> Option<T>
where
    T: TryFrom<R, Error = String>,
{
    row.and_then(|row| match T::try_from(row) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("{} invalid row: {}", context, e);
            None
        }
    })
}

const ITEM_COLUMNS: &str =
    "id, kind, image_key, starts_at, ends_at, published, created_at, updated_at";
const TRANSLATION_COLUMNS: &str = "id, item_id, locale, title, description, content";
const COMMENT_COLUMNS: &str = "id, item_id, author_id, moderator_id, body, approved, created_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an item and its translations inside one transaction.
    async fn insert_item(
        &self,
        kind: ContentKind,
        req: CreateContentRequest,
    ) -> Result<(ContentItem, Vec<LocalizedContent>), sqlx::Error> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let item_row = sqlx::query_as::<_, ContentItemRow>(&format!(
            "INSERT INTO content_items (id, kind, image_key, starts_at, ends_at, published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(req.image_key)
        .bind(req.starts_at)
        .bind(req.ends_at)
        .bind(req.published)
        .fetch_one(&mut *tx)
        .await?;

        let item = ContentItem::try_from(item_row).map_err(|e| sqlx::Error::Decode(e.into()))?;

        let mut translations = Vec::with_capacity(req.translations.len());
        for (position, translation) in req.translations.into_iter().enumerate() {
            let row = sqlx::query_as::<_, TranslationRow>(&format!(
                "INSERT INTO content_translations (id, item_id, locale, position, title, description, content) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {TRANSLATION_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(item.id)
            .bind(String::from(translation.locale))
            .bind(position as i32)
            .bind(translation.title)
            .bind(translation.description)
            .bind(translation.content)
            .fetch_one(&mut *tx)
            .await?;
            translations.push(LocalizedContent::from(row));
        }

        tx.commit().await?;
        Ok((item, translations))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_items
    ///
    /// Newest first. Unpublished items are only included when explicitly requested
    /// (administrators).
    async fn list_items(&self, kind: ContentKind, include_unpublished: bool) -> Vec<ContentItem> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM content_items \
             WHERE kind = $1 AND (published = true OR $2) \
             ORDER BY created_at DESC"
        );
        match sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(kind.as_str())
            .bind(include_unpublished)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => convert_rows(rows, "list_items"),
            Err(e) => {
                tracing::error!("list_items error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_item(&self, id: Uuid) -> Option<ContentItem> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM content_items WHERE id = $1");
        let row = sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_item error: {:?}", e);
                None
            });
        convert_row(row, "get_item")
    }

    async fn get_translations(&self, item_id: Uuid) -> Vec<LocalizedContent> {
        let query = format!(
            "SELECT {TRANSLATION_COLUMNS} FROM content_translations \
             WHERE item_id = $1 ORDER BY position ASC"
        );
        sqlx::query_as::<_, TranslationRow>(&query)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(LocalizedContent::from).collect())
            .unwrap_or_else(|e| {
                tracing::error!("get_translations error: {:?}", e);
                vec![]
            })
    }

    /// get_translations_for
    ///
    /// Batch variant used by list endpoints to avoid one query per item.
    async fn get_translations_for(&self, item_ids: &[Uuid]) -> Vec<LocalizedContent> {
        if item_ids.is_empty() {
            return vec![];
        }
        let query = format!(
            "SELECT {TRANSLATION_COLUMNS} FROM content_translations \
             WHERE item_id = ANY($1) ORDER BY item_id, position ASC"
        );
        sqlx::query_as::<_, TranslationRow>(&query)
            .bind(item_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(LocalizedContent::from).collect())
            .unwrap_or_else(|e| {
                tracing::error!("get_translations_for error: {:?}", e);
                vec![]
            })
    }

    async fn create_item(
        &self,
        kind: ContentKind,
        req: CreateContentRequest,
    ) -> Option<(ContentItem, Vec<LocalizedContent>)> {
        match self.insert_item(kind, req).await {
            Ok(created) => Some(created),
            Err(e) => {
                tracing::error!("create_item error: {:?}", e);
                None
            }
        }
    }

    async fn set_item_published(&self, id: Uuid, published: bool) -> Option<ContentItem> {
        let query = format!(
            "UPDATE content_items SET published = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(id)
            .bind(published)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("set_item_published error: {:?}", e);
                None
            });
        convert_row(row, "set_item_published")
    }

    /// delete_item
    ///
    /// Translations and comments are removed by `ON DELETE CASCADE`.
    async fn delete_item(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM content_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_item error: {:?}", e);
                false
            }
        }
    }

    // --- COMMENT ACTIONS ---

    async fn add_comment(&self, item_id: Uuid, author_id: Uuid, body: String) -> Option<Comment> {
        let query = format!(
            "INSERT INTO comments (item_id, author_id, body) VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, CommentRow>(&query)
            .bind(item_id)
            .bind(author_id)
            .bind(body)
            .fetch_one(&self.pool)
            .await
            .map(Comment::from)
            .map_err(|e| tracing::error!("add_comment error: {:?}", e))
            .ok()
    }

    async fn get_comments(&self, item_id: Uuid, include_pending: bool) -> Vec<Comment> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE item_id = $1 AND (approved = true OR $2) \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, CommentRow>(&query)
            .bind(item_id)
            .bind(include_pending)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(Comment::from).collect())
            .unwrap_or_else(|e| {
                tracing::error!("get_comments error: {:?}", e);
                vec![]
            })
    }

    async fn get_comment(&self, id: i64) -> Option<Comment> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        sqlx::query_as::<_, CommentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_comment error: {:?}", e);
                None
            })
            .map(Comment::from)
    }

    async fn approve_comment(&self, id: i64) -> Option<Comment> {
        let query =
            format!("UPDATE comments SET approved = true WHERE id = $1 RETURNING {COMMENT_COLUMNS}");
        sqlx::query_as::<_, CommentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("approve_comment error: {:?}", e);
                None
            })
            .map(Comment::from)
    }

    async fn set_comment_moderator(&self, id: i64, moderator_id: Uuid) -> Option<Comment> {
        let query = format!(
            "UPDATE comments SET moderator_id = $2 WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, CommentRow>(&query)
            .bind(id)
            .bind(moderator_id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("set_comment_moderator error: {:?}", e);
                None
            })
            .map(Comment::from)
    }

    // --- ROLES ---

    async fn get_role(&self, id: RoleId) -> Option<Role> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, app_access, admin_access FROM roles WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_role error: {:?}", e);
            None
        });
        convert_row(row, "get_role")
    }

    async fn get_roles(&self) -> Vec<Role> {
        match sqlx::query_as::<_, RoleRow>("SELECT id, app_access, admin_access FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => convert_rows(rows, "get_roles"),
            Err(e) => {
                tracing::error!("get_roles error: {:?}", e);
                vec![]
            }
        }
    }

    /// insert_role
    ///
    /// `ON CONFLICT DO NOTHING` turns a concurrent seed into a no-op instead of a
    /// duplicate-key failure.
    async fn insert_role(&self, role: Role) -> bool {
        let result = sqlx::query(
            "INSERT INTO roles (id, app_access, admin_access) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
        )
        .bind(role.id.as_str())
        .bind(role.app_access)
        .bind(role.admin_access)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("insert_role error: {:?}", e);
                false
            }
        }
    }

    async fn update_role(&self, id: RoleId, req: UpdateRoleRequest) -> Option<Role> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            UPDATE roles
            SET app_access = COALESCE($2, app_access),
                admin_access = COALESCE($3, admin_access)
            WHERE id = $1
            RETURNING id, app_access, admin_access
            "#,
        )
        .bind(id.as_str())
        .bind(req.app_access)
        .bind(req.admin_access)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_role error: {:?}", e);
            None
        });
        convert_row(row, "update_role")
    }

    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Option<User> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            });
        convert_row(row, "get_user")
    }

    async fn get_users(&self) -> Vec<User> {
        match sqlx::query_as::<_, UserRow>("SELECT id, email, role FROM users ORDER BY email")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => convert_rows(rows, "get_users"),
            Err(e) => {
                tracing::error!("get_users error: {:?}", e);
                vec![]
            }
        }
    }

    /// `ON CONFLICT (email) DO NOTHING` returns no row for a taken email; a missing
    /// role surfaces as a foreign key violation.
    async fn create_user(&self, email: String, role: RoleId) -> Result<User, CreateUserError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, role) VALUES ($1, $2, $3) ON CONFLICT (email) DO NOTHING RETURNING id, email, role",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(None) => Err(CreateUserError::DuplicateEmail),
            Ok(Some(row)) => convert_row(Some(row), "create_user").ok_or(CreateUserError::Storage),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(CreateUserError::UnknownRole(role))
            }
            Err(e) => {
                tracing::error!("create_user error: {:?}", e);
                Err(CreateUserError::Storage)
            }
        }
    }

    async fn set_user_role(&self, id: Uuid, role: RoleId) -> Option<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING id, email, role",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_user_role error: {:?}", e);
            None
        });
        convert_row(row, "set_user_role")
    }
}
