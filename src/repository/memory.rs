use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CreateUserError, Repository};
use crate::{
    models::{
        Comment, ContentItem, ContentKind, CreateContentRequest, LocalizedContent,
        UpdateRoleRequest, User,
    },
    roles::{Role, RoleId},
};

#[derive(Default)]
struct MemoryStore {
    items: Vec<ContentItem>,
    // Insertion order doubles as the translation `position`.
    translations: Vec<LocalizedContent>,
    comments: Vec<Comment>,
    next_comment_id: i64,
    roles: Vec<Role>,
    users: Vec<User>,
}

/// InMemoryRepository
///
/// A `Repository` held entirely in memory, used by the test suites and for running the
/// router without a database. Mirrors the Postgres constraints that matter to callers:
/// unique `(item_id, locale)`, unique role ids and emails, cascade on item delete.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<MemoryStore>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a translation without validation, the way a legacy import would.
    /// Returns false if the item does not exist.
    pub async fn push_translation(&self, row: LocalizedContent) -> bool {
        let mut store = self.store.write().await;
        if !store.items.iter().any(|item| item.id == row.item_id) {
            return false;
        }
        store.translations.push(row);
        true
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_items(&self, kind: ContentKind, include_unpublished: bool) -> Vec<ContentItem> {
        let store = self.store.read().await;
        let mut items: Vec<ContentItem> = store
            .items
            .iter()
            .filter(|item| item.kind == kind && (item.published || include_unpublished))
            .cloned()
            .collect();
        // Newest first; ties resolve to the most recently inserted.
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    async fn get_item(&self, id: Uuid) -> Option<ContentItem> {
        let store = self.store.read().await;
        store.items.iter().find(|item| item.id == id).cloned()
    }

    async fn get_translations(&self, item_id: Uuid) -> Vec<LocalizedContent> {
        let store = self.store.read().await;
        store
            .translations
            .iter()
            .filter(|row| row.item_id == item_id)
            .cloned()
            .collect()
    }

    async fn get_translations_for(&self, item_ids: &[Uuid]) -> Vec<LocalizedContent> {
        let store = self.store.read().await;
        item_ids
            .iter()
            .flat_map(|id| store.translations.iter().filter(move |row| row.item_id == *id))
            .cloned()
            .collect()
    }

    async fn create_item(
        &self,
        kind: ContentKind,
        req: CreateContentRequest,
    ) -> Option<(ContentItem, Vec<LocalizedContent>)> {
        // Unique (item_id, locale): reject the whole insert like the rolled-back transaction.
        let mut locales = Vec::with_capacity(req.translations.len());
        for translation in &req.translations {
            if locales.contains(&translation.locale) {
                tracing::error!("create_item error: duplicate locale {}", translation.locale);
                return None;
            }
            locales.push(translation.locale.clone());
        }

        let now = Utc::now();
        let item = ContentItem {
            id: Uuid::new_v4(),
            kind,
            image_key: req.image_key,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            published: req.published,
            created_at: now,
            updated_at: now,
        };
        let translations: Vec<LocalizedContent> = req
            .translations
            .into_iter()
            .map(|t| LocalizedContent {
                id: Uuid::new_v4(),
                item_id: item.id,
                locale: t.locale,
                title: t.title,
                description: t.description,
                content: t.content,
            })
            .collect();

        let mut store = self.store.write().await;
        store.items.push(item.clone());
        store.translations.extend(translations.iter().cloned());
        Some((item, translations))
    }

    async fn set_item_published(&self, id: Uuid, published: bool) -> Option<ContentItem> {
        let mut store = self.store.write().await;
        let item = store.items.iter_mut().find(|item| item.id == id)?;
        item.published = published;
        item.updated_at = Utc::now();
        Some(item.clone())
    }

    async fn delete_item(&self, id: Uuid) -> bool {
        let mut store = self.store.write().await;
        let before = store.items.len();
        store.items.retain(|item| item.id != id);
        if store.items.len() == before {
            return false;
        }
        store.translations.retain(|row| row.item_id != id);
        store.comments.retain(|comment| comment.item_id != id);
        true
    }

    async fn add_comment(&self, item_id: Uuid, author_id: Uuid, body: String) -> Option<Comment> {
        let mut store = self.store.write().await;
        if !store.items.iter().any(|item| item.id == item_id) {
            return None;
        }
        store.next_comment_id += 1;
        let comment = Comment {
            id: store.next_comment_id,
            item_id,
            author_id,
            moderator_id: None,
            body,
            approved: false,
            created_at: Utc::now(),
        };
        store.comments.push(comment.clone());
        Some(comment)
    }

    async fn get_comments(&self, item_id: Uuid, include_pending: bool) -> Vec<Comment> {
        let store = self.store.read().await;
        store
            .comments
            .iter()
            .filter(|c| c.item_id == item_id && (c.approved || include_pending))
            .cloned()
            .collect()
    }

    async fn get_comment(&self, id: i64) -> Option<Comment> {
        let store = self.store.read().await;
        store.comments.iter().find(|c| c.id == id).cloned()
    }

    async fn approve_comment(&self, id: i64) -> Option<Comment> {
        let mut store = self.store.write().await;
        let comment = store.comments.iter_mut().find(|c| c.id == id)?;
        comment.approved = true;
        Some(comment.clone())
    }

    async fn set_comment_moderator(&self, id: i64, moderator_id: Uuid) -> Option<Comment> {
        let mut store = self.store.write().await;
        let comment = store.comments.iter_mut().find(|c| c.id == id)?;
        comment.moderator_id = Some(moderator_id);
        Some(comment.clone())
    }

    async fn get_role(&self, id: RoleId) -> Option<Role> {
        let store = self.store.read().await;
        store.roles.iter().find(|role| role.id == id).cloned()
    }

    async fn get_roles(&self) -> Vec<Role> {
        let store = self.store.read().await;
        let mut roles = store.roles.clone();
        roles.sort_by_key(|role| role.id.as_str());
        roles
    }

    async fn insert_role(&self, role: Role) -> bool {
        let mut store = self.store.write().await;
        if store.roles.iter().any(|existing| existing.id == role.id) {
            return false;
        }
        store.roles.push(role);
        true
    }

    async fn update_role(&self, id: RoleId, req: UpdateRoleRequest) -> Option<Role> {
        let mut store = self.store.write().await;
        let role = store.roles.iter_mut().find(|role| role.id == id)?;
        if let Some(app_access) = req.app_access {
            role.app_access = app_access;
        }
        if let Some(admin_access) = req.admin_access {
            role.admin_access = admin_access;
        }
        Some(role.clone())
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        let store = self.store.read().await;
        store.users.iter().find(|user| user.id == id).cloned()
    }

    async fn get_users(&self) -> Vec<User> {
        let store = self.store.read().await;
        let mut users = store.users.clone();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }

    async fn create_user(&self, email: String, role: RoleId) -> Result<User, CreateUserError> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|user| user.email == email) {
            return Err(CreateUserError::DuplicateEmail);
        }
        // Mirrors the users.role foreign key.
        if !store.roles.iter().any(|r| r.id == role) {
            return Err(CreateUserError::UnknownRole(role));
        }
        let user = User {
            id: Uuid::new_v4(),
            email,
            role,
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn set_user_role(&self, id: Uuid, role: RoleId) -> Option<User> {
        let mut store = self.store.write().await;
        if !store.roles.iter().any(|r| r.id == role) {
            return None;
        }
        let user = store.users.iter_mut().find(|user| user.id == id)?;
        user.role = role;
        Some(user.clone())
    }
}
