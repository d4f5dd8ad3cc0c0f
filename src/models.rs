use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    localization::{Locale, LocaleTag, Localized},
    roles::RoleId,
};

// --- Core Application Schemas ---

/// ContentKind
///
/// The portal modules that publish localized content. All of them share the same
/// item/translation tables and differ only by this discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ContentKind {
    News,
    Document,
    Event,
    Slider,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::News,
        ContentKind::Document,
        ContentKind::Event,
        ContentKind::Slider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::News => "news",
            ContentKind::Document => "document",
            ContentKind::Event => "event",
            ContentKind::Slider => "slider",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| format!("unknown content kind: {raw}"))
    }
}

/// ContentItem
///
/// The locale-independent record that owns zero or more translations.
/// Deleting an item deletes its translations and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContentItem {
    pub id: Uuid,
    pub kind: ContentKind,
    // Storage key of the cover/slider image, relative to the CDN base path.
    pub image_key: Option<String>,
    // Calendar window; only meaningful for events.
    #[ts(type = "string | null")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub ends_at: Option<DateTime<Utc>>,
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// LocalizedContent
///
/// One translation of a content item. At most one row exists per `(item_id, locale)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LocalizedContent {
    pub id: Uuid,
    pub item_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "az")]
    pub locale: LocaleTag,
    pub title: String,
    pub description: String,
    pub content: String,
}

impl Localized for LocalizedContent {
    fn locale(&self) -> &LocaleTag {
        &self.locale
    }
}

/// Comment
///
/// A citizen comment on a content item. Hidden from the public until approved by
/// the assigned moderator or an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub item_id: Uuid,
    pub author_id: Uuid,
    pub moderator_id: Option<Uuid>,
    pub body: String,
    pub approved: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// User
///
/// A portal account and the role it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: RoleId,
}

// --- Request Payloads (Input Schemas) ---

/// TranslationInput
///
/// One translation supplied when creating a content item.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TranslationInput {
    #[ts(type = "string")]
    #[schema(value_type = String, example = "en")]
    pub locale: LocaleTag,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
}

/// CreateContentRequest
///
/// Input payload for `POST /admin/content/{kind}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateContentRequest {
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published: bool,
    pub translations: Vec<TranslationInput>,
}

/// ContentValidationError
///
/// Reasons a `CreateContentRequest` is refused before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentValidationError {
    NoTranslations,
    UnknownLocale(String),
    DuplicateLocale(Locale),
    EmptyTitle(Locale),
    InvertedWindow,
}

impl CreateContentRequest {
    /// Enforces one translation per known locale with a non-empty title.
    pub fn validate(&self) -> Result<(), ContentValidationError> {
        if self.translations.is_empty() {
            return Err(ContentValidationError::NoTranslations);
        }

        let mut seen: Vec<Locale> = Vec::with_capacity(self.translations.len());
        for translation in &self.translations {
            let locale = translation
                .locale
                .known()
                .ok_or_else(|| ContentValidationError::UnknownLocale(translation.locale.to_string()))?;
            if seen.contains(&locale) {
                return Err(ContentValidationError::DuplicateLocale(locale));
            }
            if translation.title.trim().is_empty() {
                return Err(ContentValidationError::EmptyTitle(locale));
            }
            seen.push(locale);
        }

        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if end < start {
                return Err(ContentValidationError::InvertedWindow);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignModeratorRequest {
    pub moderator_id: Uuid,
}

/// UpdateRoleRequest
///
/// Partial update of a role's capability flags (`PUT /admin/roles/{id}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_access: Option<bool>,
}

/// CreateUserRequest
///
/// Input payload for `POST /admin/users`. Emails are stored lowercased.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default = "default_user_role")]
    pub role: RoleId,
}

fn default_user_role() -> RoleId {
    RoleId::Citizen
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignRoleRequest {
    pub role: RoleId,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IssueTokenRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub scope: Option<String>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IssueTokenResponse {
    pub token: String,
    pub expires_in: u64,
}

/// ContentView
///
/// A content item rendered for one requested locale. `translation` is `null` when the
/// item has no translations at all.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContentView {
    pub id: Uuid,
    pub kind: ContentKind,
    pub image_url: Option<String>,
    #[ts(type = "string | null")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub ends_at: Option<DateTime<Utc>>,
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub translation: Option<LocalizedContent>,
    #[ts(type = "Array<string>")]
    #[schema(value_type = Vec<String>)]
    pub available_locales: Vec<LocaleTag>,
}

/// TranslationsView
///
/// Every known locale mapped to its translation (or `null`), for editors.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TranslationsView {
    pub item_id: Uuid,
    #[schema(value_type = Object)]
    pub translations: BTreeMap<Locale, Option<LocalizedContent>>,
    #[ts(type = "Array<string>")]
    #[schema(value_type = Vec<String>)]
    pub available_locales: Vec<LocaleTag>,
}
