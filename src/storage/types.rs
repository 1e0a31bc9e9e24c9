use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of haber appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY, SQLITE_LOCKED and SQLITE_CANTOPEN all surface as one of these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
        || lower.contains("sqlite_locked")
        || lower.contains("unable to open database file")
}

// ============================================================================
// Navigation
// ============================================================================

/// Parent sentinel some rows use instead of NULL for top-level nodes.
pub const ROOT_PARENT_SENTINEL: &str = "root";

/// Kind of a navigation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavType {
    Category,
    District,
    Trend,
    Link,
    Dropdown,
    Header,
}

impl NavType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavType::Category => "category",
            NavType::District => "district",
            NavType::Trend => "trend",
            NavType::Link => "link",
            NavType::Dropdown => "dropdown",
            NavType::Header => "header",
        }
    }

    /// Parse a stored type string. `trends` is accepted as an alias of `trend`;
    /// unknown strings fall back to `Category`.
    pub fn from_db(s: &str) -> Self {
        match s {
            "district" => NavType::District,
            "trend" | "trends" => NavType::Trend,
            "link" => NavType::Link,
            "dropdown" => NavType::Dropdown,
            "header" => NavType::Header,
            _ => NavType::Category,
        }
    }
}

/// A row of the navigation forest (menu, category, district or trend entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub label: String,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub nav_type: NavType,
    pub icon: Option<String>,
    pub order_index: i64,
    pub language_code: String,
}

impl NavNode {
    /// True when the node has no parent or carries the `root` parent sentinel.
    pub fn is_root(&self) -> bool {
        match self.parent_id.as_deref() {
            None => true,
            Some(p) => p.is_empty() || p == ROOT_PARENT_SENTINEL,
        }
    }

    /// Identifier used when the node is selected: `value` if present, else `label`.
    pub fn selector(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.label)
    }
}

/// Input for creating a navigation node from the admin menu builder.
#[derive(Debug, Clone)]
pub struct NewNavItem {
    pub parent_id: Option<String>,
    pub label: String,
    pub value: Option<String>,
    pub nav_type: NavType,
    pub icon: Option<String>,
    pub order_index: i64,
    pub language_code: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct NavRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub label: String,
    pub value: Option<String>,
    pub nav_type: String,
    pub icon: Option<String>,
    pub order_index: i64,
    pub language_code: String,
}

impl NavRow {
    pub(crate) fn into_node(self) -> NavNode {
        NavNode {
            id: self.id,
            parent_id: self.parent_id,
            label: self.label,
            value: self.value,
            nav_type: NavType::from_db(&self.nav_type),
            icon: self.icon,
            order_index: self.order_index,
            language_code: self.language_code,
        }
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Metric used to rank trend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendMetric {
    /// Combined engagement: likes + comments + shares + reads.
    Overall,
    Likes,
    Comments,
    Shares,
    Reads,
}

impl TrendMetric {
    /// SQL ordering expression. Only ever built from this closed set.
    pub(crate) fn order_expr(&self) -> &'static str {
        match self {
            TrendMetric::Overall => "(likes_count + comments_count + shares_count + views_count)",
            TrendMetric::Likes => "likes_count",
            TrendMetric::Comments => "comments_count",
            TrendMetric::Shares => "shares_count",
            TrendMetric::Reads => "views_count",
        }
    }
}

/// Predicate for a post list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// No category predicate (home).
    All,
    /// Post category equals any member of the set.
    Categories(BTreeSet<String>),
    /// Posts published at or after `since`, ranked by `metric`.
    Trending { since: i64, metric: TrendMetric },
}

/// Rich override for the feed card of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HomepageBlock {
    Slider {
        images: Vec<String>,
        #[serde(default)]
        caption: Option<String>,
    },
    Poll {
        question: String,
        options: Vec<String>,
    },
    Gallery {
        images: Vec<String>,
        #[serde(default)]
        caption: Option<String>,
    },
}

/// A post as projected at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub slug: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub publisher_id: Option<String>,
    pub image_url: Option<String>,
    pub language_code: String,
    pub created_at: i64,
    pub published_at: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub views_count: i64,
    /// Current user's like flag (false when no session).
    #[serde(default)]
    pub liked: bool,
    /// Current user's save flag (false when no session).
    #[serde(default)]
    pub saved: bool,
    pub homepage_block: Option<HomepageBlock>,
}

/// Input for inserting a post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub slug: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub publisher_id: Option<String>,
    pub image_url: Option<String>,
    pub language_code: String,
    pub published_at: i64,
    pub homepage_block: Option<HomepageBlock>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: String,
    pub slug: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub publisher_id: Option<String>,
    pub image_url: Option<String>,
    pub language_code: String,
    pub created_at: i64,
    pub published_at: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub views_count: i64,
    pub homepage_block: Option<String>,
}

impl PostRow {
    pub(crate) fn into_news_item(self) -> NewsItem {
        // A malformed block only loses the card override, never the post.
        let homepage_block = self.homepage_block.as_deref().and_then(|raw| {
            serde_json::from_str::<HomepageBlock>(raw)
                .map_err(|e| {
                    tracing::debug!(post = %self.id, error = %e, "Ignoring malformed homepage block");
                })
                .ok()
        });

        NewsItem {
            id: self.id,
            slug: self.slug,
            title: self.title,
            summary: self.summary,
            content: self.content,
            category: self.category,
            author_id: self.author_id,
            author_name: self.author_name,
            publisher_id: self.publisher_id,
            image_url: self.image_url,
            language_code: self.language_code,
            created_at: self.created_at,
            published_at: self.published_at,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            shares_count: self.shares_count,
            views_count: self.views_count,
            liked: false,
            saved: false,
            homepage_block,
        }
    }
}

// ============================================================================
// Site Settings and Stories
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// Per-language site settings, broadcast to metadata consumers on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub language_code: String,
    pub site_title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,
    #[serde(default)]
    pub og_image_url: Option<String>,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub media_url: String,
    pub language_code: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

// ============================================================================
// Accounts
// ============================================================================

/// Session issued by the external auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub role_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Publisher {
    pub id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
}

/// A role and the permission names it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub permissions: BTreeSet<String>,
}

impl Role {
    /// `*` grants every permission.
    pub fn allows(&self, permission: &str) -> bool {
        self.permissions.contains("*") || self.permissions.contains(permission)
    }
}
