//! Storage layer: the portal's data service over SQLite.
//!
//! Each submodule adds an `impl Database` block for one table family.

mod accounts;
mod kv;
mod language_packs;
mod navigation;
mod posts;
mod publishers;
mod schema;
mod settings;
mod types;

pub use posts::Interaction;
pub use schema::Database;
pub use types::{
    DatabaseError, FaqEntry, HomepageBlock, NavNode, NavType, NewNavItem, NewPost, NewsItem,
    PostFilter, Publisher, Role, Session, SiteSettings, Story, TrendMetric, UserProfile,
    ROOT_PARENT_SENTINEL,
};
