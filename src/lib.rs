//! Multi-language news portal core.
//!
//! - [`router`]: URL path <-> view state, admin tab slugs, history
//! - [`nav`]: navigation forest, category filter expansion, sidebar state
//! - [`cache`]: persistent read-through cache for first paint
//! - [`news`]: post queries with like/save enrichment and feed cards
//! - [`app`]: boot sequence and navigation controller
//! - [`storage`]: SQLite-backed data service

pub mod app;
pub mod cache;
pub mod config;
pub mod events;
pub mod i18n;
pub mod meta;
pub mod nav;
pub mod news;
pub mod router;
pub mod storage;
pub mod util;
