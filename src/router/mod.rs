//! View-state routing.
//!
//! - [`path`]: URL path <-> [`ViewState`] mapping
//! - [`admin`]: `/admin/...` tab slugs and entity-edit addressing
//! - [`history`]: in-memory back/forward stack
//!
//! [`App`](crate::app::App) is the only caller that pushes history entries.

pub mod admin;
pub mod history;
pub mod path;
pub mod state;

pub use admin::{AdminRouter, AdminTab};
pub use history::History;
pub use path::{path_from_state, segments, state_from_path, RouteContext};
pub use state::{ProfileRef, View, ViewState};
