//! Navigation forest: category token resolution and sidebar state.
//!
//! - [`NavigationTree`] indexes nodes by id, value and label, expands a
//!   selected token into the set of category values to filter on, and finds
//!   the root of any node.
//! - [`SidebarState`] flattens the forest for rendering with per-node
//!   expansion and auto-reveal of the selected category.

mod sidebar;
pub(crate) mod tree;

pub use sidebar::{SidebarItem, SidebarState};
pub use tree::NavigationTree;
