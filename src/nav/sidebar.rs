use std::collections::HashSet;

use super::tree::NavigationTree;
use crate::storage::{NavNode, NavType};

/// A single row of the flattened sidebar for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItem {
    pub node_id: String,
    pub label: String,
    /// Token emitted when the row is clicked (`value`, else `label`).
    pub selector: String,
    pub nav_type: NavType,
    pub icon: Option<String>,
    /// Nesting depth (0 = top-level).
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
    pub is_selected: bool,
}

/// Expand/collapse state of the navigation sidebar.
///
/// Nodes start collapsed. Selecting a category expands its ancestor chain so
/// the selection is always visible.
#[derive(Debug, Clone, Default)]
pub struct SidebarState {
    expanded: HashSet<String>,
}

impl SidebarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.expanded.contains(node_id)
    }

    /// Toggle expansion for a node.
    pub fn toggle(&mut self, node_id: &str) {
        if !self.expanded.remove(node_id) {
            self.expanded.insert(node_id.to_string());
        }
    }

    pub fn expand_all(&mut self, tree: &NavigationTree) {
        for node in tree.nodes() {
            if tree.has_children(&node.id) {
                self.expanded.insert(node.id.clone());
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Expand every ancestor of the node `selected` resolves to.
    ///
    /// The node itself is left as it was so a selected leaf doesn't gain an
    /// expanded marker.
    pub fn reveal(&mut self, tree: &NavigationTree, selected: &str) {
        for id in tree.ancestor_ids(selected).into_iter().skip(1) {
            self.expanded.insert(id);
        }
    }

    /// Flatten the visible part of the tree in display order.
    pub fn items(&self, tree: &NavigationTree, selected: Option<&str>) -> Vec<SidebarItem> {
        let selected_id = selected.and_then(|s| tree.find(s)).map(|n| n.id.as_str());
        let mut items = Vec::with_capacity(tree.len());
        let mut visited = HashSet::new();
        for root in tree.roots() {
            self.add_item(tree, &mut items, &mut visited, root, 0, selected_id);
        }
        items
    }

    fn add_item<'a>(
        &self,
        tree: &'a NavigationTree,
        items: &mut Vec<SidebarItem>,
        visited: &mut HashSet<&'a str>,
        node: &'a NavNode,
        depth: usize,
        selected_id: Option<&str>,
    ) {
        if !visited.insert(node.id.as_str()) {
            return;
        }
        let has_children = tree.has_children(&node.id);
        let is_expanded = has_children && self.is_expanded(&node.id);

        items.push(SidebarItem {
            node_id: node.id.clone(),
            label: node.label.clone(),
            selector: node.selector().to_string(),
            nav_type: node.nav_type,
            icon: node.icon.clone(),
            depth,
            has_children,
            is_expanded,
            is_selected: selected_id == Some(node.id.as_str()),
        });

        if is_expanded {
            for child in tree.children(&node.id) {
                self.add_item(tree, items, visited, child, depth + 1, selected_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::tree::tests::sample_tree;
    use pretty_assertions::assert_eq;

    fn labels(items: &[SidebarItem]) -> Vec<(usize, &str)> {
        items.iter().map(|i| (i.depth, i.label.as_str())).collect()
    }

    #[test]
    fn test_collapsed_by_default() {
        let tree = sample_tree();
        let state = SidebarState::new();
        let items = state.items(&tree, None);
        assert_eq!(
            labels(&items),
            vec![(0, "Gündem"), (0, "İstanbul"), (0, "Trendler")]
        );
        assert!(items[1].has_children);
        assert!(!items[1].is_expanded);
    }

    #[test]
    fn test_toggle_expands_one_level() {
        let tree = sample_tree();
        let mut state = SidebarState::new();
        state.toggle("r");
        assert_eq!(
            labels(&state.items(&tree, None)),
            vec![
                (0, "Gündem"),
                (0, "İstanbul"),
                (1, "Kadıköy"),
                (1, "Beşiktaş"),
                (0, "Trendler")
            ]
        );
        state.toggle("r");
        assert_eq!(state.items(&tree, None).len(), 3);
    }

    #[test]
    fn test_reveal_expands_ancestors_and_marks_selection() {
        let tree = sample_tree();
        let mut state = SidebarState::new();
        state.reveal(&tree, "moda");
        assert!(state.is_expanded("r"));
        assert!(state.is_expanded("c1"));
        assert!(!state.is_expanded("d1"));

        let items = state.items(&tree, Some("moda"));
        let moda = items.iter().find(|i| i.node_id == "d1").unwrap();
        assert_eq!(moda.depth, 2);
        assert!(moda.is_selected);
        assert_eq!(items.iter().filter(|i| i.is_selected).count(), 1);
    }

    #[test]
    fn test_expand_all_then_collapse_all() {
        let tree = sample_tree();
        let mut state = SidebarState::new();
        state.expand_all(&tree);
        assert_eq!(state.items(&tree, None).len(), 6);
        state.collapse_all();
        assert_eq!(state.items(&tree, None).len(), 3);
    }

    #[test]
    fn test_selector_prefers_value() {
        let tree = sample_tree();
        let items = SidebarState::new().items(&tree, None);
        assert_eq!(items[2].selector, "weekly_trends");
    }
}
