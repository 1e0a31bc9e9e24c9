use std::collections::{BTreeSet, HashMap, HashSet};

use crate::storage::{NavNode, NavType};

/// In-memory navigation forest for one language.
///
/// Nodes are addressed by id for structure and by one of two selector
/// channels for category tokens: the `value` index is tried first, then the
/// `label` index. When several nodes share a value or label, the first in
/// `order_index` order wins.
#[derive(Debug, Clone, Default)]
pub struct NavigationTree {
    nodes: Vec<NavNode>,
    by_id: HashMap<String, usize>,
    by_value: HashMap<String, usize>,
    by_label: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    roots: Vec<usize>,
}

impl NavigationTree {
    pub fn new(mut nodes: Vec<NavNode>) -> Self {
        nodes.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then_with(|| a.label.cmp(&b.label))
        });

        let mut by_id = HashMap::new();
        let mut by_value = HashMap::new();
        let mut by_label = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            by_id.entry(node.id.clone()).or_insert(idx);
            if let Some(value) = node.value.as_deref().filter(|v| !v.is_empty()) {
                by_value.entry(value.to_string()).or_insert(idx);
            }
            by_label.entry(node.label.clone()).or_insert(idx);
        }

        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            match node.parent_id.as_deref() {
                // Dangling parents are shown at the top level
                Some(pid) if !node.is_root() && by_id.contains_key(pid) => {
                    children.entry(pid.to_string()).or_default().push(idx);
                }
                _ => roots.push(idx),
            }
        }

        Self {
            nodes,
            by_id,
            by_value,
            by_label,
            children,
            roots,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in `order_index` order.
    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&NavNode> {
        self.by_id.get(id).map(move |&i| &self.nodes[i])
    }

    /// Top-level nodes in sibling order.
    pub fn roots(&self) -> impl Iterator<Item = &NavNode> {
        self.roots.iter().map(move |&i| &self.nodes[i])
    }

    /// Direct children of `id` in sibling order.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &NavNode> {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&i| &self.nodes[i])
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.children.get(id).is_some_and(|c| !c.is_empty())
    }

    /// Resolve a category token: by value first, then by label.
    pub fn find(&self, token: &str) -> Option<&NavNode> {
        self.by_value
            .get(token)
            .or_else(|| self.by_label.get(token))
            .map(move |&i| &self.nodes[i])
    }

    /// True when `token` names a top-level node that is not a trend.
    ///
    /// These are the "free" categories whose selection lives at `/`.
    pub fn is_root_category(&self, token: &str) -> bool {
        self.find(token)
            .is_some_and(|n| n.is_root() && n.nav_type != NavType::Trend)
    }

    /// The top-level ancestor of the node `token` resolves to.
    ///
    /// `None` if the token is unknown or the parent chain loops.
    pub fn root_of(&self, token: &str) -> Option<&NavNode> {
        let mut current = self.find(token)?;
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(current.id.as_str()) {
                tracing::debug!(token = %token, "Navigation parent chain loops, no root");
                return None;
            }
            if current.is_root() {
                return Some(current);
            }
            match current.parent_id.as_deref().and_then(|pid| self.get(pid)) {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }

    /// Ids of the node `token` resolves to and all of its ancestors, nearest first.
    pub fn ancestor_ids(&self, token: &str) -> Vec<String> {
        let mut ids = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.find(token);
        while let Some(node) = current {
            if !visited.insert(node.id.as_str()) {
                break;
            }
            ids.push(node.id.clone());
            current = node.parent_id.as_deref().and_then(|pid| self.get(pid));
        }
        ids
    }

    /// Category values a post may carry to match `token`.
    ///
    /// Contains the token itself, the resolved node's label and value, and
    /// the label and value of every descendant. An unknown token yields just
    /// itself. The walk keeps a visited set and stops at any node already seen.
    pub fn filter_values(&self, token: &str) -> BTreeSet<String> {
        let mut values = BTreeSet::new();
        values.insert(token.to_string());

        let Some(start) = self.find(token) else {
            return values;
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.id.as_str()) {
                continue;
            }
            values.insert(node.label.clone());
            if let Some(value) = node.value.as_deref().filter(|v| !v.is_empty()) {
                values.insert(value.to_string());
            }
            stack.extend(self.children(&node.id));
        }

        values
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn node(
        id: &str,
        parent: Option<&str>,
        label: &str,
        value: Option<&str>,
        nav_type: NavType,
        order: i64,
    ) -> NavNode {
        NavNode {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            label: label.to_string(),
            value: value.map(str::to_string),
            nav_type,
            icon: None,
            order_index: order,
            language_code: "tr".to_string(),
        }
    }

    /// Istanbul -> {Kadikoy -> {Moda}, Besiktas}; Gundem; Trend (weekly_trends)
    pub(crate) fn sample_tree() -> NavigationTree {
        NavigationTree::new(vec![
            node("r", None, "İstanbul", Some("istanbul"), NavType::Category, 1),
            node("c1", Some("r"), "Kadıköy", Some("kadikoy"), NavType::District, 0),
            node("d1", Some("c1"), "Moda", Some("moda"), NavType::District, 0),
            node("c2", Some("r"), "Beşiktaş", Some("besiktas"), NavType::District, 1),
            node("g", Some("root"), "Gündem", Some("gundem"), NavType::Category, 0),
            node("t", None, "Trendler", Some("weekly_trends"), NavType::Trend, 2),
        ])
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_values_expands_descendants() {
        let tree = sample_tree();
        assert_eq!(
            tree.filter_values("istanbul"),
            set(&[
                "istanbul", "İstanbul", "kadikoy", "Kadıköy", "moda", "Moda", "besiktas",
                "Beşiktaş"
            ])
        );
    }

    #[test]
    fn test_filter_values_by_label() {
        let tree = sample_tree();
        assert_eq!(
            tree.filter_values("Kadıköy"),
            set(&["Kadıköy", "kadikoy", "moda", "Moda"])
        );
    }

    #[test]
    fn test_filter_values_unknown_token() {
        let tree = sample_tree();
        assert_eq!(tree.filter_values("ankara"), set(&["ankara"]));
    }

    #[test]
    fn test_value_index_wins_over_label() {
        let tree = NavigationTree::new(vec![
            node("a", None, "spor", Some("sport-a"), NavType::Category, 0),
            node("b", None, "Spor B", Some("spor"), NavType::Category, 1),
        ]);
        assert_eq!(tree.find("spor").map(|n| n.id.as_str()), Some("b"));
        assert_eq!(tree.find("sport-a").map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn test_cycle_is_fail_closed() {
        let tree = NavigationTree::new(vec![
            node("a", Some("b"), "A", Some("a"), NavType::Category, 0),
            node("b", Some("a"), "B", Some("b"), NavType::Category, 1),
        ]);
        assert_eq!(tree.filter_values("a"), set(&["a", "A", "b", "B"]));
        assert!(tree.root_of("a").is_none());
        assert_eq!(tree.ancestor_ids("a"), vec!["a", "b"]);
    }

    #[test]
    fn test_root_detection() {
        let tree = sample_tree();
        assert!(tree.is_root_category("istanbul"));
        assert!(tree.is_root_category("gundem"));
        assert!(!tree.is_root_category("kadikoy"));
        // Trend nodes are never free root categories
        assert!(!tree.is_root_category("weekly_trends"));
        assert!(!tree.is_root_category("unknown"));
    }

    #[test]
    fn test_root_of() {
        let tree = sample_tree();
        assert_eq!(tree.root_of("moda").map(|n| n.id.as_str()), Some("r"));
        assert_eq!(tree.root_of("istanbul").map(|n| n.id.as_str()), Some("r"));
        assert!(tree.root_of("nowhere").is_none());
    }

    #[test]
    fn test_dangling_parent_shown_at_top_level() {
        let tree = NavigationTree::new(vec![node(
            "x",
            Some("deleted"),
            "Orphan",
            None,
            NavType::Category,
            0,
        )]);
        assert_eq!(tree.roots().count(), 1);
        assert_eq!(tree.root_of("Orphan").map(|n| n.id.as_str()), Some("x"));
    }

    #[test]
    fn test_children_in_sibling_order() {
        let tree = sample_tree();
        let ids: Vec<&str> = tree.children("r").map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        let roots: Vec<&str> = tree.roots().map(|n| n.id.as_str()).collect();
        assert_eq!(roots, vec!["g", "r", "t"]);
        assert!(tree.has_children("c1"));
        assert!(!tree.has_children("d1"));
    }
}
