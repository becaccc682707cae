//! A rooted phylogenetic tree stored as an index arena.
//!
//! Nodes are indexed `0..n_nodes` with tips first, then internal nodes. An edge
//! is identified by the index of its child node, so every node except the root
//! names exactly one edge.

mod newick;

use serde::{Deserialize, Serialize};

use super::error::FactorError;

/// Sentinel parent index for the root node.
pub const NO_PARENT: i64 = -1;

/// A rooted phylogenetic tree over a fixed set of labelled tips.
///
/// Immutable after construction. Construction validates the shape: exactly one
/// root, parent indices in range, every node reachable from the root (which
/// rules out cycles and disconnected components), tips are leaves, and branch
/// lengths are finite and non-negative.
#[derive(Clone, Serialize, Deserialize)]
pub struct Tree {
    /// Parent index per node, `NO_PARENT` for the root.
    parents: Vec<i64>,
    /// Length of the edge above each node. The root's entry is unused.
    lengths: Vec<f64>,
    /// Child indices per node, in construction order.
    children: Vec<Vec<usize>>,
    /// Labels of the tips, which occupy indices `0..n_tips`.
    tip_labels: Vec<String>,
    /// Index of the root node.
    root: usize,
    /// DFS entry times, used for ancestry tests.
    tin: Vec<usize>,
    /// DFS exit times, used for ancestry tests.
    tout: Vec<usize>,
    /// Post-order traversal of all nodes.
    post: Vec<usize>,
    /// Sorted descendant tip indices per node. A tip's entry is itself.
    descendant_tips: Vec<Vec<usize>>,
}

impl Tree {
    /// Builds a tree from structure arrays.
    ///
    /// Tips occupy indices `0..tip_labels.len()` and must be leaves; internal
    /// nodes follow.
    ///
    /// # Parameters
    ///
    /// - `parents`: parent index per node, `NO_PARENT` (-1) for the root.
    /// - `lengths`: length of the edge above each node; the root's entry is
    ///   carried but unused.
    /// - `tip_labels`: one label per tip, unique and non-empty.
    ///
    /// # Errors
    ///
    /// * If the arrays disagree in length or describe no tips.
    /// * If there is not exactly one root, or a parent index is out of range.
    /// * If any node is unreachable from the root (cycle or disconnection).
    /// * If a tip has children, or an internal node has none.
    /// * If a branch length is negative or non-finite.
    /// * If tip labels are empty or duplicated.
    pub fn from_structure(parents: Vec<i64>, lengths: Vec<f64>, tip_labels: Vec<String>) -> Result<Self, FactorError> {
        let n_nodes = parents.len();
        let n_tips = tip_labels.len();

        if n_tips == 0 {
            return Err(FactorError::InvalidTree("the tree has no tips".to_string()));
        }
        if n_tips > n_nodes {
            return Err(FactorError::InvalidTree(format!(
                "{n_tips} tip labels but only {n_nodes} nodes"
            )));
        }
        if lengths.len() != n_nodes {
            return Err(FactorError::InvalidTree(format!(
                "{} branch lengths for {n_nodes} nodes",
                lengths.len()
            )));
        }
        for (node, &l) in lengths.iter().enumerate() {
            if !l.is_finite() || l < 0.0 {
                return Err(FactorError::InvalidTree(format!(
                    "branch length {l} above node {node} is not a finite non-negative value"
                )));
            }
        }

        let mut root = None;
        let mut children = vec![Vec::new(); n_nodes];
        for (node, &p) in parents.iter().enumerate() {
            if p == NO_PARENT {
                if let Some(r) = root {
                    return Err(FactorError::InvalidTree(format!("multiple roots: nodes {r} and {node}")));
                }
                root = Some(node);
            } else {
                let p = usize::try_from(p)
                    .map_err(|_| FactorError::InvalidTree(format!("negative parent index {p} for node {node}")))?;
                if p >= n_nodes {
                    return Err(FactorError::InvalidTree(format!(
                        "parent index {p} of node {node} is out of range"
                    )));
                }
                if p == node {
                    return Err(FactorError::InvalidTree(format!("node {node} is its own parent")));
                }
                children[p].push(node);
            }
        }
        let root = root.ok_or_else(|| FactorError::InvalidTree("no root node found".to_string()))?;

        for (tip, kids) in children.iter().enumerate().take(n_tips) {
            if !kids.is_empty() {
                return Err(FactorError::InvalidTree(format!(
                    "tip {tip} ({:?}) has {} children",
                    tip_labels[tip],
                    kids.len()
                )));
            }
        }
        for (node, kids) in children.iter().enumerate().skip(n_tips) {
            if kids.is_empty() {
                return Err(FactorError::InvalidTree(format!("internal node {node} has no children")));
            }
        }

        for (i, label) in tip_labels.iter().enumerate() {
            if label.is_empty() {
                return Err(FactorError::InvalidTree(format!("tip {i} has an empty label")));
            }
            if tip_labels[..i].contains(label) {
                return Err(FactorError::InvalidTree(format!("duplicate tip label {label:?}")));
            }
        }

        // Iterative DFS from the root: entry/exit times, post-order, and a
        // reachability count that rejects cycles and disconnected components.
        let mut tin = vec![0usize; n_nodes];
        let mut tout = vec![0usize; n_nodes];
        let mut post = Vec::with_capacity(n_nodes);
        let mut visited = vec![false; n_nodes];
        let mut time = 0usize;
        let mut stack = vec![(root, 0usize)];
        visited[root] = true;
        tin[root] = time;
        time += 1;
        loop {
            let (node, child_idx) = match stack.last_mut() {
                Some(frame) => {
                    let state = *frame;
                    frame.1 += 1;
                    state
                }
                None => break,
            };
            if child_idx < children[node].len() {
                let c = children[node][child_idx];
                visited[c] = true;
                tin[c] = time;
                time += 1;
                stack.push((c, 0));
            } else {
                tout[node] = time;
                time += 1;
                post.push(node);
                stack.pop();
            }
        }
        let unreachable = visited.iter().filter(|&&v| !v).count();
        if unreachable > 0 {
            return Err(FactorError::InvalidTree(format!(
                "{unreachable} of {n_nodes} nodes are unreachable from the root (cycle or disconnected component)"
            )));
        }

        // Descendant tip sets, built bottom-up along the post-order.
        let mut descendant_tips = vec![Vec::new(); n_nodes];
        for &node in &post {
            if node < n_tips {
                descendant_tips[node] = vec![node];
            } else {
                let mut tips = children[node]
                    .iter()
                    .flat_map(|&c| descendant_tips[c].iter().copied())
                    .collect::<Vec<_>>();
                tips.sort_unstable();
                descendant_tips[node] = tips;
            }
        }

        Ok(Self {
            parents,
            lengths,
            children,
            tip_labels,
            root,
            tin,
            tout,
            post,
            descendant_tips,
        })
    }

    /// The number of tips.
    #[must_use]
    pub fn n_tips(&self) -> usize {
        self.tip_labels.len()
    }

    /// The total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.parents.len()
    }

    /// The index of the root node.
    #[must_use]
    pub const fn root(&self) -> usize {
        self.root
    }

    /// The labels of the tips, indexed by tip.
    #[must_use]
    pub fn tip_labels(&self) -> &[String] {
        &self.tip_labels
    }

    /// The label of one tip.
    ///
    /// # Panics
    ///
    /// * If `tip` is not a tip index.
    #[must_use]
    pub fn tip_label(&self, tip: usize) -> &str {
        &self.tip_labels[tip]
    }

    /// The parent of a node, or `None` for the root.
    #[must_use]
    pub fn parent(&self, node: usize) -> Option<usize> {
        let p = self.parents[node];
        (p != NO_PARENT).then(|| p.unsigned_abs() as usize)
    }

    /// The children of a node.
    #[must_use]
    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    /// The length of the edge above a node. The root's entry is meaningless.
    #[must_use]
    pub fn branch_length(&self, node: usize) -> f64 {
        self.lengths[node]
    }

    /// Whether a node is a tip.
    #[must_use]
    pub fn is_tip(&self, node: usize) -> bool {
        node < self.tip_labels.len()
    }

    /// Whether every internal node has exactly two children.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.children.iter().skip(self.n_tips()).all(|kids| kids.len() == 2)
    }

    /// All edges of the tree, each identified by its child node, in ascending
    /// index order.
    pub fn edges(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_nodes()).filter(move |&n| n != self.root)
    }

    /// The sorted tip indices descending from a node. For a tip this is the
    /// tip itself.
    #[must_use]
    pub fn descendant_tips(&self, node: usize) -> &[usize] {
        &self.descendant_tips[node]
    }

    /// Whether `node` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_strict_descendant(&self, node: usize, ancestor: usize) -> bool {
        self.tin[ancestor] < self.tin[node] && self.tout[node] < self.tout[ancestor]
    }

    /// Post-order traversal of all nodes; the root is last.
    #[must_use]
    pub fn post_order(&self) -> &[usize] {
        &self.post
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ((A,B),C) with tips 0..3, internal nodes 3 (AB) and 4 (root).
    fn three_tip() -> Tree {
        let parents = vec![3, 3, 4, 4, NO_PARENT];
        let lengths = vec![1.0, 2.0, 3.0, 0.5, 0.0];
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        Tree::from_structure(parents, lengths, labels).unwrap()
    }

    #[test]
    fn construction() {
        let tree = three_tip();
        assert_eq!(tree.n_tips(), 3);
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.root(), 4);
        assert!(tree.is_binary());
        assert_eq!(tree.parent(0), Some(3));
        assert_eq!(tree.parent(4), None);
        assert_eq!(tree.children(3), &[0, 1]);
        assert_eq!(tree.branch_length(1), 2.0);
        assert_eq!(tree.descendant_tips(3), &[0, 1]);
        assert_eq!(tree.descendant_tips(4), &[0, 1, 2]);
        assert_eq!(tree.descendant_tips(2), &[2]);
        assert_eq!(tree.edges().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn ancestry() {
        let tree = three_tip();
        assert!(tree.is_strict_descendant(0, 3));
        assert!(tree.is_strict_descendant(0, 4));
        assert!(tree.is_strict_descendant(3, 4));
        assert!(!tree.is_strict_descendant(3, 3));
        assert!(!tree.is_strict_descendant(2, 3));
        assert!(!tree.is_strict_descendant(4, 3));
    }

    #[test]
    fn post_order_ends_at_root() {
        let tree = three_tip();
        assert_eq!(tree.post_order().last(), Some(&tree.root()));
        assert_eq!(tree.post_order().len(), tree.n_nodes());
    }

    #[test]
    fn rejects_multiple_roots() {
        let parents = vec![NO_PARENT, NO_PARENT, 0];
        let lengths = vec![0.0; 3];
        let labels = vec!["A".to_string(), "B".to_string()];
        assert!(matches!(
            Tree::from_structure(parents, lengths, labels),
            Err(FactorError::InvalidTree(_))
        ));
    }

    #[test]
    fn rejects_cycles() {
        // Nodes 3 and 4 point at each other and are unreachable from the root.
        let parents = vec![2, 2, NO_PARENT, 4, 3];
        let lengths = vec![1.0; 5];
        let labels = vec!["A".to_string(), "B".to_string()];
        assert!(matches!(
            Tree::from_structure(parents, lengths, labels),
            Err(FactorError::InvalidTree(_))
        ));
    }

    #[test]
    fn rejects_tip_with_children() {
        let parents = vec![NO_PARENT, 0, 0];
        let lengths = vec![1.0; 3];
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert!(matches!(
            Tree::from_structure(parents, lengths, labels),
            Err(FactorError::InvalidTree(_))
        ));
    }

    #[test]
    fn rejects_negative_branch_length() {
        let parents = vec![2, 2, NO_PARENT];
        let lengths = vec![1.0, -0.5, 0.0];
        let labels = vec!["A".to_string(), "B".to_string()];
        assert!(matches!(
            Tree::from_structure(parents, lengths, labels),
            Err(FactorError::InvalidTree(_))
        ));
    }

    #[test]
    fn rejects_duplicate_labels() {
        let parents = vec![2, 2, NO_PARENT];
        let lengths = vec![1.0, 1.0, 0.0];
        let labels = vec!["A".to_string(), "A".to_string()];
        assert!(matches!(
            Tree::from_structure(parents, lengths, labels),
            Err(FactorError::InvalidTree(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_parent() {
        let parents = vec![9, 2, NO_PARENT];
        let lengths = vec![1.0, 1.0, 0.0];
        let labels = vec!["A".to_string(), "B".to_string()];
        assert!(matches!(
            Tree::from_structure(parents, lengths, labels),
            Err(FactorError::InvalidTree(_))
        ));
    }
}
