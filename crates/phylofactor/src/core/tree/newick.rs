//! Minimal Newick parsing for [`Tree`].
//!
//! Leaf labels are required; internal-node labels are accepted and ignored.
//! Branch lengths are optional and default to 1.0 (unit branch).

use super::Tree;
use crate::core::error::FactorError;

/// Default length for branches the Newick string leaves unspecified.
const UNIT_BRANCH: f64 = 1.0;

/// A node of the intermediate parse tree.
#[derive(Default)]
struct ProtoNode {
    label: Option<String>,
    length: Option<f64>,
    children: Vec<ProtoNode>,
}

impl ProtoNode {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn count_nodes(&self) -> (usize, usize) {
        let mut leaves = usize::from(self.is_leaf());
        let mut total = 1;
        for child in &self.children {
            let (l, t) = child.count_nodes();
            leaves += l;
            total += t;
        }
        (leaves, total)
    }
}

/// Running state while flattening a parse tree into structure arrays.
struct Flattener {
    parents: Vec<i64>,
    lengths: Vec<f64>,
    labels: Vec<String>,
    next_tip: usize,
    next_internal: usize,
}

impl Flattener {
    /// Assigns indices bottom-up: tips in left-to-right encounter order, then
    /// internal nodes in post-order. Returns the index given to `node`.
    fn assign(&mut self, node: &ProtoNode) -> usize {
        if node.is_leaf() {
            let id = self.next_tip;
            self.next_tip += 1;
            self.labels[id] = node
                .label
                .clone()
                .unwrap_or_else(|| unreachable!("the parser labels every leaf"));
            self.lengths[id] = node.length.unwrap_or(UNIT_BRANCH);
            id
        } else {
            let child_ids = node.children.iter().map(|c| self.assign(c)).collect::<Vec<_>>();
            let id = self.next_internal;
            self.next_internal += 1;
            self.lengths[id] = node.length.unwrap_or(UNIT_BRANCH);
            for c in child_ids {
                self.parents[c] = id as i64;
            }
            id
        }
    }
}

impl Tree {
    /// Parses a tree from a Newick string, e.g. `"((A:1,B:1):1,C:2);"`.
    ///
    /// Tips are indexed in left-to-right encounter order; internal nodes
    /// follow in post-order. Missing branch lengths default to 1.0.
    ///
    /// # Errors
    ///
    /// * [`FactorError::NewickParse`] if the string is malformed.
    /// * [`FactorError::InvalidTree`] if the resulting shape fails
    ///   [`Tree::from_structure`] validation.
    pub fn from_newick(text: &str) -> Result<Self, FactorError> {
        let root = parse_proto(text)?;
        let (n_leaves, n_total) = root.count_nodes();

        let mut flattener = Flattener {
            parents: vec![super::NO_PARENT; n_total],
            lengths: vec![UNIT_BRANCH; n_total],
            labels: vec![String::new(); n_leaves],
            next_tip: 0,
            next_internal: n_leaves,
        };
        flattener.assign(&root);

        Self::from_structure(flattener.parents, flattener.lengths, flattener.labels)
    }
}

/// Builds the intermediate parse tree from a Newick string.
fn parse_proto(text: &str) -> Result<ProtoNode, FactorError> {
    let bytes = text.as_bytes();
    let mut pos = 0usize;
    let mut stack: Vec<Vec<ProtoNode>> = Vec::new();
    let mut siblings: Vec<ProtoNode> = Vec::new();
    // Whether the previous token closed a subtree, so that a following label
    // or length belongs to that internal node rather than to a new leaf.
    let mut just_closed = false;
    let mut terminated = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'(' => {
                stack.push(std::mem::take(&mut siblings));
                just_closed = false;
                pos += 1;
            }
            b',' => {
                if siblings.is_empty() {
                    return Err(parse_error(pos, "comma before any node"));
                }
                just_closed = false;
                pos += 1;
            }
            b')' => {
                let children = std::mem::take(&mut siblings);
                if children.is_empty() {
                    return Err(parse_error(pos, "empty subtree"));
                }
                siblings = stack.pop().ok_or_else(|| parse_error(pos, "unmatched ')'"))?;
                siblings.push(ProtoNode {
                    children,
                    ..ProtoNode::default()
                });
                just_closed = true;
                pos += 1;
            }
            b':' => {
                let (length, next) = read_number(text, pos + 1)?;
                let node = siblings
                    .last_mut()
                    .ok_or_else(|| parse_error(pos, "branch length with no preceding node"))?;
                if node.length.is_some() {
                    return Err(parse_error(pos, "duplicate branch length"));
                }
                node.length = Some(length);
                pos = next;
            }
            b';' => {
                terminated = true;
                pos += 1;
                break;
            }
            c if c.is_ascii_whitespace() => pos += 1,
            _ => {
                let (token, next) = read_token(text, pos);
                if just_closed {
                    // Internal-node label; accepted and dropped.
                    just_closed = false;
                } else {
                    siblings.push(ProtoNode {
                        label: Some(token.to_string()),
                        ..ProtoNode::default()
                    });
                }
                pos = next;
            }
        }
    }

    if !terminated {
        return Err(parse_error(pos, "missing terminating ';'"));
    }
    if !stack.is_empty() {
        return Err(parse_error(pos, "unclosed '('"));
    }
    match siblings.len() {
        1 => Ok(siblings.remove(0)),
        0 => Err(parse_error(pos, "empty tree")),
        _ => Err(parse_error(pos, "multiple root nodes")),
    }
}

/// Reads a label token: everything up to the next structural character or
/// whitespace.
fn read_token(text: &str, start: usize) -> (&str, usize) {
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        if matches!(b, b'(' | b')' | b',' | b':' | b';') || b.is_ascii_whitespace() {
            break;
        }
        end += 1;
    }
    (&text[start..end], end)
}

/// Reads and parses a branch-length number starting at `start`.
fn read_number(text: &str, start: usize) -> Result<(f64, usize), FactorError> {
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() && matches!(bytes[end], b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E') {
        end += 1;
    }
    let length = text[start..end]
        .parse::<f64>()
        .map_err(|e| parse_error(start, &format!("invalid branch length: {e}")))?;
    Ok((length, end))
}

/// Shorthand for a [`FactorError::NewickParse`].
fn parse_error(position: usize, reason: &str) -> FactorError {
    FactorError::NewickParse {
        position,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn basic_parse() {
        let tree = Tree::from_newick("((A:1,B:2):0.5,C:3);").unwrap();
        assert_eq!(tree.n_tips(), 3);
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.tip_labels(), &["A", "B", "C"]);
        assert!(tree.is_binary());
        assert_eq!(tree.branch_length(1), 2.0);
        assert_eq!(tree.branch_length(2), 3.0);
        // Internal node above A,B is the first post-order internal index.
        assert_eq!(tree.descendant_tips(3), &[0, 1]);
        assert_eq!(tree.branch_length(3), 0.5);
    }

    #[test]
    fn missing_lengths_default_to_unit() {
        let tree = Tree::from_newick("((A,B),C);").unwrap();
        assert_eq!(tree.branch_length(0), 1.0);
        assert_eq!(tree.branch_length(3), 1.0);
    }

    #[test]
    fn internal_labels_are_ignored() {
        let tree = Tree::from_newick("((A:1,B:1)ab:1,C:1)root;").unwrap();
        assert_eq!(tree.n_tips(), 3);
        assert_eq!(tree.tip_labels(), &["A", "B", "C"]);
    }

    #[test]
    fn polytomies_parse_but_are_not_binary() {
        let tree = Tree::from_newick("(A:1,B:1,C:1);").unwrap();
        assert_eq!(tree.n_tips(), 3);
        assert!(!tree.is_binary());
    }

    #[test]
    fn scientific_notation_lengths() {
        let tree = Tree::from_newick("(A:1e-3,B:2.5E2);").unwrap();
        assert!((tree.branch_length(0) - 1e-3).abs() < 1e-12);
        assert!((tree.branch_length(1) - 250.0).abs() < 1e-12);
    }

    #[test_case("((A:1,B:1):1,C:1"; "missing semicolon")]
    #[test_case("((A:1,B:1,C:1);"; "unclosed bracket")]
    #[test_case("(A:1,B:1));"; "unmatched close")]
    #[test_case("();"; "empty subtree")]
    #[test_case(";"; "empty tree")]
    #[test_case("(A:x,B:1);"; "bad length")]
    #[test_case("(A:1:2,B:1);"; "duplicate length")]
    #[test_case("((:1,B:1):1,C:1);"; "unnamed leaf")]
    fn malformed_newick(text: &str) {
        assert!(matches!(
            Tree::from_newick(text),
            Err(FactorError::NewickParse { .. })
        ));
    }

    #[test]
    fn duplicate_tip_labels_are_invalid() {
        assert!(matches!(
            Tree::from_newick("(A:1,A:1);"),
            Err(FactorError::InvalidTree(_))
        ));
    }
}
