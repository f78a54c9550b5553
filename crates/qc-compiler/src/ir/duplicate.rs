//! Deep copy of IR subtrees
//!
//! Copies every owned node of a subtree (and the columns of copied tables),
//! then remaps child slots and back-references onto the copies. References
//! that point outside the copied subtree are kept as they are, so a copied
//! predicate still reads the outer aliases it was correlated with.

use super::*;
use std::collections::HashSet;

/// Result of a duplication: the new root and the old-to-new node map
#[derive(Debug, Clone)]
pub struct Duplicate {
    pub root: NodeId,
    pub map: HashMap<NodeId, NodeId>,
}

impl Duplicate {
    /// Copy of `old`, or `old` itself when it was not copied
    pub fn get(&self, old: NodeId) -> NodeId {
        self.map.get(&old).copied().unwrap_or(old)
    }
}

impl Ir {
    /// Deep-copy the subtree rooted at `root`
    pub fn duplicate(&mut self, root: NodeId) -> NodeId {
        self.duplicate_with_map(root).root
    }

    /// Deep-copy the subtree rooted at `root`, returning the node map
    pub fn duplicate_with_map(&mut self, root: NodeId) -> Duplicate {
        let mut originals = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            originals.push(id);
            let kind = self.kind(id);
            if let NodeKind::Table { columns, .. } | NodeKind::TableValuedFunction { columns, .. } =
                kind
            {
                stack.extend(columns.iter().copied());
            }
            let mut kids = kind.children();
            kids.reverse();
            stack.extend(kids);
        }

        let mut map = HashMap::with_capacity(originals.len());
        for &old in &originals {
            let copy = self.node(old).clone();
            let new = NodeId(self.nodes.len() as u32);
            self.nodes.push(copy);
            map.insert(old, new);
        }

        for &old in &originals {
            let new = map[&old];
            let kind = &mut self.node_mut(new).kind;
            for slot in kind.children_mut() {
                if let Some(m) = map.get(slot) {
                    *slot = *m;
                }
            }
            for slot in kind.refs_mut() {
                if let Some(m) = map.get(slot) {
                    *slot = *m;
                }
            }
        }

        Duplicate {
            root: map[&root],
            map,
        }
    }
}

#[cfg(test)]
#[path = "duplicate_test.rs"]
mod tests;
