use std::collections::VecDeque;

use ahash::RandomState;
use hashbrown::{HashMap, HashSet};

use crate::model::{Node, NodeId, NO_PARENT};

/// Parsed skeleton: nodes keyed by ID plus the parent -> children index.
///
/// A node is listed under its parent only when the parent exists in the
/// table; otherwise it is one of the roots.
#[derive(Debug, Default)]
pub struct Forest {
    nodes: HashMap<NodeId, Node, RandomState>,
    // first-insertion order of IDs, so child lists follow input order
    order: Vec<NodeId>,
    children: HashMap<NodeId, Vec<NodeId>, RandomState>,
    roots: Vec<NodeId>,
}

impl Forest {
    pub fn new() -> Self { Self::default() }

    /// Builds the forest from nodes in input order. A repeated ID replaces
    /// the earlier record but keeps its original position.
    pub fn from_nodes<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        let mut f = Self::new();
        for n in nodes { f.insert(n); }
        f.link();
        f
    }

    /// Returns true when `node.id` was already present.
    pub(crate) fn insert(&mut self, node: Node) -> bool {
        let replaced = self.nodes.insert(node.id, node).is_some();
        if !replaced { self.order.push(node.id); }
        replaced
    }

    /// Derives the child index and the root set from the node table.
    pub(crate) fn link(&mut self) {
        self.children.clear();
        let mut roots = Vec::new();
        for id in &self.order {
            let parent = self.nodes[id].parent;
            if parent == NO_PARENT {
                roots.push(*id);
            } else if self.nodes.contains_key(&parent) {
                self.children.entry(parent).or_default().push(*id);
            } else {
                // dangling parent: starts its own fragment
                roots.push(*id);
            }
        }
        roots.sort_unstable();
        roots.dedup();
        self.roots = roots;
    }

    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(&id) }

    /// Child IDs in input order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fragment roots in ascending order.
    pub fn roots(&self) -> &[NodeId] { &self.roots }

    /// Walks the nodes reachable from `root`.
    pub fn extract(&self, root: NodeId) -> Fragment {
        Fragment::extract(self, root)
    }
}

/// Nodes reachable from one root, in canonical emission order.
///
/// The order is breadth-first from the root with each node's children
/// visited in ascending ID order. It serves both membership tests and
/// serialization.
#[derive(Debug, Clone)]
pub struct Fragment {
    root: NodeId,
    order: Vec<NodeId>,
    members: HashSet<NodeId, RandomState>,
}

impl Fragment {
    pub fn extract(forest: &Forest, root: NodeId) -> Self {
        let mut order = Vec::new();
        let mut members: HashSet<NodeId, RandomState> = HashSet::with_hasher(RandomState::new());
        let mut queue = VecDeque::from([root]);
        let mut kids: Vec<NodeId> = Vec::new();
        while let Some(u) = queue.pop_front() {
            // the visited guard also stops cycles in malformed input
            if !members.insert(u) { continue; }
            order.push(u);
            kids.clear();
            kids.extend_from_slice(forest.children(u));
            kids.sort_unstable();
            queue.extend(kids.iter().copied().filter(|v| !members.contains(v)));
        }
        Self { root, order, members }
    }

    #[cfg(test)]
    pub(crate) fn from_ids(root: NodeId, order: Vec<NodeId>) -> Self {
        let members = order.iter().copied().collect();
        Self { root, order, members }
    }

    pub fn root(&self) -> NodeId { self.root }

    pub fn len(&self) -> usize { self.order.len() }
    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.members.contains(&id) }

    /// IDs in emission order; the root comes first.
    pub fn ids(&self) -> &[NodeId] { &self.order }

    /// Member nodes resolved against `forest`, in emission order.
    pub fn nodes<'a>(&'a self, forest: &'a Forest) -> impl Iterator<Item = &'a Node> + 'a {
        self.order.iter().filter_map(move |id| forest.node(*id))
    }
}
