//=====================================================
// File: profiler/tree.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Arena-backed call tree keyed by call path
// Objective: Aggregate calls, instructions, and exclusive time for every
//            distinct call stack observed while the VM runs
//=====================================================

/// Stable handle to a node stored in a [`CallTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
}

impl NodeId {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Statistics for every execution that shares one exact call path.
///
/// `f -> g -> g` and `g -> f -> g` end in the same function but are
/// different nodes. Counters are exclusive: work done in callees is recorded
/// on the callee's node, never on this one.
#[derive(Debug, Clone)]
pub struct ProfileNode<F> {
    function: Option<F>,
    calls: u64,
    instructions: u64,
    nsecs: u64,
    children: Vec<NodeId>,
}

impl<F> ProfileNode<F> {
    fn new(function: Option<F>) -> Self {
        Self {
            function,
            calls: 0,
            instructions: 0,
            nsecs: 0,
            children: Vec::new(),
        }
    }

    /// Function at the top of this call path, `None` for the root.
    pub fn function(&self) -> Option<&F> {
        self.function.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.function.is_none()
    }

    /// Number of times this exact path was entered.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Instructions dispatched while this node was active.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Wall-clock nanoseconds attributed while this node was active.
    /// Approximate; subject to scheduling noise and clock resolution.
    pub fn nsecs(&self) -> u64 {
        self.nsecs
    }

    /// Child paths in the order they were first observed.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn record_call(&mut self) {
        self.calls += 1;
    }

    pub(crate) fn record_instruction(&mut self) {
        self.instructions += 1;
    }

    pub(crate) fn add_nsecs(&mut self, nsecs: u64) {
        self.nsecs = self.nsecs.saturating_add(nsecs);
    }
}

/// Rooted tree of call paths. Nodes are created lazily and never removed.
#[derive(Debug, Clone)]
pub struct CallTree<F> {
    nodes: Vec<ProfileNode<F>>,
}

impl<F: PartialEq> CallTree<F> {
    pub fn new() -> Self {
        Self {
            nodes: vec![ProfileNode::new(None)],
        }
    }

    /// Return the node for a call to `function` made from `parent`,
    /// creating it on first use.
    ///
    /// The search is a linear scan over the distinct callees seen at this
    /// call site, which stays short for real programs.
    pub fn get_or_create_child(&mut self, parent: NodeId, function: F) -> NodeId {
        let existing = self.nodes[parent.index()]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.index()].function.as_ref() == Some(&function));
        if let Some(child) = existing {
            return child;
        }

        let child = NodeId::new(self.nodes.len());
        self.nodes.push(ProfileNode::new(Some(function)));
        self.nodes[parent.index()].children.push(child);
        tracing::trace!(parent = parent.index(), node = child.index(), "new call path");
        child
    }

    /// Follow `path` from the root, matching one function identity per level.
    pub fn find_path(&self, path: &[F]) -> Option<NodeId> {
        let mut current = self.root();
        for function in path {
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|child| self.node(*child).function.as_ref() == Some(function))?;
        }
        Some(current)
    }
}

impl<F> CallTree<F> {
    /// The synthetic top-level node.
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Panics on a handle that did not come from this tree.
    pub fn node(&self, id: NodeId) -> &ProfileNode<F> {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ProfileNode<F> {
        &mut self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ProfileNode<F>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::new(index), node))
    }

    pub fn total_nsecs(&self) -> u64 {
        self.nodes
            .iter()
            .fold(0u64, |acc, node| acc.saturating_add(node.nsecs))
    }

    pub fn total_instructions(&self) -> u64 {
        self.nodes.iter().map(|node| node.instructions).sum()
    }

    /// Time spent in `id` and everything it called.
    pub fn inclusive_nsecs(&self, id: NodeId) -> u64 {
        self.subtree(id)
            .fold(0u64, |acc, node| acc.saturating_add(self.node(node).nsecs))
    }

    /// Instructions executed by `id` and everything it called.
    pub fn inclusive_instructions(&self, id: NodeId) -> u64 {
        self.subtree(id).map(|node| self.node(node).instructions).sum()
    }

    /// Inclusive time for every node, indexed by [`NodeId::index`].
    ///
    /// A child is always allocated after its parent, so one reverse sweep
    /// sees every child's total before the parent's.
    pub fn inclusive_nsecs_by_node(&self) -> Vec<u64> {
        let mut totals: Vec<u64> = self.nodes.iter().map(|node| node.nsecs).collect();
        for index in (0..self.nodes.len()).rev() {
            let from_children = self.nodes[index]
                .children
                .iter()
                .fold(0u64, |acc, child| acc.saturating_add(totals[child.index()]));
            totals[index] = totals[index].saturating_add(from_children);
        }
        totals
    }

    fn subtree(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut pending = vec![id];
        std::iter::from_fn(move || {
            let next = pending.pop()?;
            pending.extend_from_slice(self.children(next));
            Some(next)
        })
    }
}

impl<F: PartialEq> Default for CallTree<F> {
    fn default() -> Self {
        Self::new()
    }
}


//=====================================================
// End of file
//=====================================================
