//! Shared behavior tree structure.
//!
//! A [`BehaviorTree`] is an arena of [`BehaviorNode`]s linked by [`NodeId`].
//! It is built once with a [`TreeBuilder`] and never mutated afterwards, so a
//! single `Arc<BehaviorTree<C>>` can drive any number of agents. Everything an
//! agent remembers between ticks lives in its own [`NodeState`] array, indexed
//! by each node's state index.

use crate::blackboard::Blackboard;
use crate::error::{BuildError, BuildResult};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt::{self, Debug, Formatter};

/// Performs one quantum of work and returns `true` once the action is done.
/// The last argument is the elapsed time of the current tick in seconds.
pub type ActionFn<C> = Box<
    dyn Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard, f32) -> bool + Send + Sync,
>;

/// Picks the child to run. `None` or an index past the last child makes the
/// selector finish and hand control back to its parent.
pub type SelectorFn<C> = Box<
    dyn Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard) -> Option<usize>
        + Send
        + Sync,
>;

/// Decides whether a repeat node enters its child again.
pub type ContinuationFn<C> =
    Box<dyn Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Per-agent memory of one node.
pub enum NodeState {
    /// Nothing stored yet.
    Empty,
    Sequence { next: usize },
    Countdown { remaining_ms: i64 },
    Counter(u32),
    Flag(bool),
    /// Anything else a handler wants to keep across ticks.
    Custom(Box<dyn Any + Send>),
}

impl NodeState {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn clear(&mut self) {
        *self = Self::Empty;
    }

    pub fn custom<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(value) => value.downcast_ref(),
            _ => None,
        }
    }

    pub fn custom_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            Self::Custom(value) => value.downcast_mut(),
            _ => None,
        }
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Empty
    }
}

impl Debug for NodeState {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Empty => write!(fmt, "Empty"),
            Self::Sequence { next } => write!(fmt, "Sequence {{ next: {} }}", next),
            Self::Countdown { remaining_ms } => {
                write!(fmt, "Countdown {{ remaining_ms: {} }}", remaining_ms)
            }
            Self::Counter(count) => write!(fmt, "Counter({})", count),
            Self::Flag(flag) => write!(fmt, "Flag({})", flag),
            Self::Custom(_) => write!(fmt, "Custom(..)"),
        }
    }
}

pub enum NodeKind<C: ?Sized> {
    /// Runs its children round-robin, one child per visit.
    Sequence { children: Vec<NodeId> },
    Selector {
        children: Vec<NodeId>,
        select: SelectorFn<C>,
    },
    Repeat {
        child: NodeId,
        proceed: ContinuationFn<C>,
    },
    Action { handler: ActionFn<C> },
}

impl<C: ?Sized> NodeKind<C> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequence { .. } => "Sequence",
            Self::Selector { .. } => "Selector",
            Self::Repeat { .. } => "Repeat",
            Self::Action { .. } => "Action",
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Sequence { children } | Self::Selector { children, .. } => children,
            Self::Repeat { child, .. } => std::slice::from_ref(child),
            Self::Action { .. } => &[],
        }
    }
}

pub struct BehaviorNode<C: ?Sized> {
    name: Option<String>,
    parent: Option<NodeId>,
    state_index: OnceCell<usize>,
    kind: NodeKind<C>,
}

impl<C: ?Sized> BehaviorNode<C> {
    fn new(kind: NodeKind<C>) -> Self {
        Self {
            name: None,
            parent: None,
            state_index: OnceCell::new(),
            kind,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Slot of this node in every agent's state array, once numbered.
    pub fn state_index(&self) -> Option<usize> {
        self.state_index.get().copied()
    }

    pub fn kind(&self) -> &NodeKind<C> {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        self.kind.children()
    }
}

impl<C: ?Sized> Debug for BehaviorNode<C> {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("BehaviorNode")
            .field("name", &self.name)
            .field("kind", &self.kind.name())
            .field("parent", &self.parent)
            .field("state_index", &self.state_index.get())
            .field("children", &self.children())
            .finish()
    }
}

/// Assembles a tree bottom-up: children are created first and handed to the
/// composite that owns them.
pub struct TreeBuilder<C: ?Sized> {
    nodes: Vec<BehaviorNode<C>>,
}

impl<C: ?Sized> Default for TreeBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> TreeBuilder<C> {
    pub fn new() -> Self {
        Self { nodes: vec![] }
    }

    pub fn action(
        &mut self,
        handler: impl Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard, f32) -> bool
            + Send
            + Sync
            + 'static,
    ) -> NodeId {
        self.push(NodeKind::Action {
            handler: Box::new(handler),
        })
    }

    pub fn sequence(&mut self, children: &[NodeId]) -> BuildResult<NodeId> {
        let id = NodeId(self.nodes.len());
        self.adopt(id, children)?;
        Ok(self.push(NodeKind::Sequence {
            children: children.to_vec(),
        }))
    }

    pub fn selector(
        &mut self,
        children: &[NodeId],
        select: impl Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard) -> Option<usize>
            + Send
            + Sync
            + 'static,
    ) -> BuildResult<NodeId> {
        let id = NodeId(self.nodes.len());
        self.adopt(id, children)?;
        Ok(self.push(NodeKind::Selector {
            children: children.to_vec(),
            select: Box::new(select),
        }))
    }

    pub fn repeat(
        &mut self,
        child: NodeId,
        proceed: impl Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard) -> bool
            + Send
            + Sync
            + 'static,
    ) -> BuildResult<NodeId> {
        let id = NodeId(self.nodes.len());
        self.adopt(id, &[child])?;
        Ok(self.push(NodeKind::Repeat {
            child,
            proceed: Box::new(proceed),
        }))
    }

    /// Boxed variants used by the data-driven loader.
    pub(crate) fn push_action(&mut self, handler: ActionFn<C>) -> NodeId {
        self.push(NodeKind::Action { handler })
    }

    pub(crate) fn push_selector(
        &mut self,
        children: &[NodeId],
        select: SelectorFn<C>,
    ) -> BuildResult<NodeId> {
        let id = NodeId(self.nodes.len());
        self.adopt(id, children)?;
        Ok(self.push(NodeKind::Selector {
            children: children.to_vec(),
            select,
        }))
    }

    pub(crate) fn push_repeat(
        &mut self,
        child: NodeId,
        proceed: ContinuationFn<C>,
    ) -> BuildResult<NodeId> {
        let id = NodeId(self.nodes.len());
        self.adopt(id, &[child])?;
        Ok(self.push(NodeKind::Repeat { child, proceed }))
    }

    pub fn set_name(&mut self, node: NodeId, name: impl Into<String>) -> BuildResult<()> {
        let node = self
            .nodes
            .get_mut(node.0)
            .ok_or(BuildError::UnknownNode(node.0))?;
        node.name = Some(name.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finishes the tree. `root` must be a repeat node and every node created
    /// by this builder must be reachable from it.
    pub fn build(self, root: NodeId) -> BuildResult<BehaviorTree<C>> {
        let root_node = self
            .nodes
            .get(root.0)
            .ok_or(BuildError::UnknownNode(root.0))?;
        if !matches!(root_node.kind, NodeKind::Repeat { .. }) {
            return Err(BuildError::RootNotRepeat);
        }

        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reachable[id.0] = true;
            stack.extend_from_slice(self.nodes[id.0].children());
        }
        if let Some(node) = reachable.iter().position(|r| !r) {
            return Err(BuildError::Detached { node });
        }

        Ok(BehaviorTree {
            nodes: self.nodes,
            root,
        })
    }

    fn push(&mut self, kind: NodeKind<C>) -> NodeId {
        self.nodes.push(BehaviorNode::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    fn adopt(&mut self, parent: NodeId, children: &[NodeId]) -> BuildResult<()> {
        for (i, child) in children.iter().enumerate() {
            let node = self
                .nodes
                .get(child.0)
                .ok_or(BuildError::UnknownNode(child.0))?;
            if node.parent.is_some() || children[..i].contains(child) {
                return Err(BuildError::AlreadyParented { node: child.0 });
            }
        }
        for child in children {
            self.nodes[child.0].parent = Some(parent);
        }
        Ok(())
    }
}

pub struct BehaviorTree<C: ?Sized> {
    nodes: Vec<BehaviorNode<C>>,
    root: NodeId,
}

impl<C: ?Sized> BehaviorTree<C> {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// # Panics
    ///
    /// If `id` does not belong to this tree. Use [`get`](Self::get) for ids
    /// of unknown origin.
    pub fn node(&self, id: NodeId) -> &BehaviorNode<C> {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&BehaviorNode<C>> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name.as_deref() == Some(name))
            .map(NodeId)
    }

    /// Numbers every node in depth-first pre-order from the root and returns
    /// whether this call did the numbering. Once numbered, calls return
    /// `false` without walking the tree.
    pub fn assign_state_indices(&self) -> bool {
        if self.indices_assigned() {
            return false;
        }
        let mut next = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            node.state_index.get_or_init(|| next);
            next += 1;
            stack.extend(node.children().iter().rev());
        }
        true
    }

    pub fn indices_assigned(&self) -> bool {
        self.nodes[self.root.0].state_index.get().is_some()
    }

    /// State slot of `id`, numbering the tree first if needed.
    pub fn state_index(&self, id: NodeId) -> usize {
        let cell = &self.nodes[id.0].state_index;
        if let Some(index) = cell.get() {
            return *index;
        }
        self.assign_state_indices();
        cell.get().copied().unwrap_or(id.0)
    }

    /// Node ids in pre-order.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children().iter().rev());
        }
        out
    }
}

impl<C: ?Sized> Debug for BehaviorTree<C> {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("BehaviorTree")
            .field("root", &self.root)
            .field("nodes", &self.nodes)
            .finish()
    }
}
