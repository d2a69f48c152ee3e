//! Per-agent interpreter over a shared [`BehaviorTree`].
//!
//! The executor remembers the last action leaf it visited and resumes there
//! on the next tick. Only action handlers can keep the agent on the same
//! leaf across ticks, by returning `false`; every other node hands control to
//! a child or back to its parent within the tick that reached it.

use crate::blackboard::Blackboard;
use crate::tree::{BehaviorTree, NodeId, NodeKind, NodeState};
use log::{debug, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorPhase {
    /// No agent state yet, or the tree was left through the root.
    Uninitialized,
    /// `current` is an action that has not finished.
    Running,
    /// `current` just finished and its parent decides what comes next.
    FinishedNode,
}

#[derive(Clone, Copy)]
enum Dispatch {
    /// Entering a node from its parent.
    Descend(NodeId),
    /// Returning to a node from one of its children.
    Ascend(NodeId),
    /// An action leaf was recorded as the resume point.
    Settled,
    /// Control climbed past the root.
    Exited,
}

pub struct Executor<C: ?Sized> {
    tree: Arc<BehaviorTree<C>>,
    current: Option<NodeId>,
    phase: ExecutorPhase,
    delta_time: f32,
    states: Vec<NodeState>,
}

impl<C: ?Sized> Executor<C> {
    pub fn new(tree: Arc<BehaviorTree<C>>) -> Self {
        Self {
            tree,
            current: None,
            phase: ExecutorPhase::Uninitialized,
            delta_time: 0.,
            states: vec![],
        }
    }

    pub fn tree(&self) -> &Arc<BehaviorTree<C>> {
        &self.tree
    }

    pub fn phase(&self) -> ExecutorPhase {
        self.phase
    }

    /// The action leaf the next tick resumes, if any.
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// This agent's memory for `node`; `None` before the first tick.
    pub fn state(&self, node: NodeId) -> Option<&NodeState> {
        self.states.get(self.tree.get(node)?.state_index()?)
    }

    /// Forgets the resume point. Node states are kept; the next tick starts
    /// over from the root continuation.
    pub fn reset(&mut self) {
        self.current = None;
        self.phase = ExecutorPhase::Uninitialized;
    }

    /// Advances the agent by one frame.
    pub fn tick(&mut self, delta_time: f32, ctx: &mut C, blackboard: &mut Blackboard) {
        if self.phase == ExecutorPhase::Uninitialized {
            self.init_state();

            let root = self.tree.root();
            let Some(child) = self.tree.node(root).children().first().copied() else {
                return;
            };
            if !self.proceed(root, ctx, blackboard) {
                return;
            }
            self.current = Some(child);
            self.phase = ExecutorPhase::FinishedNode;
        }

        let Some(current) = self.current else {
            return;
        };
        self.delta_time = delta_time;

        if self.phase == ExecutorPhase::Running && self.run_action(current, ctx, blackboard) {
            self.phase = ExecutorPhase::FinishedNode;
        }

        if self.phase == ExecutorPhase::FinishedNode {
            let parent = self.tree.node(current).parent();
            self.dispatch(parent, ctx, blackboard);
            if self.phase == ExecutorPhase::FinishedNode {
                self.phase = ExecutorPhase::Running;
            }
        }
    }

    fn init_state(&mut self) {
        self.tree.assign_state_indices();
        let len = self.tree.len();
        if self.states.len() != len {
            self.states = (0..len).map(|_| NodeState::Empty).collect();
        }
    }

    /// Follows zero-duration redirections until an action leaf is recorded.
    fn dispatch(&mut self, start: Option<NodeId>, ctx: &mut C, blackboard: &mut Blackboard) {
        let limit = 4 * self.tree.len() + 8;
        let mut budget = limit;
        let mut next = match start {
            Some(node) => Dispatch::Ascend(node),
            None => Dispatch::Exited,
        };
        loop {
            match next {
                Dispatch::Descend(node) | Dispatch::Ascend(node) => {
                    if budget == 0 {
                        warn!(
                            "Behavior tree dispatch did not reach an action within {} steps; \
                             idling until the next tick",
                            limit
                        );
                        self.reset();
                        return;
                    }
                    budget -= 1;
                    let from_child = matches!(next, Dispatch::Ascend(_));
                    next = self.execute(node, from_child, ctx, blackboard);
                }
                Dispatch::Settled => return,
                Dispatch::Exited => {
                    debug!("Behavior tree finished through the root");
                    self.reset();
                    return;
                }
            }
        }
    }

    fn execute(
        &mut self,
        id: NodeId,
        from_child: bool,
        ctx: &mut C,
        blackboard: &mut Blackboard,
    ) -> Dispatch {
        let tree = &*self.tree;
        let node = tree.node(id);
        let index = tree.state_index(id);
        let ascend = || match node.parent() {
            Some(parent) => Dispatch::Ascend(parent),
            None => Dispatch::Exited,
        };

        match node.kind() {
            NodeKind::Sequence { children } => {
                let slot = &mut self.states[index];
                let pos = match slot {
                    NodeState::Sequence { next } => *next,
                    _ => 0,
                };
                if children.is_empty() {
                    return ascend();
                }
                *slot = NodeState::Sequence {
                    next: (pos + 1) % children.len(),
                };
                match children.get(pos) {
                    Some(child) => Dispatch::Descend(*child),
                    None => ascend(),
                }
            }
            NodeKind::Selector { children, select } => {
                // A selector runs one chosen child per visit from above.
                if from_child {
                    return ascend();
                }
                let choice = select(&mut self.states[index], ctx, node, blackboard);
                match choice.and_then(|i| children.get(i)) {
                    Some(child) => Dispatch::Descend(*child),
                    None => ascend(),
                }
            }
            NodeKind::Repeat { child, proceed } => {
                if proceed(&mut self.states[index], ctx, node, blackboard) {
                    Dispatch::Descend(*child)
                } else {
                    ascend()
                }
            }
            NodeKind::Action { .. } => {
                self.current = Some(id);
                Dispatch::Settled
            }
        }
    }

    /// Calls the handler of the action at `id`, returning whether it finished.
    fn run_action(&mut self, id: NodeId, ctx: &mut C, blackboard: &mut Blackboard) -> bool {
        let tree = &*self.tree;
        let node = tree.node(id);
        match node.kind() {
            NodeKind::Action { handler } => {
                let index = tree.state_index(id);
                handler(&mut self.states[index], ctx, node, blackboard, self.delta_time)
            }
            _ => true,
        }
    }

    fn proceed(&mut self, id: NodeId, ctx: &mut C, blackboard: &mut Blackboard) -> bool {
        let tree = &*self.tree;
        let node = tree.node(id);
        match node.kind() {
            NodeKind::Repeat { proceed, .. } => {
                let index = tree.state_index(id);
                proceed(&mut self.states[index], ctx, node, blackboard)
            }
            _ => false,
        }
    }
}

impl<C: ?Sized> std::fmt::Debug for Executor<C> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Executor")
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("delta_time", &self.delta_time)
            .field("states", &self.states)
            .finish()
    }
}

#[cfg(test)]
mod test;
