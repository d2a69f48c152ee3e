use crate::blackboard::Blackboard;
use crate::key::BlackboardKeyManager;
use crate::tree::{ActionFn, BehaviorNode, ContinuationFn, NodeState, SelectorFn};
use std::collections::HashMap;

/// Builds a handler, registering whatever blackboard keys it needs.
pub type Constructor<T> = Box<dyn Fn(&mut BlackboardKeyManager) -> T>;

pub fn boxify_action<C: ?Sized>(
    handler: impl Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard, f32) -> bool
        + Send
        + Sync
        + 'static,
) -> ActionFn<C> {
    Box::new(handler)
}

pub fn boxify_selector<C: ?Sized>(
    select: impl Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard) -> Option<usize>
        + Send
        + Sync
        + 'static,
) -> SelectorFn<C> {
    Box::new(select)
}

pub fn boxify_continuation<C: ?Sized>(
    proceed: impl Fn(&mut NodeState, &mut C, &BehaviorNode<C>, &mut Blackboard) -> bool
        + Send
        + Sync
        + 'static,
) -> ContinuationFn<C> {
    Box::new(proceed)
}

/// Named handler constructors for trees described as data.
pub struct Registry<C: ?Sized> {
    actions: HashMap<String, Constructor<ActionFn<C>>>,
    selectors: HashMap<String, Constructor<SelectorFn<C>>>,
    continuations: HashMap<String, Constructor<ContinuationFn<C>>>,
}

impl<C: ?Sized + 'static> Default for Registry<C> {
    fn default() -> Self {
        let mut ret = Self::empty();
        ret.register_action("succeed", |_| boxify_action(|_, _, _, _, _| true));
        ret.register_continuation("always", |_| boxify_continuation(|_, _, _, _| true));
        ret.register_continuation("never", |_| boxify_continuation(|_, _, _, _| false));
        ret.register_selector("first", |_| boxify_selector(|_, _, _, _| Some(0)));
        ret
    }
}

impl<C: ?Sized> Registry<C> {
    /// A registry without the builtin handlers.
    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
            selectors: HashMap::new(),
            continuations: HashMap::new(),
        }
    }

    pub fn register_action(
        &mut self,
        name: impl ToString,
        constructor: impl Fn(&mut BlackboardKeyManager) -> ActionFn<C> + 'static,
    ) {
        self.actions.insert(name.to_string(), Box::new(constructor));
    }

    pub fn register_selector(
        &mut self,
        name: impl ToString,
        constructor: impl Fn(&mut BlackboardKeyManager) -> SelectorFn<C> + 'static,
    ) {
        self.selectors.insert(name.to_string(), Box::new(constructor));
    }

    pub fn register_continuation(
        &mut self,
        name: impl ToString,
        constructor: impl Fn(&mut BlackboardKeyManager) -> ContinuationFn<C> + 'static,
    ) {
        self.continuations
            .insert(name.to_string(), Box::new(constructor));
    }

    pub fn build_action(&self, name: &str, keys: &mut BlackboardKeyManager) -> Option<ActionFn<C>> {
        self.actions.get(name).map(|constructor| constructor(keys))
    }

    pub fn build_selector(
        &self,
        name: &str,
        keys: &mut BlackboardKeyManager,
    ) -> Option<SelectorFn<C>> {
        self.selectors.get(name).map(|constructor| constructor(keys))
    }

    pub fn build_continuation(
        &self,
        name: &str,
        keys: &mut BlackboardKeyManager,
    ) -> Option<ContinuationFn<C>> {
        self.continuations
            .get(name)
            .map(|constructor| constructor(keys))
    }
}
