use crate::blackboard::Blackboard;
use crate::error::PetResult;
use crate::executor::Executor;
use crate::host::{Gender, Host, PetId};
use crate::key::BlackboardKeyManager;
use crate::tree::BehaviorTree;
use std::sync::Arc;

/// One simulated pet: its own blackboard and executor over the shared tree,
/// plus the opaque state blob its host gave it.
#[derive(Debug)]
pub struct Pet {
    id: PetId,
    parent_male: Option<PetId>,
    parent_female: Option<PetId>,
    gender: Gender,
    state: Vec<u8>,
    blackboard: Blackboard,
    executor: Executor<dyn Host>,
}

impl Pet {
    pub(crate) fn new(
        id: PetId,
        parents: (Option<PetId>, Option<PetId>),
        gender: Gender,
        state: Vec<u8>,
        keys: &BlackboardKeyManager,
        tree: Arc<BehaviorTree<dyn Host>>,
    ) -> PetResult<Self> {
        Ok(Self {
            id,
            parent_male: parents.0,
            parent_female: parents.1,
            gender,
            state,
            blackboard: Blackboard::new(keys)?,
            executor: Executor::new(tree),
        })
    }

    pub fn id(&self) -> PetId {
        self.id
    }

    pub fn parent_male(&self) -> Option<PetId> {
        self.parent_male
    }

    pub fn parent_female(&self) -> Option<PetId> {
        self.parent_female
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn state(&self) -> &[u8] {
        &self.state
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn executor(&self) -> &Executor<dyn Host> {
        &self.executor
    }

    pub(crate) fn tick(&mut self, delta_time: f32, host: &mut (dyn Host + 'static)) {
        self.executor.tick(delta_time, host, &mut self.blackboard);
    }
}
