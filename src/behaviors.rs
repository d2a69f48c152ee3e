//! The stock pet: bark, nap for five seconds, repeat forever.

use crate::blackboard::Blackboard;
use crate::error::{BuildResult, PetError};
use crate::host::Host;
use crate::key::{BlackboardKey, BlackboardKeyManager};
use crate::registry::{boxify_action, boxify_continuation, Registry};
use crate::tree::{BehaviorNode, BehaviorTree, NodeState, TreeBuilder};
use log::{debug, info, warn};

pub const BARK_COUNT_KEY: &str = "BarkCount";
pub const NAP_MS: i64 = 5000;
/// Longest single host sleep a napping pet asks for.
pub const NAP_SLICE_MS: i64 = 50;

type PetNode = BehaviorNode<dyn Host>;

/// Logs a bark and counts it under [`BARK_COUNT_KEY`].
pub fn bark(
    bark_count: BlackboardKey,
) -> impl Fn(&mut NodeState, &mut (dyn Host + 'static), &PetNode, &mut Blackboard, f32) -> bool
       + Send
       + Sync
       + 'static {
    move |state, _, _, blackboard, _| {
        // The first bark of this pet starts the count from zero whatever the
        // slot held before.
        let barks = match state {
            NodeState::Counter(_) => blackboard.read::<u32>(bark_count).unwrap_or(0),
            _ => 0,
        };
        let barks = barks.wrapping_add(1);
        if let Err(e) = blackboard.write(bark_count, barks) {
            warn!("Could not store bark count: {}", e);
        }
        *state = NodeState::Counter(barks);
        info!("Bork bork!");
        true
    }
}

/// Sleeps through the host in short slices until five seconds have passed,
/// counting both frame time and the time slept here.
pub fn sleep_5s(
    state: &mut NodeState,
    host: &mut (dyn Host + 'static),
    _node: &PetNode,
    _blackboard: &mut Blackboard,
    delta_time: f32,
) -> bool {
    let remaining = match *state {
        NodeState::Countdown { remaining_ms } => remaining_ms,
        _ => NAP_MS,
    };
    let remaining = remaining - (delta_time * 1000.0) as i64;
    if remaining <= 0 {
        state.clear();
        return true;
    }
    let request = remaining.min(NAP_SLICE_MS) as u32;

    let slept = match host.sleep(request) {
        Ok(slept) => slept,
        Err(e) => {
            if e != PetError::NotImplemented {
                debug!("Nap cut short: {}", e);
            }
            state.clear();
            return true;
        }
    };

    let remaining = remaining - slept as i64;
    if remaining <= 0 {
        state.clear();
        return true;
    }
    *state = NodeState::Countdown {
        remaining_ms: remaining,
    };
    false
}

pub fn continue_tree(
    _state: &mut NodeState,
    _host: &mut (dyn Host + 'static),
    _node: &PetNode,
    _blackboard: &mut Blackboard,
) -> bool {
    true
}

/// `Repeat(continue_tree) -> Sequence[bark, sleep_5s]`, registering the keys
/// its actions use.
pub fn default_tree(keys: &mut BlackboardKeyManager) -> BuildResult<BehaviorTree<dyn Host>> {
    let bark_count = keys.calculate_key(BARK_COUNT_KEY, std::mem::size_of::<u32>());

    let mut builder = TreeBuilder::<dyn Host>::new();
    let bark = builder.action(bark(bark_count));
    builder.set_name(bark, "Bark")?;
    let nap = builder.action(sleep_5s);
    builder.set_name(nap, "Sleep5s")?;
    let sequence = builder.sequence(&[bark, nap])?;
    builder.set_name(sequence, "BarkSequence")?;
    let root = builder.repeat(sequence, continue_tree)?;
    builder.set_name(root, "Root")?;
    builder.build(root)
}

/// A registry with the builtins plus `Bark`, `Sleep5s` and `ContinueTree`,
/// for pets described in YAML.
pub fn registry() -> Registry<dyn Host> {
    let mut reg = Registry::default();
    reg.register_action("Bark", |keys: &mut BlackboardKeyManager| {
        let bark_count = keys.calculate_key(BARK_COUNT_KEY, std::mem::size_of::<u32>());
        boxify_action(bark(bark_count))
    });
    reg.register_action("Sleep5s", |_: &mut BlackboardKeyManager| {
        boxify_action(sleep_5s)
    });
    reg.register_continuation("ContinueTree", |_: &mut BlackboardKeyManager| {
        boxify_continuation(continue_tree)
    });
    reg
}
