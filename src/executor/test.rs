use super::*;
use crate::key::BlackboardKeyManager;
use crate::tree::{BehaviorNode, TreeBuilder};

#[derive(Default)]
struct Recorder {
    tick: u32,
    calls: Vec<(u32, &'static str)>,
    proceed_calls: u32,
    stop: bool,
}

type Action = Box<
    dyn Fn(&mut NodeState, &mut Recorder, &BehaviorNode<Recorder>, &mut Blackboard, f32) -> bool
        + Send
        + Sync,
>;

type Select = Box<
    dyn Fn(&mut NodeState, &mut Recorder, &BehaviorNode<Recorder>, &mut Blackboard) -> Option<usize>
        + Send
        + Sync,
>;

fn picks(choice: Option<usize>) -> Select {
    Box::new(move |_, _, _, _| choice)
}

/// An action that logs its call and finishes on the `n`th call of a run.
fn finishes_after(name: &'static str, n: u32) -> Action {
    Box::new(move |state, rec, _, _, _| {
        rec.calls.push((rec.tick, name));
        let count = match state {
            NodeState::Counter(count) => *count + 1,
            _ => 1,
        };
        if count >= n {
            state.clear();
            true
        } else {
            *state = NodeState::Counter(count);
            false
        }
    })
}

fn proceed(
    _: &mut NodeState,
    rec: &mut Recorder,
    _: &BehaviorNode<Recorder>,
    _: &mut Blackboard,
) -> bool {
    rec.proceed_calls += 1;
    !rec.stop
}

fn blackboard() -> Blackboard {
    Blackboard::new(&BlackboardKeyManager::new()).unwrap()
}

fn run(executor: &mut Executor<Recorder>, rec: &mut Recorder, ticks: u32) {
    let mut bb = blackboard();
    for _ in 0..ticks {
        rec.tick += 1;
        executor.tick(0.016, rec, &mut bb);
    }
}

fn sequence_tree(actions: Vec<Action>) -> Arc<BehaviorTree<Recorder>> {
    let mut builder = TreeBuilder::new();
    let children: Vec<_> = actions.into_iter().map(|a| builder.action(a)).collect();
    let seq = builder.sequence(&children).unwrap();
    let root = builder.repeat(seq, proceed).unwrap();
    Arc::new(builder.build(root).unwrap())
}

#[test]
fn test_sequence_is_round_robin() {
    let tree = sequence_tree(vec![
        finishes_after("a", 1),
        finishes_after("b", 1),
        finishes_after("c", 1),
    ]);
    let mut executor = Executor::new(tree);
    let mut rec = Recorder::default();
    run(&mut executor, &mut rec, 10);

    let names: Vec<_> = rec.calls.iter().map(|(_, name)| *name).collect();
    assert_eq!(names, vec!["a", "b", "c", "a", "b", "c", "a", "b", "c"]);
    // The first tick only finds the first leaf.
    assert_eq!(rec.calls[0].0, 2);
}

#[test]
fn test_suspended_action_resumes() {
    let tree = sequence_tree(vec![finishes_after("wait", 4), finishes_after("other", 1)]);
    let mut executor = Executor::new(tree);
    let mut rec = Recorder::default();
    run(&mut executor, &mut rec, 6);

    assert_eq!(
        rec.calls,
        vec![(2, "wait"), (3, "wait"), (4, "wait"), (5, "wait"), (6, "other")]
    );
}

#[test]
fn test_finished_action_hands_over_in_same_tick() {
    // Repeat -> Sequence[a1 finishes at once, a2 finishes on its third call]
    let tree = sequence_tree(vec![finishes_after("a1", 1), finishes_after("a2", 3)]);
    let mut executor = Executor::new(tree);
    let mut rec = Recorder::default();

    run(&mut executor, &mut rec, 1);
    assert!(rec.calls.is_empty());
    assert_eq!(executor.phase(), ExecutorPhase::Running);

    run(&mut executor, &mut rec, 5);
    assert_eq!(
        rec.calls,
        vec![(2, "a1"), (3, "a2"), (4, "a2"), (5, "a2"), (6, "a1")]
    );
}

#[test]
fn test_selector_out_of_range_ascends() {
    // Repeat -> Sequence[Selector(5)[x, y], z]
    let mut builder = TreeBuilder::new();
    let x = builder.action(finishes_after("x", 1));
    let y = builder.action(finishes_after("y", 1));
    let z = builder.action(finishes_after("z", 1));
    let sel = builder.selector(&[x, y], picks(Some(5))).unwrap();
    let seq = builder.sequence(&[sel, z]).unwrap();
    let root = builder.repeat(seq, proceed).unwrap();
    let mut executor = Executor::new(Arc::new(builder.build(root).unwrap()));
    let mut rec = Recorder::default();

    run(&mut executor, &mut rec, 1);
    assert_eq!(executor.current(), Some(z));
    run(&mut executor, &mut rec, 3);
    assert_eq!(rec.calls, vec![(2, "z"), (3, "z"), (4, "z")]);
}

#[test]
fn test_selector_runs_chosen_child_once() {
    // Repeat -> Sequence[Selector(1)[x, y], z]
    let mut builder = TreeBuilder::new();
    let x = builder.action(finishes_after("x", 1));
    let y = builder.action(finishes_after("y", 1));
    let z = builder.action(finishes_after("z", 1));
    let sel = builder.selector(&[x, y], picks(Some(1))).unwrap();
    let seq = builder.sequence(&[sel, z]).unwrap();
    let root = builder.repeat(seq, proceed).unwrap();
    let mut executor = Executor::new(Arc::new(builder.build(root).unwrap()));
    let mut rec = Recorder::default();

    run(&mut executor, &mut rec, 5);
    let names: Vec<_> = rec.calls.iter().map(|(_, name)| *name).collect();
    assert_eq!(names, vec!["y", "z", "y", "z"]);
}

#[test]
fn test_runaway_dispatch_is_cut_off() {
    let mut builder = TreeBuilder::new();
    let x = builder.action(finishes_after("x", 1));
    let sel = builder.selector(&[x], picks(None)).unwrap();
    let root = builder.repeat(sel, proceed).unwrap();
    let tree = Arc::new(builder.build(root).unwrap());
    let limit = 4 * tree.len() + 8;
    let mut executor = Executor::new(tree);
    let mut rec = Recorder::default();

    run(&mut executor, &mut rec, 1);
    assert!(rec.calls.is_empty());
    assert_eq!(executor.phase(), ExecutorPhase::Uninitialized);
    assert_eq!(executor.current(), None);
    // One bootstrap check plus one per visit of the root.
    assert!(rec.proceed_calls as usize <= limit);

    // Every tick tries again from the root.
    let before = rec.proceed_calls;
    run(&mut executor, &mut rec, 1);
    assert!(rec.proceed_calls > before);
}

#[test]
fn test_root_continuation_stops_and_restarts() {
    let mut builder = TreeBuilder::new();
    let a = builder.action(finishes_after("a", 1));
    let root = builder.repeat(a, proceed).unwrap();
    let mut executor = Executor::new(Arc::new(builder.build(root).unwrap()));
    let mut rec = Recorder {
        stop: true,
        ..Recorder::default()
    };

    run(&mut executor, &mut rec, 2);
    assert!(rec.calls.is_empty());
    assert_eq!(rec.proceed_calls, 2);
    assert_eq!(executor.phase(), ExecutorPhase::Uninitialized);

    rec.stop = false;
    run(&mut executor, &mut rec, 2);
    assert_eq!(rec.calls, vec![(4, "a")]);
    assert_eq!(executor.current(), Some(a));

    // Stopping mid-run leaves through the root once the action finishes.
    rec.stop = true;
    run(&mut executor, &mut rec, 1);
    assert_eq!(rec.calls, vec![(4, "a"), (5, "a")]);
    assert_eq!(executor.current(), None);
    assert_eq!(executor.phase(), ExecutorPhase::Uninitialized);
    run(&mut executor, &mut rec, 3);
    assert_eq!(rec.calls.len(), 2);
}

#[test]
fn test_agents_share_tree_not_state() {
    let tree = sequence_tree(vec![finishes_after("a", 1), finishes_after("b", 2)]);
    let mut first = Executor::new(tree.clone());
    let mut second = Executor::new(tree.clone());
    let mut first_rec = Recorder::default();
    let mut second_rec = Recorder::default();

    run(&mut first, &mut first_rec, 3);
    run(&mut second, &mut second_rec, 2);
    assert_eq!(first_rec.calls, vec![(2, "a"), (3, "b")]);
    assert_eq!(second_rec.calls, vec![(2, "a")]);

    let seq = tree.node(tree.root()).children()[0];
    let b = tree.node(seq).children()[1];
    assert!(matches!(first.state(b), Some(NodeState::Counter(1))));
    assert!(matches!(second.state(b), Some(NodeState::Empty)));
    assert!(matches!(first.state(seq), Some(NodeState::Sequence { next: 0 })));
    assert!(matches!(second.state(seq), Some(NodeState::Sequence { next: 0 })));
}

#[test]
fn test_state_indices_assigned_on_first_tick() {
    let tree = sequence_tree(vec![finishes_after("a", 1)]);
    let executor_tree = tree.clone();
    let mut executor = Executor::new(executor_tree);
    assert!(!tree.indices_assigned());
    assert!(executor.state(tree.root()).is_none());

    run(&mut executor, &mut Recorder::default(), 1);
    assert!(tree.indices_assigned());
    assert!(executor.state(tree.root()).is_some());
}

#[test]
fn test_idle_agent_keeps_its_state() {
    let tree = sequence_tree(vec![finishes_after("a", 1)]);
    let mut executor = Executor::new(tree.clone());
    let mut rec = Recorder {
        stop: true,
        ..Recorder::default()
    };

    run(&mut executor, &mut rec, 1);
    assert!(tree.indices_assigned());
    let states = (executor.states.as_ptr(), executor.states.len());

    run(&mut executor, &mut rec, 100);
    assert_eq!(executor.phase(), ExecutorPhase::Uninitialized);
    assert_eq!(rec.proceed_calls, 101);
    assert!(rec.calls.is_empty());
    assert_eq!((executor.states.as_ptr(), executor.states.len()), states);
    assert!(!tree.assign_state_indices());
}

#[test]
fn test_state_of_foreign_node() {
    let tree = sequence_tree(vec![finishes_after("a", 1)]);
    let mut executor = Executor::new(tree);
    run(&mut executor, &mut Recorder::default(), 1);
    assert!(executor.state(NodeId(1000)).is_none());
}

#[test]
fn test_delta_time_reaches_handler() {
    let mut builder = TreeBuilder::new();
    let a = builder.action(
        |state: &mut NodeState,
         _: &mut Recorder,
         _: &BehaviorNode<Recorder>,
         _: &mut Blackboard,
         dt: f32| {
            *state = NodeState::Countdown {
                remaining_ms: (dt * 1000.) as i64,
            };
            true
        },
    );
    let root = builder.repeat(a, proceed).unwrap();
    let mut executor = Executor::new(Arc::new(builder.build(root).unwrap()));
    let mut rec = Recorder::default();
    let mut bb = blackboard();
    executor.tick(0.1, &mut rec, &mut bb);
    executor.tick(0.25, &mut rec, &mut bb);
    assert_eq!(executor.delta_time(), 0.25);
    assert!(matches!(
        executor.state(a),
        Some(NodeState::Countdown { remaining_ms: 250 })
    ));
}
