//! # pet-ai (Rust crate)
//!
//! A small behavior tree runtime for desktop pets, driven frame by frame by
//! the application that embeds it.
//!
//!
//! ## Overview
//!
//! Every pet runs the same immutable behavior tree. What a pet remembers
//! between frames lives in two places of its own:
//!
//! * a [`Blackboard`], a flat byte buffer with one slot per named key
//!   registered in a [`BlackboardKeyManager`], and
//! * an [`Executor`], which knows the action the pet is currently running and
//!   keeps a [`NodeState`] for each node of the tree.
//!
//! Actions are resumable. An action returning `false` is called again on the
//! next frame; returning `true` hands control back up the tree, which picks
//! the next action within the same frame.
//!
//!
//! ## How it looks like
//!
//! Register the blackboard keys your actions need and build a tree whose root
//! is a repeat node.
//!
//! ```rust
//! use pet_ai::{BlackboardKeyManager, TreeBuilder};
//! use std::sync::Arc;
//!
//! struct Dog {
//!     barks: u32,
//! }
//!
//! let mut keys = BlackboardKeyManager::new();
//! let hunger = keys.calculate_key("Hunger", 4);
//!
//! let mut builder = TreeBuilder::<Dog>::new();
//! let bark = builder.action(|_, dog, _, _, _| {
//!     dog.barks += 1;
//!     true
//! });
//! let eat = builder.action(move |_, _, _, blackboard, _| blackboard.write(hunger, 0u32).is_ok());
//! let sequence = builder.sequence(&[bark, eat])?;
//! let root = builder.repeat(sequence, |_, _, _, _| true)?;
//! let tree = Arc::new(builder.build(root)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Then give each pet a blackboard and an executor, and tick it every frame.
//! The first tick only finds the first action; it runs from the second tick on.
//!
//! ```rust
//! # use pet_ai::{Blackboard, BlackboardKeyManager, Executor, TreeBuilder};
//! # use std::sync::Arc;
//! # struct Dog { barks: u32 }
//! # let mut keys = BlackboardKeyManager::new();
//! # let mut builder = TreeBuilder::<Dog>::new();
//! # let bark = builder.action(|_, dog, _, _, _| { dog.barks += 1; true });
//! # let eat = builder.action(|_, _, _, _, _| true);
//! # let sequence = builder.sequence(&[bark, eat])?;
//! # let root = builder.repeat(sequence, |_, _, _, _| true)?;
//! # let tree = Arc::new(builder.build(root)?);
//! let mut dog = Dog { barks: 0 };
//! let mut blackboard = Blackboard::new(&keys)?;
//! let mut executor = Executor::new(tree);
//! for _ in 0..3 {
//!     executor.tick(0.016, &mut dog, &mut blackboard);
//! }
//! assert_eq!(dog.barks, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//!
//! ## Running pets
//!
//! [`PetManager`] wraps the whole session for an application implementing
//! [`Host`]: it restores saved data, spawns pets running the stock
//! [`behaviors`], ticks them until the host raises its [`ExitSignal`] and
//! saves the blackboard key table on the way out.
//!
//!
//! ## Loading the tree structure from a yaml file
//!
//! Trees can also be described as data and built with [`load_yaml`] from the
//! handlers registered in a [`Registry`].
//!
//! ```yaml
//! behavior_tree:
//!   type: Repeat
//!   continuation: ContinueTree
//!   children:
//!     - type: Sequence
//!       children:
//!         - type: Action
//!           action: Bark
//!         - type: Action
//!           action: Sleep5s
//! ```

mod avl;
pub mod behaviors;
mod blackboard;
mod config;
pub mod error;
mod executor;
mod host;
mod key;
pub mod keyfile;
mod loader;
mod pet;
mod registry;
mod runtime;
mod tree;

pub use crate::{
    avl::{AvlHandle, AvlTree, InsertMethod, IterateOrder},
    blackboard::{Blackboard, SlotValue},
    config::RuntimeConfig,
    error::{BuildError, KeyFileError, LoadYamlError, PetError, PetResult},
    executor::{Executor, ExecutorPhase},
    host::{
        monotonic_ms, CreatePetRequest, ExitSignal, FileId, Gender, Host, PetId, PetSpawn,
    },
    key::{fnv1a_upper, BlackboardKey, BlackboardKeyManager, KeyEntry, KeyName, KeyRecord},
    loader::load_yaml,
    pet::Pet,
    registry::{
        boxify_action, boxify_continuation, boxify_selector, Constructor, Registry,
    },
    runtime::PetManager,
    tree::{
        ActionFn, BehaviorNode, BehaviorTree, ContinuationFn, NodeId, NodeKind, NodeState,
        SelectorFn, TreeBuilder,
    },
};
