//! Builds behavior trees from YAML.
//!
//! ```yaml
//! behavior_tree:
//!   type: Repeat
//!   continuation: always
//!   children:
//!     - type: Sequence
//!       name: chores
//!       children:
//!         - type: Action
//!           action: Bark
//!         - type: Selector
//!           selector: first
//!           children:
//!             - type: Action
//!               action: Sleep5s
//! ```
//!
//! Handler names are looked up in a [`Registry`]; constructors may register
//! the blackboard keys their handlers use while the tree is being built.

use crate::error::LoadYamlError;
use crate::key::BlackboardKeyManager;
use crate::registry::Registry;
use crate::tree::{BehaviorTree, NodeId, TreeBuilder};
use serde_yaml::Value;

fn recurse_parse<C: ?Sized>(
    value: &Value,
    reg: &Registry<C>,
    keys: &mut BlackboardKeyManager,
    builder: &mut TreeBuilder<C>,
) -> Result<NodeId, LoadYamlError> {
    let node_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadYamlError::MissingField {
            node_type: "Node".to_string(),
            field: "type",
        })?;
    let field = |field: &'static str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| LoadYamlError::MissingField {
                node_type: node_type.to_string(),
                field,
            })
    };
    let child_count_error = |found| LoadYamlError::ChildCount {
        node_type: node_type.to_string(),
        found,
    };

    let children = match value.get("children") {
        Some(Value::Sequence(children)) => children
            .iter()
            .map(|child| recurse_parse(child, reg, keys, builder))
            .collect::<Result<Vec<_>, _>>()?,
        _ => vec![],
    };

    let id = match node_type {
        "Action" => {
            if !children.is_empty() {
                return Err(child_count_error(children.len()));
            }
            let name = field("action")?;
            let handler = reg
                .build_action(name, keys)
                .ok_or_else(|| LoadYamlError::UnknownAction(name.to_string()))?;
            builder.push_action(handler)
        }
        "Sequence" => builder.sequence(&children)?,
        "Selector" => {
            let name = field("selector")?;
            let select = reg
                .build_selector(name, keys)
                .ok_or_else(|| LoadYamlError::UnknownSelector(name.to_string()))?;
            builder.push_selector(&children, select)?
        }
        "Repeat" => {
            let &[child] = &children[..] else {
                return Err(child_count_error(children.len()));
            };
            let name = field("continuation")?;
            let proceed = reg
                .build_continuation(name, keys)
                .ok_or_else(|| LoadYamlError::UnknownContinuation(name.to_string()))?;
            builder.push_repeat(child, proceed)?
        }
        _ => return Err(LoadYamlError::UnknownType(node_type.to_string())),
    };

    if let Some(name) = value.get("name").and_then(Value::as_str) {
        builder.set_name(id, name)?;
    }

    Ok(id)
}

/// Parses the tree under the top-level `behavior_tree` entry of `yaml`.
pub fn load_yaml<C: ?Sized>(
    yaml: &str,
    reg: &Registry<C>,
    keys: &mut BlackboardKeyManager,
) -> Result<BehaviorTree<C>, LoadYamlError> {
    let yaml: Value = serde_yaml::from_str(yaml)?;
    let root = yaml
        .get("behavior_tree")
        .ok_or(LoadYamlError::MissingTree)?;

    let mut builder = TreeBuilder::new();
    let root = recurse_parse(root, reg, keys, &mut builder)?;
    Ok(builder.build(root)?)
}
