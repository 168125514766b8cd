//! Discovery of the game model inside the host object graph.
//!
//! The model is identified structurally: it is the first object (in
//! depth-first pre-order) whose `step_history` property is an array. The graph
//! comes from the host page and may be cyclic, so every object is visited at
//! most once, keyed by identity. Property reads that fail turn the branch they
//! lead to into a dead end; they never abort the search.

use std::collections::HashSet;

use log::debug;

use crate::constants::STEP_HISTORY_KEY;
use crate::host::{HostValue, ObjectRef};
use crate::model::StoneModel;

/// Search `root` and its descendants for the game model.
///
/// Returns `None` when no object in the reachable graph carries an array
/// valued `step_history`. That is the normal state before the host has
/// created its game, so callers simply retry later.
pub fn find_stone_model(root: &HostValue) -> Option<StoneModel> {
    let root = root.as_object()?;
    let mut visited: HashSet<usize> = HashSet::new();
    let mut stack: Vec<ObjectRef> = vec![root.clone()];

    while let Some(obj) = stack.pop() {
        if !visited.insert(obj.id()) {
            continue;
        }

        match obj.get(STEP_HISTORY_KEY) {
            Ok(Some(HostValue::Object(history))) if history.is_array() => {
                debug!(
                    "found stone model after visiting {} objects ({} steps)",
                    visited.len(),
                    history.len()
                );
                return Some(StoneModel::new(obj));
            }
            Ok(_) => {}
            Err(e) => {
                debug!("skipping branch: {e}");
                continue;
            }
        }

        // Push in reverse so the first key is explored first.
        let children: Vec<ObjectRef> = obj
            .keys()
            .iter()
            .filter_map(|key| match obj.get(key) {
                Ok(Some(HostValue::Object(child))) => Some(child),
                Ok(_) => None,
                Err(e) => {
                    debug!("skipping branch: {e}");
                    None
                }
            })
            .filter(|child| !visited.contains(&child.id()))
            .collect();
        stack.extend(children.into_iter().rev());
    }

    debug!("no stone model among {} objects", visited.len());
    None
}
