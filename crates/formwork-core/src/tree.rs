#![forbid(unsafe_code)]

//! Nested value tree access.
//!
//! Form values live in a single `serde_json::Value` whose root is an object.
//! These helpers read and write that tree by [`Path`].
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Missing segment on read | `get` returns `None` |
//! | Key segment over a non-object on write | Replaced by an empty object |
//! | Index segment over a non-array on write | Replaced by an empty array |
//! | Index past the end on write | Array padded with `null` |
//! | Index more than [`MAX_INDEX_GAP`] past the end | Write refused, tree untouched |
//! | Missing segment on remove/splice | No-op, returns `None` |

use serde_json::{Map, Value};

use crate::path::{Path, Seg};

/// Read the value at `path`. Never fails for missing segments.
#[must_use]
pub fn get<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = root;
    for seg in path.segments() {
        current = match seg {
            Seg::Key(key) => current.as_object()?.get(key)?,
            Seg::Index(idx) => current.as_array()?.get(*idx)?,
        };
    }
    Some(current)
}

fn get_mut<'a>(root: &'a mut Value, segments: &[Seg]) -> Option<&'a mut Value> {
    let mut current = root;
    for seg in segments {
        current = match seg {
            Seg::Key(key) => current.as_object_mut()?.get_mut(key)?,
            Seg::Index(idx) => current.as_array_mut()?.get_mut(*idx)?,
        };
    }
    Some(current)
}

/// How far past the end of an array a write may land. Gaps are padded with
/// `null`, so this bounds the padding a single write can allocate.
pub const MAX_INDEX_GAP: usize = 1024;

/// Write `value` at `path`, creating intermediate containers as needed.
///
/// Returns `false` (leaving the tree unchanged) when an index segment lands
/// more than [`MAX_INDEX_GAP`] past the end of its array.
pub fn set(root: &mut Value, path: &Path, value: Value) -> bool {
    if !within_reach(root, path.segments()) {
        return false;
    }
    set_at(root, path.segments(), value);
    true
}

/// Every index segment stays within [`MAX_INDEX_GAP`] of the array it
/// addresses (an array that does not exist yet has length zero).
fn within_reach(root: &Value, segments: &[Seg]) -> bool {
    let mut current = Some(root);
    for seg in segments {
        current = match seg {
            Seg::Key(key) => current.and_then(Value::as_object).and_then(|o| o.get(key)),
            Seg::Index(idx) => {
                let arr = current.and_then(Value::as_array);
                let len = arr.map_or(0, Vec::len);
                if *idx > len.saturating_add(MAX_INDEX_GAP) {
                    return false;
                }
                arr.and_then(|a| a.get(*idx))
            }
        };
    }
    true
}

fn set_at(current: &mut Value, segments: &[Seg], value: Value) {
    match segments {
        [] => *current = value,
        [Seg::Key(key), rest @ ..] => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            if let Value::Object(obj) = current {
                let entry = obj.entry(key.clone()).or_insert(Value::Null);
                set_at(entry, rest, value);
            }
        }
        [Seg::Index(idx), rest @ ..] => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            if let Value::Array(arr) = current {
                let Some(needed) = idx.checked_add(1) else {
                    return;
                };
                if arr.len() < needed {
                    arr.resize(needed, Value::Null);
                }
                if let Some(slot) = arr.get_mut(*idx) {
                    set_at(slot, rest, value);
                }
            }
        }
    }
}

/// Remove the value at `path`.
///
/// Object keys are deleted; array slots are set to `null` so sibling
/// positions never move. Removing the root resets it to an empty object.
pub fn remove(root: &mut Value, path: &Path) -> Option<Value> {
    let Some((last, head)) = path.segments().split_last() else {
        return Some(std::mem::replace(root, Value::Object(Map::new())));
    };
    let parent = get_mut(root, head)?;
    match last {
        Seg::Key(key) => parent.as_object_mut()?.remove(key),
        Seg::Index(idx) => {
            let slot = parent.as_array_mut()?.get_mut(*idx)?;
            Some(std::mem::replace(slot, Value::Null))
        }
    }
}

/// Remove the value at `path`, then drop parent objects the removal left
/// empty.
///
/// Pruning walks upward and stops at the root, at an array, at a non-empty
/// object, or at a parent that `baseline` also holds (so an empty object
/// present in the initial values survives).
pub fn remove_pruned(root: &mut Value, path: &Path, baseline: &Value) -> Option<Value> {
    let removed = remove(root, path)?;
    if !matches!(path.last(), Some(Seg::Key(_))) {
        return Some(removed);
    }
    let mut parent = path.parent();
    while let Some(current) = parent {
        if current.is_root() || !matches!(current.last(), Some(Seg::Key(_))) {
            break;
        }
        let empty = get(root, &current)
            .and_then(Value::as_object)
            .is_some_and(Map::is_empty);
        if !empty || get(baseline, &current).is_some() {
            break;
        }
        remove(root, &current);
        parent = current.parent();
    }
    Some(removed)
}

/// Remove element `index` from the array stored at `array`, shifting later
/// elements down by one.
pub fn splice(root: &mut Value, array: &Path, index: usize) -> Option<Value> {
    let arr = get_mut(root, array.segments())?.as_array_mut()?;
    if index < arr.len() {
        Some(arr.remove(index))
    } else {
        None
    }
}

/// Short name of a value's JSON type, for error messages.
#[must_use]
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
