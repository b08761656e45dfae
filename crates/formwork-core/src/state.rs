#![forbid(unsafe_code)]

//! Canonical form state.
//!
//! # Invariants
//!
//! 1. `pristine` is true iff `values` equals the initial snapshot, and
//!    `dirty == !pristine`. Both flags are private and recomputed by every
//!    method that touches `values`; callers cannot set them.
//! 2. `errors` holds only non-empty messages. Writing `None` or `""` removes
//!    the entry, so "absent" and "valid" are the same thing.
//! 3. `touched` holds only `true` entries for the same reason.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::Path;
use crate::tree;

/// Current validation message per full path.
pub type ErrorMap = BTreeMap<Path, String>;

/// Touched flag per full path.
pub type TouchedMap = BTreeMap<Path, bool>;

/// Snapshot of one form instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormState {
    values: Value,
    touched: TouchedMap,
    errors: ErrorMap,
    pristine: bool,
    dirty: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl FormState {
    /// A pristine state seeded with `values`.
    #[must_use]
    pub fn new(values: Value) -> Self {
        Self {
            values,
            touched: TouchedMap::new(),
            errors: ErrorMap::new(),
            pristine: true,
            dirty: false,
        }
    }

    #[must_use]
    pub fn values(&self) -> &Value {
        &self.values
    }

    #[must_use]
    pub fn touched(&self) -> &TouchedMap {
        &self.touched
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.pristine
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn value(&self, path: &Path) -> Option<&Value> {
        tree::get(&self.values, path)
    }

    #[must_use]
    pub fn error(&self, path: &Path) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn is_touched(&self, path: &Path) -> bool {
        self.touched.get(path).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Write (or remove, for `None`) one value and recompute the flags.
    ///
    /// Removing a key also drops parent objects left empty, unless the
    /// snapshot has them. Returns `false` if the tree refused the write
    /// (see [`tree::MAX_INDEX_GAP`]).
    pub fn write_value(&mut self, path: &Path, value: Option<Value>, snapshot: &Value) -> bool {
        let written = match value {
            Some(value) => tree::set(&mut self.values, path, value),
            None => {
                tree::remove_pruned(&mut self.values, path, snapshot);
                true
            }
        };
        self.recompute(snapshot);
        written
    }

    /// Replace the whole values tree and recompute the flags.
    pub fn replace_values(&mut self, values: Value, snapshot: &Value) {
        self.values = if values.is_null() {
            Value::Object(Map::new())
        } else {
            values
        };
        self.recompute(snapshot);
    }

    /// Remove element `index` of the array at `array`, shifting the values,
    /// touched flags and errors of later elements down by one position.
    pub fn splice_entry(&mut self, array: &Path, index: usize, snapshot: &Value) -> Option<Value> {
        let removed = tree::splice(&mut self.values, array, index);
        reindex_after_removal(&mut self.touched, array, index);
        reindex_after_removal(&mut self.errors, array, index);
        self.recompute(snapshot);
        removed
    }

    pub fn set_touched(&mut self, path: &Path, touched: bool) {
        if touched {
            self.touched.insert(path.clone(), true);
        } else {
            self.touched.remove(path);
        }
    }

    pub fn set_error(&mut self, path: &Path, error: Option<String>) {
        match error.filter(|msg| !msg.is_empty()) {
            Some(msg) => {
                self.errors.insert(path.clone(), msg);
            }
            None => {
                self.errors.remove(path);
            }
        }
    }

    pub fn replace_touched(&mut self, touched: TouchedMap) {
        self.touched = touched.into_iter().filter(|(_, t)| *t).collect();
    }

    pub fn replace_errors(&mut self, errors: ErrorMap) {
        self.errors = errors.into_iter().filter(|(_, m)| !m.is_empty()).collect();
    }

    pub fn clear_touched(&mut self) {
        self.touched.clear();
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Recompute `pristine`/`dirty` against the initial snapshot.
    pub fn recompute(&mut self, snapshot: &Value) {
        self.pristine = self.values == *snapshot;
        self.dirty = !self.pristine;
    }
}

/// Drop entries for `array[index]` (and below) and move entries for later
/// indices down by one.
fn reindex_after_removal<V>(map: &mut BTreeMap<Path, V>, array: &Path, index: usize) {
    let affected: Vec<Path> = map
        .keys()
        .filter(|p| p.index_under(array).is_some_and(|i| i >= index))
        .cloned()
        .collect();
    let mut moved = Vec::with_capacity(affected.len());
    for path in affected {
        let Some(value) = map.remove(&path) else {
            continue;
        };
        let Some(i) = path.index_under(array) else {
            continue;
        };
        if i > index {
            if let Some(shifted) = path.with_index_under(array, i - 1) {
                moved.push((shifted, value));
            }
        }
    }
    map.extend(moved);
}

/// Partial replacement for [`FormState`] (`setState`).
///
/// The derived flags are deliberately absent: they follow `values`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormStatePatch {
    pub values: Option<Value>,
    pub touched: Option<TouchedMap>,
    pub errors: Option<ErrorMap>,
}

impl FormStatePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_values(mut self, values: Value) -> Self {
        self.values = Some(values);
        self
    }

    #[must_use]
    pub fn with_touched(mut self, touched: TouchedMap) -> Self {
        self.touched = Some(touched);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: ErrorMap) -> Self {
        self.errors = Some(errors);
        self
    }
}
