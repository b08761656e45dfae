#![forbid(unsafe_code)]

//! Scopes and the per-form field registry.
//!
//! A field declares a relative path; the [`Scope`] it is registered under
//! turns that into the full path the controller stores values and errors
//! at. Scopes are explicit values threaded through registration calls, not
//! ambient state.
//!
//! The registry keeps one [`FieldDescriptor`] per mounted field. When two
//! mounted fields resolve to the same full path, the most recent
//! registration wins until it is dropped.

use std::collections::BTreeMap;
use std::rc::Rc;

use formwork_core::{Path, Value, tree};

/// Field-level validator: `(value, form values) -> message`.
///
/// `None` (or an empty message) means valid.
pub type Validator = Rc<dyn Fn(Option<&Value>, &Value) -> Option<String>>;

/// Array-level validator: `(value, entry count, form values) -> message`.
pub type ArrayValidator = Rc<dyn Fn(Option<&Value>, usize, &Value) -> Option<String>>;

/// A path prefix under which relative field paths resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    prefix: Path,
}

impl Scope {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(prefix: impl Into<Path>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// A scope nested under this one (`address` + `billing` → `address.billing`).
    #[must_use]
    pub fn nest(&self, name: impl Into<Path>) -> Self {
        Self {
            prefix: self.prefix.join(&name.into()),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Resolve a relative field path to its full path.
    #[must_use]
    pub fn full_field(&self, relative: &Path) -> Path {
        self.prefix.join(relative)
    }
}

/// When a field re-runs its validator.
///
/// A field with neither flag set validates on change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationTrigger {
    pub on_change: bool,
    pub on_blur: bool,
}

impl ValidationTrigger {
    #[must_use]
    pub fn validates_on_change(self) -> bool {
        self.on_change || !self.on_blur
    }

    #[must_use]
    pub fn validates_on_blur(self) -> bool {
        self.on_blur
    }
}

/// Opaque handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u64);

/// A mounted field as the controller sees it.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub relative: Path,
    pub full: Path,
    pub validate: Option<Validator>,
    /// Value is derived (array aggregate), not user-entered.
    pub shadow: bool,
    pub trigger: ValidationTrigger,
    /// Store `""` as-is for this field even if the form does not.
    pub allow_empty_string: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(relative: Path, full: Path) -> Self {
        Self {
            relative,
            full,
            validate: None,
            shadow: false,
            trigger: ValidationTrigger::default(),
            allow_empty_string: false,
        }
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("relative", &self.relative.to_string())
            .field("full", &self.full.to_string())
            .field("validate", &self.validate.is_some())
            .field("shadow", &self.shadow)
            .field("trigger", &self.trigger)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct FieldRegistry {
    entries: Vec<(FieldId, FieldDescriptor)>,
    next_id: u64,
}

impl FieldRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: FieldDescriptor) -> FieldId {
        let id = FieldId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, descriptor));
        id
    }

    pub fn deregister(&mut self, id: FieldId) -> Option<FieldDescriptor> {
        let pos = self.entries.iter().position(|(entry, _)| *entry == id)?;
        Some(self.entries.remove(pos).1)
    }

    /// The active descriptor for a full path.
    #[must_use]
    pub fn lookup(&self, full: &Path) -> Option<&FieldDescriptor> {
        self.entries
            .iter()
            .rev()
            .map(|(_, d)| d)
            .find(|d| d.full == *full)
    }

    /// Every registration, oldest first.
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Active validators keyed by full path, in path order.
    #[must_use]
    pub fn validators(&self) -> BTreeMap<Path, Validator> {
        let mut out = BTreeMap::new();
        for (_, descriptor) in &self.entries {
            match &descriptor.validate {
                Some(validate) => {
                    out.insert(descriptor.full.clone(), Rc::clone(validate));
                }
                // A later registration without a validator shadows an earlier one.
                None => {
                    out.remove(&descriptor.full);
                }
            }
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Look up a full path in the initial-value tree.
///
/// Returns `None` when any segment is missing; never fails.
#[must_use]
pub fn initial_value(initial: &Value, full: &Path) -> Option<Value> {
    tree::get(initial, full).cloned()
}
