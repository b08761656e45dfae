#![forbid(unsafe_code)]

//! Array field coordination.
//!
//! An [`ArrayField`] manages a dynamically sized list of child fields. Each
//! entry owns an [`EntryKey`] assigned at creation; removing an entry shifts
//! the *paths* of later entries (`items[3]` becomes `items[2]`) but never
//! their keys, so a rendering layer can keep widget identity.
//!
//! # Shadow synchronization
//!
//! The coordinator mounts a shadow field at the array's own path whose
//! validator sees `(value, entry count, values)`, which is how list-level
//! rules ("at least two items") are expressed. It listens for `Value`
//! events on the form's bus:
//!
//! 1. A write to the array's own path is the shadow's own write: ignored.
//! 2. A write to `array[i]` or below is a child edit: the aggregate is
//!    re-read through the scope and pushed into the shadow field.
//! 3. Anything else is unrelated: ignored.
//!
//! The listener is held by a [`Subscription`], reinstalled when the field
//! path changes, and gone when the coordinator is dropped.
//!
//! # Invariants
//!
//! 1. `keys` and `initial_values` have equal length at all times.
//! 2. Every key handed out is distinct from all keys already present.
//! 3. The key list is read through a [`Tracked`] cell, so the shadow
//!    validator always sees the current count.

use std::rc::Rc;

use formwork_core::{EntryKey, FormError, KeyGenerator, Path, Value, tree};
use tracing::{debug, trace, warn};

use crate::controller::FormController;
use crate::field::{Field, FieldOptions, FormScope};
use crate::reactive::{EventKind, FormEvent, Subscription, Tracked};
use crate::registry::{ArrayValidator, ValidationTrigger, Validator};

/// Registration options for an array field.
#[derive(Clone)]
pub struct ArrayFieldOptions {
    pub field: Path,
    pub initial_value: Option<Value>,
    pub validate: Option<ArrayValidator>,
    pub trigger: ValidationTrigger,
}

impl std::fmt::Debug for ArrayFieldOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayFieldOptions")
            .field("field", &self.field.to_string())
            .field("initial_value", &self.initial_value)
            .field("validate", &self.validate.is_some())
            .field("trigger", &self.trigger)
            .finish()
    }
}

impl ArrayFieldOptions {
    #[must_use]
    pub fn new(field: impl Into<Path>) -> Self {
        Self {
            field: field.into(),
            initial_value: None,
            validate: None,
            trigger: ValidationTrigger::default(),
        }
    }

    /// Fallback initial list used when the form's initial tree has none.
    #[must_use]
    pub fn initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn validate(
        mut self,
        validate: impl Fn(Option<&Value>, usize, &Value) -> Option<String> + 'static,
    ) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    #[must_use]
    pub fn validate_on_blur(mut self, enabled: bool) -> Self {
        self.trigger.on_blur = enabled;
        self
    }

    #[must_use]
    pub fn validate_on_change(mut self, enabled: bool) -> Self {
        self.trigger.on_change = enabled;
        self
    }
}

/// Keys and per-entry initial values, kept parallel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entries {
    keys: Vec<EntryKey>,
    initial_values: Vec<Option<Value>>,
}

impl Entries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> &[EntryKey] {
        &self.keys
    }

    #[must_use]
    pub fn initial_values(&self) -> &[Option<Value>] {
        &self.initial_values
    }

    fn push(&mut self, key: EntryKey, initial: Option<Value>) {
        self.keys.push(key);
        self.initial_values.push(initial);
    }

    fn remove(&mut self, index: usize) -> Option<EntryKey> {
        if index >= self.keys.len() {
            return None;
        }
        self.initial_values.remove(index);
        Some(self.keys.remove(index))
    }
}

/// One entry as exposed to the rendering layer.
pub struct ArrayEntry {
    pub key: EntryKey,
    /// Relative path to register the child under (`items[2]`).
    pub field: Path,
    pub full_path: Path,
    pub initial_value: Option<Value>,
    remover: EntryRemover,
}

impl std::fmt::Debug for ArrayEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayEntry")
            .field("key", &self.key)
            .field("field", &self.field.to_string())
            .field("initial_value", &self.initial_value)
            .finish_non_exhaustive()
    }
}

impl ArrayEntry {
    /// Remove this entry (bound to the index it had when `fields()` ran).
    pub fn remove(&self) -> Option<EntryKey> {
        self.remover.remove()
    }
}

#[derive(Clone)]
struct EntryRemover {
    entries: Tracked<Entries>,
    controller: FormController,
    array: Path,
    index: usize,
}

impl EntryRemover {
    fn remove(&self) -> Option<EntryKey> {
        remove_entry(&self.entries, &self.controller, &self.array, self.index)
    }
}

fn remove_entry(
    entries: &Tracked<Entries>,
    controller: &FormController,
    array: &Path,
    index: usize,
) -> Option<EntryKey> {
    if index >= entries.with(Entries::len) {
        warn!(%array, index, "remove out of range");
        return None;
    }
    // Values first, so entry subscribers see keys and values that agree.
    controller.splice_array_entry(array, index);
    let key = entries.update(|e| e.remove(index))?;
    debug!(%array, index, %key, "removed array entry");
    controller.announce_array_removal(array.clone(), index);
    Some(key)
}

pub struct ArrayField {
    scope: FormScope,
    relative: Path,
    full: Path,
    entries: Tracked<Entries>,
    keys: Rc<dyn KeyGenerator>,
    validate: Option<ArrayValidator>,
    trigger: ValidationTrigger,
    shadow: Field,
    _listener: Subscription,
}

impl std::fmt::Debug for ArrayField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayField")
            .field("field", &self.relative.to_string())
            .field("full", &self.full.to_string())
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl ArrayField {
    /// Mount an array field under `scope`.
    ///
    /// The initial list comes from the form's initial tree at the full
    /// path, falling back to `options.initial_value`, then to empty.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::ArrayFieldNotList`] if that initial value is
    /// present but not a list.
    pub fn register(scope: &FormScope, options: ArrayFieldOptions) -> Result<Self, FormError> {
        let full = scope.get_full_field(&options.field);
        let initial = scope
            .controller()
            .get_initial_value(&full)
            .filter(|v| !v.is_null())
            .or_else(|| options.initial_value.clone().filter(|v| !v.is_null()));

        let items = match initial {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FormError::ArrayFieldNotList {
                    field: full,
                    found: tree::kind(&other),
                });
            }
        };

        let keys = scope.controller().key_generator();
        let mut entries = Entries::default();
        for item in items {
            entries.push(keys.next_key(), Some(item));
        }
        let entries = Tracked::new(entries);

        let shadow = mount_shadow(scope, &options.field, &entries, &options.validate, options.trigger);
        let listener = install_listener(scope, &options.field, &full);
        debug!(%full, len = entries.with(Entries::len), "array field mounted");

        Ok(Self {
            scope: scope.clone(),
            relative: options.field,
            full,
            entries,
            keys,
            validate: options.validate,
            trigger: options.trigger,
            shadow,
            _listener: listener,
        })
    }

    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full
    }

    /// The shadow field holding the aggregate value and list-level error.
    #[must_use]
    pub fn shadow(&self) -> &Field {
        &self.shadow
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.with(Entries::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current keys, in position order.
    #[must_use]
    pub fn keys(&self) -> Vec<EntryKey> {
        self.entries.with(|e| e.keys.clone())
    }

    #[must_use]
    pub fn entries(&self) -> Entries {
        self.entries.get()
    }

    /// Bumps whenever keys or initial values change; a re-render hint.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.entries.version()
    }

    /// Be told when the entry list changes.
    pub fn subscribe(&self, callback: impl Fn(&Entries) + 'static) -> Subscription {
        self.entries.subscribe(callback)
    }

    /// Append an entry with a fresh key.
    pub fn add(&self) -> EntryKey {
        let key = self.keys.next_key();
        self.entries.update(|e| e.push(key.clone(), None));
        trace!(array = %self.full, %key, "added entry");
        key
    }

    /// Append an entry with a fresh key and an initial value for it.
    pub fn add_with_initial_value(&self, value: impl Into<Value>) -> EntryKey {
        let key = self.keys.next_key();
        let value = value.into();
        self.entries.update(|e| e.push(key.clone(), Some(value)));
        trace!(array = %self.full, %key, "added entry with initial value");
        key
    }

    /// Remove the entry at `index`. Later entries keep their keys; their
    /// paths and stored values shift down by one.
    pub fn remove(&self, index: usize) -> Option<EntryKey> {
        remove_entry(&self.entries, self.scope.controller(), &self.full, index)
    }

    /// Entries as the rendering layer consumes them, derived fresh.
    #[must_use]
    pub fn fields(&self) -> Vec<ArrayEntry> {
        self.entries.with(|e| {
            e.keys
                .iter()
                .zip(&e.initial_values)
                .enumerate()
                .map(|(i, (key, initial))| ArrayEntry {
                    key: key.clone(),
                    field: self.relative.clone().index(i),
                    full_path: self.full.clone().index(i),
                    initial_value: initial.clone(),
                    remover: EntryRemover {
                        entries: self.entries.clone(),
                        controller: self.scope.controller().clone(),
                        array: self.full.clone(),
                        index: i,
                    },
                })
                .collect()
        })
    }

    /// Move the array to a new relative path, reinstalling the shadow field
    /// and the value listener. Keys are kept.
    pub fn set_field(&mut self, field: impl Into<Path>) {
        let field = field.into();
        if field == self.relative {
            return;
        }
        let full = self.scope.get_full_field(&field);
        debug!(from = %self.full, to = %full, "array field moved");
        // Replacing drops the old listener and deregisters the old shadow.
        self._listener = install_listener(&self.scope, &field, &full);
        self.shadow = mount_shadow(&self.scope, &field, &self.entries, &self.validate, self.trigger);
        self.relative = field;
        self.full = full;
    }
}

fn mount_shadow(
    scope: &FormScope,
    field: &Path,
    entries: &Tracked<Entries>,
    validate: &Option<ArrayValidator>,
    trigger: ValidationTrigger,
) -> Field {
    let wrapped: Option<Validator> = validate.clone().map(|validate| {
        let entries = entries.clone();
        Rc::new(move |value: Option<&Value>, values: &Value| {
            let len = entries.with(Entries::len);
            validate(value, len, values)
        }) as Validator
    });
    let mut options = FieldOptions::new(field.clone())
        .validator(wrapped)
        .shadow(true);
    options.trigger = trigger;
    scope.register_field(options)
}

fn install_listener(scope: &FormScope, field: &Path, full: &Path) -> Subscription {
    let scope = scope.clone();
    let relative = field.clone();
    let full = full.clone();
    let bus = scope.controller().events().clone();
    bus.subscribe(EventKind::Value, move |event| {
        let FormEvent::Value(changed) = event else {
            return;
        };
        if *changed == full {
            return;
        }
        if changed.index_under(&full).is_none() {
            return;
        }
        // Read by relative path: the scope resolves it.
        let aggregate = scope.get_value(&relative);
        trace!(array = %full, %changed, "child changed, syncing shadow");
        scope.controller().set_shadow_value(&full, aggregate);
    })
}
