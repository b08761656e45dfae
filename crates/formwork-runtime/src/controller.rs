#![forbid(unsafe_code)]

//! Form state controller.
//!
//! [`FormController`] owns the canonical [`FormState`] of one form instance,
//! the field registry, and the instance's [`EventBus`]. Every mutation goes
//! through one of its accessors; none of them defers work, so values, the
//! derived flags and errors are consistent as soon as an accessor returns.
//!
//! # Event ordering
//!
//! `set_value` emits `Value` strictly before `Change`. Value listeners (the
//! array coordinator) observe the fully updated state and may write back
//! into the controller before any change listener runs.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Validator returns a message | Stored in `errors[path]`; data, not an error |
//! | Validator panics | Propagates to the caller; nothing is caught |
//! | Submit with errors | `Failure` emitted, `Submit` not emitted |
//! | Non-object `initial_values` | `FormController::new` returns `FormError::Config` |
//! | Index far past an array's end | Write refused and logged; no events |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use formwork_core::{
    ErrorMap, FormError, FormOptions, FormState, FormStatePatch, KeyGenerator, Path,
    RandomKeys, Value, tree,
};
use tracing::{debug, trace, warn};

use crate::field::FormScope;
use crate::reactive::{EventBus, EventKind, FormEvent, Listener, Subscription};
use crate::registry::{self, FieldDescriptor, FieldId, FieldRegistry, Scope, Validator};

/// Form-level validator: whole values → per-path messages.
///
/// `None` entries clear any existing error at that path.
pub type FormValidator = Rc<dyn Fn(&Value) -> BTreeMap<Path, Option<String>>>;

/// Transform applied to the values of a successful submit before the
/// `Submit` event is emitted.
pub type PreSubmit = Rc<dyn Fn(Value) -> Value>;

/// The UI gesture that triggered a submit (or key press).
pub trait SubmitGesture {
    /// Suppress the gesture's default action.
    fn prevent_default(&mut self);
}

impl<F: FnMut()> SubmitGesture for F {
    fn prevent_default(&mut self) {
        self()
    }
}

/// Result of [`FormController::submit_form`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation passed; carries the values that were emitted.
    Submitted(Value),
    /// Validation failed; carries the full errors map.
    Failed(ErrorMap),
}

/// Everything needed to create a form instance.
#[derive(Clone)]
pub struct FormConfig {
    pub options: FormOptions,
    pub validate: Option<FormValidator>,
    pub pre_submit: Option<PreSubmit>,
    pub keys: Rc<dyn KeyGenerator>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            options: FormOptions::default(),
            validate: None,
            pre_submit: None,
            keys: Rc::new(RandomKeys),
        }
    }
}

impl std::fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormConfig")
            .field("options", &self.options)
            .field("validate", &self.validate.is_some())
            .field("pre_submit", &self.pre_submit.is_some())
            .finish_non_exhaustive()
    }
}

impl FormConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_initial_values(mut self, values: Value) -> Self {
        self.options.initial_values = values;
        self
    }

    #[must_use]
    pub fn with_validate(
        mut self,
        validate: impl Fn(&Value) -> BTreeMap<Path, Option<String>> + 'static,
    ) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    #[must_use]
    pub fn with_pre_submit(mut self, pre_submit: impl Fn(Value) -> Value + 'static) -> Self {
        self.pre_submit = Some(Rc::new(pre_submit));
        self
    }

    #[must_use]
    pub fn with_keys(mut self, keys: impl KeyGenerator + 'static) -> Self {
        self.keys = Rc::new(keys);
        self
    }
}

struct ControllerInner {
    options: FormOptions,
    validate: Option<FormValidator>,
    pre_submit: Option<PreSubmit>,
    keys: Rc<dyn KeyGenerator>,
    /// Initial values; the baseline for `pristine` and the target of `reset`.
    snapshot: RefCell<Value>,
    state: RefCell<FormState>,
    registry: RefCell<FieldRegistry>,
    bus: EventBus,
}

/// Handle to one form instance. Clones share the same state.
#[derive(Clone)]
pub struct FormController {
    inner: Rc<ControllerInner>,
}

impl Default for FormController {
    fn default() -> Self {
        Self::from_validated(FormConfig::default())
    }
}

impl std::fmt::Debug for FormController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("state", &self.inner.state.borrow())
            .field("fields", &self.inner.registry.borrow().len())
            .field("bus", &self.inner.bus)
            .finish()
    }
}

impl FormController {
    /// Create a form instance seeded from `config.options.initial_values`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Config`] if the initial values are not an object.
    pub fn new(mut config: FormConfig) -> Result<Self, FormError> {
        config.options = config.options.validated()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: FormConfig) -> Self {
        let snapshot = config.options.initial_values.clone();
        debug!(initial = %snapshot, "form created");
        Self {
            inner: Rc::new(ControllerInner {
                state: RefCell::new(FormState::new(snapshot.clone())),
                snapshot: RefCell::new(snapshot),
                options: config.options,
                validate: config.validate,
                pre_submit: config.pre_submit,
                keys: config.keys,
                registry: RefCell::new(FieldRegistry::new()),
                bus: EventBus::new(),
            }),
        }
    }

    #[must_use]
    pub fn options(&self) -> &FormOptions {
        &self.inner.options
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Register a caller-owned listener (idempotent per kind).
    pub fn on(&self, kind: EventKind, listener: &Listener) -> bool {
        self.inner.bus.on(kind, listener)
    }

    pub fn remove_listener(&self, kind: EventKind, listener: &Listener) -> bool {
        self.inner.bus.remove_listener(kind, listener)
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&FormEvent) + 'static,
    ) -> Subscription {
        self.inner.bus.subscribe(kind, callback)
    }

    #[must_use]
    pub fn key_generator(&self) -> Rc<dyn KeyGenerator> {
        Rc::clone(&self.inner.keys)
    }

    /// The root scope, for registering fields and nesting sub-scopes.
    #[must_use]
    pub fn root(&self) -> FormScope {
        FormScope::new(self.clone(), Scope::root())
    }

    /// A scope named `name` directly under the root.
    #[must_use]
    pub fn scope(&self, name: impl Into<Path>) -> FormScope {
        FormScope::new(self.clone(), Scope::new(name))
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn get_value(&self, path: impl Into<Path>) -> Option<Value> {
        self.inner.state.borrow().value(&path.into()).cloned()
    }

    /// Write a user-entered value.
    ///
    /// Marks the path touched, recomputes the derived flags, runs the
    /// field's validator when its trigger includes change, then emits
    /// `Value` followed by `Change`.
    pub fn set_value(&self, path: impl Into<Path>, value: impl Into<Value>) {
        let path = path.into();
        let descriptor = self.descriptor(&path);
        let allow_empty = self.inner.options.allow_empty_strings
            || descriptor.as_ref().is_some_and(|d| d.allow_empty_string);
        let stored = normalize(value.into(), allow_empty);
        debug!(%path, value = ?stored, "set value");

        {
            let snapshot = self.inner.snapshot.borrow();
            let mut state = self.inner.state.borrow_mut();
            if !state.write_value(&path, stored, &snapshot) {
                warn!(%path, "write refused: index too far past the end of its list");
                return;
            }
            state.set_touched(&path, true);
        }

        if let Some(validate) = descriptor
            .filter(|d| d.trigger.validates_on_change())
            .and_then(|d| d.validate)
        {
            self.run_validator(&path, &validate);
        }

        self.emit(FormEvent::Value(path));
        self.emit(FormEvent::Change);
    }

    /// Write a derived value (array aggregate).
    ///
    /// Unlike [`set_value`](Self::set_value) this never marks the path
    /// touched and always runs the registered validator.
    pub fn set_shadow_value(&self, path: impl Into<Path>, value: Option<Value>) {
        let path = path.into();
        trace!(%path, "set shadow value");
        let written = {
            let snapshot = self.inner.snapshot.borrow();
            self.inner
                .state
                .borrow_mut()
                .write_value(&path, value, &snapshot)
        };
        if !written {
            warn!(%path, "shadow write refused: index too far past the end of its list");
            return;
        }
        if let Some(validate) = self.descriptor(&path).and_then(|d| d.validate) {
            self.run_validator(&path, &validate);
        }
        self.emit(FormEvent::Value(path));
        self.emit(FormEvent::Change);
    }

    #[must_use]
    pub fn get_error(&self, path: impl Into<Path>) -> Option<String> {
        self.inner
            .state
            .borrow()
            .error(&path.into())
            .map(str::to_owned)
    }

    /// Set or clear (`None`) the error at `path`. Emits `Change` only.
    pub fn set_error(&self, path: impl Into<Path>, error: Option<String>) {
        let path = path.into();
        debug!(%path, ?error, "set error");
        self.inner.state.borrow_mut().set_error(&path, error);
        self.emit(FormEvent::Change);
    }

    #[must_use]
    pub fn get_touched(&self, path: impl Into<Path>) -> bool {
        self.inner.state.borrow().is_touched(&path.into())
    }

    pub fn set_touched(&self, path: impl Into<Path>, touched: bool) {
        let path = path.into();
        trace!(%path, touched, "set touched");
        self.inner.state.borrow_mut().set_touched(&path, touched);
        self.emit(FormEvent::Change);
    }

    /// Focus left the field at `path`: mark it touched and validate it if
    /// its trigger includes blur.
    pub fn blur(&self, path: impl Into<Path>) {
        let path = path.into();
        self.inner.state.borrow_mut().set_touched(&path, true);
        if let Some(validate) = self
            .descriptor(&path)
            .filter(|d| d.trigger.validates_on_blur())
            .and_then(|d| d.validate)
        {
            self.run_validator(&path, &validate);
        }
        self.emit(FormEvent::Change);
    }

    /// Re-run the validator registered at `path` and store the result.
    ///
    /// Returns the stored message; `None` if valid or no validator exists.
    pub fn validate_field(&self, path: impl Into<Path>) -> Option<String> {
        let path = path.into();
        let validate = self.descriptor(&path).and_then(|d| d.validate)?;
        let result = self.run_validator(&path, &validate);
        self.emit(FormEvent::Change);
        result
    }

    #[must_use]
    pub fn get_state(&self) -> FormState {
        self.inner.state.borrow().clone()
    }

    /// Replace parts of the state. Replacing values recomputes the derived
    /// flags but does not re-run validation. Emits `Change`.
    pub fn set_state(&self, patch: FormStatePatch) {
        {
            let snapshot = self.inner.snapshot.borrow();
            let mut state = self.inner.state.borrow_mut();
            if let Some(values) = patch.values {
                state.replace_values(values, &snapshot);
            }
            if let Some(touched) = patch.touched {
                state.replace_touched(touched);
            }
            if let Some(errors) = patch.errors {
                state.replace_errors(errors);
            }
        }
        debug!("set state");
        self.emit(FormEvent::Change);
    }

    /// Replace the whole values tree, keeping touched flags and errors.
    pub fn set_values(&self, values: Value) {
        debug!(%values, "set values");
        {
            let snapshot = self.inner.snapshot.borrow();
            self.inner
                .state
                .borrow_mut()
                .replace_values(values, &snapshot);
        }
        self.emit(FormEvent::Change);
    }

    /// Restore the initial snapshot and clear touched flags and errors.
    pub fn reset(&self) {
        debug!("reset");
        let fresh = FormState::new(self.inner.snapshot.borrow().clone());
        *self.inner.state.borrow_mut() = fresh;
        self.emit(FormEvent::Change);
    }

    /// Validate everything and submit if valid.
    ///
    /// Runs every registered field validator (restricted to
    /// `validate_fields` when configured), then the form-level validator,
    /// merging both into `errors`. Emits `Change`, then `Failure` with the
    /// errors map if any error remains, otherwise `Submit` with the values
    /// (after `pre_submit`).
    ///
    /// The gesture's default action is suppressed exactly once unless
    /// `dont_prevent_default` is set.
    pub fn submit_form(&self, gesture: Option<&mut dyn SubmitGesture>) -> SubmitOutcome {
        if let Some(gesture) = gesture {
            if !self.inner.options.dont_prevent_default {
                gesture.prevent_default();
            }
        }

        let validators = self.inner.registry.borrow().validators();
        for (path, validate) in &validators {
            if self.inner.options.validates_field(path) {
                self.run_validator(path, validate);
            }
        }

        if let Some(validate) = &self.inner.validate {
            let values = self.inner.state.borrow().values().clone();
            let report = validate(&values);
            let mut state = self.inner.state.borrow_mut();
            for (path, message) in report {
                state.set_error(&path, message);
            }
        }

        self.emit(FormEvent::Change);

        let (errors, values) = {
            let state = self.inner.state.borrow();
            (state.errors().clone(), state.values().clone())
        };

        if !errors.is_empty() {
            debug!(count = errors.len(), "submit blocked by validation errors");
            self.emit(FormEvent::Failure(errors.clone()));
            return SubmitOutcome::Failed(errors);
        }

        let values = match &self.inner.pre_submit {
            Some(pre_submit) => pre_submit(values),
            None => values,
        };
        debug!(%values, "submit");
        self.emit(FormEvent::Submit(values.clone()));
        SubmitOutcome::Submitted(values)
    }

    /// Root-scope resolution: the relative path is the full path.
    #[must_use]
    pub fn get_full_field(&self, relative: impl Into<Path>) -> Path {
        Scope::root().full_field(&relative.into())
    }

    #[must_use]
    pub fn get_initial_value(&self, full: impl Into<Path>) -> Option<Value> {
        registry::initial_value(&self.inner.snapshot.borrow(), &full.into())
    }

    /// Remove element `index` of the array at `array`.
    ///
    /// Later elements, their touched flags and errors shift down one
    /// position. Emits `Value` for `array[index]` then `Change`, which is
    /// what lets the array coordinator refresh its shadow field.
    pub fn remove_array_entry(&self, array: impl Into<Path>, index: usize) -> Option<Value> {
        let array = array.into();
        let removed = self.splice_array_entry(&array, index);
        self.announce_array_removal(array, index);
        removed
    }

    /// The state half of [`remove_array_entry`](Self::remove_array_entry):
    /// splice without emitting anything.
    pub(crate) fn splice_array_entry(&self, array: &Path, index: usize) -> Option<Value> {
        let snapshot = self.inner.snapshot.borrow();
        let removed = self
            .inner
            .state
            .borrow_mut()
            .splice_entry(array, index, &snapshot);
        debug!(%array, index, "remove array entry");
        removed
    }

    /// The event half of [`remove_array_entry`](Self::remove_array_entry).
    pub(crate) fn announce_array_removal(&self, array: Path, index: usize) {
        self.emit(FormEvent::Value(array.index(index)));
        self.emit(FormEvent::Change);
    }

    // ── Registry plumbing ──────────────────────────────────────────────────

    pub(crate) fn register(&self, descriptor: FieldDescriptor) -> FieldId {
        trace!(full = %descriptor.full, shadow = descriptor.shadow, "register field");
        self.inner.registry.borrow_mut().register(descriptor)
    }

    pub(crate) fn deregister(&self, id: FieldId) {
        if let Some(descriptor) = self.inner.registry.borrow_mut().deregister(id) {
            trace!(full = %descriptor.full, "deregister field");
        }
    }

    /// Make `value` part of both the current values and the initial
    /// snapshot at `full`, if neither holds anything there yet.
    pub(crate) fn seed_initial_value(&self, full: &Path, value: Value) {
        let seeded = {
            let mut snapshot = self.inner.snapshot.borrow_mut();
            let mut state = self.inner.state.borrow_mut();
            if tree::get(&snapshot, full).is_some() || state.value(full).is_some() {
                false
            } else if tree::set(&mut snapshot, full, value.clone()) {
                state.write_value(full, Some(value), &snapshot)
            } else {
                warn!(%full, "initial value refused: index too far past the end of its list");
                false
            }
        };
        if seeded {
            trace!(%full, "seeded field initial value");
            self.emit(FormEvent::Change);
        }
    }

    fn descriptor(&self, full: &Path) -> Option<FieldDescriptor> {
        self.inner.registry.borrow().lookup(full).cloned()
    }

    /// Call `validate` with the current value and values, store the result.
    /// No borrow is held while the validator runs.
    fn run_validator(&self, path: &Path, validate: &Validator) -> Option<String> {
        let (value, values) = {
            let state = self.inner.state.borrow();
            (state.value(path).cloned(), state.values().clone())
        };
        let result = validate(value.as_ref(), &values).filter(|msg| !msg.is_empty());
        trace!(%path, error = ?result, "validated field");
        self.inner
            .state
            .borrow_mut()
            .set_error(path, result.clone());
        result
    }

    fn emit(&self, event: FormEvent) {
        self.inner.bus.emit(&event);
    }
}

/// `""` is stored as absent unless empty strings are allowed.
fn normalize(value: Value, allow_empty: bool) -> Option<Value> {
    match value {
        Value::String(s) if s.is_empty() && !allow_empty => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn fresh_form_is_empty_and_pristine() {
        let form = FormController::default();
        assert_eq!(
            serde_json::to_value(form.get_state()).unwrap(),
            json!({"values": {}, "touched": {}, "errors": {}, "pristine": true, "dirty": false})
        );
    }

    #[test]
    fn non_object_initial_values_are_rejected() {
        let config = FormConfig::new().with_initial_values(json!("nope"));
        assert!(matches!(FormController::new(config), Err(FormError::Config(_))));
    }

    #[test]
    fn set_value_writes_nested_paths() {
        let form = FormController::default();
        form.set_value("address.city", "Oslo");
        assert_eq!(form.get_value("address.city"), Some(json!("Oslo")));
        assert_eq!(form.get_state().values(), &json!({"address": {"city": "Oslo"}}));
        assert!(form.get_touched("address.city"));
        assert!(form.get_state().is_dirty());
    }

    #[test]
    fn empty_string_is_absent_by_default() {
        let form = FormController::default();
        form.set_value("name", "x");
        form.set_value("name", "");
        assert_eq!(form.get_value("name"), None);
        assert!(form.get_state().is_pristine());
    }

    #[test]
    fn clearing_nested_value_returns_to_pristine() {
        let form = FormController::default();
        form.set_value("address.city", "Oslo");
        form.set_value("address.city", "");
        assert_eq!(form.get_state().values(), &json!({}));
        assert!(form.get_state().is_pristine());
    }

    #[test]
    fn huge_index_is_refused_without_events() {
        let form = FormController::default();
        let events = Rc::new(Cell::new(0));
        let e = Rc::clone(&events);
        let _sub = form.subscribe(EventKind::Change, move |_| e.set(e.get() + 1));

        form.set_value(format!("items[{}]", usize::MAX), "x");
        form.set_value("items[4000000000]", "x");

        assert_eq!(form.get_state().values(), &json!({}));
        assert!(!form.get_touched("items[4000000000]"));
        assert_eq!(events.get(), 0);
    }

    #[test]
    fn empty_string_kept_when_allowed() {
        let options = FormOptions::new().with_allow_empty_strings(true);
        let form = FormController::new(FormConfig::new().with_options(options)).unwrap();
        form.set_value("name", "");
        assert_eq!(form.get_value("name"), Some(json!("")));
    }

    #[test]
    fn set_error_emits_change_but_not_value() {
        let form = FormController::default();
        let values = Rc::new(Cell::new(0));
        let changes = Rc::new(Cell::new(0));
        let v = Rc::clone(&values);
        let c = Rc::clone(&changes);
        let _a = form.subscribe(EventKind::Value, move |_| v.set(v.get() + 1));
        let _b = form.subscribe(EventKind::Change, move |_| c.set(c.get() + 1));

        form.set_error("greeting", Some("error".into()));

        assert_eq!(values.get(), 0);
        assert_eq!(changes.get(), 1);
        assert_eq!(form.get_error("greeting").as_deref(), Some("error"));
    }

    #[test]
    fn initial_value_lookup_never_fails() {
        let config = FormConfig::new().with_initial_values(json!({"a": {"b": [1, 2]}}));
        let form = FormController::new(config).unwrap();
        assert_eq!(form.get_initial_value("a.b[1]"), Some(json!(2)));
        assert_eq!(form.get_initial_value("a.c.d"), None);
        assert_eq!(form.get_full_field("a.b"), Path::parse("a.b"));
    }

    #[test]
    fn gesture_closure_counts_prevent_default() {
        let form = FormController::default();
        let mut hits = 0;
        let mut gesture = || hits += 1;
        form.submit_form(Some(&mut gesture));
        assert_eq!(hits, 1);
    }
}
