#![forbid(unsafe_code)]

//! Scoped form access and mounted field handles.
//!
//! [`FormScope`] pairs a controller with an explicit [`Scope`]; everything
//! that registers fields receives one. [`Field`] is the handle a mounted
//! input holds: it resolves its full path once at registration and
//! deregisters itself when dropped.

use std::rc::Rc;

use formwork_core::{FormError, Path, Value};

use crate::array_field::{ArrayField, ArrayFieldOptions};
use crate::controller::FormController;
use crate::registry::{FieldDescriptor, FieldId, Scope, ValidationTrigger, Validator};

/// A controller seen through a scope.
#[derive(Clone, Debug)]
pub struct FormScope {
    controller: FormController,
    scope: Scope,
}

impl FormScope {
    #[must_use]
    pub fn new(controller: FormController, scope: Scope) -> Self {
        Self { controller, scope }
    }

    #[must_use]
    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// A child scope (`address` inside this scope).
    #[must_use]
    pub fn nest(&self, name: impl Into<Path>) -> FormScope {
        FormScope::new(self.controller.clone(), self.scope.nest(name))
    }

    #[must_use]
    pub fn get_full_field(&self, relative: impl Into<Path>) -> Path {
        self.scope.full_field(&relative.into())
    }

    #[must_use]
    pub fn get_value(&self, relative: impl Into<Path>) -> Option<Value> {
        self.controller.get_value(self.get_full_field(relative))
    }

    pub fn set_value(&self, relative: impl Into<Path>, value: impl Into<Value>) {
        self.controller.set_value(self.get_full_field(relative), value);
    }

    #[must_use]
    pub fn get_error(&self, relative: impl Into<Path>) -> Option<String> {
        self.controller.get_error(self.get_full_field(relative))
    }

    #[must_use]
    pub fn get_touched(&self, relative: impl Into<Path>) -> bool {
        self.controller.get_touched(self.get_full_field(relative))
    }

    #[must_use]
    pub fn get_initial_value(&self, relative: impl Into<Path>) -> Option<Value> {
        self.controller.get_initial_value(self.get_full_field(relative))
    }

    /// Mount a field under this scope.
    pub fn register_field(&self, options: FieldOptions) -> Field {
        let full = self.scope.full_field(&options.field);
        if let Some(initial) = options.initial_value.clone() {
            self.controller.seed_initial_value(&full, initial);
        }
        let descriptor = FieldDescriptor {
            relative: options.field.clone(),
            full: full.clone(),
            validate: options.validate,
            shadow: options.shadow,
            trigger: options.trigger,
            allow_empty_string: options.allow_empty_string,
        };
        let id = self.controller.register(descriptor);
        Field {
            scope: self.clone(),
            relative: options.field,
            full,
            shadow: options.shadow,
            id,
        }
    }

    /// Mount an array field under this scope.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::ArrayFieldNotList`] when the initial value found
    /// for the field is present but not a list.
    pub fn register_array_field(&self, options: ArrayFieldOptions) -> Result<ArrayField, FormError> {
        ArrayField::register(self, options)
    }
}

/// Registration options for one field.
#[derive(Clone)]
pub struct FieldOptions {
    pub field: Path,
    pub validate: Option<Validator>,
    pub trigger: ValidationTrigger,
    pub shadow: bool,
    pub initial_value: Option<Value>,
    pub allow_empty_string: bool,
}

impl std::fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldOptions")
            .field("field", &self.field.to_string())
            .field("validate", &self.validate.is_some())
            .field("trigger", &self.trigger)
            .field("shadow", &self.shadow)
            .field("initial_value", &self.initial_value)
            .finish()
    }
}

impl FieldOptions {
    #[must_use]
    pub fn new(field: impl Into<Path>) -> Self {
        Self {
            field: field.into(),
            validate: None,
            trigger: ValidationTrigger::default(),
            shadow: false,
            initial_value: None,
            allow_empty_string: false,
        }
    }

    #[must_use]
    pub fn validate(
        mut self,
        validate: impl Fn(Option<&Value>, &Value) -> Option<String> + 'static,
    ) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    #[must_use]
    pub fn validator(mut self, validate: Option<Validator>) -> Self {
        self.validate = validate;
        self
    }

    #[must_use]
    pub fn validate_on_change(mut self, enabled: bool) -> Self {
        self.trigger.on_change = enabled;
        self
    }

    #[must_use]
    pub fn validate_on_blur(mut self, enabled: bool) -> Self {
        self.trigger.on_blur = enabled;
        self
    }

    #[must_use]
    pub fn shadow(mut self, enabled: bool) -> Self {
        self.shadow = enabled;
        self
    }

    #[must_use]
    pub fn initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn allow_empty_string(mut self, enabled: bool) -> Self {
        self.allow_empty_string = enabled;
        self
    }
}

/// A mounted field. Dropping it deregisters the field; the stored value
/// stays in the form.
#[derive(Debug)]
pub struct Field {
    scope: FormScope,
    relative: Path,
    full: Path,
    shadow: bool,
    id: FieldId,
}

impl Field {
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full
    }

    #[must_use]
    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    fn controller(&self) -> &FormController {
        self.scope.controller()
    }

    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.controller().get_value(&self.full)
    }

    /// Write this field's value. Shadow fields take the direct write path.
    pub fn set_value(&self, value: impl Into<Value>) {
        if self.shadow {
            self.controller()
                .set_shadow_value(&self.full, Some(value.into()));
        } else {
            self.controller().set_value(&self.full, value);
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.controller().get_error(&self.full)
    }

    pub fn set_error(&self, error: Option<String>) {
        self.controller().set_error(&self.full, error);
    }

    #[must_use]
    pub fn touched(&self) -> bool {
        self.controller().get_touched(&self.full)
    }

    pub fn set_touched(&self, touched: bool) {
        self.controller().set_touched(&self.full, touched);
    }

    /// Focus left the input.
    pub fn blur(&self) {
        self.controller().blur(&self.full);
    }

    /// Run this field's validator now.
    pub fn validate(&self) -> Option<String> {
        self.controller().validate_field(&self.full)
    }

    #[must_use]
    pub fn initial_value(&self) -> Option<Value> {
        self.controller().get_initial_value(&self.full)
    }
}

impl Drop for Field {
    fn drop(&mut self) {
        self.scope.controller().deregister(self.id);
    }
}
