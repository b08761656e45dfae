#![forbid(unsafe_code)]

//! Form-instance configuration flags.
//!
//! `FormOptions` carries the plain, serializable part of a form's setup.
//! Behavior that needs closures (form-level validation, pre-submit
//! transforms, key generators) is attached in the runtime crate.
//!
//! Options deserialize from the camelCase names used by UI bindings
//! (`dontPreventDefault`) as well as snake_case.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::FormError;
use crate::path::Path;
use crate::tree;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormOptions {
    /// Leave the submit gesture's default action alone.
    #[serde(alias = "dont_prevent_default")]
    pub dont_prevent_default: bool,

    /// Initial value tree. `null` is treated as an empty object.
    #[serde(alias = "initial_values")]
    pub initial_values: Value,

    /// When set, submit runs field validators only for these full paths.
    #[serde(alias = "validate_fields")]
    pub validate_fields: Option<BTreeSet<Path>>,

    /// Store `""` as-is instead of treating it as an absent value.
    #[serde(alias = "allow_empty_strings")]
    pub allow_empty_strings: bool,

    /// Suppress the default action of Enter key presses inside the form.
    #[serde(alias = "prevent_enter")]
    pub prevent_enter: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            dont_prevent_default: false,
            initial_values: Value::Object(Map::new()),
            validate_fields: None,
            allow_empty_strings: false,
            prevent_enter: false,
        }
    }
}

impl FormOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Config`] when the JSON is malformed or
    /// `initialValues` is neither an object nor `null`.
    pub fn from_json_str(raw: &str) -> Result<Self, FormError> {
        let options: Self =
            serde_json::from_str(raw).map_err(|err| FormError::Config(err.to_string()))?;
        options.validated()
    }

    /// Normalize `initial_values` (`null` becomes `{}`) and reject
    /// non-object trees.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Config`] for a non-object initial tree.
    pub fn validated(mut self) -> Result<Self, FormError> {
        match &self.initial_values {
            Value::Null => self.initial_values = Value::Object(Map::new()),
            Value::Object(_) => {}
            other => {
                return Err(FormError::Config(format!(
                    "initialValues must be an object, found {}",
                    tree::kind(other)
                )));
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_dont_prevent_default(mut self, enabled: bool) -> Self {
        self.dont_prevent_default = enabled;
        self
    }

    #[must_use]
    pub fn with_initial_values(mut self, values: Value) -> Self {
        self.initial_values = values;
        self
    }

    #[must_use]
    pub fn with_validate_fields<I, P>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Path>,
    {
        self.validate_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_allow_empty_strings(mut self, enabled: bool) -> Self {
        self.allow_empty_strings = enabled;
        self
    }

    #[must_use]
    pub fn with_prevent_enter(mut self, enabled: bool) -> Self {
        self.prevent_enter = enabled;
        self
    }

    /// Whether submit should run the field validator registered at `path`.
    #[must_use]
    pub fn validates_field(&self, path: &Path) -> bool {
        self.validate_fields
            .as_ref()
            .is_none_or(|fields| fields.contains(path))
    }
}
