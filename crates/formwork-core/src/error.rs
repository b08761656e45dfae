#![forbid(unsafe_code)]

//! Errors from form configuration.
//!
//! Validation failures are not errors: validators return messages that are
//! stored per path in [`FormState`](crate::FormState). `FormError` covers
//! only misconfiguration detected while creating a form or an array field.

use crate::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// An array field's initial value was present but not a list.
    ArrayFieldNotList { field: Path, found: &'static str },
    /// Form options could not be parsed or were inconsistent.
    Config(String),
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArrayFieldNotList { field, found } => {
                write!(f, "array field '{field}' has a non-list initial value ({found})")
            }
            Self::Config(msg) => write!(f, "invalid form configuration: {msg}"),
        }
    }
}

impl std::error::Error for FormError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let err = FormError::ArrayFieldNotList {
            field: Path::parse("order.items"),
            found: "string",
        };
        assert_eq!(
            err.to_string(),
            "array field 'order.items' has a non-list initial value (string)"
        );
    }
}
