#![forbid(unsafe_code)]

//! Runtime: the form controller, field registry, array coordinator and
//! the per-form event bus.
//!
//! # Role in Formwork
//! `formwork-runtime` is where state changes happen. A [`FormController`]
//! owns one form's [`FormState`](formwork_core::FormState); fields mount
//! through a [`FormScope`] and get a [`Field`] handle back; list fields
//! mount as an [`ArrayField`] that keeps stable entry keys and a shadow
//! aggregate in sync with its children.
//!
//! # Primary responsibilities
//! - **Controller**: accessors, validation, submit/reset, event emission.
//! - **Registry**: scope resolution and one descriptor per mounted field.
//! - **Array coordinator**: keys, initial values, shadow synchronization.
//! - **Form**: caller hooks, gestures, and a render snapshot.
//!
//! Everything is single-threaded; handles are cheap `Rc` clones.
//!
//! # Example
//!
//! ```
//! use formwork_runtime::{FieldOptions, FormController, SubmitOutcome};
//! use formwork_core::json;
//!
//! let form = FormController::default();
//! let greeting = form.root().register_field(
//!     FieldOptions::new("greeting")
//!         .validate(|value, _| (value == Some(&json!("hello!"))).then(|| "too loud".to_string())),
//! );
//! greeting.set_value("hello!");
//! assert!(matches!(form.submit_form(None), SubmitOutcome::Failed(_)));
//! ```

pub mod array_field;
pub mod controller;
pub mod field;
pub mod form;
pub mod reactive;
pub mod registry;

pub use array_field::{ArrayEntry, ArrayField, ArrayFieldOptions, Entries};
pub use controller::{
    FormConfig, FormController, FormValidator, PreSubmit, SubmitGesture, SubmitOutcome,
};
pub use field::{Field, FieldOptions, FormScope};
pub use form::{Form, FormHooks};
pub use reactive::{EventBus, EventKind, FormEvent, Listener, Subscription, Tracked};
pub use registry::{ArrayValidator, FieldId, Scope, ValidationTrigger, Validator};
