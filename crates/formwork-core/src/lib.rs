#![forbid(unsafe_code)]

//! Core: field paths, value trees, entry identity, and form state types.
//!
//! # Role in Formwork
//! `formwork-core` is the data layer. It owns the structured [`Path`] type
//! every field is addressed by, the nested value tree helpers that read and
//! write form values, the [`FormState`] snapshot, and the plain configuration
//! flags a form instance is created with.
//!
//! # Primary responsibilities
//! - **Path**: parse `address.city` / `items[2].name` into segments and answer
//!   "is this path an indexed child of that array" without string matching.
//! - **Tree**: get/set/remove/splice inside a `serde_json::Value` root.
//! - **Identity**: injectable key generators for dynamic list entries.
//! - **State**: values, touched, errors, and the derived pristine/dirty flags.
//!
//! # How it fits in the system
//! The runtime (`formwork-runtime`) builds the controller, event bus, field
//! registry, and array coordinator on top of these types. Nothing in this
//! crate emits events or holds shared mutable state.

pub mod error;
pub mod identity;
pub mod options;
pub mod path;
pub mod state;
pub mod tree;

pub use error::FormError;
pub use identity::{EntryKey, KeyGenerator, RandomKeys, SequentialKeys};
pub use options::FormOptions;
pub use path::{Path, Seg};
pub use state::{ErrorMap, FormState, FormStatePatch, TouchedMap};

/// Re-exported so downstream crates build values with the same `json!` macro.
pub use serde_json::{Value, json};
