#![forbid(unsafe_code)]

//! Stable identity keys for dynamic list entries.
//!
//! An array field gives each entry a key when the entry is created. The key
//! never changes afterwards, even when earlier entries are removed and the
//! entry's index shifts, so a rendering layer can keep widget identity.
//!
//! Key generation is injectable: [`SequentialKeys`] is deterministic and
//! suited to tests, [`RandomKeys`] produces UUID v4 strings.

use std::cell::Cell;
use std::fmt;

/// Opaque identity of one array entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey(String);

impl EntryKey {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh entry keys.
///
/// Every call must return a key distinct from all keys previously returned
/// by the same generator.
pub trait KeyGenerator {
    fn next_key(&self) -> EntryKey;
}

/// Monotonic counter keys: `"{prefix}{n}"`.
#[derive(Debug, Default)]
pub struct SequentialKeys {
    prefix: String,
    next: Cell<u64>,
}

impl SequentialKeys {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys are rendered as `{prefix}{n}`.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: Cell::new(0),
        }
    }
}

impl KeyGenerator for SequentialKeys {
    fn next_key(&self) -> EntryKey {
        let n = self.next.get();
        self.next.set(n + 1);
        EntryKey(format!("{}{n}", self.prefix))
    }
}

/// Random UUID v4 keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeys;

impl KeyGenerator for RandomKeys {
    fn next_key(&self) -> EntryKey {
        EntryKey(uuid::Uuid::new_v4().to_string())
    }
}
