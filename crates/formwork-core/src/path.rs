#![forbid(unsafe_code)]

//! Structured field paths.
//!
//! A [`Path`] is a sequence of segments, each either an object key or an
//! array index. Fields declare paths as strings (`"address.city"`,
//! `"items[2].name"`); the parser turns them into segments once so every
//! later comparison is structural.
//!
//! # Invariants
//!
//! 1. **Parsing is total**: every string yields a path. Dots separate keys,
//!    `[n]` with a decimal integer yields an index, any other bracket content
//!    is taken as a key, and empty segments are skipped.
//! 2. **Canonical display**: `Display` renders `a.b[2].c` with no leading
//!    dot. Paths whose keys contain no `.`, `[` or `]` round-trip through
//!    [`Path::parse`].
//! 3. **Ordering is segment-wise**, so maps keyed by `Path` group children
//!    directly after their parent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single segment in a field path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Seg {
    /// Object key access: `address` in `address.city`.
    Key(String),
    /// Array index access: `[2]` in `items[2]`.
    Index(usize),
}

impl Seg {
    /// Get the key if this is a key segment.
    #[inline]
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }

    /// Get the index if this is an index segment.
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(_) => None,
            Seg::Index(i) => Some(*i),
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// An absolute or relative address of a field.
///
/// The empty path is the root of the values tree.
///
/// # Examples
///
/// ```
/// use formwork_core::Path;
///
/// let path = Path::parse("items[2].name");
/// assert_eq!(path, Path::root().key("items").index(2).key("name"));
/// assert_eq!(path.to_string(), "items[2].name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The empty path.
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from explicit segments.
    #[inline]
    #[must_use]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Parse a dotted/indexed field name.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut segments = Vec::new();
        let mut key = String::new();
        let mut chars = input.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => flush_key(&mut key, &mut segments),
                '[' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        // Unterminated bracket: keep the text as part of the key.
                        key.push('[');
                        key.push_str(&inner);
                        continue;
                    }
                    flush_key(&mut key, &mut segments);
                    match parse_index(&inner) {
                        Some(i) => segments.push(Seg::Index(i)),
                        None => {
                            let trimmed = inner.trim_matches(|c| c == '"' || c == '\'');
                            if !trimmed.is_empty() {
                                segments.push(Seg::Key(trimmed.to_owned()));
                            }
                        }
                    }
                }
                _ => key.push(c),
            }
        }
        flush_key(&mut key, &mut segments);
        Self(segments)
    }

    /// Append a key segment (builder style).
    #[inline]
    #[must_use]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment (builder style).
    #[inline]
    #[must_use]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Concatenate `other` onto this path.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = Vec::with_capacity(self.0.len() + other.0.len());
        segments.extend_from_slice(&self.0);
        segments.extend_from_slice(&other.0);
        Path(segments)
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// The path without its last segment, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Path> {
        let (_, head) = self.0.split_last()?;
        Some(Path(head.to_vec()))
    }

    /// Whether `prefix` is a (non-strict) prefix of this path.
    #[inline]
    #[must_use]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// If this path is `array[i]` or any descendant of `array[i]`, return `i`.
    ///
    /// This is the relation the array coordinator uses to tell child edits
    /// (`items[2]`, `items[2].name`) from its own writes (`items`) and from
    /// unrelated fields (`itemsX[0]`, `other[0]`).
    #[must_use]
    pub fn index_under(&self, array: &Path) -> Option<usize> {
        if self.0.len() <= array.0.len() || !self.starts_with(array) {
            return None;
        }
        self.0[array.0.len()].as_index()
    }

    /// Replace the index directly under `array` with `index`.
    ///
    /// Returns `None` when the path is not an indexed descendant of `array`.
    #[must_use]
    pub fn with_index_under(&self, array: &Path, index: usize) -> Option<Path> {
        self.index_under(array)?;
        let mut segments = self.0.clone();
        segments[array.0.len()] = Seg::Index(index);
        Some(Path(segments))
    }
}

fn flush_key(key: &mut String, segments: &mut Vec<Seg>) {
    if !key.is_empty() {
        segments.push(Seg::Key(std::mem::take(key)));
    }
}

fn parse_index(inner: &str) -> Option<usize> {
    let inner = inner.trim();
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Seg::Key(k) if i == 0 => f.write_str(k)?,
                Seg::Key(k) => write!(f, ".{k}")?,
                Seg::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl From<&String> for Path {
    fn from(s: &String) -> Self {
        Path::parse(s)
    }
}

impl From<&Path> for Path {
    fn from(p: &Path) -> Self {
        p.clone()
    }
}

impl From<Vec<Seg>> for Path {
    fn from(segments: Vec<Seg>) -> Self {
        Path(segments)
    }
}

// Paths serialize as their display string so state maps read `{"a.b": ..}`.
impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Path::parse(&raw))
    }
}
