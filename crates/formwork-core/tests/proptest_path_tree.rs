#![forbid(unsafe_code)]

//! Property-based invariant tests for paths and the value tree.
//!
//! 1. `Path::parse` is total: no input panics.
//! 2. The canonical display form parses back to the same path.
//! 3. `index_under` recognizes every descendant of `array[i]` and nothing
//!    that merely shares a string prefix.
//! 4. `tree::set` then `tree::get` reads back the written value.
//! 5. `tree::splice` shortens the list by one and keeps the other elements
//!    in order.

use formwork_core::{Path, Seg, Value, json, tree};
use proptest::prelude::*;

fn seg_strategy() -> impl Strategy<Value = Seg> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,5}".prop_map(Seg::Key),
        (0usize..5).prop_map(Seg::Index),
    ]
}

/// Paths that start with a key, like every field path a form uses.
fn path_strategy() -> impl Strategy<Value = Path> {
    ("[a-z]{1,4}", proptest::collection::vec(seg_strategy(), 0..4)).prop_map(|(head, rest)| {
        let mut segments = vec![Seg::Key(head)];
        segments.extend(rest);
        Path::from_segments(segments)
    })
}

proptest! {
    #[test]
    fn parse_is_total(raw in ".{0,24}") {
        let _ = Path::parse(&raw);
    }

    #[test]
    fn display_parses_back(path in path_strategy()) {
        prop_assert_eq!(Path::parse(&path.to_string()), path);
    }

    #[test]
    fn index_under_finds_descendants(
        array in path_strategy(),
        index in 0usize..10,
        rest in proptest::collection::vec(seg_strategy(), 0..3),
    ) {
        let child = array.clone().index(index);
        let descendant = child.join(&Path::from_segments(rest));
        prop_assert_eq!(descendant.index_under(&array), Some(index));
        prop_assert_eq!(array.index_under(&array), None);

        let mut sibling = array.to_string();
        sibling.push_str("x[0]");
        prop_assert_eq!(Path::parse(&sibling).index_under(&array), None);
    }

    #[test]
    fn set_then_get(path in path_strategy(), n in any::<i64>()) {
        let mut root = json!({});
        tree::set(&mut root, &path, Value::from(n));
        prop_assert_eq!(tree::get(&root, &path), Some(&Value::from(n)));
    }

    #[test]
    fn splice_removes_one(items in proptest::collection::vec(any::<u8>(), 1..8), pick in 0usize..8) {
        let index = pick % items.len();
        let mut root = json!({ "list": items.clone() });
        let removed = tree::splice(&mut root, &Path::parse("list"), index);

        let mut expected = items.clone();
        let gone = expected.remove(index);
        prop_assert_eq!(removed, Some(Value::from(gone)));
        prop_assert_eq!(root, json!({ "list": expected }));
    }
}
