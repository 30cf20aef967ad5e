//! Deterministic next-stone selection.
//!
//! Stones are ordered by plain lexical comparison of their names, so `3.10`
//! sorts before `3.2`. Stones sharing the leading numeric branch of the first
//! incomplete stone form a group that may be worked in parallel.

use std::collections::HashSet;

/// How many stones `select_next` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Only the first incomplete stone.
    #[default]
    One,
    /// Every incomplete stone in the first incomplete stone's order group.
    All,
}

/// Leading run of all-digit, dot-separated segments of a stone name.
///
/// `3.1.research.domain` -> `3.1`, `2.b` -> `2`. A name that does not start
/// with a numeric segment is its own prefix.
pub fn order_prefix(name: &str) -> &str {
    let mut end = 0;
    for segment in name.split('.') {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        end = if end == 0 {
            segment.len()
        } else {
            end + 1 + segment.len()
        };
    }
    if end == 0 { name } else { &name[..end] }
}

/// Select the next stone(s) among `names` that are not in `passed`.
///
/// `names` need not be sorted; the result is in lexical order.
pub fn select_next(names: &[String], passed: &HashSet<String>, mode: SelectMode) -> Vec<String> {
    let mut incomplete: Vec<&String> = names.iter().filter(|name| !passed.contains(*name)).collect();
    incomplete.sort();
    incomplete.dedup();

    let Some(first) = incomplete.first() else {
        return Vec::new();
    };
    match mode {
        SelectMode::One => vec![(*first).clone()],
        SelectMode::All => {
            let prefix = order_prefix(first);
            incomplete
                .iter()
                .filter(|name| order_prefix(name) == prefix)
                .map(|name| (*name).clone())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn passed(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn order_prefix_takes_leading_numeric_segments() {
        assert_eq!(order_prefix("3.1.research.domain"), "3.1");
        assert_eq!(order_prefix("2.b"), "2");
        assert_eq!(order_prefix("10"), "10");
        assert_eq!(order_prefix("vision"), "vision");
        assert_eq!(order_prefix("3.1a.x"), "3");
    }

    #[test]
    fn lexical_order_is_not_numeric() {
        let all = names(&["3.2", "3.10"]);
        let next = select_next(&all, &passed(&[]), SelectMode::One);
        assert_eq!(next, names(&["3.10"]));
    }

    #[test]
    fn one_returns_first_incomplete() {
        let all = names(&["3.1.x", "1.a", "3.2.z", "2.b", "3.1.y"]);
        let next = select_next(&all, &passed(&["1.a"]), SelectMode::One);
        assert_eq!(next, names(&["2.b"]));
    }

    #[test]
    fn all_returns_sibling_group_only() {
        let all = names(&["1.a", "2.b", "3.1.x", "3.1.y", "3.2.z"]);
        let next = select_next(&all, &passed(&["1.a", "2.b"]), SelectMode::All);
        assert_eq!(next, names(&["3.1.x", "3.1.y"]));
    }

    #[test]
    fn all_skips_passed_siblings() {
        let all = names(&["3.1.x", "3.1.y", "3.1.z"]);
        let next = select_next(&all, &passed(&["3.1.y"]), SelectMode::All);
        assert_eq!(next, names(&["3.1.x", "3.1.z"]));
    }

    #[test]
    fn empty_when_everything_passed() {
        let all = names(&["1.a"]);
        assert!(select_next(&all, &passed(&["1.a"]), SelectMode::All).is_empty());
    }
}
