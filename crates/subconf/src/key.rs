//! Hierarchical configuration keys
//!
//! Keys are paths of segments joined by `:` (e.g. `Database:Connection:Host`).
//! Comparison is case-insensitive. Ordering compares segment by segment:
//! numeric segments sort before text and numerically among themselves, so
//! array items enumerate as `0, 1, 2, 10` rather than `0, 1, 10, 2`.

use std::cmp::Ordering;

/// Separator between key segments
pub const KEY_DELIMITER: &str = ":";

/// Join segments into a single key path
pub fn combine<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

/// Case-insensitive key equality
pub fn keys_equal(a: &str, b: &str) -> bool {
    a == b || normalize(a) == normalize(b)
}

/// Normalized form used for case-insensitive map lookups
pub fn normalize(key: &str) -> String {
    key.to_lowercase()
}

/// If `key` lies under `parent` (case-insensitive), the child segment directly below it
///
/// `parent = None` means the root, so the first segment of every key is a child.
pub fn child_segment<'a>(key: &'a str, parent: Option<&str>) -> Option<&'a str> {
    let rest = match parent {
        None => key,
        Some(parent) => {
            let prefix_len = parent.len() + KEY_DELIMITER.len();
            if key.len() <= prefix_len
                || !key.is_char_boundary(parent.len())
                || !keys_equal(&key[..parent.len()], parent)
                || !key[parent.len()..].starts_with(KEY_DELIMITER)
            {
                return None;
            }
            &key[prefix_len..]
        }
    };

    match rest.find(KEY_DELIMITER) {
        Some(idx) => Some(&rest[..idx]),
        None => Some(rest),
    }
}

/// Hierarchical, case-insensitive key ordering
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = a.split(KEY_DELIMITER).filter(|s| !s.is_empty());
    let mut right = b.split(KEY_DELIMITER).filter(|s| !s.is_empty());

    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => {
                let ordering = compare_segment(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn compare_segment(x: &str, y: &str) -> Ordering {
    match (x.parse::<i64>(), y.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => normalize(x).cmp(&normalize(y)),
    }
}

/// Sort keys with [`compare`] and drop case-insensitive duplicates, keeping the first spelling
pub fn sort_and_dedup(keys: &mut Vec<String>) {
    keys.sort_by(|a, b| compare(a, b));
    keys.dedup_by(|a, b| keys_equal(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine() {
        assert_eq!(combine(&["Database", "Host"]), "Database:Host");
        assert_eq!(combine(&["Host"]), "Host");
    }

    #[test]
    fn test_keys_equal_ignores_case() {
        assert!(keys_equal("Bar", "bar"));
        assert!(keys_equal("Bar1:Bar2", "BAR1:bar2"));
        assert!(!keys_equal("Bar", "Baz"));
    }

    #[test]
    fn test_child_segment() {
        assert_eq!(child_segment("Logging:Level", None), Some("Logging"));
        assert_eq!(child_segment("Logging:Level:Default", Some("logging")), Some("Level"));
        assert_eq!(child_segment("Logging", Some("Logging")), None);
        assert_eq!(child_segment("LoggingExtra:Level", Some("Logging")), None);
        assert_eq!(child_segment("Other:Level", Some("Logging")), None);
    }

    #[test]
    fn test_compare_numeric_segments() {
        let mut keys = vec!["10".to_string(), "2".into(), "b".into(), "A".into(), "1".into()];
        keys.sort_by(|a, b| compare(a, b));
        assert_eq!(keys, vec!["1", "2", "10", "A", "b"]);
    }

    #[test]
    fn test_compare_depth() {
        assert_eq!(compare("a", "a:b"), Ordering::Less);
        assert_eq!(compare("a:b", "A:B"), Ordering::Equal);
        assert_eq!(compare("a:2", "a:10"), Ordering::Less);
    }

    #[test]
    fn test_sort_and_dedup() {
        let mut keys = vec!["foo".to_string(), "Bar".into(), "FOO".into(), "bar".into()];
        sort_and_dedup(&mut keys);
        assert_eq!(keys, vec!["Bar", "foo"]);
    }
}
