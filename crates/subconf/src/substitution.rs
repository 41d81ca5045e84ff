//! Template substitution
//!
//! Values may reference other keys:
//! - `${Database:Password}` - replaced by the resolved value of that key
//! - `${{Database:Password}}` - escaped, emitted as the literal `${Database:Password}`
//!
//! Referenced values are resolved recursively before being spliced in. The
//! composed result is not scanned again, so text produced by a substitution
//! (including an unescaped `${...}`) is left as-is.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::key;

/// A plain reference or an escaped one, as captured in a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `${name}`
    Reference(String),
    /// `${{name}}`; holds `name`
    Escaped(String),
}

impl Token {
    /// The literal text this token was captured from
    pub fn placeholder(&self) -> String {
        match self {
            Token::Reference(name) => format!("${{{}}}", name),
            Token::Escaped(name) => format!("${{{{{}}}}}", name),
        }
    }
}

static TEMPLATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn template_pattern() -> &'static Regex {
    TEMPLATE_PATTERN.get_or_init(|| {
        // A name without braces, or the same wrapped in exactly one extra pair
        Regex::new(r"\$\{([^{}]+|\{[^{}]+\})\}").expect("template pattern is valid")
    })
}

/// Check if a value contains anything to substitute or unescape
pub fn contains_template(value: &str) -> bool {
    template_pattern().is_match(value)
}

/// Scan a value left to right for template tokens
pub fn scan(value: &str) -> Vec<Token> {
    template_pattern()
        .captures_iter(value)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let captured = m.as_str();
            match captured
                .strip_prefix('{')
                .and_then(|inner| inner.strip_suffix('}'))
            {
                Some(inner) => Token::Escaped(inner.to_string()),
                None => Token::Reference(captured.to_string()),
            }
        })
        .collect()
}

/// Keys under active resolution, root first
///
/// Owned by a single top-level [`resolve`] call.
#[derive(Debug)]
pub struct ReferenceChain {
    keys: Vec<String>,
}

impl ReferenceChain {
    /// Start a chain at `root`
    pub fn new(root: &str) -> Self {
        Self {
            keys: vec![root.to_string()],
        }
    }

    /// Whether `name` is already being resolved (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.keys.iter().any(|k| key::keys_equal(k, name))
    }

    fn push(&mut self, name: &str) {
        self.keys.push(name.to_string());
    }

    fn pop(&mut self) {
        self.keys.pop();
    }

    fn closed_with(&self, name: &str) -> Vec<String> {
        let mut chain = self.keys.clone();
        chain.push(name.to_string());
        chain
    }
}

/// Resolve `key` through `lookup`, substituting every reference
///
/// Returns `Ok(None)` when `key` itself has no value. Referencing a key
/// without a value fails with an unresolved reference error; a key that
/// reappears in its own resolution chain fails with a cyclic reference error.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use subconf::substitution;
///
/// let data = HashMap::from([
///     ("ConnectionString", "pwd=${DatabasePassword}"),
///     ("DatabasePassword", "X"),
/// ]);
/// let lookup = |k: &str| Ok::<_, subconf::Error>(data.get(k).map(|v| v.to_string()));
///
/// let value = substitution::resolve(&lookup, "ConnectionString").unwrap();
/// assert_eq!(value.as_deref(), Some("pwd=X"));
/// ```
pub fn resolve<L>(lookup: &L, key: &str) -> Result<Option<String>>
where
    L: Fn(&str) -> Result<Option<String>> + ?Sized,
{
    let Some(value) = lookup(key)? else {
        return Ok(None);
    };

    if !contains_template(&value) {
        return Ok(Some(value));
    }

    let mut chain = ReferenceChain::new(key);
    substitute(lookup, key, value, &mut chain).map(Some)
}

fn substitute<L>(lookup: &L, key: &str, value: String, chain: &mut ReferenceChain) -> Result<String>
where
    L: Fn(&str) -> Result<Option<String>> + ?Sized,
{
    let tokens = scan(&value);
    let mut value = value;

    for token in tokens {
        match token {
            Token::Escaped(name) => {
                let escaped = Token::Escaped(name.clone()).placeholder();
                let literal = Token::Reference(name).placeholder();
                value = value.replacen(&escaped, &literal, 1);
            }
            Token::Reference(name) => {
                if chain.contains(&name) {
                    return Err(Error::cyclic_reference(chain.closed_with(&name)));
                }

                let raw = lookup(&name)?
                    .ok_or_else(|| Error::unresolved_reference(name.as_str(), key))?;

                log::trace!("Substituting '{}' in '{}'", name, key);
                chain.push(&name);
                let resolved = substitute(lookup, &name, raw, chain)?;
                chain.pop();

                value = value.replace(&Token::Reference(name).placeholder(), &resolved);
            }
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Case-insensitive lookup over literal pairs; `None` values are explicit nulls
    fn lookup_from(pairs: &[(&str, Option<&str>)]) -> impl Fn(&str) -> Result<Option<String>> {
        let data: HashMap<String, Option<String>> = pairs
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.map(str::to_string)))
            .collect();
        move |k: &str| Ok(data.get(&k.to_lowercase()).cloned().flatten())
    }

    fn resolve_pairs(pairs: &[(&str, &str)], key: &str) -> Result<Option<String>> {
        let pairs: Vec<(&str, Option<&str>)> = pairs.iter().map(|(k, v)| (*k, Some(*v))).collect();
        resolve(&lookup_from(&pairs), key)
    }

    #[test]
    fn test_scan_tokens() {
        assert_eq!(
            scan("a ${Foo} b ${{Bar}} c ${Baz:Qux}"),
            vec![
                Token::Reference("Foo".into()),
                Token::Escaped("Bar".into()),
                Token::Reference("Baz:Qux".into()),
            ]
        );
    }

    #[test]
    fn test_scan_ignores_malformed_tokens() {
        assert!(scan("Hello {world}").is_empty());
        assert!(scan("Hello ${Var what's up ?").is_empty());
        assert!(scan("${{Bar}").is_empty());
        assert!(scan("${{{Bar}}}").is_empty());
        assert!(scan("${}").is_empty());
    }

    #[test]
    fn test_contains_template() {
        assert!(contains_template("pwd=${DatabasePassword}"));
        assert!(contains_template("${{Escaped}}"));
        assert!(!contains_template("just $dollar and {braces}"));
    }

    #[test]
    fn test_value_without_template_is_unchanged() {
        let value = resolve_pairs(&[("Foo", "Bar")], "Foo").unwrap();
        assert_eq!(value.as_deref(), Some("Bar"));
    }

    #[test]
    fn test_absent_key_is_not_an_error() {
        let value = resolve_pairs(&[("Foo", "Bar")], "Missing").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_single_reference() {
        let value = resolve_pairs(
            &[
                ("ConnectionString", "pwd=${DatabasePassword}"),
                ("DatabasePassword", "X"),
            ],
            "ConnectionString",
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some("pwd=X"));
    }

    #[test]
    fn test_reference_at_start_middle_and_end() {
        let pairs = [
            ("Start", "${Password}&server=localhost"),
            ("Middle", "a&password=${Password}&server=localhost"),
            ("End", "a&password=${Password}"),
            ("Password", "ComplicatedPassword"),
        ];

        assert_eq!(
            resolve_pairs(&pairs, "Start").unwrap().as_deref(),
            Some("ComplicatedPassword&server=localhost")
        );
        assert_eq!(
            resolve_pairs(&pairs, "Middle").unwrap().as_deref(),
            Some("a&password=ComplicatedPassword&server=localhost")
        );
        assert_eq!(
            resolve_pairs(&pairs, "End").unwrap().as_deref(),
            Some("a&password=ComplicatedPassword")
        );
    }

    #[test]
    fn test_repeated_tokens_are_all_replaced() {
        let value = resolve_pairs(
            &[
                ("Foo", "${Bar1}${Bar2}${Bar1}"),
                ("Bar1", "Doe"),
                ("Bar2", "-John-"),
            ],
            "Foo",
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some("Doe-John-Doe"));
    }

    #[test]
    fn test_hierarchical_reference() {
        let value = resolve_pairs(
            &[("Foo", "Hello ${Bar1:Bar2}"), ("Bar1:Bar2", "world!")],
            "Foo",
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some("Hello world!"));
    }

    #[test]
    fn test_empty_reference_is_valid() {
        let value = resolve_pairs(&[("Foo", "${Var1}"), ("Var1", "")], "Foo").unwrap();
        assert_eq!(value.as_deref(), Some(""));
    }

    #[test]
    fn test_nested_references() {
        let value = resolve_pairs(
            &[
                ("Bar", "${Foo}"),
                ("Foo", "Hello ${Qux}"),
                ("Qux", "${WO}${Baz}!"),
                ("WO", "${W}${O}"),
                ("W", "w"),
                ("O", "o"),
                ("Baz", "rld"),
            ],
            "Bar",
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some("Hello world!"));
    }

    #[test]
    fn test_missing_reference_fails() {
        let err = resolve_pairs(&[("TestKey", "Test value ${Foobar}")], "TestKey").unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::UnresolvedReference {
                key: "Foobar".into(),
                requested_by: "TestKey".into(),
            }
        );
        assert!(err.to_string().contains("Foobar"));
    }

    #[test]
    fn test_null_reference_fails_like_absent() {
        let lookup = lookup_from(&[("Foo", Some("${Var1}")), ("Var1", None)]);
        let err = resolve(&lookup, "Foo").unwrap_err();

        assert!(matches!(
            err.kind,
            ErrorKind::UnresolvedReference { ref key, .. } if key == "Var1"
        ));
    }

    #[test]
    fn test_self_cycle_is_case_insensitive() {
        let err = resolve_pairs(&[("Bar", "${bar}")], "Bar").unwrap_err();

        assert_eq!(err.reference_chain().as_deref(), Some("Bar > bar"));
        assert!(err.to_string().contains("Bar > bar"));
    }

    #[test]
    fn test_indirect_cycle_reports_every_hop() {
        let err = resolve_pairs(
            &[
                ("Bar", "${Foo}"),
                ("Foo", "Hello ${Qux}"),
                ("Qux", "${WO}${Baz}!"),
                ("Baz", "rld"),
                ("WO", "${W}${Bar}"),
                ("W", "w"),
                ("O", "o"),
            ],
            "Bar",
        )
        .unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::CyclicReference {
                chain: vec![
                    "Bar".into(),
                    "Foo".into(),
                    "Qux".into(),
                    "WO".into(),
                    "Bar".into(),
                ],
            }
        );
        assert!(err.to_string().contains("Bar > Foo > Qux > WO > Bar"));
    }

    #[test]
    fn test_escaped_reference_is_unescaped_once() {
        let value = resolve_pairs(&[("Foo", "Hello ${Bar}!"), ("Bar", "${{Bar}}")], "Foo").unwrap();
        assert_eq!(value.as_deref(), Some("Hello ${Bar}!"));
    }

    #[test]
    fn test_incomplete_escape_is_left_verbatim() {
        let value = resolve_pairs(&[("Foo", "Hello ${Bar}!"), ("Bar", "${{Bar}")], "Foo").unwrap();
        assert_eq!(value.as_deref(), Some("Hello ${{Bar}!"));
    }

    #[test]
    fn test_malformed_templates_are_left_verbatim() {
        let pairs = [("Prefix", "Hello {world}"), ("Suffix", "Hello ${Var what's up ?")];

        assert_eq!(
            resolve_pairs(&pairs, "Prefix").unwrap().as_deref(),
            Some("Hello {world}")
        );
        assert_eq!(
            resolve_pairs(&pairs, "Suffix").unwrap().as_deref(),
            Some("Hello ${Var what's up ?")
        );
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        // `Outer` becomes "${Target}" after unescaping; it must stay literal
        let value = resolve_pairs(
            &[
                ("Outer", "[${Inner}]"),
                ("Inner", "${{Target}}"),
                ("Target", "should not appear"),
            ],
            "Outer",
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some("[${Target}]"));
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let lookup = |k: &str| -> Result<Option<String>> {
            match k {
                "Foo" => Ok(Some("${Broken}".into())),
                _ => Err(Error::internal("provider failure")),
            }
        };
        let err = resolve(&lookup, "Foo").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_reference_chain_tracks_depth() {
        let mut chain = ReferenceChain::new("Root");
        assert!(chain.contains("ROOT"));

        chain.push("Child");
        assert_eq!(chain.closed_with("root"), vec!["Root", "Child", "root"]);
        chain.pop();
        assert!(!chain.contains("Child"));
        assert!(chain.contains("root"));
    }
}
