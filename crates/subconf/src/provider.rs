//! Providers and sources
//!
//! A [`Source`] is registered with a [`ConfigurationBuilder`] and produces one
//! [`Provider`] when the builder is built. Providers contribute key/values to
//! a chain; later providers override earlier ones.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::chain::{ConfigurationBuilder, ConfigurationRoot};
use crate::error::Result;
use crate::key;
use crate::value::FlatData;

/// Discriminates leaf providers from composites that own a private sub-chain
pub enum ProviderKind<'a> {
    /// A provider that holds its own data
    Leaf,
    /// A provider that answers from a private chain of other providers
    Composite(&'a ConfigurationRoot),
}

/// One layer of a configuration chain
pub trait Provider: Send + Sync {
    /// Look up a key. `Ok(None)` means the layer has no value for it.
    fn try_get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value into this layer
    fn set(&self, key: &str, value: Option<String>) -> Result<()>;

    /// (Re)load the layer's data
    fn load(&self) -> Result<()> {
        Ok(())
    }

    /// Child segment names under `parent_path`, merged with `earlier_keys`
    /// collected from the providers before this one
    fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>)
        -> Result<Vec<String>>;

    /// Whether this provider is a leaf or a composite
    fn kind(&self) -> ProviderKind<'_> {
        ProviderKind::Leaf
    }

    /// Release any resources held by the provider
    fn dispose(&self) {}

    /// Human-readable name, for logs and diagnostics
    fn name(&self) -> &str;
}

/// Marker telling the substitution layer how a registered source was installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    /// An ordinary source
    Plain,
    /// A source wrapped in a build-once cache
    Cached,
    /// A substitution source
    Substitution,
}

/// Something that builds a provider
pub trait Source: Send + Sync {
    /// Build the provider. `builder` is the builder this source is registered in.
    fn build(&self, builder: &ConfigurationBuilder) -> Result<Arc<dyn Provider>>;

    /// How this source was installed
    fn tag(&self) -> SourceTag {
        SourceTag::Plain
    }

    /// Short description for logs
    fn describe(&self) -> String;
}

struct Entry {
    key: String,
    value: Option<String>,
}

/// Case-insensitive key/value storage shared by data-holding providers
///
/// Keys keep the spelling they were first written with.
#[derive(Default)]
pub struct KeyValueStore {
    entries: RwLock<IndexMap<String, Entry>>,
}

impl KeyValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from flattened data
    pub fn from_data(data: FlatData) -> Self {
        let store = Self::new();
        store.replace(data);
        store
    }

    /// Look up a key; null entries read as absent
    pub fn get(&self, k: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&key::normalize(k))
            .and_then(|entry| entry.value.clone())
    }

    /// Insert or overwrite a key
    pub fn set(&self, k: &str, value: Option<String>) {
        let normalized = key::normalize(k);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(&normalized) {
            Some(entry) => entry.value = value,
            None => {
                entries.insert(
                    normalized,
                    Entry {
                        key: k.to_string(),
                        value,
                    },
                );
            }
        }
    }

    /// Replace every entry
    pub fn replace(&self, data: FlatData) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        for (k, value) in data {
            entries.insert(key::normalize(&k), Entry { key: k, value });
        }
    }

    /// Child segments under `parent_path`, followed by `earlier_keys`, sorted
    pub fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = entries
            .values()
            .filter_map(|entry| key::child_segment(&entry.key, parent_path))
            .map(str::to_string)
            .collect();
        keys.extend(earlier_keys);
        keys.sort_by(|a, b| key::compare(a, b));
        keys
    }
}

/// In-memory provider
pub struct MemoryProvider {
    name: String,
    store: KeyValueStore,
}

impl MemoryProvider {
    /// Create a provider holding `data`
    pub fn new(name: impl Into<String>, data: FlatData) -> Self {
        Self {
            name: name.into(),
            store: KeyValueStore::from_data(data),
        }
    }
}

impl Provider for MemoryProvider {
    fn try_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.get(key))
    }

    fn set(&self, key: &str, value: Option<String>) -> Result<()> {
        self.store.set(key, value);
        Ok(())
    }

    fn child_keys(
        &self,
        earlier_keys: Vec<String>,
        parent_path: Option<&str>,
    ) -> Result<Vec<String>> {
        Ok(self.store.child_keys(earlier_keys, parent_path))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Source for an in-memory collection of key/values
///
/// # Example
///
/// ```rust
/// use subconf::{ConfigurationBuilder, MemorySource};
///
/// let root = ConfigurationBuilder::new()
///     .add(MemorySource::new("defaults").with("Database:Host", "localhost"))
///     .build()
///     .unwrap();
/// assert_eq!(root.get("database:host").unwrap().as_deref(), Some("localhost"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    data: FlatData,
}

impl MemorySource {
    /// Create an empty source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: FlatData::new(),
        }
    }

    /// Add a key/value pair
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), Some(value.into()));
        self
    }

    /// Add a key whose value is explicitly null
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.data.insert(key.into(), None);
        self
    }
}

impl Source for MemorySource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Result<Arc<dyn Provider>> {
        Ok(Arc::new(MemoryProvider::new(
            self.name.clone(),
            self.data.clone(),
        )))
    }

    fn describe(&self) -> String {
        format!("memory({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_store_is_case_insensitive() {
        let store = KeyValueStore::new();
        store.set("Database:Host", Some("localhost".into()));

        assert_eq!(store.get("database:HOST").as_deref(), Some("localhost"));

        store.set("DATABASE:host", Some("db".into()));
        assert_eq!(store.get("Database:Host").as_deref(), Some("db"));
        assert_eq!(store.child_keys(vec![], None), vec!["Database"]);
    }

    #[test]
    fn test_store_null_reads_as_absent() {
        let store = KeyValueStore::new();
        store.set("Var1", None);

        assert_eq!(store.get("Var1"), None);
        assert_eq!(store.child_keys(vec![], None), vec!["Var1"]);
    }

    #[test]
    fn test_store_child_keys() {
        let mut data = FlatData::new();
        data.insert("Logging:Level".into(), Some("Info".into()));
        data.insert("Logging:Console:Enabled".into(), Some("true".into()));
        data.insert("Foo:10".into(), Some("ten".into()));
        data.insert("Foo:2".into(), Some("two".into()));
        let store = KeyValueStore::from_data(data);

        assert_eq!(store.child_keys(vec![], None), vec!["Foo", "Foo", "Logging", "Logging"]);
        assert_eq!(
            store.child_keys(vec![], Some("logging")),
            vec!["Console", "Level"]
        );
        assert_eq!(store.child_keys(vec!["3".into()], Some("Foo")), vec!["2", "3", "10"]);
    }

    #[test]
    fn test_memory_source_builds_provider() {
        let source = MemorySource::new("test")
            .with("Foo", "Bar")
            .with_null("Empty");
        let provider = source.build(&ConfigurationBuilder::new()).unwrap();

        assert_eq!(provider.name(), "test");
        assert_eq!(provider.try_get("foo").unwrap().as_deref(), Some("Bar"));
        assert_eq!(provider.try_get("Empty").unwrap(), None);
        assert_eq!(provider.try_get("Missing").unwrap(), None);
        assert!(matches!(provider.kind(), ProviderKind::Leaf));
        assert_eq!(source.tag(), SourceTag::Plain);
    }

    #[test]
    fn test_memory_provider_set() {
        let provider = MemoryProvider::new("test", FlatData::new());
        provider.set("New:Key", Some("value".into())).unwrap();

        assert_eq!(provider.try_get("new:key").unwrap().as_deref(), Some("value"));
    }
}
