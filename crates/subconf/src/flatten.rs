//! Flattened view of provider chains
//!
//! A chain holding a substitution layer shows that layer as a single
//! composite provider. Tools that inspect providers one by one see the
//! composite's private providers instead.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::chain::ConfigurationRoot;
use crate::error::{Error, Result};
use crate::provider::{Provider, ProviderKind};

/// Flatten a provider list, replacing the last composite with its private providers
///
/// Leaves are kept in order. Walking from the end of the list, the first
/// composite found is expanded recursively and the walk stops there: the
/// composite already holds every provider registered before it.
pub fn flatten_providers(providers: &[Arc<dyn Provider>]) -> Vec<Arc<dyn Provider>> {
    let mut flattened = VecDeque::with_capacity(providers.len());
    for provider in providers.iter().rev() {
        match provider.kind() {
            ProviderKind::Leaf => flattened.push_front(Arc::clone(provider)),
            ProviderKind::Composite(inner) => {
                for nested in flatten_providers(inner.providers()).into_iter().rev() {
                    flattened.push_front(nested);
                }
                break;
            }
        }
    }
    flattened.into()
}

/// A configuration root whose provider list is flattened
///
/// Reads and writes go through the wrapped root unchanged.
#[derive(Debug, Clone)]
pub struct FlattenedRoot {
    inner: Arc<ConfigurationRoot>,
}

impl FlattenedRoot {
    /// Wrap a loaded root
    pub fn new(inner: Arc<ConfigurationRoot>) -> Self {
        Self { inner }
    }

    /// The wrapped root
    pub fn inner(&self) -> &ConfigurationRoot {
        &self.inner
    }

    /// Providers with every substitution layer expanded
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        flatten_providers(self.inner.providers())
    }

    /// Read a key through the wrapped root
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    /// Write a key into every provider of the wrapped root
    pub fn set(&self, key: &str, value: Option<String>) -> Result<()> {
        self.inner.set(key, value)
    }

    /// Child segment names under `parent_path`, as the wrapped root reports them
    pub fn child_keys(&self, parent_path: Option<&str>) -> Result<Vec<String>> {
        self.inner.child_keys(parent_path)
    }

    /// Every key path with its value; see [`ConfigurationRoot::entries`]
    pub fn entries(&self) -> Result<Vec<(String, Option<String>)>> {
        self.inner.entries()
    }

    /// Reload every provider of the wrapped root
    pub fn reload(&self) -> Result<()> {
        self.inner.reload()
    }
}

/// Wrap every registered configuration root in a flattened view
///
/// Fails when nothing is registered.
pub fn wrap_registered<I>(roots: I) -> Result<Vec<FlattenedRoot>>
where
    I: IntoIterator<Item = Arc<ConfigurationRoot>>,
{
    let wrapped: Vec<FlattenedRoot> = roots.into_iter().map(FlattenedRoot::new).collect();
    if wrapped.is_empty() {
        return Err(Error::precondition(
            "a configuration root must be registered before it can be flattened",
        ));
    }
    log::debug!("Flattening {} registered configuration root(s)", wrapped.len());
    Ok(wrapped)
}
