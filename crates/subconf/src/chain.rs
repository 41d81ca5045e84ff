//! Configuration builder and the outer provider chain
//!
//! The builder holds an ordered list of sources. Building it produces a
//! [`ConfigurationRoot`], which loads every provider and answers reads from
//! the last provider that has a value (last registered wins).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::key;
use crate::provider::{Provider, Source};

/// Ordered list of configuration sources
#[derive(Clone, Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Arc<dyn Source>>,
}

impl ConfigurationBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder over an existing list of sources
    pub fn from_sources(sources: Vec<Arc<dyn Source>>) -> Self {
        Self { sources }
    }

    /// Register a source after every source registered so far
    pub fn add(&mut self, source: impl Source + 'static) -> &mut Self {
        self.add_shared(Arc::new(source))
    }

    /// Register an already shared source
    pub fn add_shared(&mut self, source: Arc<dyn Source>) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Registered sources, in registration order
    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    pub(crate) fn sources_mut(&mut self) -> &mut Vec<Arc<dyn Source>> {
        &mut self.sources
    }

    /// Registration index of `source`, compared by identity
    pub fn position_of(&self, source: &dyn Source) -> Option<usize> {
        let target = source as *const dyn Source as *const ();
        self.sources
            .iter()
            .position(|registered| Arc::as_ptr(registered) as *const () == target)
    }

    /// Build every source and load the resulting chain
    pub fn build(&self) -> Result<ConfigurationRoot> {
        let providers = self
            .sources
            .iter()
            .map(|source| source.build(self))
            .collect::<Result<Vec<_>>>()?;
        ConfigurationRoot::new(providers)
    }
}

/// A loaded, ordered chain of providers
pub struct ConfigurationRoot {
    providers: Vec<Arc<dyn Provider>>,
}

impl ConfigurationRoot {
    /// Create a chain and load every provider, in order
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Result<Self> {
        for provider in &providers {
            provider.load()?;
        }
        log::trace!("Loaded configuration chain with {} provider(s)", providers.len());
        Ok(Self { providers })
    }

    /// Providers, lowest priority first
    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Read a key from the highest-priority provider that has it
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        for provider in self.providers.iter().rev() {
            if let Some(value) = provider.try_get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Write a key into every provider
    pub fn set(&self, key: &str, value: Option<String>) -> Result<()> {
        if self.providers.is_empty() {
            return Err(Error::precondition(
                "a configuration source must be registered before values can be set",
            )
            .with_path(key));
        }
        for provider in &self.providers {
            provider.set(key, value.clone())?;
        }
        Ok(())
    }

    /// Distinct child segment names under `parent_path`, in key order
    pub fn child_keys(&self, parent_path: Option<&str>) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for provider in &self.providers {
            keys = provider.child_keys(keys, parent_path)?;
        }
        key::sort_and_dedup(&mut keys);
        Ok(keys)
    }

    /// Every key path in the tree with its value, depth-first in key order
    ///
    /// Section keys that only group children report `None`.
    pub fn entries(&self) -> Result<Vec<(String, Option<String>)>> {
        let mut entries = Vec::new();
        self.collect_entries(None, &mut entries)?;
        Ok(entries)
    }

    fn collect_entries(
        &self,
        parent_path: Option<&str>,
        entries: &mut Vec<(String, Option<String>)>,
    ) -> Result<()> {
        for child in self.child_keys(parent_path)? {
            let path = match parent_path {
                Some(parent) => key::combine(&[parent, child.as_str()]),
                None => child,
            };
            let value = self.get(&path)?;
            entries.push((path.clone(), value));
            self.collect_entries(Some(&path), entries)?;
        }
        Ok(())
    }

    /// Reload every provider, in order
    pub fn reload(&self) -> Result<()> {
        for provider in &self.providers {
            provider.load()?;
        }
        Ok(())
    }

    /// Dispose every provider
    pub fn dispose(&self) {
        for provider in &self.providers {
            provider.dispose();
        }
    }
}

impl std::fmt::Debug for ConfigurationRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationRoot")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
