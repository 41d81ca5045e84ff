//! Substitution layer for a provider chain
//!
//! [`ConfigurationBuilder::add_substitution`] appends a [`SubstitutionSource`].
//! When built, it collects every source registered before it into a private
//! chain and answers reads by substituting templates against that chain.
//! Sources registered after it still override its values as usual.
//!
//! # Example
//!
//! ```rust
//! use subconf::{ConfigurationBuilder, MemorySource, SubstitutionOptions};
//!
//! let root = ConfigurationBuilder::new()
//!     .add(
//!         MemorySource::new("app")
//!             .with("ConnectionString", "server=db;pwd=${DatabasePassword}")
//!             .with("DatabasePassword", "hunter2"),
//!     )
//!     .add_substitution(SubstitutionOptions::default())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     root.get("ConnectionString").unwrap().as_deref(),
//!     Some("server=db;pwd=hunter2")
//! );
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;

use crate::cache::CachedSource;
use crate::chain::{ConfigurationBuilder, ConfigurationRoot};
use crate::error::{Error, Result};
use crate::key;
use crate::provider::{Provider, ProviderKind, Source, SourceTag};
use crate::substitution;

/// Options for the substitution layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubstitutionOptions {
    /// Resolve every key while loading, so a broken reference fails at
    /// startup instead of on first read
    pub eager_validation: bool,
}

impl SubstitutionOptions {
    /// Options with eager validation enabled
    pub fn eager() -> Self {
        Self {
            eager_validation: true,
        }
    }
}

impl ConfigurationBuilder {
    /// Substitute `${key}` references in every value registered so far
    ///
    /// Earlier sources are wrapped so they are built only once, then a
    /// [`SubstitutionSource`] is appended.
    pub fn add_substitution(&mut self, options: SubstitutionOptions) -> &mut Self {
        for source in self.sources_mut().iter_mut() {
            if source.tag() == SourceTag::Plain {
                *source = CachedSource::wrap(Arc::clone(source));
            }
        }
        self.add(SubstitutionSource::new(options))
    }
}

/// Source that builds a [`SubstitutionProvider`] over the sources before it
///
/// Only [`ConfigurationBuilder::add_substitution`] creates one, after wrapping
/// the earlier sources so each is built once:
///
/// ```compile_fail
/// use subconf::{SubstitutionOptions, SubstitutionSource};
///
/// let source = SubstitutionSource::new(SubstitutionOptions::default());
/// ```
#[derive(Debug)]
pub struct SubstitutionSource {
    options: SubstitutionOptions,
}

impl SubstitutionSource {
    pub(crate) fn new(options: SubstitutionOptions) -> Self {
        Self { options }
    }
}

impl Source for SubstitutionSource {
    fn build(&self, builder: &ConfigurationBuilder) -> Result<Arc<dyn Provider>> {
        let position = builder.position_of(self).ok_or_else(|| {
            Error::precondition(
                "the substitution source must be registered in the builder it is built from",
            )
        })?;

        // Substitution layers never appear inside a private chain
        let sources: Vec<Arc<dyn Source>> = builder.sources()[..position]
            .iter()
            .filter(|source| source.tag() != SourceTag::Substitution)
            .cloned()
            .collect();
        log::debug!(
            "Building substitution chain over {} source(s): [{}]",
            sources.len(),
            sources
                .iter()
                .map(|s| s.describe())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let root = ConfigurationBuilder::from_sources(sources).build()?;
        Ok(Arc::new(SubstitutionProvider::new(
            Arc::new(root),
            self.options,
        )))
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Substitution
    }

    fn describe(&self) -> String {
        "substitution".into()
    }
}

/// Provider answering reads with substituted values from a private chain
pub struct SubstitutionProvider {
    root: Arc<ConfigurationRoot>,
    options: SubstitutionOptions,
    disposed: AtomicBool,
}

impl SubstitutionProvider {
    /// Create a provider over an already loaded private chain
    pub fn new(root: Arc<ConfigurationRoot>, options: SubstitutionOptions) -> Self {
        Self {
            root,
            options,
            disposed: AtomicBool::new(false),
        }
    }

    /// Resolve every key in the private chain, failing on the first error
    pub fn validate(&self) -> Result<()> {
        let entries = self.root.entries()?;
        log::debug!("Validating substitution of {} key(s)", entries.len());
        for (path, _) in &entries {
            self.try_get(path)?;
        }
        Ok(())
    }
}

impl Provider for SubstitutionProvider {
    fn try_get(&self, key: &str) -> Result<Option<String>> {
        let root = &self.root;
        substitution::resolve(&|k: &str| root.get(k), key)
    }

    fn set(&self, key: &str, value: Option<String>) -> Result<()> {
        self.root.set(key, value)
    }

    fn load(&self) -> Result<()> {
        if self.options.eager_validation {
            self.validate()?;
        }
        Ok(())
    }

    fn child_keys(
        &self,
        earlier_keys: Vec<String>,
        parent_path: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut keys = self.root.child_keys(parent_path)?;
        keys.extend(earlier_keys);
        key::sort_and_dedup(&mut keys);
        Ok(keys)
    }

    fn kind(&self) -> ProviderKind<'_> {
        ProviderKind::Composite(&self.root)
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.root.dispose();
        }
    }

    fn name(&self) -> &str {
        "substitution"
    }
}
