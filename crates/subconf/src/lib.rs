//! subconf: Template substitution for layered configuration
//!
//! This crate provides a layered configuration chain (last registered source
//! wins) and a substitution layer that resolves `${key}` references in values
//! against everything registered before it. `${{key}}` escapes a reference.
//!
//! # Example
//!
//! ```rust
//! use subconf::{ConfigurationBuilder, MemorySource, SubstitutionOptions};
//!
//! let root = ConfigurationBuilder::new()
//!     .add(
//!         MemorySource::new("defaults")
//!             .with("Database:Host", "localhost")
//!             .with("Database:Url", "postgres://${Database:Host}/app")
//!             .with("Literal", "${{Database:Host}}"),
//!     )
//!     .add_substitution(SubstitutionOptions::default())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     root.get("database:url").unwrap().as_deref(),
//!     Some("postgres://localhost/app")
//! );
//! assert_eq!(root.get("Literal").unwrap().as_deref(), Some("${Database:Host}"));
//! ```

pub mod cache;
pub mod chain;
pub mod composite;
pub mod error;
pub mod file;
pub mod flatten;
pub mod key;
pub mod provider;
pub mod substitution;
pub mod value;

pub use cache::CachedSource;
pub use chain::{ConfigurationBuilder, ConfigurationRoot};
pub use composite::{SubstitutionOptions, SubstitutionProvider, SubstitutionSource};
pub use error::{Error, ErrorKind, Result};
pub use file::{FileFormat, FileProvider, FileSource};
pub use flatten::{flatten_providers, wrap_registered, FlattenedRoot};
pub use provider::{
    KeyValueStore, MemoryProvider, MemorySource, Provider, ProviderKind, Source, SourceTag,
};
pub use value::{FlatData, Value};
