//! YAML and JSON file sources
//!
//! File contents are flattened into `:`-joined keys on every load.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chain::ConfigurationBuilder;
use crate::error::{Error, Result};
use crate::provider::{KeyValueStore, Provider, Source};
use crate::value::Value;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Guess the format from a file extension; anything but `.json` is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    fn parse(self, content: &str) -> Result<Value> {
        match self {
            FileFormat::Yaml => {
                let document: serde_yaml::Value =
                    serde_yaml::from_str(content).map_err(|e| Error::parse(e.to_string()))?;
                Value::from_yaml(document)
            }
            FileFormat::Json => {
                let document: serde_json::Value =
                    serde_json::from_str(content).map_err(|e| Error::parse(e.to_string()))?;
                Ok(Value::from(document))
            }
        }
    }
}

/// Source for a configuration file, either required or optional
///
/// # Example
///
/// ```rust,no_run
/// use subconf::{ConfigurationBuilder, FileSource, SubstitutionOptions};
///
/// let root = ConfigurationBuilder::new()
///     .add(FileSource::yaml("base.yaml"))
///     .add(FileSource::json("local.json").optional())
///     .add_substitution(SubstitutionOptions::default())
///     .build()?;
/// # Ok::<(), subconf::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: FileFormat,
    optional: bool,
}

impl FileSource {
    /// A required YAML file
    pub fn yaml(path: impl Into<PathBuf>) -> Self {
        Self::with_format(path, FileFormat::Yaml)
    }

    /// A required JSON file
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self::with_format(path, FileFormat::Json)
    }

    /// A required file, format chosen by extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self::with_format(path, format)
    }

    fn with_format(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            optional: false,
        }
    }

    /// Don't fail when the file is missing
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl Source for FileSource {
    fn build(&self, _builder: &ConfigurationBuilder) -> Result<Arc<dyn Provider>> {
        Ok(Arc::new(FileProvider::new(self.clone())))
    }

    fn describe(&self) -> String {
        format!("file({})", self.path.display())
    }
}

/// Provider holding the flattened contents of one file
pub struct FileProvider {
    source: FileSource,
    name: String,
    store: KeyValueStore,
}

impl FileProvider {
    /// Create an empty provider; the file is read on [`Provider::load`]
    pub fn new(source: FileSource) -> Self {
        let name = source.path.display().to_string();
        Self {
            source,
            name,
            store: KeyValueStore::new(),
        }
    }

    fn read(&self) -> Result<Option<String>> {
        let path = &self.source.path;
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                if self.source.optional {
                    log::debug!("Optional file not found, skipping: {}", path.display());
                    Ok(None)
                } else {
                    Err(Error::file_not_found(path.display().to_string()))
                }
            }
            Err(e) => Err(Error::io(path.display().to_string(), e.to_string())),
        }
    }
}

impl Provider for FileProvider {
    fn try_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.get(key))
    }

    fn set(&self, key: &str, value: Option<String>) -> Result<()> {
        self.store.set(key, value);
        Ok(())
    }

    fn load(&self) -> Result<()> {
        let Some(content) = self.read()? else {
            self.store.replace(Default::default());
            return Ok(());
        };

        let data = self
            .source
            .format
            .parse(&content)
            .and_then(|value| value.flatten())
            .map_err(|e| e.with_path(self.name.clone()))?;
        log::debug!("Loaded {} key(s) from {}", data.len(), self.name);
        self.store.replace(data);
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
