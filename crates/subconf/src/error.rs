//! Error types for subconf
//!
//! Errors are structured: a kind, the configuration key involved, and an
//! optional cause and help line. Substitution failures are raised to the
//! caller of the key read, never swallowed or defaulted.

use std::fmt;

/// Result type alias for subconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Separator used when displaying a reference chain
pub const CHAIN_SEPARATOR: &str = " > ";

/// Main error type for subconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Configuration key or file path the error relates to
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced key has no value (absent or explicitly null)
    UnresolvedReference {
        /// The referenced key
        key: String,
        /// The key whose value contains the reference
        requested_by: String,
    },
    /// A key reappeared in its own resolution chain
    CyclicReference {
        /// Keys from the root of the resolution up to the repeated key
        chain: Vec<String>,
    },
    /// A required precondition of an integration step is missing
    Precondition { requirement: String },
    /// Error parsing YAML/JSON content
    Parse,
    /// I/O error (file not found, unreadable, etc.)
    Io,
    /// Internal error (bug in subconf)
    Internal,
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create an unresolved reference error
    pub fn unresolved_reference(key: impl Into<String>, requested_by: impl Into<String>) -> Self {
        let key = key.into();
        let help = format!("Define '{}' or escape the reference as ${{{{{}}}}}", key, key);
        Self::from_kind(ErrorKind::UnresolvedReference {
            key,
            requested_by: requested_by.into(),
        })
        .with_help(help)
    }

    /// Create a cyclic reference error from the full chain, root to repeat
    pub fn cyclic_reference(chain: Vec<String>) -> Self {
        Self::from_kind(ErrorKind::CyclicReference { chain })
            .with_help("Break the loop by removing one of the references")
    }

    /// Create a precondition error naming what is missing
    pub fn precondition(requirement: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Precondition {
            requirement: requirement.into(),
        })
    }

    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        let mut err = Self::from_kind(ErrorKind::Parse);
        err.cause = Some(message.into());
        err
    }

    /// Create an I/O error for a file
    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::from_kind(ErrorKind::Io).with_path(path);
        err.cause = Some(message.into());
        err
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::io(path, "File not found")
            .with_help("Check the path, or register the file as optional")
    }

    /// Create an internal error (bug in subconf)
    pub fn internal(message: impl Into<String>) -> Self {
        let mut err = Self::from_kind(ErrorKind::Internal)
            .with_help("This is likely a bug in subconf. Please report it.");
        err.cause = Some(message.into());
        err
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// The reference chain of a cyclic reference, joined with `" > "`
    pub fn reference_chain(&self) -> Option<String> {
        match &self.kind {
            ErrorKind::CyclicReference { chain } => Some(chain.join(CHAIN_SEPARATOR)),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnresolvedReference { key, requested_by } => write!(
                f,
                "Configuration key '{}' does not have a value but is referenced in '{}'.",
                key, requested_by
            )?,
            ErrorKind::CyclicReference { .. } => write!(
                f,
                "Recursive loop detected while substituting configuration keys: '{}'.",
                self.reference_chain().unwrap_or_default()
            )?,
            ErrorKind::Precondition { requirement } => {
                write!(f, "Missing precondition: {}", requirement)?
            }
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
