//! Configuration
//!
//! Provides [`StrataConfig`], loadable from TOML:
//!
//! ```toml
//! [path]
//! alphabet = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ"
//! steplen = 4
//! max_probes = 1000
//!
//! [logging]
//! filter = "info,strata_migrate=debug"
//! json = false
//! ```

use crate::error::MigrateError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strata_path::{PathAllocator, PathScheme, DEFAULT_ALPHABET, DEFAULT_STEPLEN};

/// Tree path configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Ordered step alphabet
    pub alphabet: String,
    /// Characters per step
    pub steplen: usize,
    /// Bound on allocation probes per call (unbounded when absent)
    pub max_probes: Option<u64>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
            steplen: DEFAULT_STEPLEN,
            max_probes: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives, overridden by the `STRATA_LOG` environment variable
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Strata configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Tree path scheme
    pub path: PathConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl StrataConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With step alphabet
    #[inline]
    #[must_use]
    pub fn with_alphabet(mut self, alphabet: impl Into<String>) -> Self {
        self.path.alphabet = alphabet.into();
        self
    }

    /// With step length
    #[inline]
    #[must_use]
    pub fn with_steplen(mut self, steplen: usize) -> Self {
        self.path.steplen = steplen;
        self
    }

    /// With probe bound
    #[inline]
    #[must_use]
    pub fn with_max_probes(mut self, max_probes: Option<u64>) -> Self {
        self.path.max_probes = max_probes;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.logging.filter = filter.into();
        self
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// Returns [`MigrateError::Config`] on invalid TOML or wrong types
    pub fn from_toml_str(text: &str) -> Result<Self, MigrateError> {
        toml::from_str(text).map_err(|e| MigrateError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`MigrateError::Config`] if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MigrateError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Build the configured path scheme
    ///
    /// # Errors
    /// Returns [`MigrateError::Config`] if the alphabet or step length is
    /// invalid
    pub fn path_scheme(&self) -> Result<PathScheme, MigrateError> {
        PathScheme::new(&self.path.alphabet, self.path.steplen)
            .map_err(|e| MigrateError::Config(e.to_string()))
    }

    /// Build the configured allocator
    ///
    /// # Errors
    /// Returns [`MigrateError::Config`] if the path scheme is invalid
    pub fn allocator(&self) -> Result<PathAllocator, MigrateError> {
        Ok(PathAllocator::new(self.path_scheme()?).with_max_probes(self.path.max_probes))
    }
}
