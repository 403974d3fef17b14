//! Index configuration.
//!
//! Read from `pyflow.toml` at the project root when present, otherwise the
//! built-in defaults apply. Every key is optional:
//!
//! ```toml
//! ignored_dirs = ["venv", ".venv", "tmp", "__pycache__", ".git"]
//! extensions = ["py"]
//! exclude = ["tests/**", "**/migrations/*.py"]
//! respect_gitignore = false
//! strict = false
//! ```

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "pyflow.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid exclude pattern `{pattern}`: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// How the project tree is walked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory names skipped wherever they appear.
    pub ignored_dirs: Vec<String>,
    /// File extensions, without the dot, that are indexed.
    pub extensions: Vec<String>,
    /// Globs matched against project-relative paths.
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
    /// Abort on the first file that cannot be extracted.
    pub strict: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: ["venv", ".venv", "tmp", "__pycache__", ".git"]
                .into_iter()
                .map(String::from)
                .collect(),
            extensions: vec!["py".to_string()],
            exclude: Vec::new(),
            respect_gitignore: false,
            strict: false,
        }
    }
}

impl IndexConfig {
    /// `pyflow.toml` under `root` if it exists, defaults otherwise.
    pub fn for_project(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            tracing::debug!("Loading index config from {}", path.display());
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            origin: "<string>".to_string(),
            source,
        })
    }

    pub fn exclude_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::Glob {
            pattern: self.exclude.join(", "),
            source,
        })
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|dir| dir == name)
    }

    pub fn has_indexed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}
