//! Project Configuration (tether.toml)
//!
//! Handles project-level configuration stored in `tether.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Capsule symbol resolved from the foreign runtime when none is configured.
pub const DEFAULT_CAPSULE_SYMBOL: &str = "tether_capsule_v1";

/// Project configuration from tether.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Foreign runtime binding configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeConfig>,
}

/// Foreign runtime configuration
///
/// Describes where the foreign runtime's shared library lives and which
/// capsule the binding layer should resolve from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Runtime library: a short name ("tetherhost") or a full path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,

    /// Extra library search paths, tried before the platform defaults
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,

    /// Capsule symbol to resolve (default: tether_capsule_v1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capsule_symbol: Option<String>,

    /// Pinned capsule ABI version; initialization fails on mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi_version: Option<u32>,
}

impl RuntimeConfig {
    /// Capsule symbol name, falling back to the default
    pub fn capsule_symbol(&self) -> &str {
        self.capsule_symbol
            .as_deref()
            .unwrap_or(DEFAULT_CAPSULE_SYMBOL)
    }
}

impl ProjectConfig {
    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ProjectConfig =
            toml::from_str(&contents).map_err(|error| ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(runtime) = &self.runtime {
            if runtime.abi_version == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "runtime.abi-version".to_string(),
                    reason: "ABI versions start at 1".to_string(),
                });
            }
            if let Some(symbol) = &runtime.capsule_symbol {
                if symbol.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "runtime.capsule-symbol".to_string(),
                        reason: "symbol name must not be empty".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Merge another configuration underneath this one
    ///
    /// Fields set in `self` win; `base` fills the gaps. Search paths from
    /// `self` are tried before those from `base`.
    pub fn merged_over(self, base: ProjectConfig) -> ProjectConfig {
        let runtime = match (self.runtime, base.runtime) {
            (Some(top), Some(bottom)) => {
                let mut search_paths = top.search_paths;
                search_paths.extend(bottom.search_paths);
                Some(RuntimeConfig {
                    library: top.library.or(bottom.library),
                    search_paths,
                    capsule_symbol: top.capsule_symbol.or(bottom.capsule_symbol),
                    abi_version: top.abi_version.or(bottom.abi_version),
                })
            }
            (top, bottom) => top.or(bottom),
        };
        ProjectConfig { runtime }
    }
}
