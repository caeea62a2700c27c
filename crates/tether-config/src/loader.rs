//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::project::{ProjectConfig, RuntimeConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.tether/config.toml) - lowest priority
/// 2. Project config (./tether.toml) - overrides global
/// 3. Environment variables (TETHER_*) - highest priority
pub struct ConfigLoader {
    /// Override for the global config path (used by tests)
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Merged project configuration
    pub project: ProjectConfig,

    /// Project root directory (where tether.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.tether/config.toml
    pub fn with_global_config(mut self, path: PathBuf) -> Self {
        self.global_config_path = Some(path);
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find tether.toml; a missing project
    /// file is not an error (environment variables alone may configure the
    /// binding).
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        let global_config = self.load_global_config().unwrap_or_default();
        let merged = project_config.merged_over(global_config);
        let merged = self.apply_env_overrides(merged)?;
        merged.validate()?;

        Ok(Config {
            project: merged,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;

        let global_config = self.load_global_config().unwrap_or_default();
        let merged = project_config.merged_over(global_config);
        let merged = self.apply_env_overrides(merged)?;
        merged.validate()?;

        Ok(Config {
            project: merged,
            project_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find project configuration by walking up the directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join("tether.toml");
            if config_path.exists() {
                let config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), config));
            }

            if !current.pop() {
                return Ok((None, ProjectConfig::default()));
            }
        }
    }

    /// Load the global config file if it exists
    fn load_global_config(&self) -> Option<ProjectConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => dirs::home_dir()?.join(".tether").join("config.toml"),
        };

        if path.exists() {
            ProjectConfig::load_from_file(&path).ok()
        } else {
            None
        }
    }

    /// Apply TETHER_* environment variable overrides
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        let mut runtime = config.runtime.take().unwrap_or_default();

        if let Ok(library) = env::var("TETHER_RUNTIME_LIB") {
            runtime.library = Some(PathBuf::from(library));
        }

        if let Ok(symbol) = env::var("TETHER_CAPSULE_SYMBOL") {
            runtime.capsule_symbol = Some(symbol);
        }

        if let Ok(version) = env::var("TETHER_ABI_VERSION") {
            let parsed = version
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue {
                    field: "TETHER_ABI_VERSION".to_string(),
                    reason: format!("'{}' is not a valid ABI version", version),
                })?;
            runtime.abi_version = Some(parsed);
        }

        if let Ok(paths) = env::var("TETHER_SEARCH_PATHS") {
            let mut env_paths: Vec<PathBuf> = env::split_paths(&paths).collect();
            env_paths.extend(runtime.search_paths);
            runtime.search_paths = env_paths;
        }

        if runtime != RuntimeConfig::default() {
            config.runtime = Some(runtime);
        }
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
