//! Dynamic resolution of the foreign runtime
//!
//! Loads the runtime's shared library with `libloading`, resolves the
//! capsule symbol, and installs the validated entry-point table. Handles
//! platform-specific library naming conventions and search paths; the
//! search list comes from configuration first, platform defaults second.

use crate::abi::capsule::{CapsuleFn, RawCapsule, CAPSULE_ABI_VERSION};
use crate::error::InitError;
use crate::table::{self, EntryPointTable};
use libloading::{Library, Symbol};
use std::path::{Path, PathBuf};
use tether_config::{Config, RuntimeConfig};

/// Library loading errors
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Library file not found in search paths
    LibraryNotFound(String),
    /// Symbol not found in library
    SymbolNotFound { library: String, symbol: String },
    /// Failed to load library
    LoadFailed(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::LibraryNotFound(name) => write!(f, "Library not found: {}", name),
            LoadError::SymbolNotFound { library, symbol } => {
                write!(f, "Symbol '{}' not found in library '{}'", symbol, library)
            }
            LoadError::LoadFailed(msg) => write!(f, "Failed to load library: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Resolves and loads the foreign runtime library.
///
/// # Safety
///
/// Loading the runtime executes its initialization code in-process; the
/// library must be trusted.
pub struct RuntimeLoader {
    /// Search paths, in priority order
    search_paths: Vec<PathBuf>,
}

impl RuntimeLoader {
    /// Create a loader with the platform's default search paths.
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Create a loader from runtime configuration.
    ///
    /// Configured search paths are tried before the platform defaults.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let mut search_paths = config.search_paths.clone();
        search_paths.extend(Self::default_search_paths());
        Self { search_paths }
    }

    /// Platform-specific default search paths.
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        #[cfg(target_os = "windows")]
        {
            paths.push(PathBuf::from("C:\\Windows\\System32"));
        }

        // Current working directory has highest priority
        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// Resolve a library name to a full path.
    ///
    /// Accepts an absolute path as-is; otherwise tries platform naming
    /// conventions (lib prefix, .so/.dylib/.dll) across the search paths.
    fn resolve_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() && path.exists() {
            return Some(path.to_path_buf());
        }

        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };

        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        for search_path in &self.search_paths {
            for prefix in prefixes {
                for ext in extensions {
                    let candidate = search_path.join(format!("{}{}.{}", prefix, name, ext));
                    if candidate.exists() {
                        return Some(candidate);
                    }
                }
            }
        }

        None
    }

    /// Load the runtime library and resolve its capsule.
    ///
    /// The library is intentionally kept loaded for the life of the process:
    /// every entry point the capsule carries lives in its text segment.
    pub fn load_capsule(
        &self,
        library: &str,
        symbol: &str,
    ) -> Result<*const RawCapsule, LoadError> {
        let path = self
            .resolve_library_path(library)
            .ok_or_else(|| LoadError::LibraryNotFound(library.to_string()))?;

        let lib =
            unsafe { Library::new(&path).map_err(|e| LoadError::LoadFailed(e.to_string()))? };

        let capsule_fn: CapsuleFn = {
            let resolved: Symbol<'_, CapsuleFn> = unsafe {
                lib.get(symbol.as_bytes())
                    .map_err(|_| LoadError::SymbolNotFound {
                        library: library.to_string(),
                        symbol: symbol.to_string(),
                    })?
            };
            *resolved
        };

        // The runtime must stay mapped for the process lifetime.
        std::mem::forget(lib);

        Ok(unsafe { capsule_fn() })
    }

    /// Bind the configured foreign runtime and install the process-wide
    /// entry-point table.
    pub fn bootstrap(config: &Config) -> Result<&'static EntryPointTable, InitError> {
        let runtime = config.project.runtime.clone().unwrap_or_default();

        if let Some(pinned) = runtime.abi_version {
            if pinned != CAPSULE_ABI_VERSION {
                return Err(InitError::VersionMismatch {
                    expected: CAPSULE_ABI_VERSION,
                    found: pinned,
                });
            }
        }

        let library = runtime.library.clone().ok_or_else(|| {
            InitError::Load(LoadError::LibraryNotFound(
                "no [runtime].library configured".to_string(),
            ))
        })?;

        let loader = Self::from_config(&runtime);
        let capsule =
            loader.load_capsule(&library.to_string_lossy(), runtime.capsule_symbol())?;
        table::initialize(capsule)
    }
}

impl Default for RuntimeLoader {
    fn default() -> Self {
        Self::new()
    }
}
