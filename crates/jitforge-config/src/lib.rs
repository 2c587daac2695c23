//! Configuration system for jitforge.
//!
//! Load cache and toolchain settings from TOML or YAML files so the
//! compiler, search paths and build timeout can change without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use jitforge_config::JitConfig;
//! use std::time::Duration;
//!
//! let config = JitConfig::from_toml_str(r#"
//!     cache_dir = "/var/cache/jitforge"
//!
//!     [build]
//!     compiler = "clang"
//!     include_dirs = ["/opt/engine/include"]
//!     libs = ["m", "engine"]
//!     timeout_secs = 30
//! "#).unwrap();
//!
//! assert_eq!(config.build.compiler(), "clang");
//! assert_eq!(config.build.timeout(), Duration::from_secs(30));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use jitforge_config::JitConfig;
//!
//! let config = JitConfig::load("jitforge.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::time::Duration;

use jitforge_core::JitError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "JITFORGE_CACHE_DIR";

/// Environment variable overriding the compiler executable.
pub const COMPILER_ENV: &str = "JITFORGE_CC";

/// Default wall-clock budget for one compiler invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for JitError {
    fn from(e: ConfigError) -> Self {
        JitError::Config(e.to_string())
    }
}

/// Main jitforge configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct JitConfig {
    /// Root of the on-disk compile cache.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Toolchain configuration.
    #[serde(default)]
    pub build: BuildConfig,
}

impl JitConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the cache root.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Replaces the toolchain configuration.
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    /// Checks values serde cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "build.timeout_secs must be positive".to_string(),
            ));
        }
        if matches!(&self.build.compiler, Some(c) if c.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "build.compiler must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the cache root to use.
    ///
    /// Order: `cache_dir`, then `$JITFORGE_CACHE_DIR`, then the platform
    /// cache directory, then the system temp directory.
    pub fn cache_root(&self) -> PathBuf {
        resolve_cache_root(
            self.cache_dir.as_deref(),
            std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from),
        )
    }
}

fn resolve_cache_root(explicit: Option<&Path>, env: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = env.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("jitforge")
}

/// Toolchain configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BuildConfig {
    /// Compiler executable. Falls back to `$JITFORGE_CC`, then `cc`.
    #[serde(default)]
    pub compiler: Option<String>,

    /// Flags passed before the source file.
    #[serde(default = "default_flags")]
    pub flags: Vec<String>,

    /// Extra `-I` directories.
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,

    /// Extra `-L` directories, also added as rpath entries.
    #[serde(default)]
    pub lib_dirs: Vec<PathBuf>,

    /// Libraries to link (`-l<name>`).
    #[serde(default = "default_libs")]
    pub libs: Vec<String>,

    /// Wall-clock budget for one compiler run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// pkg-config package to discover include and library paths from.
    #[serde(default)]
    pub pkg_config: Option<String>,
}

fn default_flags() -> Vec<String> {
    ["-O2", "-fPIC", "-shared", "-std=c99"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_libs() -> Vec<String> {
    vec!["m".to_string()]
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compiler: None,
            flags: default_flags(),
            include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
            libs: default_libs(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            pkg_config: None,
        }
    }
}

impl BuildConfig {
    /// Returns the compiler executable to invoke.
    pub fn compiler(&self) -> String {
        self.compiler
            .clone()
            .or_else(|| std::env::var(COMPILER_ENV).ok().filter(|c| !c.is_empty()))
            .unwrap_or_else(|| "cc".to_string())
    }

    /// Returns the build timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the compiler executable.
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    /// Sets the build timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Adds an include directory.
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// Adds a library directory.
    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dirs.push(dir.into());
        self
    }

    /// Adds a library to link.
    pub fn with_lib(mut self, lib: impl Into<String>) -> Self {
        self.libs.push(lib.into());
        self
    }

    /// Sets the pkg-config package used for discovery.
    pub fn with_pkg_config(mut self, package: impl Into<String>) -> Self {
        self.pkg_config = Some(package.into());
        self
    }
}
