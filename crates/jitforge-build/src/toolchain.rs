//! Resolved compiler configuration.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use jitforge_config::BuildConfig;
use jitforge_core::{JitError, Result};
use tracing::debug;

/// Everything needed to turn one source file into a shared library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub compiler: String,
    pub flags: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    pub libs: Vec<String>,
    pub timeout: Duration,
}

impl Toolchain {
    /// Builds a toolchain from static configuration only.
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            compiler: config.compiler(),
            flags: config.flags.clone(),
            include_dirs: config.include_dirs.clone(),
            lib_dirs: config.lib_dirs.clone(),
            libs: config.libs.clone(),
            timeout: config.timeout(),
        }
    }

    /// Builds a toolchain, merging in pkg-config output when configured.
    ///
    /// # Errors
    ///
    /// Returns `JitError::ToolchainNotFound` if `pkg-config` is missing or
    /// does not know the configured package.
    pub fn discover(config: &BuildConfig) -> Result<Self> {
        let mut toolchain = Self::from_config(config);
        if let Some(package) = &config.pkg_config {
            let flags = pkg_config_flags(package)?;
            debug!(event = "pkg_config", package = %package, flags = %flags);
            toolchain.merge_pkg_config(&flags);
        }
        Ok(toolchain)
    }

    /// Merges `pkg-config --cflags --libs` output.
    ///
    /// `-I`, `-L` and `-l` tokens go to their lists (deduplicated); anything
    /// else is appended to `flags`.
    pub fn merge_pkg_config(&mut self, output: &str) {
        for token in output.split_whitespace() {
            if let Some(dir) = token.strip_prefix("-I") {
                push_unique(&mut self.include_dirs, PathBuf::from(dir));
            } else if let Some(dir) = token.strip_prefix("-L") {
                push_unique(&mut self.lib_dirs, PathBuf::from(dir));
            } else if let Some(lib) = token.strip_prefix("-l") {
                push_unique(&mut self.libs, lib.to_string());
            } else {
                push_unique(&mut self.flags, token.to_string());
            }
        }
    }

    /// Compiler arguments for building `source` into `output`.
    pub fn args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        for dir in &self.include_dirs {
            args.push(prefixed("-I", dir));
        }
        args.push(source.into());
        args.push("-o".into());
        args.push(output.into());
        for dir in &self.lib_dirs {
            args.push(prefixed("-L", dir));
            if cfg!(unix) {
                args.push(prefixed("-Wl,-rpath,", dir));
            }
        }
        for lib in &self.libs {
            args.push(format!("-l{lib}").into());
        }
        args
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::from_config(&BuildConfig::default())
    }
}

fn prefixed(prefix: &str, path: &Path) -> OsString {
    let mut s = OsString::from(prefix);
    s.push(path);
    s
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn pkg_config_flags(package: &str) -> Result<String> {
    let output = match Command::new("pkg-config")
        .args(["--cflags", "--libs", package])
        .output()
    {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(JitError::ToolchainNotFound(
                "pkg-config is not installed".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !output.status.success() {
        return Err(JitError::ToolchainNotFound(format!(
            "pkg-config could not find package {package}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
