//! Published artifacts and their on-disk layout.

use std::fs;
use std::path::{Path, PathBuf};

use jitforge_core::{JitError, Result, Signature};
use serde::{Deserialize, Serialize};

/// Rendered source inside an artifact directory.
pub const SOURCE_FILE: &str = "source.c";

/// Combined compiler output inside an artifact directory.
pub const LOG_FILE: &str = "build.log";

/// Completion marker; its presence is the only thing that makes an artifact
/// directory count as built.
pub const MARKER_FILE: &str = "complete.toml";

/// File name of the shared library inside an artifact directory.
pub fn binary_file_name() -> String {
    format!("binary.{}", std::env::consts::DLL_EXTENSION)
}

/// Lifecycle of a signature as seen by one observer.
///
/// `Failed` is never persisted: a failed build leaves the signature `Unbuilt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Unbuilt,
    Building,
    Complete,
}

/// Contents of the completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ArtifactManifest {
    pub signature: String,
    pub binary: String,
    pub template_version: u32,
    /// RFC 3339 publication time.
    pub created_at: String,
}

/// A complete artifact in the cache. Read-only once published.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactHandle {
    signature: Signature,
    dir: PathBuf,
}

impl ArtifactHandle {
    pub(crate) fn new(signature: Signature, dir: PathBuf) -> Self {
        Self { signature, dir }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn binary_path(&self) -> PathBuf {
        self.dir.join(binary_file_name())
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(SOURCE_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(MARKER_FILE)
    }

    /// Reads the completion marker.
    pub fn manifest(&self) -> Result<ArtifactManifest> {
        let text = fs::read_to_string(self.marker_path())?;
        toml::from_str(&text).map_err(|e| JitError::Load {
            path: self.marker_path(),
            reason: format!("corrupt completion marker: {e}"),
        })
    }
}

/// Paths a build function writes into while the artifact is staged.
#[derive(Debug, Clone)]
pub struct StagingPaths {
    pub dir: PathBuf,
    pub source: PathBuf,
    pub binary: PathBuf,
    pub log: PathBuf,
}

impl StagingPaths {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self {
            source: dir.join(SOURCE_FILE),
            binary: dir.join(binary_file_name()),
            log: dir.join(LOG_FILE),
            dir,
        }
    }
}
