//! Content-addressed compile cache.
//!
//! # Layout
//!
//! ```text
//! {root}/{signature}/source.c        rendered source
//! {root}/{signature}/build.log       combined compiler output
//! {root}/{signature}/binary.<dll>    shared library
//! {root}/{signature}/complete.toml   completion marker, written last
//! {root}/{signature}.lock            advisory lock file
//! {root}/.staging/{signature}-{pid}-{nonce}/   in-progress builds
//! ```
//!
//! # Publication Order
//!
//! binary fsync → staging dir renamed to `{signature}` → marker written to a
//! temp name, fsynced, renamed into place. A reader that sees the marker
//! therefore sees the full binary; a crash anywhere before the final rename
//! leaves no marker and the next caller rebuilds.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use jitforge_core::{JitError, Result, Signature, TEMPLATE_VERSION};
use tracing::{debug, info, warn};

use crate::artifact::{
    binary_file_name, ArtifactHandle, ArtifactManifest, ArtifactState, StagingPaths, MARKER_FILE,
};
use crate::lock::SignatureLock;

const STAGING_DIR: &str = ".staging";

/// On-disk store of compiled artifacts keyed by signature.
///
/// Holds no in-memory state beyond its root, so any number of instances
/// (in any number of processes) may share one root.
#[derive(Debug, Clone)]
pub struct CompileCache {
    root: PathBuf,
}

impl CompileCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(STAGING_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of `signature`'s artifact.
    pub fn artifact_dir(&self, signature: &Signature) -> PathBuf {
        self.root.join(signature.as_str())
    }

    fn lock_path(&self, signature: &Signature) -> PathBuf {
        self.root.join(format!("{signature}.lock"))
    }

    /// Returns the artifact if a complete build exists. Never blocks.
    pub fn lookup(&self, signature: &Signature) -> Option<ArtifactHandle> {
        let dir = self.artifact_dir(signature);
        dir.join(MARKER_FILE)
            .is_file()
            .then(|| ArtifactHandle::new(signature.clone(), dir))
    }

    /// Reports where `signature` is in its lifecycle.
    ///
    /// `Building` means another caller currently holds the signature lock.
    pub fn state(&self, signature: &Signature) -> Result<ArtifactState> {
        if self.lookup(signature).is_some() {
            return Ok(ArtifactState::Complete);
        }
        match SignatureLock::try_acquire(&self.lock_path(signature))? {
            Some(_lock) => Ok(self
                .lookup(signature)
                .map_or(ArtifactState::Unbuilt, |_| ArtifactState::Complete)),
            None => Ok(ArtifactState::Building),
        }
    }

    /// Returns the artifact for `signature`, building it on a miss.
    ///
    /// On a miss, `source_text` is written to a staging directory and
    /// `build_fn` is called with the staging paths; it must leave a shared
    /// library at `paths.binary`. At most one build per signature runs at a
    /// time across all processes sharing the root; other callers block on the
    /// lock and then find the published artifact.
    ///
    /// # Errors
    ///
    /// Returns `JitError::BuildFailed` (with the staged build log) if
    /// `build_fn` fails or produces no binary. Nothing is cached in that case.
    pub fn get_or_build<F>(
        &self,
        signature: &Signature,
        source_text: &str,
        build_fn: F,
    ) -> Result<ArtifactHandle>
    where
        F: FnOnce(&StagingPaths) -> Result<()>,
    {
        if let Some(handle) = self.lookup(signature) {
            debug!(event = "cache_hit", signature = %signature);
            return Ok(handle);
        }

        let lock_path = self.lock_path(signature);
        let _lock = match SignatureLock::try_acquire(&lock_path)? {
            Some(lock) => lock,
            None => {
                info!(event = "lock_wait", signature = %signature);
                SignatureLock::acquire(&lock_path)?
            }
        };

        // Another holder may have published while we waited.
        if let Some(handle) = self.lookup(signature) {
            info!(event = "cache_hit", signature = %signature, after_wait = true);
            return Ok(handle);
        }

        info!(event = "cache_miss", signature = %signature);
        let staging = self.stage(signature, source_text)?;

        let outcome = build_fn(&staging).and_then(|()| {
            if staging.binary.is_file() {
                Ok(())
            } else {
                Err(JitError::Compile {
                    status: "build reported success".to_string(),
                    log: format!("no binary at {}", staging.binary.display()),
                })
            }
        });

        if let Err(source) = outcome {
            let log = fs::read(&staging.log)
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .ok()
                .or_else(|| source.build_log().map(str::to_string))
                .unwrap_or_default();
            warn!(event = "build_failed", signature = %signature, error = %source);
            let _ = fs::remove_dir_all(&staging.dir);
            return Err(JitError::BuildFailed {
                signature: signature.to_string(),
                log,
                source: Box::new(source),
            });
        }

        let handle = self.publish(signature, &staging)?;
        info!(event = "artifact_published", signature = %signature);
        Ok(handle)
    }

    fn stage(&self, signature: &Signature, source_text: &str) -> Result<StagingPaths> {
        let dir = self.root.join(STAGING_DIR).join(format!(
            "{signature}-{}-{:016x}",
            std::process::id(),
            rand::random::<u64>()
        ));
        fs::create_dir_all(&dir)?;
        let staging = StagingPaths::new(dir);
        fs::write(&staging.source, source_text)?;
        Ok(staging)
    }

    // Caller holds the signature lock.
    fn publish(&self, signature: &Signature, staging: &StagingPaths) -> Result<ArtifactHandle> {
        let final_dir = self.artifact_dir(signature);

        // Only a crashed earlier build leaves this behind; it has no marker.
        if final_dir.exists() {
            warn!(event = "stale_artifact_removed", signature = %signature);
            fs::remove_dir_all(&final_dir)?;
        }

        File::open(&staging.binary)?.sync_all()?;
        fs::rename(&staging.dir, &final_dir)?;

        let manifest = ArtifactManifest {
            signature: signature.to_string(),
            binary: binary_file_name(),
            template_version: TEMPLATE_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let text = toml::to_string(&manifest).map_err(|e| JitError::Io(std::io::Error::other(e)))?;

        let tmp = final_dir.join(format!("{MARKER_FILE}.tmp"));
        let mut file = File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, final_dir.join(MARKER_FILE))?;
        sync_dir(&final_dir);

        Ok(ArtifactHandle::new(signature.clone(), final_dir))
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
