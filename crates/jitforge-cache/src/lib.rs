//! Content-addressed on-disk compile cache.
//!
//! Artifacts live under `{root}/{signature}/` and count as built only once
//! their completion marker exists. Builds for one signature are serialized
//! by an advisory lock visible to every process sharing the root; builds for
//! different signatures never wait on each other.

mod artifact;
mod cache;
mod lock;


pub use artifact::{
    binary_file_name, ArtifactHandle, ArtifactManifest, ArtifactState, StagingPaths, LOG_FILE,
    MARKER_FILE, SOURCE_FILE,
};
pub use cache::CompileCache;
