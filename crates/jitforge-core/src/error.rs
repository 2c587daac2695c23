//! Error types for jitforge

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for jitforge operations.
///
/// Variants fall into three groups:
/// - malformed input (`InvalidFragment`, `UnknownProperty`, and the call
///   errors `WrongKind` / `Dimension`), never retried;
/// - build-time failures (`ToolchainNotFound`, `Compile`, `Timeout`, wrapped
///   by the cache in `BuildFailed`), which leave the cache clean for a retry;
/// - post-build integrity failures (`SymbolNotFound`, `Load`), which point at
///   a broken template or build pipeline.
#[derive(Debug, Error)]
pub enum JitError {
    /// Fragment rejected before any code was rendered
    #[error("Invalid fragment: {0}")]
    InvalidFragment(String),

    /// Compiler or build configuration could not be discovered
    #[error("Toolchain not found: {0}")]
    ToolchainNotFound(String),

    /// Compiler exited unsuccessfully
    #[error("Compilation failed ({status})\n{log}")]
    Compile { status: String, log: String },

    /// Compiler exceeded its wall-clock budget and was killed
    #[error("Compilation timed out after {limit:?}\n{log}")]
    Timeout { limit: Duration, log: String },

    /// A cache miss could not be built; the cache holds no marker for it
    #[error("Build of {signature} failed: {source}")]
    BuildFailed {
        signature: String,
        log: String,
        #[source]
        source: Box<JitError>,
    },

    /// Factory symbol missing from a built artifact
    #[error("Symbol {symbol} not found in {}", path.display())]
    SymbolNotFound { symbol: String, path: PathBuf },

    /// Artifact could not be mapped or is incompatible
    #[error("Failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// Entry point called on an object of the other kind
    #[error("{operation}() called on a {found} object")]
    WrongKind {
        operation: &'static str,
        found: &'static str,
    },

    /// Input or output slice shorter than the object reads or writes
    #[error("{what} needs {needed} values, got {got}")]
    Dimension {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    /// Property accessor used with a name the object does not declare
    #[error(transparent)]
    UnknownProperty(#[from] UnknownProperty),

    /// Error in jitforge configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JitError {
    /// Returns the captured build log, if this error carries one.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            JitError::Compile { log, .. }
            | JitError::Timeout { log, .. }
            | JitError::BuildFailed { log, .. } => Some(log),
            _ => None,
        }
    }

    /// Returns true for failures that a later call may recover from.
    ///
    /// Build failures are never cached, so retrying rebuilds from scratch.
    /// Load failures would reproduce against the same published artifact.
    pub fn is_retryable(&self) -> bool {
        match self {
            JitError::BuildFailed { source, .. } => source.is_retryable(),
            JitError::ToolchainNotFound(_)
            | JitError::Compile { .. }
            | JitError::Timeout { .. }
            | JitError::Io(_) => true,
            _ => false,
        }
    }
}

/// Property name not declared by the object it was looked up on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown property: {0}")]
pub struct UnknownProperty(pub String);

/// Result type alias for jitforge operations
pub type Result<T> = std::result::Result<T, JitError>;
