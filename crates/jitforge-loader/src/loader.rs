//! Opens artifact binaries and resolves their factories.
//!
//! Libraries are opened once per canonical path and stay mapped while any
//! factory handle or object created from them is alive. A library is never
//! closed while code from it might still run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use jitforge_core::abi::FactoryFn;
use jitforge_core::{JitError, Result};
use libloading::{Library, Symbol};
use tracing::{debug, info};

use crate::object::NativeObject;

/// Loads compiled artifacts into the process.
#[derive(Debug, Default)]
pub struct ArtifactLoader {
    libraries: Mutex<HashMap<PathBuf, Arc<Library>>>,
}

impl ArtifactLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `binary` (or reuses an open handle) and resolves `symbol`.
    pub fn load(&self, binary: &Path, symbol: &str) -> Result<FactoryHandle> {
        let path = binary.canonicalize().map_err(|e| JitError::Load {
            path: binary.to_path_buf(),
            reason: e.to_string(),
        })?;
        let library = self.open(&path)?;

        // SAFETY: generated factories have the `FactoryFn` signature; the
        // symbol name carries the signature so a mismatch cannot resolve.
        let factory = unsafe {
            let sym: Symbol<FactoryFn> =
                library
                    .get(symbol.as_bytes())
                    .map_err(|_| JitError::SymbolNotFound {
                        symbol: symbol.to_string(),
                        path: path.clone(),
                    })?;
            *sym
        };

        debug!(event = "factory_resolved", symbol, path = %path.display());
        Ok(FactoryHandle {
            library,
            factory,
            symbol: symbol.to_string(),
            path,
        })
    }

    fn open(&self, path: &Path) -> Result<Arc<Library>> {
        let mut libraries = self.libraries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(library) = libraries.get(path) {
            return Ok(Arc::clone(library));
        }

        // SAFETY: artifacts are plain C99 units with no initializers beyond
        // what the template emits.
        let library = unsafe { Library::new(path) }.map_err(|e| JitError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let library = Arc::new(library);
        libraries.insert(path.to_path_buf(), Arc::clone(&library));

        info!(event = "artifact_loaded", path = %path.display());
        Ok(library)
    }

    /// Number of distinct libraries opened so far.
    pub fn loaded_count(&self) -> usize {
        self.libraries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A resolved factory. Each [`create`](Self::create) yields a fresh instance.
#[derive(Clone)]
pub struct FactoryHandle {
    library: Arc<Library>,
    factory: FactoryFn,
    symbol: String,
    path: PathBuf,
}

// SAFETY: the factory is a plain C function pointer; the library is kept
// alive by the Arc.
unsafe impl Send for FactoryHandle {}
unsafe impl Sync for FactoryHandle {}

impl FactoryHandle {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Invokes the factory.
    pub fn create(&self) -> Result<NativeObject> {
        // SAFETY: factory comes from `library`, which we keep alive.
        let raw = unsafe { (self.factory)() };
        let object = unsafe { NativeObject::from_raw(raw, Arc::clone(&self.library), &self.path) }?;
        debug!(
            event = "object_created",
            symbol = %self.symbol,
            kind = object.kind().tag()
        );
        Ok(object)
    }
}

impl std::fmt::Debug for FactoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryHandle")
            .field("symbol", &self.symbol)
            .field("path", &self.path)
            .finish()
    }
}
