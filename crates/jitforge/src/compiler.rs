//! The compile pipeline: render, cache, build, load, create.

use std::path::Path;

use jitforge_build::{BuildExecutor, Toolchain};
use jitforge_cache::CompileCache;
use jitforge_codegen::render;
use jitforge_config::JitConfig;
use jitforge_core::{Fragment, FragmentKind, JitError, PropertyTable, Result};
use jitforge_loader::{ArtifactLoader, NativeObject};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::compiled::{CompiledExpression, CompiledSubDomain};

/// Turns fragments into live native objects, building each distinct
/// signature at most once per cache root.
///
/// `JitCompiler` is `Sync`; share one across threads rather than creating
/// one per call, so loaded libraries are reused.
#[derive(Debug)]
pub struct JitCompiler {
    cache: CompileCache,
    executor: BuildExecutor,
    loader: ArtifactLoader,
}

impl JitCompiler {
    pub fn new(cache: CompileCache, toolchain: Toolchain) -> Self {
        #[cfg(feature = "console")]
        jitforge_console::init();

        Self {
            cache,
            executor: BuildExecutor::new(toolchain),
            loader: ArtifactLoader::new(),
        }
    }

    /// Creates a compiler from configuration, running toolchain discovery.
    ///
    /// # Errors
    ///
    /// Returns `JitError::ToolchainNotFound` if pkg-config discovery fails,
    /// or `JitError::Io` if the cache root cannot be created.
    pub fn from_config(config: &JitConfig) -> Result<Self> {
        let toolchain = Toolchain::discover(&config.build)?;
        let cache = CompileCache::new(config.cache_root())?;
        info!(
            event = "compiler_ready",
            cache_root = %cache.root().display(),
            compiler = %toolchain.compiler,
        );
        Ok(Self::new(cache, toolchain))
    }

    /// Loads a configuration file and creates a compiler from it.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = JitConfig::load(path)?;
        Self::from_config(&config)
    }

    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    pub fn toolchain(&self) -> &Toolchain {
        self.executor.toolchain()
    }

    pub fn loader(&self) -> &ArtifactLoader {
        &self.loader
    }

    /// Compiles `fragment` (or reuses its cached artifact) and returns a
    /// fresh instance with every property set to its default.
    ///
    /// # Errors
    ///
    /// - `InvalidFragment` if the fragment fails validation; nothing is built.
    /// - `BuildFailed` wrapping `ToolchainNotFound`, `Compile` or `Timeout`,
    ///   with the build log attached. Nothing is cached.
    /// - `SymbolNotFound` / `Load` if the artifact does not match the template.
    pub fn compile(&self, fragment: &Fragment) -> Result<NativeObject> {
        let unit = render(fragment)?;
        debug!(event = "rendered", signature = %unit.signature, kind = unit.kind.tag());

        let handle = self.cache.get_or_build(&unit.signature, &unit.text, |staging| {
            self.executor
                .build(&staging.source, &staging.binary, &staging.log)
                .map(drop)
        })?;

        let factory = self
            .loader
            .load(&handle.binary_path(), &unit.factory_symbol)?;
        let mut object = factory.create()?;

        if object.kind() != unit.kind
            || object.value_size() != unit.value_size
            || object.input_dim() != unit.input_dim
        {
            return Err(JitError::Load {
                path: handle.binary_path(),
                reason: format!(
                    "artifact declares {:?} with {} outputs over {} inputs, expected {:?} with {} over {}",
                    object.kind(),
                    object.value_size(),
                    object.input_dim(),
                    unit.kind,
                    unit.value_size,
                    unit.input_dim
                ),
            });
        }

        object.set_all(fragment.properties().iter().map(|(k, v)| (k.as_str(), *v)))?;
        Ok(object)
    }

    /// Compiles a boundary predicate with no properties.
    pub fn compile_subdomain(&self, code: impl Into<String>) -> Result<CompiledSubDomain> {
        self.compile_subdomain_fragment(&Fragment::predicate(code))
    }

    /// Compiles a predicate fragment, which may carry properties.
    pub fn compile_subdomain_fragment(&self, fragment: &Fragment) -> Result<CompiledSubDomain> {
        expect_kind(fragment, FragmentKind::Predicate)?;
        Ok(CompiledSubDomain::new(self.compile(fragment)?))
    }

    /// Compiles an expression with one snippet per output component.
    pub fn compile_expression<I, S, P, K>(
        &self,
        snippets: I,
        properties: P,
    ) -> Result<CompiledExpression>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let fragment = Fragment::expression(snippets, properties);
        Ok(CompiledExpression::new(self.compile(&fragment)?))
    }

    /// Compiles `fragments` in parallel, returning results in input order.
    ///
    /// Distinct signatures build concurrently; duplicates serialize on the
    /// signature lock and all but the first hit the cache.
    pub fn compile_many(&self, fragments: &[Fragment]) -> Vec<Result<NativeObject>> {
        fragments.par_iter().map(|f| self.compile(f)).collect()
    }
}

fn expect_kind(fragment: &Fragment, kind: FragmentKind) -> Result<()> {
    if fragment.kind() == kind {
        Ok(())
    } else {
        Err(JitError::InvalidFragment(format!(
            "expected a {} fragment, got {}",
            kind.tag(),
            fragment.kind().tag()
        )))
    }
}
