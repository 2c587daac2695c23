//! jitforge - Cached JIT compilation of numeric snippets
//!
//! Turns a small C fragment (a boundary predicate or an expression body)
//! into a live native object. Compiled artifacts are content-addressed on
//! disk, so each distinct fragment is built once per cache root, even with
//! many threads or processes asking at the same time.
//!
//! # Example
//!
//! ```no_run
//! use jitforge::prelude::*;
//!
//! let compiler = JitCompiler::from_config(&JitConfig::default())?;
//!
//! let left = compiler.compile_subdomain("on_boundary && near(x[0], 0.0)")?;
//! assert!(left.inside(&[0.0, 0.5], true));
//!
//! let mut f = compiler.compile_expression(["x[0]*t", "x[1]*t"], [("t", 2.0)])?;
//! assert_eq!(f.call(&[1.0, 3.0]), vec![2.0, 6.0]);
//! f.set("t", 0.5)?;
//! # Ok::<(), jitforge::JitError>(())
//! ```

mod compiled;
mod compiler;
mod domain;


pub use compiled::{CompiledExpression, CompiledSubDomain};
pub use compiler::JitCompiler;
pub use domain::{
    Evaluate, Expression, Inside, SubDomain, UserSuppliedExpression, UserSuppliedPredicate,
};

pub use jitforge_build::{BuildExecutor, Toolchain};
pub use jitforge_cache::{ArtifactHandle, ArtifactState, CompileCache};
pub use jitforge_codegen::{compute_signature, render, SourceUnit};
pub use jitforge_config::{BuildConfig, ConfigError, JitConfig};
pub use jitforge_core::{
    Fragment, FragmentKind, JitError, MapPropertyTable, PropertyTable, Result, Signature,
    UnknownProperty,
};
pub use jitforge_loader::{ArtifactLoader, FactoryHandle, NativeObject};

pub mod prelude {
    pub use super::{
        CompiledExpression, CompiledSubDomain, Evaluate, Expression, Fragment, Inside,
        JitCompiler, JitConfig, JitError, MapPropertyTable, PropertyTable, SubDomain,
        UserSuppliedExpression, UserSuppliedPredicate,
    };
}
