//! jitforge Core - Core types and traits for the JIT compile cache
//!
//! This crate provides the fundamental abstractions shared by every stage
//! of the pipeline:
//! - `Fragment`: user-supplied snippets plus a property schema
//! - `Signature`: the content-derived cache key
//! - `PropertyTable`: named numeric properties on a compiled object
//! - `abi`: the C extension-point interface generated code implements
//! - `JitError`: the error taxonomy surfaced to callers

pub mod abi;
pub mod error;
pub mod fragment;
pub mod property;
pub mod signature;


pub use error::{JitError, Result, UnknownProperty};
pub use fragment::{Fragment, FragmentKind, Snippets};
pub use property::{MapPropertyTable, PropertyTable};
pub use signature::Signature;

/// Version of the generated-source template.
///
/// Mixed into every signature, so artifacts built from an older template
/// are never picked up by a newer one.
pub const TEMPLATE_VERSION: u32 = 1;
