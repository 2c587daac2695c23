//! jitforge Loader - Dynamic loading of compiled artifacts
//!
//! Maps artifact binaries into the process, resolves their
//! `create_<signature>` factories and wraps created instances in
//! [`NativeObject`], which dispatches through the C vtable.

mod loader;
mod object;

#[cfg(test)]
mod tests;

pub use loader::{ArtifactLoader, FactoryHandle};
pub use object::NativeObject;
