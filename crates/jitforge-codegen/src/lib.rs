//! Source rendering and signature computation.
//!
//! `render` turns a [`Fragment`](jitforge_core::Fragment) into one C unit
//! implementing the extension-point ABI from `jitforge_core::abi`;
//! `signature::compute` derives the content hash that names the unit, its
//! cache directory and its factory symbol. Both are pure: no I/O.

mod render;
pub mod signature;

#[cfg(test)]
mod tests;

pub use render::{render, SourceUnit};
pub use signature::compute as compute_signature;
