//! Native toolchain invocation for jitforge.
//!
//! [`Toolchain`] is the resolved compiler configuration (static settings
//! plus optional pkg-config discovery); [`BuildExecutor`] runs it on one
//! source file with a wall-clock bound, capturing a combined build log.

mod executor;
mod toolchain;

#[cfg(test)]
mod tests;

pub use executor::BuildExecutor;
pub use toolchain::Toolchain;
