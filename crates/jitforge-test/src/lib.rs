//! Shared test fixtures for jitforge crates.
//!
//! This crate builds real shared libraries for tests that need them.
//! It does NOT depend on `jitforge-loader` or `jitforge` so both can use it
//! as a dev-dependency without a cycle.
//!
//! - [`toolchain`] - host compiler detection and fixture builds
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! jitforge-test = { workspace = true }
//! ```
//!
//! ```ignore
//! use jitforge_test::{require_toolchain, compile_fixture};
//!
//! let Some(toolchain) = require_toolchain() else { return };
//! ```

pub mod toolchain;

pub use toolchain::{compile_fixture, require_toolchain, CompiledFixture};
