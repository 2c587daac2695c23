//! Host compiler detection and fixture builds.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use jitforge_build::{BuildExecutor, Toolchain};
use jitforge_codegen::{render, SourceUnit};
use jitforge_core::Fragment;

/// A fragment compiled into a temp directory.
pub struct CompiledFixture {
    pub dir: tempfile::TempDir,
    pub unit: SourceUnit,
    pub binary: PathBuf,
}

/// Returns the default toolchain if its compiler runs, else `None`.
///
/// Tests that need a real compiler return early on `None`, printing why.
pub fn require_toolchain() -> Option<Toolchain> {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    let toolchain = Toolchain::default();
    let available = *AVAILABLE.get_or_init(|| {
        Command::new(&toolchain.compiler)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    });
    if !available {
        eprintln!("skipping: compiler `{}` unavailable", toolchain.compiler);
        return None;
    }
    Some(toolchain)
}

/// Renders and compiles `fragment` outside any cache.
///
/// Returns `None` when no toolchain is available.
///
/// # Panics
///
/// Panics if rendering or compilation fails.
pub fn compile_fixture(fragment: &Fragment) -> Option<CompiledFixture> {
    let toolchain = require_toolchain()?;
    let unit = render(fragment).expect("fixture renders");
    let dir = tempfile::tempdir().expect("temp dir");

    let source = dir.path().join("source.c");
    std::fs::write(&source, &unit.text).expect("write source");
    let binary = dir
        .path()
        .join(format!("binary.{}", std::env::consts::DLL_EXTENSION));
    let log = dir.path().join("build.log");

    BuildExecutor::new(toolchain)
        .build(&source, &binary, &log)
        .unwrap_or_else(|e| panic!("fixture build failed: {e}"));

    Some(CompiledFixture { dir, unit, binary })
}
