//! Tests for toolchain resolution and the build executor.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jitforge_config::BuildConfig;
use jitforge_core::JitError;

use super::*;

fn strs(args: &[std::ffi::OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

// ============================================================================
// Toolchain
// ============================================================================

mod toolchain {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = BuildConfig::default()
            .with_compiler("clang")
            .with_timeout_secs(7)
            .with_include_dir("/inc");
        let tc = Toolchain::from_config(&config);
        assert_eq!(tc.compiler, "clang");
        assert_eq!(tc.timeout, Duration::from_secs(7));
        assert_eq!(tc.include_dirs, [PathBuf::from("/inc")]);
        assert_eq!(tc.libs, ["m"]);
    }

    #[test]
    fn test_args_order() {
        let tc = Toolchain {
            compiler: "cc".into(),
            flags: vec!["-O2".into(), "-shared".into()],
            include_dirs: vec!["/inc".into()],
            lib_dirs: vec!["/lib".into()],
            libs: vec!["m".into(), "engine".into()],
            timeout: Duration::from_secs(1),
        };
        let args = strs(&tc.args(Path::new("src.c"), Path::new("out.so")));

        let pos = |a: &str| args.iter().position(|x| x == a).unwrap();
        assert!(pos("-O2") < pos("src.c"));
        assert!(pos("-I/inc") < pos("src.c"));
        assert_eq!(args[pos("-o") + 1], "out.so");
        assert!(pos("src.c") < pos("-L/lib"));
        assert!(pos("-L/lib") < pos("-lengine"));
        assert!(pos("-lm") < pos("-lengine"));
        if cfg!(unix) {
            assert!(args.contains(&"-Wl,-rpath,/lib".to_string()));
        }
    }

    #[test]
    fn test_merge_pkg_config() {
        let mut tc = Toolchain::default();
        tc.merge_pkg_config("-DENGINE=1 -I/opt/e/include -I/opt/e/include -L/opt/e/lib -lengine -lm\n");
        assert_eq!(tc.include_dirs, [PathBuf::from("/opt/e/include")]);
        assert_eq!(tc.lib_dirs, [PathBuf::from("/opt/e/lib")]);
        assert_eq!(tc.libs, ["m", "engine"]);
        assert!(tc.flags.contains(&"-DENGINE=1".to_string()));
    }

    #[test]
    fn test_discover_without_pkg_config_is_static() {
        let config = BuildConfig::default().with_compiler("gcc");
        assert_eq!(
            Toolchain::discover(&config).unwrap(),
            Toolchain::from_config(&config)
        );
    }

    #[test]
    fn test_discover_unknown_package() {
        let config = BuildConfig::default().with_pkg_config("jitforge-no-such-package-xyz");
        let err = Toolchain::discover(&config).unwrap_err();
        assert!(matches!(err, JitError::ToolchainNotFound(_)), "{err}");
    }
}

// ============================================================================
// Executor (driven through /bin/sh standing in for the compiler)
// ============================================================================

#[cfg(unix)]
mod executor {
    use super::*;

    // `sh -c <script> fake-cc <source> -o <output>`: $1 = source, $3 = output.
    fn shell_toolchain(script: &str, timeout: Duration) -> Toolchain {
        Toolchain {
            compiler: "/bin/sh".into(),
            flags: vec!["-c".into(), script.into(), "fake-cc".into()],
            include_dirs: vec![],
            lib_dirs: vec![],
            libs: vec![],
            timeout,
        }
    }

    struct Paths {
        _dir: tempfile::TempDir,
        source: PathBuf,
        output: PathBuf,
        log: PathBuf,
    }

    fn paths() -> Paths {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.c");
        std::fs::write(&source, "int main(void) { return 0; }\n").unwrap();
        Paths {
            source,
            output: dir.path().join("binary.so"),
            log: dir.path().join("build.log"),
            _dir: dir,
        }
    }

    #[test]
    fn test_success_captures_log() {
        let p = paths();
        let exec = BuildExecutor::new(shell_toolchain(
            r#"echo "compiling $1"; echo "note: stderr line" >&2; cp "$1" "$3""#,
            Duration::from_secs(10),
        ));

        let out = exec.build(&p.source, &p.output, &p.log).unwrap();
        assert_eq!(out, p.output);
        assert!(p.output.is_file());

        let log = std::fs::read_to_string(&p.log).unwrap();
        assert!(log.starts_with("$ /bin/sh"));
        assert!(log.contains("compiling"));
        assert!(log.contains("note: stderr line"));
    }

    #[test]
    fn test_nonzero_exit_is_compile_error() {
        let p = paths();
        let exec = BuildExecutor::new(shell_toolchain(
            r#"echo "error: expected ';'" >&2; exit 3"#,
            Duration::from_secs(10),
        ));

        let err = exec.build(&p.source, &p.output, &p.log).unwrap_err();
        match &err {
            JitError::Compile { log, .. } => assert!(log.contains("expected ';'")),
            other => panic!("expected Compile, got {other:?}"),
        }
        assert!(p.log.is_file());
        assert!(!p.output.exists());
    }

    #[test]
    fn test_missing_output_is_compile_error() {
        let p = paths();
        let exec = BuildExecutor::new(shell_toolchain("exit 0", Duration::from_secs(10)));
        let err = exec.build(&p.source, &p.output, &p.log).unwrap_err();
        assert!(matches!(err, JitError::Compile { .. }));
    }

    #[test]
    fn test_missing_compiler() {
        let p = paths();
        let mut tc = Toolchain::default();
        tc.compiler = "/nonexistent/jitforge-cc".into();
        let err = BuildExecutor::new(tc)
            .build(&p.source, &p.output, &p.log)
            .unwrap_err();
        assert!(matches!(err, JitError::ToolchainNotFound(_)));
    }

    #[test]
    fn test_timeout_kills_process_group() {
        let p = paths();
        let exec = BuildExecutor::new(shell_toolchain(
            "echo started; sleep 30 & sleep 30; wait",
            Duration::from_millis(300),
        ));

        let start = Instant::now();
        let err = exec.build(&p.source, &p.output, &p.log).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(10));
        match err {
            JitError::Timeout { limit, log } => {
                assert_eq!(limit, Duration::from_millis(300));
                assert!(log.contains("started"));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        let config = jitforge_config::JitConfig::from_toml_str(
            "[build]\ntimeout_secs = 9223372036854775807",
        )
        .unwrap();
        let timeout = Toolchain::from_config(&config.build).timeout;

        let p = paths();
        let exec = BuildExecutor::new(shell_toolchain(r#"cp "$1" "$3""#, timeout));
        let out = exec.build(&p.source, &p.output, &p.log).unwrap();
        assert!(out.is_file());
    }
}
