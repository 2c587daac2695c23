//! Tests for jitforge configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        cache_dir = "/tmp/jit-cache"

        [build]
        compiler = "clang"
        flags = ["-O3", "-fPIC", "-shared"]
        include_dirs = ["/opt/engine/include"]
        lib_dirs = ["/opt/engine/lib"]
        libs = ["m", "engine"]
        timeout_secs = 45
        pkg_config = "engine"
    "#;

    let config = JitConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/jit-cache")));
    assert_eq!(config.build.compiler(), "clang");
    assert_eq!(config.build.flags, ["-O3", "-fPIC", "-shared"]);
    assert_eq!(config.build.include_dirs, [PathBuf::from("/opt/engine/include")]);
    assert_eq!(config.build.libs, ["m", "engine"]);
    assert_eq!(config.build.timeout(), Duration::from_secs(45));
    assert_eq!(config.build.pkg_config.as_deref(), Some("engine"));
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        cache_dir: /tmp/jit-cache
        build:
          compiler: gcc
          timeout_secs: 10
    "#;

    let config = JitConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.cache_root(), PathBuf::from("/tmp/jit-cache"));
    assert_eq!(config.build.compiler(), "gcc");
    assert_eq!(config.build.timeout_secs, 10);
    // unspecified keys keep their defaults
    assert_eq!(config.build.libs, ["m"]);
}

#[test]
fn test_defaults() {
    let config = JitConfig::from_toml_str("").unwrap();
    assert_eq!(config, JitConfig::default());
    assert_eq!(config.build.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert!(config.build.flags.iter().any(|f| f == "-shared"));
    assert!(config.build.pkg_config.is_none());
}

#[test]
fn test_zero_timeout_rejected() {
    let err = JitConfig::from_toml_str("[build]\ntimeout_secs = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_empty_compiler_rejected() {
    let err = JitConfig::from_toml_str("[build]\ncompiler = \"  \"").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_unparseable_toml() {
    let err = JitConfig::from_toml_str("[build\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
    let jit: JitError = err.into();
    assert!(matches!(jit, JitError::Config(_)));
}

#[test]
fn test_missing_file() {
    let err = JitConfig::load("/nonexistent/jitforge.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_builder() {
    let config = JitConfig::new().with_cache_dir("/tmp/a").with_build(
        BuildConfig::default()
            .with_compiler("clang")
            .with_timeout_secs(5)
            .with_include_dir("/inc")
            .with_lib_dir("/lib")
            .with_lib("engine")
            .with_pkg_config("engine"),
    );

    assert_eq!(config.cache_root(), PathBuf::from("/tmp/a"));
    assert_eq!(config.build.compiler(), "clang");
    assert_eq!(config.build.libs, ["m", "engine"]);
    assert_eq!(config.build.lib_dirs, [PathBuf::from("/lib")]);
}

#[test]
fn test_cache_root_resolution_order() {
    let explicit = PathBuf::from("/explicit");
    let env = PathBuf::from("/from-env");

    assert_eq!(
        resolve_cache_root(Some(&explicit), Some(env.clone())),
        explicit
    );
    assert_eq!(resolve_cache_root(None, Some(env.clone())), env);

    let fallback = resolve_cache_root(None, Some(PathBuf::new()));
    assert!(fallback.ends_with("jitforge"));
    assert_eq!(resolve_cache_root(None, None), fallback);
}
