//! Tests for artifact loading. Skipped when no host compiler is available.

use std::fs;

use jitforge_core::{Fragment, FragmentKind, JitError, PropertyTable};
use jitforge_test::compile_fixture;

use super::*;

#[test]
fn test_predicate_roundtrip() {
    let Some(fixture) = compile_fixture(&Fragment::predicate("x[0] > 0.5")) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let factory = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap();
    let object = factory.create().unwrap();

    assert_eq!(object.kind(), FragmentKind::Predicate);
    assert_eq!(object.value_size(), 0);
    assert!(object.inside(&[0.6, 0.0], false).unwrap());
    assert!(!object.inside(&[0.4, 0.0], false).unwrap());
}

#[test]
fn test_on_boundary_is_visible_to_snippet() {
    let Some(fixture) = compile_fixture(&Fragment::predicate("on_boundary && near(x[0], 0.0)"))
    else {
        return;
    };
    let loader = ArtifactLoader::new();
    let object = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap()
        .create()
        .unwrap();

    assert!(object.inside(&[0.0], true).unwrap());
    assert!(!object.inside(&[0.0], false).unwrap());
    assert!(!object.inside(&[0.5], true).unwrap());
}

#[test]
fn test_vector_expression_with_property() {
    let fragment = Fragment::expression(["x[0]*t", "x[1]*t"], [("t", 2.0)]);
    let Some(fixture) = compile_fixture(&fragment) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let mut object = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap()
        .create()
        .unwrap();

    assert_eq!(object.kind(), FragmentKind::ExpressionBody);
    assert_eq!(object.value_rank(), 1);
    assert_eq!(object.value_size(), 2);

    let mut values = [0.0; 2];
    object.eval(&mut values, &[1.0, 3.0]).unwrap();
    assert_eq!(values, [0.0, 0.0], "properties start at zero until set");

    object.set("t", 2.0).unwrap();
    object.eval(&mut values, &[1.0, 3.0]).unwrap();
    assert_eq!(values, [2.0, 6.0]);
    assert_eq!(object.get("t").unwrap(), 2.0);

    object.set("t", 0.5).unwrap();
    object.eval(&mut values, &[1.0, 3.0]).unwrap();
    assert_eq!(values, [0.5, 1.5]);
}

#[test]
fn test_unknown_property() {
    let fragment = Fragment::expression(["a"], [("a", 1.0)]);
    let Some(fixture) = compile_fixture(&fragment) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let mut object = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap()
        .create()
        .unwrap();

    assert_eq!(object.get("b").unwrap_err().0, "b");
    assert!(object.set("b", 1.0).is_err());
    assert!(object.get("a\0b").is_err());
    assert!(object.get("A").is_err(), "lookups are case sensitive");
}

#[test]
fn test_instances_are_independent() {
    let fragment = Fragment::expression(["k"], [("k", 0.0)]);
    let Some(fixture) = compile_fixture(&fragment) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let factory = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap();
    let mut a = factory.create().unwrap();
    let b = factory.create().unwrap();

    a.set("k", 7.0).unwrap();
    let (mut va, mut vb) = ([0.0], [0.0]);
    a.eval(&mut va, &[]).unwrap();
    b.eval(&mut vb, &[]).unwrap();
    assert_eq!(va, [7.0]);
    assert_eq!(vb, [0.0]);
}

#[test]
fn test_library_opened_once() {
    let Some(fixture) = compile_fixture(&Fragment::predicate("true")) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let symbol = &fixture.unit.factory_symbol;

    let first = loader.load(&fixture.binary, symbol).unwrap();
    let second = loader
        .load(&fixture.dir.path().join(".").join(fixture.binary.file_name().unwrap()), symbol)
        .unwrap();
    assert_eq!(loader.loaded_count(), 1);
    assert_eq!(first.path(), second.path());

    // Objects outlive the handle that created them.
    let object = first.create().unwrap();
    drop(first);
    drop(second);
    assert!(object.inside(&[], false).unwrap());
}

#[test]
fn test_short_input_is_rejected_before_the_call() {
    let Some(fixture) = compile_fixture(&Fragment::predicate("x[2] > 0.5")) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let object = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap()
        .create()
        .unwrap();

    assert_eq!(object.input_dim(), 3);
    match object.inside(&[1.0], false).unwrap_err() {
        JitError::Dimension { what, needed, got } => {
            assert_eq!((what, needed, got), ("x", 3, 1));
        }
        other => panic!("expected Dimension, got {other:?}"),
    }
    assert!(matches!(object.inside(&[], true), Err(JitError::Dimension { .. })));
    assert!(object.inside(&[0.0, 0.0, 0.6], false).unwrap());
}

#[test]
fn test_short_output_buffer_is_rejected() {
    let fragment = Fragment::expression(["x[0]", "x[1]"], Vec::<(String, f64)>::new());
    let Some(fixture) = compile_fixture(&fragment) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let object = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap()
        .create()
        .unwrap();

    let mut one = [0.0];
    let err = object.eval(&mut one, &[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, JitError::Dimension { what: "values", needed: 2, got: 1 }));
    let err = object.eval(&mut [0.0; 2], &[1.0]).unwrap_err();
    assert!(matches!(err, JitError::Dimension { what: "x", needed: 2, got: 1 }));
    assert!(!err.is_retryable());
}

#[test]
fn test_wrong_kind_is_an_error() {
    let Some(fixture) = compile_fixture(&Fragment::predicate("x[0] > 0.5")) else {
        return;
    };
    let loader = ArtifactLoader::new();
    let object = loader
        .load(&fixture.binary, &fixture.unit.factory_symbol)
        .unwrap()
        .create()
        .unwrap();

    let err = object.eval(&mut [0.0], &[1.0]).unwrap_err();
    assert!(matches!(
        err,
        JitError::WrongKind { operation: "eval", found: "predicate" }
    ));
    assert_eq!(err.to_string(), "eval() called on a predicate object");
}

#[test]
fn test_missing_symbol() {
    let Some(fixture) = compile_fixture(&Fragment::predicate("true")) else {
        return;
    };
    let err = ArtifactLoader::new()
        .load(&fixture.binary, "create_nothing")
        .unwrap_err();
    match err {
        JitError::SymbolNotFound { symbol, .. } => assert_eq!(symbol, "create_nothing"),
        other => panic!("expected SymbolNotFound, got {other:?}"),
    }
}

#[test]
fn test_garbage_binary_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join(format!("binary.{}", std::env::consts::DLL_EXTENSION));
    fs::write(&path, b"not a shared library").unwrap();

    let err = ArtifactLoader::new().load(&path, "create_x").unwrap_err();
    assert!(matches!(err, JitError::Load { .. }), "got {err:?}");
}

#[test]
fn test_missing_binary_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ArtifactLoader::new()
        .load(&dir.path().join("absent.so"), "create_x")
        .unwrap_err();
    assert!(matches!(err, JitError::Load { .. }));
}

#[test]
fn test_objects_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NativeObject>();
    assert_send_sync::<FactoryHandle>();
    assert_send_sync::<ArtifactLoader>();
}
