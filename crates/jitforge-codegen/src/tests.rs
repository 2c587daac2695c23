//! Tests for rendering and signatures.

use std::collections::BTreeMap;

use jitforge_core::{Fragment, FragmentKind, JitError};
use proptest::prelude::*;

use super::*;

// ============================================================================
// Signatures
// ============================================================================

mod signatures {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = Fragment::predicate("x[0] > 0.5");
        let b = Fragment::predicate("x[0] > 0.5");
        assert_eq!(compute_signature(&a), compute_signature(&b));
        assert_eq!(compute_signature(&a).as_str().len(), 64);
    }

    #[test]
    fn test_property_values_excluded() {
        let a = Fragment::expression(["x[0]*t"], [("t", 2.0)]);
        let b = Fragment::expression(["x[0]*t"], [("t", -7.25)]);
        assert_eq!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn test_property_insertion_order_irrelevant() {
        let a = Fragment::expression(["a*x[0] + b"], [("a", 1.0), ("b", 2.0)]);
        let b = Fragment::expression(["a*x[0] + b"], [("b", 2.0), ("a", 1.0)]);
        assert_eq!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn test_property_names_included() {
        let a = Fragment::expression(["x[0]"], [("t", 1.0)]);
        let b = Fragment::expression(["x[0]"], [("s", 1.0)]);
        let c = Fragment::expression(["x[0]"], Vec::<(String, f64)>::new());
        assert_ne!(compute_signature(&a), compute_signature(&b));
        assert_ne!(compute_signature(&a), compute_signature(&c));
    }

    #[test]
    fn test_snippet_order_significant() {
        let a = Fragment::expression(["x[0]", "x[1]"], Vec::<(String, f64)>::new());
        let b = Fragment::expression(["x[1]", "x[0]"], Vec::<(String, f64)>::new());
        assert_ne!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn test_snippet_boundaries_significant() {
        let a = Fragment::expression(["x[0]+", "1"], Vec::<(String, f64)>::new());
        let b = Fragment::expression(["x[0]", "+1"], Vec::<(String, f64)>::new());
        assert_ne!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn test_snippet_vs_property_name_boundary() {
        let a = Fragment::expression(["x[0]", "t"], Vec::<(String, f64)>::new());
        let b = Fragment::expression(["x[0]"], [("t", 0.0)]);
        assert_ne!(compute_signature(&a), compute_signature(&b));
    }

    #[test]
    fn test_kind_significant() {
        let a = Fragment::predicate("x[0]");
        let b = Fragment::new(FragmentKind::ExpressionBody, ["x[0]"], BTreeMap::new());
        assert_ne!(compute_signature(&a), compute_signature(&b));
    }

    proptest! {
        #[test]
        fn prop_values_never_change_signature(
            snippets in prop::collection::vec("[a-z0-9\\[\\]*+ ]{1,12}", 1..4),
            names in prop::collection::btree_set("[a-z][a-z0-9_]{0,6}", 0..4),
            v1 in -1e6f64..1e6,
            v2 in -1e6f64..1e6,
        ) {
            let a = Fragment::expression(snippets.clone(), names.iter().map(|n| (n.clone(), v1)));
            let b = Fragment::expression(snippets, names.iter().map(|n| (n.clone(), v2)));
            prop_assert_eq!(compute_signature(&a), compute_signature(&b));
        }

        #[test]
        fn prop_swapping_distinct_snippets_changes_signature(
            s0 in "[a-z0-9*+]{1,8}",
            s1 in "[a-z0-9*+]{1,8}",
        ) {
            prop_assume!(s0 != s1);
            let a = Fragment::expression([s0.clone(), s1.clone()], Vec::<(String, f64)>::new());
            let b = Fragment::expression([s1, s0], Vec::<(String, f64)>::new());
            prop_assert_ne!(compute_signature(&a), compute_signature(&b));
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

mod rendering {
    use super::*;

    #[test]
    fn test_predicate_unit() {
        let fragment = Fragment::predicate("x[0] > 0.5");
        let unit = render(&fragment).unwrap();
        let sig = compute_signature(&fragment);

        assert_eq!(unit.signature, sig);
        assert_eq!(unit.kind, FragmentKind::Predicate);
        assert_eq!(unit.type_name, format!("jit_{sig}"));
        assert_eq!(unit.factory_symbol, format!("create_{sig}"));
        assert_eq!((unit.value_rank, unit.value_size), (0, 0));
        assert_eq!(unit.input_dim, 1);

        let t = &unit.text;
        assert!(t.contains("struct jit_vtable"));
        assert!(t.contains(&format!("static bool jit_{sig}_inside(")));
        assert!(t.contains("x[0] > 0.5"));
        assert!(t.contains(&format!("JIT_EXPORT jit_object *create_{sig}(void)")));
        assert!(!t.contains(&format!("jit_{sig}_eval(")));
        assert_eq!(t.matches("JIT_EXPORT jit_object *").count(), 1);
    }

    #[test]
    fn test_expression_unit() {
        let fragment = Fragment::expression(["x[0]*t", "x[1]*t"], [("t", 2.0)]);
        let unit = render(&fragment).unwrap();

        assert_eq!(unit.kind, FragmentKind::ExpressionBody);
        assert_eq!((unit.value_rank, unit.value_size), (1, 2));

        let t = &unit.text;
        assert!(t.contains("  double t;"));
        assert!(t.contains("const double t = self->t;"));
        let first = t.find("values[0] = (\nx[0]*t\n  );").unwrap();
        let second = t.find("values[1] = (\nx[1]*t\n  );").unwrap();
        assert!(first < second);
        assert!(t.contains("if (strcmp(name, \"t\") == 0) { *out = self->t; return 1; }"));
        assert!(t.contains("if (strcmp(name, \"t\") == 0) { self->t = value; return 1; }"));
        assert!(t.contains("self->base.value_rank = 1;"));
        assert!(t.contains("self->base.value_size = 2;"));
        assert!(t.contains("self->base.input_dim = 2;"));
    }

    #[test]
    fn test_input_dim_follows_highest_coordinate() {
        let unit = render(&Fragment::expression(["x[3] - x[0]", "1.0"], [("k", 1.0)])).unwrap();
        assert_eq!(unit.input_dim, 4);
        assert!(unit.text.contains("self->base.input_dim = 4;"));

        let unit = render(&Fragment::expression(["k"], [("k", 1.0)])).unwrap();
        assert_eq!(unit.input_dim, 0);
    }

    #[test]
    fn test_scalar_expression_rank() {
        let unit = render(&Fragment::expression(["sin(x[0])"], Vec::<(String, f64)>::new())).unwrap();
        assert_eq!((unit.value_rank, unit.value_size), (0, 1));
    }

    #[test]
    fn test_accessors_sorted_by_name() {
        let fragment = Fragment::expression(["a + b"], [("b", 1.0), ("a", 2.0)]);
        let t = render(&fragment).unwrap().text;
        assert!(t.find("  double a;").unwrap() < t.find("  double b;").unwrap());
    }

    #[test]
    fn test_render_is_pure() {
        let fragment = Fragment::expression(["x[0]*k"], [("k", 3.0)]);
        assert_eq!(render(&fragment).unwrap(), render(&fragment).unwrap());
    }

    #[test]
    fn test_default_values_not_compiled_in() {
        let a = render(&Fragment::expression(["x[0]*k"], [("k", 3.0)])).unwrap();
        let b = render(&Fragment::expression(["x[0]*k"], [("k", 9.5)])).unwrap();
        assert_eq!(a.text, b.text);
    }

    #[test]
    fn test_invalid_fragment_rejected() {
        let two = Fragment::new(FragmentKind::Predicate, ["a", "b"], BTreeMap::new());
        assert!(matches!(render(&two), Err(JitError::InvalidFragment(_))));

        let bad_name = Fragment::expression(["x[0]"], [("2t", 1.0)]);
        assert!(matches!(render(&bad_name), Err(JitError::InvalidFragment(_))));

        let nan = Fragment::expression(["x[0]*t"], [("t", f64::NAN)]);
        assert!(matches!(render(&nan), Err(JitError::InvalidFragment(_))));
    }
}
