//! C source rendering for fragments.
//!
//! A rendered unit holds, in order:
//! 1. the shared ABI prelude;
//! 2. a struct `jit_<sig>` embedding `jit_object` plus one `double` per property;
//! 3. the entry point for the fragment kind (`inside` or `eval`), with every
//!    property bound as a `const double` local so snippets use it by name;
//! 4. `get_property` / `set_property` dispatching on exact `strcmp` matches;
//! 5. a static vtable and the exported `create_<sig>()` factory.

use std::fmt::Write;

use jitforge_core::abi::{ABI_VERSION, C_PRELUDE};
use jitforge_core::{Fragment, FragmentKind, Result, Signature};

use crate::signature;

/// A rendered, self-contained C translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub signature: Signature,
    pub kind: FragmentKind,
    /// Name of the generated struct.
    pub type_name: String,
    /// Name of the exported factory function.
    pub factory_symbol: String,
    /// 0 for scalar output, 1 for vector output.
    pub value_rank: usize,
    /// Number of output components; 0 for predicates.
    pub value_size: usize,
    /// Coordinates the entry point reads from `x`.
    pub input_dim: usize,
    pub text: String,
}

/// Renders `fragment` into a compilable unit.
///
/// # Errors
///
/// Returns `JitError::InvalidFragment` when the fragment fails validation.
pub fn render(fragment: &Fragment) -> Result<SourceUnit> {
    fragment.validate()?;

    let signature = signature::compute(fragment);
    let type_name = signature.type_name();
    let factory_symbol = signature.factory_symbol();
    let value_size = fragment.value_size();
    let value_rank = usize::from(value_size > 1);
    let input_dim = fragment.input_dim();
    let props: Vec<&str> = fragment.property_names().collect();

    let mut text = String::with_capacity(C_PRELUDE.len() + 2048);
    // fmt::Write into a String cannot fail.
    let _ = writeln!(text, "/* jitforge {} {} */", fragment.kind().tag(), signature);
    text.push_str(C_PRELUDE);
    text.push('\n');

    emit_struct(&mut text, &type_name, &props);
    let (inside, eval) = match fragment.kind() {
        FragmentKind::Predicate => {
            emit_inside(&mut text, &type_name, &props, &fragment.snippets()[0]);
            (format!("{type_name}_inside"), "NULL".to_string())
        }
        FragmentKind::ExpressionBody => {
            emit_eval(&mut text, &type_name, &props, fragment.snippets());
            ("NULL".to_string(), format!("{type_name}_eval"))
        }
    };
    emit_accessors(&mut text, &type_name, &props);

    let _ = write!(
        text,
        r#"
static void {t}_destroy(jit_object *obj)
{{
  free(obj);
}}

static const jit_vtable {t}_vtable = {{
  {abi}u,
  {kind}u,
  {inside},
  {eval},
  {t}_get_property,
  {t}_set_property,
  {t}_destroy
}};

JIT_EXPORT jit_object *{factory}(void)
{{
  {t} *self = ({t} *) calloc(1, sizeof({t}));
  if (self == NULL)
    return NULL;
  self->base.vtable = &{t}_vtable;
  self->base.value_rank = {rank};
  self->base.value_size = {size};
  self->base.input_dim = {dim};
  return &self->base;
}}
"#,
        t = type_name,
        abi = ABI_VERSION,
        kind = fragment.kind().abi_code(),
        factory = factory_symbol,
        rank = value_rank,
        size = value_size,
        dim = input_dim,
    );

    Ok(SourceUnit {
        signature,
        kind: fragment.kind(),
        type_name,
        factory_symbol,
        value_rank,
        value_size,
        input_dim,
        text,
    })
}

fn emit_struct(text: &mut String, type_name: &str, props: &[&str]) {
    text.push_str("typedef struct\n{\n  jit_object base;\n");
    for p in props {
        let _ = writeln!(text, "  double {p};");
    }
    let _ = writeln!(text, "}} {type_name};\n");
}

// Binds `self` and every property as locals, then silences unused warnings.
fn emit_bindings(text: &mut String, type_name: &str, props: &[&str], unused: &[&str]) {
    let _ = writeln!(text, "  const {type_name} *self = (const {type_name} *) obj;");
    for p in props {
        let _ = writeln!(text, "  const double {p} = self->{p};");
    }
    text.push_str("  (void) self;\n");
    for name in unused.iter().chain(props) {
        let _ = writeln!(text, "  (void) {name};");
    }
}

fn emit_inside(text: &mut String, type_name: &str, props: &[&str], snippet: &str) {
    let _ = writeln!(
        text,
        "static bool {type_name}_inside(const jit_object *obj, const double *x, size_t dim, bool on_boundary)\n{{"
    );
    emit_bindings(text, type_name, props, &["x", "dim", "on_boundary"]);
    let _ = writeln!(text, "  return (\n{snippet}\n  );\n}}\n");
}

fn emit_eval(text: &mut String, type_name: &str, props: &[&str], snippets: &[String]) {
    let _ = writeln!(
        text,
        "static void {type_name}_eval(const jit_object *obj, double *values, const double *x, size_t dim)\n{{"
    );
    emit_bindings(text, type_name, props, &["x", "dim"]);
    for (i, snippet) in snippets.iter().enumerate() {
        let _ = writeln!(text, "  values[{i}] = (\n{snippet}\n  );");
    }
    text.push_str("}\n\n");
}

fn emit_accessors(text: &mut String, type_name: &str, props: &[&str]) {
    let _ = writeln!(
        text,
        "static int {type_name}_get_property(const jit_object *obj, const char *name, double *out)\n{{"
    );
    let _ = writeln!(text, "  const {type_name} *self = (const {type_name} *) obj;");
    text.push_str("  (void) self;\n  (void) name;\n  (void) out;\n");
    for p in props {
        let _ = writeln!(
            text,
            "  if (strcmp(name, \"{p}\") == 0) {{ *out = self->{p}; return 1; }}"
        );
    }
    text.push_str("  return 0;\n}\n\n");

    let _ = writeln!(
        text,
        "static int {type_name}_set_property(jit_object *obj, const char *name, double value)\n{{"
    );
    let _ = writeln!(text, "  {type_name} *self = ({type_name} *) obj;");
    text.push_str("  (void) self;\n  (void) name;\n  (void) value;\n");
    for p in props {
        let _ = writeln!(
            text,
            "  if (strcmp(name, \"{p}\") == 0) {{ self->{p} = value; return 1; }}"
        );
    }
    text.push_str("  return 0;\n}\n");
}
