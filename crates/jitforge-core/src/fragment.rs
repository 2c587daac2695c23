//! User-supplied code fragments.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::error::{JitError, Result};

/// Snippet storage. Predicates hold one, most expressions three or fewer.
pub type Snippets = SmallVec<[String; 3]>;

/// Which extension point a fragment compiles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// A boolean point-membership test: `inside(x, on_boundary) -> bool`.
    Predicate,
    /// A vector-valued evaluator: `eval(values, x)`, one snippet per component.
    ExpressionBody,
}

impl FragmentKind {
    /// Stable tag used in signatures and the native ABI.
    pub fn tag(self) -> &'static str {
        match self {
            FragmentKind::Predicate => "predicate",
            FragmentKind::ExpressionBody => "expression",
        }
    }

    /// Numeric kind recorded in the generated vtable.
    pub fn abi_code(self) -> u32 {
        match self {
            FragmentKind::Predicate => 0,
            FragmentKind::ExpressionBody => 1,
        }
    }
}

/// Snippets plus a property schema, ready to be rendered and compiled.
///
/// Immutable once constructed. Property names are kept sorted, which is the
/// order both the signature and the generated accessors use.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    kind: FragmentKind,
    snippets: Snippets,
    properties: BTreeMap<String, f64>,
}

/// Names the generated template binds itself; properties may not shadow them.
const RESERVED: &[&str] = &[
    // template parameters and helpers
    "x", "values", "dim", "on_boundary", "self", "obj", "name", "value", "out", "near",
    "between", "bool", "true", "false",
    // C keywords
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch",
    "typedef", "union", "unsigned", "void", "volatile", "while", "_Bool", "_Complex",
    "_Imaginary",
    // object-like macros and typedefs from the prelude's headers
    "NULL", "INFINITY", "NAN", "HUGE_VAL", "HUGE_VALF", "HUGE_VALL", "MATH_ERRNO",
    "MATH_ERREXCEPT", "math_errhandling", "EXIT_SUCCESS", "EXIT_FAILURE", "RAND_MAX",
    "MB_CUR_MAX", "errno", "size_t", "ptrdiff_t", "wchar_t", "div_t", "ldiv_t", "lldiv_t",
    "float_t", "double_t",
];

/// Prefixes owned by the template (`jit_`, `JIT_`) or by the C headers
/// (`FP_` classification macros, `M_` math constants).
const RESERVED_PREFIXES: &[&str] = &["jit_", "JIT_", "FP_", "M_"];

/// True for names C reserves to the implementation: `__x` and `_X`.
fn is_implementation_reserved(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('_'), Some(c)) if c == '_' || c.is_ascii_uppercase()
    )
}

fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
        || RESERVED_PREFIXES.iter().any(|p| name.starts_with(p))
        || is_implementation_reserved(name)
}

impl Fragment {
    /// Creates a fragment without validating it; see [`Fragment::validate`].
    pub fn new<I, S>(kind: FragmentKind, snippets: I, properties: BTreeMap<String, f64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            snippets: snippets.into_iter().map(Into::into).collect(),
            properties,
        }
    }

    /// A single-expression boundary predicate with no properties.
    pub fn predicate(code: impl Into<String>) -> Self {
        Self::new(FragmentKind::Predicate, [code.into()], BTreeMap::new())
    }

    /// An expression body, one snippet per output component.
    pub fn expression<I, S, P, K>(snippets: I, properties: P) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self::new(
            FragmentKind::ExpressionBody,
            snippets,
            properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn snippets(&self) -> &[String] {
        &self.snippets
    }

    /// Property defaults, sorted by name.
    pub fn properties(&self) -> &BTreeMap<String, f64> {
        &self.properties
    }

    /// Sorted property names.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of output components the compiled object will declare.
    pub fn value_size(&self) -> usize {
        match self.kind {
            FragmentKind::Predicate => 0,
            FragmentKind::ExpressionBody => self.snippets.len(),
        }
    }

    /// Coordinates the compiled object reads: one past the highest `x[N]`
    /// across all snippets, 0 when no snippet reads `x`.
    ///
    /// Only meaningful once [`Fragment::validate`] has accepted the fragment.
    pub fn input_dim(&self) -> usize {
        self.snippets
            .iter()
            .filter_map(|s| coordinate_bound(s).ok())
            .max()
            .unwrap_or(0)
    }

    /// Checks the fragment can be rendered into compilable source.
    ///
    /// # Errors
    ///
    /// Returns `JitError::InvalidFragment` when a predicate does not have
    /// exactly one snippet, an expression has none, a snippet is blank,
    /// contains a NUL byte or reads `x` other than as `x[<integer literal>]`,
    /// a property name is not a usable identifier, or a property default is
    /// not a finite `f64`.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            FragmentKind::Predicate if self.snippets.len() != 1 => {
                return Err(JitError::InvalidFragment(format!(
                    "a predicate takes exactly one expression, got {}",
                    self.snippets.len()
                )));
            }
            FragmentKind::ExpressionBody if self.snippets.is_empty() => {
                return Err(JitError::InvalidFragment(
                    "an expression needs at least one snippet".to_string(),
                ));
            }
            _ => {}
        }

        for (i, snippet) in self.snippets.iter().enumerate() {
            if snippet.trim().is_empty() {
                return Err(JitError::InvalidFragment(format!("snippet {i} is blank")));
            }
            if snippet.contains('\0') {
                return Err(JitError::InvalidFragment(format!(
                    "snippet {i} contains a NUL byte"
                )));
            }
            coordinate_bound(snippet)
                .map_err(|reason| JitError::InvalidFragment(format!("snippet {i}: {reason}")))?;
        }

        for (name, value) in &self.properties {
            if !is_identifier(name) {
                return Err(JitError::InvalidFragment(format!(
                    "property name {name:?} is not a valid identifier"
                )));
            }
            if is_reserved(name) {
                return Err(JitError::InvalidFragment(format!(
                    "property name {name:?} is reserved"
                )));
            }
            if !value.is_finite() {
                return Err(JitError::InvalidFragment(format!(
                    "property {name} has non-finite default {value}"
                )));
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_spaces(bytes: &[u8], mut at: usize) -> usize {
    while at < bytes.len() && bytes[at].is_ascii_whitespace() {
        at += 1;
    }
    at
}

/// One past the highest coordinate `snippet` reads.
///
/// Every `x` token must be subscripted by a decimal literal so the bound is
/// known before the code runs. Leading zeros make C read the literal as
/// octal, which only lowers the real index.
fn coordinate_bound(snippet: &str) -> std::result::Result<usize, String> {
    let bytes = snippet.as_bytes();
    let mut bound = 0;
    let mut at = 0;
    while at < bytes.len() {
        if !is_ident_byte(bytes[at]) {
            at += 1;
            continue;
        }
        let start = at;
        while at < bytes.len() && is_ident_byte(bytes[at]) {
            at += 1;
        }
        if &bytes[start..at] != b"x" {
            continue;
        }

        let not_literal = || format!("x at byte {start} must be indexed as x[<integer literal>]");
        let open = skip_spaces(bytes, at);
        if bytes.get(open) != Some(&b'[') {
            return Err(not_literal());
        }
        let digits = skip_spaces(bytes, open + 1);
        let mut end = digits;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let close = skip_spaces(bytes, end);
        if end == digits || bytes.get(close) != Some(&b']') {
            return Err(not_literal());
        }
        let index: usize = snippet[digits..end]
            .parse()
            .map_err(|_| format!("coordinate index {} is too large", &snippet[digits..end]))?;
        bound = bound.max(index.saturating_add(1));
        at = close + 1;
    }
    Ok(bound)
}
