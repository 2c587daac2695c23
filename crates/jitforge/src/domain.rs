//! Subdomains and expressions, compiled or user-supplied.
//!
//! Downstream code takes a [`SubDomain`] or an [`Expression`] and calls it
//! through [`Inside`] / [`Evaluate`] without caring whether the behavior is
//! native code from the cache or a Rust closure.

use std::fmt;

use jitforge_core::{MapPropertyTable, PropertyTable, Result, UnknownProperty};

use crate::compiled::{CompiledExpression, CompiledSubDomain};
use crate::compiler::JitCompiler;

/// Point-membership test.
pub trait Inside {
    fn inside(&self, x: &[f64], on_boundary: bool) -> bool;
}

/// Vector-valued evaluation into a caller-provided buffer.
pub trait Evaluate {
    /// 0 for scalar output, 1 for vector output.
    fn value_rank(&self) -> usize;

    fn value_size(&self) -> usize;

    fn eval(&self, values: &mut [f64], x: &[f64]);

    /// Evaluates at `x` into a fresh buffer of `value_size` components.
    fn call(&self, x: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; self.value_size()];
        self.eval(&mut values, x);
        values
    }
}

impl Inside for CompiledSubDomain {
    fn inside(&self, x: &[f64], on_boundary: bool) -> bool {
        CompiledSubDomain::inside(self, x, on_boundary)
    }
}

impl Evaluate for CompiledExpression {
    fn value_rank(&self) -> usize {
        CompiledExpression::value_rank(self)
    }

    fn value_size(&self) -> usize {
        CompiledExpression::value_size(self)
    }

    fn eval(&self, values: &mut [f64], x: &[f64]) {
        CompiledExpression::eval(self, values, x)
    }
}

type PredicateFn = dyn Fn(&[f64], bool, &MapPropertyTable) -> bool + Send + Sync;
type ExpressionFn = dyn Fn(&mut [f64], &[f64], &MapPropertyTable) + Send + Sync;

/// A predicate implemented by a Rust closure.
///
/// The closure receives the predicate's own property table, so it can be
/// parameterized the same way a compiled predicate is.
pub struct UserSuppliedPredicate {
    inside: Box<PredicateFn>,
    properties: MapPropertyTable,
}

impl UserSuppliedPredicate {
    pub fn new<F>(inside: F) -> Self
    where
        F: Fn(&[f64], bool) -> bool + Send + Sync + 'static,
    {
        Self::with_properties(MapPropertyTable::default(), move |x, b, _| inside(x, b))
    }

    pub fn with_properties<F>(properties: MapPropertyTable, inside: F) -> Self
    where
        F: Fn(&[f64], bool, &MapPropertyTable) -> bool + Send + Sync + 'static,
    {
        Self {
            inside: Box::new(inside),
            properties,
        }
    }
}

impl Inside for UserSuppliedPredicate {
    fn inside(&self, x: &[f64], on_boundary: bool) -> bool {
        (self.inside)(x, on_boundary, &self.properties)
    }
}

impl PropertyTable for UserSuppliedPredicate {
    fn get(&self, name: &str) -> std::result::Result<f64, UnknownProperty> {
        self.properties.get(name)
    }

    fn set(&mut self, name: &str, value: f64) -> std::result::Result<(), UnknownProperty> {
        self.properties.set(name, value)
    }
}

impl fmt::Debug for UserSuppliedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSuppliedPredicate")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// An expression implemented by a Rust closure with a fixed output size.
pub struct UserSuppliedExpression {
    value_size: usize,
    eval: Box<ExpressionFn>,
    properties: MapPropertyTable,
}

impl UserSuppliedExpression {
    /// # Panics
    ///
    /// Panics if `value_size` is zero.
    pub fn new<F>(value_size: usize, eval: F) -> Self
    where
        F: Fn(&mut [f64], &[f64]) + Send + Sync + 'static,
    {
        Self::with_properties(value_size, MapPropertyTable::default(), move |v, x, _| {
            eval(v, x)
        })
    }

    /// # Panics
    ///
    /// Panics if `value_size` is zero.
    pub fn with_properties<F>(value_size: usize, properties: MapPropertyTable, eval: F) -> Self
    where
        F: Fn(&mut [f64], &[f64], &MapPropertyTable) + Send + Sync + 'static,
    {
        assert!(value_size > 0, "an expression has at least one component");
        Self {
            value_size,
            eval: Box::new(eval),
            properties,
        }
    }
}

impl Evaluate for UserSuppliedExpression {
    fn value_rank(&self) -> usize {
        usize::from(self.value_size > 1)
    }

    fn value_size(&self) -> usize {
        self.value_size
    }

    fn eval(&self, values: &mut [f64], x: &[f64]) {
        assert!(
            values.len() >= self.value_size,
            "eval: output buffer holds {} values, expression produces {}",
            values.len(),
            self.value_size
        );
        (self.eval)(&mut values[..self.value_size], x, &self.properties)
    }
}

impl PropertyTable for UserSuppliedExpression {
    fn get(&self, name: &str) -> std::result::Result<f64, UnknownProperty> {
        self.properties.get(name)
    }

    fn set(&mut self, name: &str, value: f64) -> std::result::Result<(), UnknownProperty> {
        self.properties.set(name, value)
    }
}

impl fmt::Debug for UserSuppliedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSuppliedExpression")
            .field("value_size", &self.value_size)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// A subdomain: compiled from code, or supplied as a closure.
#[derive(Debug)]
pub enum SubDomain {
    Compiled(CompiledSubDomain),
    User(UserSuppliedPredicate),
}

impl SubDomain {
    /// Compiles `code` as a predicate.
    pub fn from_code(compiler: &JitCompiler, code: impl Into<String>) -> Result<Self> {
        compiler.compile_subdomain(code).map(Self::Compiled)
    }

    pub fn from_fn<F>(inside: F) -> Self
    where
        F: Fn(&[f64], bool) -> bool + Send + Sync + 'static,
    {
        Self::User(UserSuppliedPredicate::new(inside))
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Compiled(_))
    }
}

impl Inside for SubDomain {
    fn inside(&self, x: &[f64], on_boundary: bool) -> bool {
        match self {
            Self::Compiled(s) => Inside::inside(s, x, on_boundary),
            Self::User(s) => s.inside(x, on_boundary),
        }
    }
}

impl PropertyTable for SubDomain {
    fn get(&self, name: &str) -> std::result::Result<f64, UnknownProperty> {
        match self {
            Self::Compiled(s) => s.get(name),
            Self::User(s) => s.get(name),
        }
    }

    fn set(&mut self, name: &str, value: f64) -> std::result::Result<(), UnknownProperty> {
        match self {
            Self::Compiled(s) => s.set(name, value),
            Self::User(s) => s.set(name, value),
        }
    }
}

impl From<CompiledSubDomain> for SubDomain {
    fn from(s: CompiledSubDomain) -> Self {
        Self::Compiled(s)
    }
}

impl From<UserSuppliedPredicate> for SubDomain {
    fn from(s: UserSuppliedPredicate) -> Self {
        Self::User(s)
    }
}

/// An expression: compiled from snippets, or supplied as a closure.
#[derive(Debug)]
pub enum Expression {
    Compiled(CompiledExpression),
    User(UserSuppliedExpression),
}

impl Expression {
    /// Compiles one snippet per component, with property defaults.
    pub fn from_code<I, S, P, K>(compiler: &JitCompiler, snippets: I, properties: P) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        compiler
            .compile_expression(snippets, properties)
            .map(Self::Compiled)
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Compiled(_))
    }
}

impl Evaluate for Expression {
    fn value_rank(&self) -> usize {
        match self {
            Self::Compiled(e) => Evaluate::value_rank(e),
            Self::User(e) => e.value_rank(),
        }
    }

    fn value_size(&self) -> usize {
        match self {
            Self::Compiled(e) => Evaluate::value_size(e),
            Self::User(e) => e.value_size(),
        }
    }

    fn eval(&self, values: &mut [f64], x: &[f64]) {
        match self {
            Self::Compiled(e) => Evaluate::eval(e, values, x),
            Self::User(e) => e.eval(values, x),
        }
    }
}

impl PropertyTable for Expression {
    fn get(&self, name: &str) -> std::result::Result<f64, UnknownProperty> {
        match self {
            Self::Compiled(e) => e.get(name),
            Self::User(e) => e.get(name),
        }
    }

    fn set(&mut self, name: &str, value: f64) -> std::result::Result<(), UnknownProperty> {
        match self {
            Self::Compiled(e) => e.set(name, value),
            Self::User(e) => e.set(name, value),
        }
    }
}

impl From<CompiledExpression> for Expression {
    fn from(e: CompiledExpression) -> Self {
        Self::Compiled(e)
    }
}

impl From<UserSuppliedExpression> for Expression {
    fn from(e: UserSuppliedExpression) -> Self {
        Self::User(e)
    }
}
