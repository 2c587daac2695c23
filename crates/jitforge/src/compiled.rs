//! Typed proxies over compiled native objects.

use jitforge_core::{FragmentKind, PropertyTable, Result as JitResult, UnknownProperty};
use jitforge_loader::NativeObject;

/// A compiled boundary predicate.
#[derive(Debug)]
pub struct CompiledSubDomain {
    object: NativeObject,
}

impl CompiledSubDomain {
    pub(crate) fn new(object: NativeObject) -> Self {
        debug_assert_eq!(object.kind(), FragmentKind::Predicate);
        Self { object }
    }

    /// Coordinates `x` must hold.
    pub fn input_dim(&self) -> usize {
        self.object.input_dim()
    }

    /// Whether `x` lies in the subdomain.
    ///
    /// # Errors
    ///
    /// `JitError::Dimension` if `x` is shorter than [`input_dim`](Self::input_dim).
    pub fn try_inside(&self, x: &[f64], on_boundary: bool) -> JitResult<bool> {
        self.object.inside(x, on_boundary)
    }

    /// Whether `x` lies in the subdomain.
    ///
    /// # Panics
    ///
    /// Panics if `x` is shorter than [`input_dim`](Self::input_dim), like an
    /// out-of-range slice index.
    pub fn inside(&self, x: &[f64], on_boundary: bool) -> bool {
        match self.try_inside(x, on_boundary) {
            Ok(inside) => inside,
            Err(err) => panic!("inside: {err}"),
        }
    }

    pub fn native(&self) -> &NativeObject {
        &self.object
    }

    pub fn into_native(self) -> NativeObject {
        self.object
    }
}

impl PropertyTable for CompiledSubDomain {
    fn get(&self, name: &str) -> Result<f64, UnknownProperty> {
        self.object.get(name)
    }

    fn set(&mut self, name: &str, value: f64) -> Result<(), UnknownProperty> {
        self.object.set(name, value)
    }
}

/// A compiled scalar or vector expression.
#[derive(Debug)]
pub struct CompiledExpression {
    object: NativeObject,
}

impl CompiledExpression {
    pub(crate) fn new(object: NativeObject) -> Self {
        debug_assert_eq!(object.kind(), FragmentKind::ExpressionBody);
        Self { object }
    }

    /// 0 for a scalar expression, 1 for a vector expression.
    pub fn value_rank(&self) -> usize {
        self.object.value_rank()
    }

    pub fn value_size(&self) -> usize {
        self.object.value_size()
    }

    /// Coordinates `x` must hold.
    pub fn input_dim(&self) -> usize {
        self.object.input_dim()
    }

    /// Writes the expression's components at `x` into `values`.
    ///
    /// # Errors
    ///
    /// `JitError::Dimension` if `x` is shorter than
    /// [`input_dim`](Self::input_dim) or `values` shorter than
    /// [`value_size`](Self::value_size).
    pub fn try_eval(&self, values: &mut [f64], x: &[f64]) -> JitResult<()> {
        self.object.eval(values, x)
    }

    /// Writes the expression's components at `x` into `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is shorter than [`value_size`](Self::value_size)
    /// or `x` shorter than [`input_dim`](Self::input_dim).
    pub fn eval(&self, values: &mut [f64], x: &[f64]) {
        if let Err(err) = self.try_eval(values, x) {
            panic!("eval: {err}");
        }
    }

    /// Evaluates at `x` into a fresh buffer.
    pub fn call(&self, x: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; self.value_size()];
        self.eval(&mut values, x);
        values
    }

    pub fn native(&self) -> &NativeObject {
        &self.object
    }

    pub fn into_native(self) -> NativeObject {
        self.object
    }
}

impl PropertyTable for CompiledExpression {
    fn get(&self, name: &str) -> Result<f64, UnknownProperty> {
        self.object.get(name)
    }

    fn set(&mut self, name: &str, value: f64) -> Result<(), UnknownProperty> {
        self.object.set(name, value)
    }
}
