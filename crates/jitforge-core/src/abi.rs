//! Native extension-point interface.
//!
//! Every generated unit starts with [`C_PRELUDE`], which declares the
//! `jit_vtable` / `jit_object` pair. The `#[repr(C)]` types below mirror
//! those declarations field for field; changing one side without the other
//! (and without bumping [`ABI_VERSION`]) breaks every cached artifact.
//!
//! # Object Layout
//!
//! ```text
//! jit_object*  ──► { vtable*, value_rank, value_size, input_dim }   // base
//!                  { double <prop>; ... }                // generated fields
//! ```
//!
//! The factory `create_<signature>()` heap-allocates one object and returns
//! a pointer to its base. `destroy` frees it.

use std::os::raw::{c_char, c_int, c_uint};

/// Version stamped into every generated vtable.
pub const ABI_VERSION: u32 = 1;

/// Predicate entry: `inside(self, x, dim, on_boundary)`.
pub type InsideFn = unsafe extern "C" fn(*const JitObject, *const f64, usize, bool) -> bool;

/// Expression entry: `eval(self, values, x, dim)`.
pub type EvalFn = unsafe extern "C" fn(*const JitObject, *mut f64, *const f64, usize);

/// Returns 1 and writes `*out` when `name` matches a property, else 0.
pub type GetPropertyFn = unsafe extern "C" fn(*const JitObject, *const c_char, *mut f64) -> c_int;

/// Returns 1 when `name` matches a property and it was updated, else 0.
pub type SetPropertyFn = unsafe extern "C" fn(*mut JitObject, *const c_char, f64) -> c_int;

pub type DestroyFn = unsafe extern "C" fn(*mut JitObject);

/// Exported factory: `create_<signature>()`.
pub type FactoryFn = unsafe extern "C" fn() -> *mut JitObject;

/// Mirror of `jit_vtable`.
#[repr(C)]
#[derive(Debug)]
pub struct JitVTable {
    pub abi_version: c_uint,
    pub kind: c_uint,
    pub inside: Option<InsideFn>,
    pub eval: Option<EvalFn>,
    pub get_property: Option<GetPropertyFn>,
    pub set_property: Option<SetPropertyFn>,
    pub destroy: Option<DestroyFn>,
}

/// Mirror of the `jit_object` base every generated type embeds first.
#[repr(C)]
#[derive(Debug)]
pub struct JitObject {
    pub vtable: *const JitVTable,
    pub value_rank: usize,
    pub value_size: usize,
    /// Coordinates `x` must hold: one past the highest `x[N]` the code reads.
    pub input_dim: usize,
}

/// Declarations shared by every generated unit.
pub const C_PRELUDE: &str = r#"#if defined _WIN32 || defined __CYGWIN__
  #ifdef __GNUC__
    #define JIT_EXPORT __attribute__ ((dllexport))
  #else
    #define JIT_EXPORT __declspec(dllexport)
  #endif
#else
  #define JIT_EXPORT __attribute__ ((visibility ("default")))
#endif

#include <math.h>
#include <stdbool.h>
#include <stddef.h>
#include <stdlib.h>
#include <string.h>

#define JIT_EPS 3.0e-16

typedef struct jit_object jit_object;

typedef struct jit_vtable
{
  unsigned int abi_version;
  unsigned int kind;
  bool (*inside)(const jit_object *self, const double *x, size_t dim, bool on_boundary);
  void (*eval)(const jit_object *self, double *values, const double *x, size_t dim);
  int (*get_property)(const jit_object *self, const char *name, double *out);
  int (*set_property)(jit_object *self, const char *name, double value);
  void (*destroy)(jit_object *self);
} jit_vtable;

struct jit_object
{
  const jit_vtable *vtable;
  size_t value_rank;
  size_t value_size;
  size_t input_dim;
};

static inline bool near(double a, double b)
{
  return fabs(a - b) < JIT_EPS;
}

static inline bool between(double v, double lo, double hi)
{
  return v >= lo - JIT_EPS && v <= hi + JIT_EPS;
}
"#;
