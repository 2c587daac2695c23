//! Live native objects produced by artifact factories.

use std::ffi::CString;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

use jitforge_core::abi::{JitObject, JitVTable, ABI_VERSION};
use jitforge_core::{FragmentKind, JitError, PropertyTable, Result, UnknownProperty};
use libloading::Library;

/// One instance created by a factory call. Owned exclusively by the caller.
///
/// Keeps its library mapped for as long as it lives and releases the native
/// instance through the vtable's `destroy` on drop.
pub struct NativeObject {
    ptr: NonNull<JitObject>,
    kind: FragmentKind,
    _library: Arc<Library>,
}

// SAFETY: the object is uniquely owned. Entry points taking `&self` only read
// native state; the only native mutation (`set_property`) requires `&mut self`.
unsafe impl Send for NativeObject {}
unsafe impl Sync for NativeObject {}

impl NativeObject {
    /// Validates and takes ownership of a freshly created object.
    ///
    /// # Safety
    ///
    /// `ptr` must come from a factory exported by `library` and must not be
    /// owned by anything else.
    pub(crate) unsafe fn from_raw(
        ptr: *mut JitObject,
        library: Arc<Library>,
        path: &Path,
    ) -> Result<Self> {
        let load_err = |reason: &str| JitError::Load {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let ptr = NonNull::new(ptr).ok_or_else(|| load_err("factory returned null"))?;
        let vtable = unsafe { ptr.as_ref().vtable.as_ref() }
            .ok_or_else(|| load_err("object has no vtable"))?;

        let kind = match check_vtable(vtable) {
            Ok(kind) => kind,
            Err(reason) => {
                // Without a destroy entry the instance leaks.
                if let Some(destroy) = vtable.destroy {
                    unsafe { destroy(ptr.as_ptr()) };
                }
                return Err(load_err(&reason));
            }
        };

        Ok(Self {
            ptr,
            kind,
            _library: library,
        })
    }

    fn object(&self) -> &JitObject {
        // SAFETY: ptr is valid until drop.
        unsafe { self.ptr.as_ref() }
    }

    fn vtable(&self) -> &JitVTable {
        // SAFETY: checked non-null in from_raw; vtables are static in the library.
        unsafe { &*self.object().vtable }
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    /// 0 for scalar output, 1 for vector output; 0 for predicates.
    pub fn value_rank(&self) -> usize {
        self.object().value_rank
    }

    /// Number of output components; 0 for predicates.
    pub fn value_size(&self) -> usize {
        self.object().value_size
    }

    /// Coordinates the entry point reads; `x` must hold at least this many.
    pub fn input_dim(&self) -> usize {
        self.object().input_dim
    }

    fn check_input(&self, x: &[f64]) -> Result<()> {
        if x.len() < self.input_dim() {
            return Err(JitError::Dimension {
                what: "x",
                needed: self.input_dim(),
                got: x.len(),
            });
        }
        Ok(())
    }

    /// Evaluates the predicate at `x`.
    ///
    /// # Errors
    ///
    /// `JitError::WrongKind` if this object is an expression and
    /// `JitError::Dimension` if `x` is shorter than [`input_dim`](Self::input_dim).
    pub fn inside(&self, x: &[f64], on_boundary: bool) -> Result<bool> {
        let inside = self.vtable().inside.ok_or(JitError::WrongKind {
            operation: "inside",
            found: self.kind.tag(),
        })?;
        self.check_input(x)?;
        // SAFETY: the generated code reads x[..input_dim] only.
        Ok(unsafe { inside(self.ptr.as_ptr(), x.as_ptr(), x.len(), on_boundary) })
    }

    /// Evaluates the expression at `x` into `values[..value_size]`.
    ///
    /// # Errors
    ///
    /// `JitError::WrongKind` if this object is a predicate and
    /// `JitError::Dimension` if `x` is shorter than [`input_dim`](Self::input_dim)
    /// or `values` shorter than [`value_size`](Self::value_size).
    pub fn eval(&self, values: &mut [f64], x: &[f64]) -> Result<()> {
        let eval = self.vtable().eval.ok_or(JitError::WrongKind {
            operation: "eval",
            found: self.kind.tag(),
        })?;
        self.check_input(x)?;
        if values.len() < self.value_size() {
            return Err(JitError::Dimension {
                what: "values",
                needed: self.value_size(),
                got: values.len(),
            });
        }
        // SAFETY: writes values[..value_size] and reads x[..input_dim] only.
        unsafe { eval(self.ptr.as_ptr(), values.as_mut_ptr(), x.as_ptr(), x.len()) };
        Ok(())
    }
}

impl PropertyTable for NativeObject {
    fn get(&self, name: &str) -> std::result::Result<f64, UnknownProperty> {
        let unknown = || UnknownProperty(name.to_string());
        let c_name = CString::new(name).map_err(|_| unknown())?;
        let get = self.vtable().get_property.ok_or_else(unknown)?;
        let mut out = 0.0;
        let found = unsafe { get(self.ptr.as_ptr(), c_name.as_ptr(), &mut out) };
        if found != 0 {
            Ok(out)
        } else {
            Err(unknown())
        }
    }

    fn set(&mut self, name: &str, value: f64) -> std::result::Result<(), UnknownProperty> {
        let unknown = || UnknownProperty(name.to_string());
        let c_name = CString::new(name).map_err(|_| unknown())?;
        let set = self.vtable().set_property.ok_or_else(unknown)?;
        let found = unsafe { set(self.ptr.as_ptr(), c_name.as_ptr(), value) };
        if found != 0 {
            Ok(())
        } else {
            Err(unknown())
        }
    }
}

impl Drop for NativeObject {
    fn drop(&mut self) {
        if let Some(destroy) = self.vtable().destroy {
            // SAFETY: we own the object; it is not used after this call.
            unsafe { destroy(self.ptr.as_ptr()) };
        }
    }
}

impl std::fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeObject")
            .field("kind", &self.kind)
            .field("value_rank", &self.value_rank())
            .field("value_size", &self.value_size())
            .field("input_dim", &self.input_dim())
            .finish()
    }
}

fn check_vtable(vtable: &JitVTable) -> std::result::Result<FragmentKind, String> {
    if vtable.abi_version != ABI_VERSION {
        return Err(format!(
            "ABI version {} does not match {}",
            vtable.abi_version, ABI_VERSION
        ));
    }
    let kind = match vtable.kind {
        0 => FragmentKind::Predicate,
        1 => FragmentKind::ExpressionBody,
        other => return Err(format!("unknown object kind {other}")),
    };
    let entry_ok = match kind {
        FragmentKind::Predicate => vtable.inside.is_some(),
        FragmentKind::ExpressionBody => vtable.eval.is_some(),
    };
    if !entry_ok {
        return Err(format!("{kind:?} vtable lacks its entry point"));
    }
    if vtable.get_property.is_none() || vtable.set_property.is_none() || vtable.destroy.is_none() {
        return Err("vtable lacks property accessors or destroy".to_string());
    }
    Ok(kind)
}
