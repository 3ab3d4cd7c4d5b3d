//! Compiler-backend capability consumed by [`CompiledArtifact`](crate::CompiledArtifact).
//!
//! A backend is created per target through the compiler registry, receives lowered
//! modules through [`Compiler::build`], and resolves symbol names to entry-point
//! addresses through [`Compiler::lookup`].

mod registry;

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use crate::error::CompileResult;
use crate::target::Target;

pub use registry::{
    create_compiler, has_compiler, list_compilers, register_compiler, CompilerFactory,
};

/// Non-null address of a resolved entry point inside a compiled module.
///
/// The address stays valid for as long as the [`Compiler`] that produced it is alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FnAddr(NonNull<c_void>);

// SAFETY: an FnAddr is a code address; it carries no thread affinity of its own.
unsafe impl Send for FnAddr {}
unsafe impl Sync for FnAddr {}

impl FnAddr {
    pub fn new(ptr: *const c_void) -> Option<Self> {
        NonNull::new(ptr as *mut c_void).map(Self)
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0.as_ptr()
    }

    /// Reinterprets the address as a concrete function pointer type.
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the ABI and signature of the
    /// symbol this address was resolved from.
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*const c_void>()
        );
        std::mem::transmute_copy(&self.0.as_ptr())
    }
}

impl fmt::Debug for FnAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnAddr({:p})", self.0.as_ptr())
    }
}

/// Lowered program text handed to a backend for building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredModule {
    pub name: String,
    pub source: String,
}

impl LoweredModule {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

pub trait Compiler: Send + Sync {
    fn target(&self) -> &Target;

    /// Builds and links a lowered module so its symbols become resolvable.
    fn build(&self, module: &LoweredModule) -> CompileResult<()>;

    /// Resolves a symbol; `None` when no built module exports it.
    fn lookup(&self, symbol: &str) -> Option<FnAddr>;
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn double(x: i32) -> i32 {
        x * 2
    }

    #[test]
    fn fn_addr_rejects_null() {
        assert!(FnAddr::new(std::ptr::null()).is_none());
    }

    #[test]
    fn fn_addr_casts_back_to_callable() {
        let addr = FnAddr::new(double as *const c_void).expect("non-null");
        let f: extern "C" fn(i32) -> i32 = unsafe { addr.cast() };
        assert_eq!(f(21), 42);
    }
}
