//! Per-worker memoization of compiled fusion groups.
//!
//! A fusion group is identified by a [`FusionSignature`]. The first time a worker sees
//! a signature it compiles the group into a [`CompiledArtifact`], wraps it in a
//! [`CompilationOutcome`], and stores it in its [`CompilationCache`]; later requests
//! read [`KernelInfo`] straight from the cache.

pub mod artifact;
pub mod cache;
pub mod compiler;
pub mod context;
mod env;
pub mod error;
pub mod hashing;
pub mod kernel_info;
pub mod outcome;
pub mod signature;
pub mod target;

pub use artifact::{CompiledArtifact, X86_KERNEL_SUFFIX};
pub use cache::{CacheConfig, CacheStats, CompilationCache};
pub use compiler::{Compiler, FnAddr, LoweredModule};
pub use context::WorkerContext;
pub use error::{CompileError, CompileResult};
pub use kernel_info::{KernelInfo, SymbolArgBinding, SymbolArgBindings};
pub use outcome::{CompilationOutcome, SharedOutcome};
pub use signature::{DimExpr, FusedOp, FusionSignature};
pub use target::{Arch, Target};
