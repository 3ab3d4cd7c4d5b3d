use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::compiler::{create_compiler, Compiler, FnAddr};
use crate::error::{CompileError, CompileResult};
use crate::kernel_info::{KernelInfo, SymbolArgBindings};
use crate::target::Target;

/// Suffix appended to the host entry point to name the secondary-architecture kernel.
pub const X86_KERNEL_SUFFIX: &str = "_x86";

/// Compiled code for exactly one (target, fusion group) pair.
///
/// Owns the backend compiler handle; every address it hands out stays valid while
/// the artifact (or a clone of [`compiler`](Self::compiler)) is alive. Addresses are
/// resolved on first use and memoized.
pub struct CompiledArtifact {
    target: Target,
    host_fn_name: String,
    infer_fn_name: String,
    symbol_args: SymbolArgBindings,
    temp_space_sizes: Vec<u64>,
    compiler: Arc<dyn Compiler>,
    host_fn: OnceLock<FnAddr>,
    infer_fn: OnceLock<FnAddr>,
    x86_fn: OnceLock<FnAddr>,
}

impl CompiledArtifact {
    /// Creates the backend compiler for `target` right away. This is the expensive step
    /// the compilation cache amortizes; a failure here is returned and never cached.
    pub fn new(
        target: &Target,
        host_fn_name: impl Into<String>,
        infer_fn_name: impl Into<String>,
        symbol_args: SymbolArgBindings,
        temp_space_sizes: Vec<u64>,
    ) -> CompileResult<Self> {
        let compiler = create_compiler(target)?;
        Ok(Self::with_compiler(
            compiler,
            host_fn_name,
            infer_fn_name,
            symbol_args,
            temp_space_sizes,
        ))
    }

    /// Wraps an already created backend compiler.
    pub fn with_compiler(
        compiler: Arc<dyn Compiler>,
        host_fn_name: impl Into<String>,
        infer_fn_name: impl Into<String>,
        symbol_args: SymbolArgBindings,
        temp_space_sizes: Vec<u64>,
    ) -> Self {
        Self {
            target: compiler.target().clone(),
            host_fn_name: host_fn_name.into(),
            infer_fn_name: infer_fn_name.into(),
            symbol_args,
            temp_space_sizes,
            compiler,
            host_fn: OnceLock::new(),
            infer_fn: OnceLock::new(),
            x86_fn: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn host_fn_name(&self) -> &str {
        &self.host_fn_name
    }

    pub fn infer_fn_name(&self) -> &str {
        &self.infer_fn_name
    }

    pub fn x86_fn_name(&self) -> String {
        format!("{}{X86_KERNEL_SUFFIX}", self.host_fn_name)
    }

    pub fn symbol_args(&self) -> &SymbolArgBindings {
        &self.symbol_args
    }

    pub fn temp_space_sizes(&self) -> &[u64] {
        &self.temp_space_sizes
    }

    pub fn compiler(&self) -> &Arc<dyn Compiler> {
        &self.compiler
    }

    pub fn host_fn(&self) -> CompileResult<FnAddr> {
        self.resolve(&self.host_fn, &self.host_fn_name)
            .ok_or_else(|| CompileError::missing_symbol(&self.host_fn_name))
    }

    pub fn infer_fn(&self) -> CompileResult<FnAddr> {
        self.resolve(&self.infer_fn, &self.infer_fn_name)
            .ok_or_else(|| CompileError::missing_symbol(&self.infer_fn_name))
    }

    /// The secondary-architecture kernel is optional; a module without it yields `None`.
    pub fn x86_fn(&self) -> Option<FnAddr> {
        self.resolve(&self.x86_fn, &self.x86_fn_name())
    }

    /// Assembles the launch record. The secondary kernel is only looked up when
    /// `need_x86_kernel` is set.
    pub fn generate_kernel_info(&self, need_x86_kernel: bool) -> CompileResult<KernelInfo> {
        let x86_fn = if need_x86_kernel { self.x86_fn() } else { None };
        Ok(KernelInfo {
            host_fn: self.host_fn()?,
            infer_fn: self.infer_fn()?,
            x86_fn,
            symbol_arg_bindings: self.symbol_args.clone(),
            temp_buffer_sizes: self.temp_space_sizes.clone(),
        })
    }

    fn resolve(&self, slot: &OnceLock<FnAddr>, symbol: &str) -> Option<FnAddr> {
        if let Some(addr) = slot.get() {
            return Some(*addr);
        }
        tracing::debug!(symbol, "resolving kernel symbol");
        let addr = self.compiler.lookup(symbol)?;
        Some(*slot.get_or_init(|| addr))
    }
}

impl fmt::Debug for CompiledArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledArtifact")
            .field("target", &self.target)
            .field("host_fn_name", &self.host_fn_name)
            .field("infer_fn_name", &self.infer_fn_name)
            .field("symbol_args", &self.symbol_args)
            .field("temp_space_sizes", &self.temp_space_sizes)
            .finish_non_exhaustive()
    }
}
