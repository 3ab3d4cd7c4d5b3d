use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compiler::FnAddr;

/// Where the runtime value for a symbolic kernel parameter comes from at launch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolArgBinding {
    /// Dimension `dim_idx` of tensor argument `arg_idx`.
    Dim { arg_idx: usize, dim_idx: usize },
    /// Element `value_idx` of integer tensor argument `arg_idx`.
    Value { arg_idx: usize, value_idx: usize },
}

impl SymbolArgBinding {
    pub fn arg_idx(&self) -> usize {
        match *self {
            SymbolArgBinding::Dim { arg_idx, .. } | SymbolArgBinding::Value { arg_idx, .. } => {
                arg_idx
            }
        }
    }
}

/// Parameter slot index to binding; ordered so launchers can walk slots in order.
pub type SymbolArgBindings = BTreeMap<usize, SymbolArgBinding>;

/// Everything an execution engine needs to launch a compiled fusion group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    pub host_fn: FnAddr,
    pub infer_fn: FnAddr,
    /// Secondary-architecture fallback; only present when requested and exported.
    pub x86_fn: Option<FnAddr>,
    pub symbol_arg_bindings: SymbolArgBindings,
    pub temp_buffer_sizes: Vec<u64>,
}

impl KernelInfo {
    pub fn temp_space_bytes(&self) -> u64 {
        self.temp_buffer_sizes.iter().sum()
    }
}
