use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use super::Compiler;
use crate::error::{CompileError, CompileResult};
use crate::target::Target;

/// Constructs a backend compiler for a target.
pub type CompilerFactory = Arc<dyn Fn(&Target) -> CompileResult<Arc<dyn Compiler>> + Send + Sync>;

struct CompilerRegistry {
    factories: RwLock<HashMap<String, CompilerFactory>>,
}

impl CompilerRegistry {
    fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    fn register(&self, backend: &str, factory: CompilerFactory) {
        self.factories
            .write()
            .expect("compiler registry poisoned")
            .insert(backend.to_string(), factory);
    }

    fn get(&self, backend: &str) -> Option<CompilerFactory> {
        self.factories
            .read()
            .expect("compiler registry poisoned")
            .get(backend)
            .cloned()
    }

    fn list(&self) -> Vec<String> {
        let mut backends: Vec<String> = self
            .factories
            .read()
            .expect("compiler registry poisoned")
            .keys()
            .cloned()
            .collect();
        backends.sort();
        backends
    }
}

static GLOBAL_REGISTRY: OnceLock<CompilerRegistry> = OnceLock::new();

fn registry() -> &'static CompilerRegistry {
    GLOBAL_REGISTRY.get_or_init(CompilerRegistry::new)
}

/// Registers (or replaces) the compiler factory for a backend name.
pub fn register_compiler<F>(backend: &str, factory: F)
where
    F: Fn(&Target) -> CompileResult<Arc<dyn Compiler>> + Send + Sync + 'static,
{
    registry().register(backend, Arc::new(factory));
}

pub fn has_compiler(backend: &str) -> bool {
    registry().get(backend).is_some()
}

pub fn list_compilers() -> Vec<String> {
    registry().list()
}

/// Creates a fresh backend compiler for `target`, dispatching on `target.backend()`.
pub fn create_compiler(target: &Target) -> CompileResult<Arc<dyn Compiler>> {
    let factory = registry()
        .get(target.backend())
        .ok_or_else(|| CompileError::UnknownBackend(target.backend().to_string()))?;
    tracing::debug!(backend = target.backend(), "creating backend compiler for {target}");
    factory(target)
}
