use crate::cache::{CacheConfig, CompilationCache};
use crate::target::Target;

/// State owned by one execution worker.
///
/// Each worker thread constructs its own context; the cache inside is never shared, so
/// there is no locking on the lookup path.
pub struct WorkerContext {
    target: Target,
    cache: CompilationCache,
}

impl WorkerContext {
    pub fn new(target: Target) -> Self {
        Self::with_cache(target, CompilationCache::new())
    }

    pub fn with_config(target: Target, config: CacheConfig) -> Self {
        Self::with_cache(target, CompilationCache::with_config(config))
    }

    pub fn with_cache(target: Target, cache: CompilationCache) -> Self {
        Self { target, cache }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn cache(&self) -> &CompilationCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CompilationCache {
        &mut self.cache
    }
}
