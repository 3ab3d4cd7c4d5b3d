//! Memoization of compilation outcomes by fusion signature.
//!
//! A cache belongs to one worker; [`CompilationCache`] is deliberately `!Send`. Identical
//! signatures seen by different workers are compiled once per worker. No eviction: the
//! number of distinct fusion shapes is bounded by program structure, not iteration count.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::artifact::CompiledArtifact;
use crate::env;
use crate::error::CompileResult;
use crate::kernel_info::KernelInfo;
use crate::outcome::{CompilationOutcome, SharedOutcome};
use crate::signature::FusionSignature;
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false, [`CompilationCache::get_or_compile`] always builds and never stores.
    pub enabled: bool,
}

impl CacheConfig {
    /// Reads `FUSERS_DISABLE_COMPILE_CACHE`.
    pub fn from_env() -> Self {
        Self {
            enabled: !env::compile_cache_disabled(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Counters maintained by [`CompilationCache::get_or_compile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub compiles: u64,
    pub failures: u64,
}

pub struct CompilationCache {
    config: CacheConfig,
    entries: HashMap<FusionSignature, SharedOutcome>,
    stats: CacheStats,
}

impl CompilationCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::from_env())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn has(&self, key: &FusionSignature) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the stored outcome.
    ///
    /// # Panics
    /// If `key` is absent; check [`has`](Self::has) first.
    pub fn get(&self, key: &FusionSignature) -> &SharedOutcome {
        match self.entries.get(key) {
            Some(outcome) => outcome,
            None => panic!("no compilation outcome cached for {key:?}; check has() first"),
        }
    }

    /// Inserts or replaces the outcome for `key`. A replaced outcome is dropped unless
    /// another owner still holds it.
    pub fn insert(&mut self, key: FusionSignature, value: SharedOutcome) {
        tracing::debug!(fingerprint = key.fingerprint(), "inserting compilation outcome");
        if let Some(previous) = self.entries.insert(key, value) {
            tracing::debug!(
                other_owners = Rc::strong_count(&previous) - 1,
                "replaced compilation outcome"
            );
        }
    }

    /// Drops every entry and resets the counters. Outcomes held elsewhere stay alive.
    pub fn clear(&mut self) {
        tracing::debug!(entries = self.entries.len(), "clearing compilation cache");
        self.entries.clear();
        self.stats = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Launch record for a cached signature.
    ///
    /// # Panics
    /// If `key` is absent or its outcome has no artifact yet.
    pub fn kernel_info(&self, key: &FusionSignature) -> CompileResult<KernelInfo> {
        self.get(key).kernel_info()
    }

    /// Returns the cached outcome for `key`, compiling and inserting it on a miss.
    ///
    /// A hit whose stored outcome was created with a different `need_x86_kernel` yields a
    /// fresh outcome sharing the stored artifact, so the returned launch record always
    /// honors the requested flag.
    ///
    /// `build` receives the signature's target and must produce a built artifact. Its
    /// error is returned as-is and leaves the cache untouched, so a later call for the
    /// same signature compiles again.
    pub fn get_or_compile<F>(
        &mut self,
        key: &FusionSignature,
        need_x86_kernel: bool,
        build: F,
    ) -> CompileResult<SharedOutcome>
    where
        F: FnOnce(&Target) -> CompileResult<CompiledArtifact>,
    {
        if self.config.enabled {
            if let Some(found) = self.entries.get(key) {
                self.stats.hits += 1;
                tracing::debug!(fingerprint = key.fingerprint(), "compilation cache hit");
                if found.need_x86_kernel() != need_x86_kernel {
                    if let Some(artifact) = found.artifact() {
                        // Same compiled code, different launch record: view it with the
                        // requested flag without touching the stored outcome.
                        let view =
                            CompilationOutcome::shared(key.target().clone(), need_x86_kernel);
                        view.set_artifact(artifact);
                        return Ok(view);
                    }
                }
                return Ok(Rc::clone(found));
            }
        }
        self.stats.misses += 1;
        tracing::debug!(fingerprint = key.fingerprint(), "compilation cache miss");

        let artifact = match build(key.target()) {
            Ok(artifact) => artifact,
            Err(err) => {
                self.stats.failures += 1;
                tracing::warn!(signature = ?key, error = %err, "fusion group compilation failed");
                return Err(err);
            }
        };
        self.stats.compiles += 1;

        let outcome = CompilationOutcome::shared(key.target().clone(), need_x86_kernel);
        outcome.set_artifact(Arc::new(artifact));
        if self.config.enabled {
            self.insert(key.clone(), Rc::clone(&outcome));
        }
        Ok(outcome)
    }
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new()
    }
}
