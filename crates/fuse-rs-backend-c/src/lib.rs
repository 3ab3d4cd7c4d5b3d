//! Compiler backend that builds lowered C modules into shared libraries.
//!
//! Sources are written into a cache directory keyed by a fingerprint of the target
//! and the module text; an existing library for the same fingerprint is loaded
//! without invoking the C compiler again.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use fuse_rs::compiler::register_compiler;
use fuse_rs::hashing::{fnv1a_bytes, fnv1a_hash};
use fuse_rs::{CompileError, CompileResult, Compiler, FnAddr, LoweredModule, Target};
use libloading::Library;

pub const BACKEND_NAME: &str = "c";

static NEXT_STAGING_ID: AtomicU64 = AtomicU64::new(0);

struct LoadedModule {
    name: String,
    lib: Library,
}

pub struct CCompiler {
    target: Target,
    cache_dir: PathBuf,
    modules: Mutex<Vec<LoadedModule>>,
}

impl CCompiler {
    pub fn new(target: Target) -> Self {
        Self::with_cache_dir(target, default_cache_dir())
    }

    pub fn with_cache_dir(target: Target, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            cache_dir: cache_dir.into(),
            modules: Mutex::new(Vec::new()),
        }
    }

    /// True when the configured C compiler can be launched.
    pub fn is_available() -> bool {
        Command::new(c_compiler())
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Names of the modules built so far, oldest first.
    pub fn module_names(&self) -> Vec<String> {
        self.modules
            .lock()
            .expect("c compiler module list poisoned")
            .iter()
            .map(|module| module.name.clone())
            .collect()
    }

    fn fingerprint(&self, module: &LoweredModule) -> u64 {
        let hash = fnv1a_hash(&self.target.digest().to_le_bytes());
        fnv1a_bytes(hash, module.source.as_bytes())
    }
}

impl Compiler for CCompiler {
    fn target(&self) -> &Target {
        &self.target
    }

    fn build(&self, module: &LoweredModule) -> CompileResult<()> {
        let fingerprint = self.fingerprint(module);
        std::fs::create_dir_all(&self.cache_dir)?;

        let lib_path = self
            .cache_dir
            .join(format!("libfuse_rs_c_{fingerprint:016x}{}", lib_ext()));
        if lib_path.exists() {
            tracing::debug!(
                module = %module.name,
                path = %lib_path.display(),
                "reusing compiled C module"
            );
        } else {
            let src_path = self.cache_dir.join(format!("module_{fingerprint:016x}.c"));
            compile_staged(&module.source, &src_path, &lib_path)?;
            tracing::debug!(
                module = %module.name,
                path = %lib_path.display(),
                "compiled C module"
            );
        }

        let lib = unsafe { Library::new(&lib_path) }
            .map_err(|err| CompileError::backend(err.to_string()))?;
        self.modules
            .lock()
            .expect("c compiler module list poisoned")
            .push(LoadedModule {
                name: module.name.clone(),
                lib,
            });
        Ok(())
    }

    fn lookup(&self, symbol: &str) -> Option<FnAddr> {
        let modules = self.modules.lock().expect("c compiler module list poisoned");
        modules.iter().rev().find_map(|module| {
            let addr = unsafe { module.lib.get::<*const c_void>(symbol.as_bytes()) }
                .map(|sym| *sym)
                .ok()?;
            FnAddr::new(addr)
        })
    }
}

/// Registers the C backend under [`BACKEND_NAME`], building into `FUSERS_C_CACHE_DIR`
/// (or `<tmp>/fuse_rs_c_backend`).
pub fn register_c_compiler() {
    register_c_compiler_with_cache_dir(default_cache_dir());
}

/// Registers the C backend under [`BACKEND_NAME`], building into `cache_dir`.
pub fn register_c_compiler_with_cache_dir(cache_dir: impl Into<PathBuf>) {
    let cache_dir = cache_dir.into();
    register_compiler(BACKEND_NAME, move |target| {
        Ok(Arc::new(CCompiler::with_cache_dir(target.clone(), cache_dir.clone()))
            as Arc<dyn Compiler>)
    });
}

fn default_cache_dir() -> PathBuf {
    match std::env::var_os("FUSERS_C_CACHE_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join("fuse_rs_c_backend"),
    }
}

fn c_compiler() -> String {
    std::env::var("CC").unwrap_or_else(|_| "cc".to_string())
}

fn lib_ext() -> &'static str {
    if cfg!(target_os = "macos") {
        ".dylib"
    } else if cfg!(target_os = "windows") {
        ".dll"
    } else {
        ".so"
    }
}

// Workers compile independently, so two of them may race on the same fingerprint;
// each compiles into its own staging file and renames it into place.
fn staging_path(lib_path: &Path) -> PathBuf {
    let id = NEXT_STAGING_ID.fetch_add(1, Ordering::Relaxed);
    let mut name = lib_path.as_os_str().to_owned();
    name.push(format!(".{}.{id}.tmp", std::process::id()));
    PathBuf::from(name)
}

// Leaves nothing behind in the cache dir when compilation or the final rename fails.
fn compile_staged(source: &str, src_path: &Path, lib_path: &Path) -> CompileResult<()> {
    let staging = staging_path(lib_path);
    let mut staging_src = staging.as_os_str().to_owned();
    staging_src.push(".c");
    let staging_src = PathBuf::from(staging_src);

    let result = std::fs::write(&staging_src, source)
        .map_err(CompileError::from)
        .and_then(|()| compile_c(&staging_src, &staging))
        .and_then(|()| std::fs::rename(&staging, lib_path).map_err(CompileError::from));
    match result {
        Ok(()) => {
            let _ = std::fs::rename(&staging_src, src_path);
            Ok(())
        }
        Err(err) => {
            let _ = std::fs::remove_file(&staging);
            let _ = std::fs::remove_file(&staging_src);
            Err(err)
        }
    }
}

fn compile_c(src: &Path, out: &Path) -> CompileResult<()> {
    let mut cmd = Command::new(c_compiler());
    if cfg!(target_os = "macos") {
        cmd.arg("-dynamiclib");
    } else {
        cmd.arg("-shared").arg("-fPIC");
    }
    cmd.arg("-O2");
    cmd.arg("-o").arg(out).arg(src);
    if !cfg!(target_os = "windows") {
        cmd.arg("-lm");
    }

    let output = cmd.output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CompileError::backend(format!("C compiler failed: {stderr}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuse_rs::Arch;

    #[test]
    fn fingerprint_depends_on_source_and_target() {
        let x86 = CCompiler::with_cache_dir(Target::new(BACKEND_NAME, Arch::X86), "/unused");
        let arm = CCompiler::with_cache_dir(Target::new(BACKEND_NAME, Arch::Arm), "/unused");
        let a = LoweredModule::new("a", "int f(void) { return 1; }");
        let b = LoweredModule::new("b", "int f(void) { return 2; }");
        assert_eq!(x86.fingerprint(&a), x86.fingerprint(&a.clone()));
        assert_ne!(x86.fingerprint(&a), x86.fingerprint(&b));
        assert_ne!(x86.fingerprint(&a), arm.fingerprint(&a));
    }

    #[test]
    fn staging_paths_are_unique() {
        let lib = Path::new("/tmp/libfuse_rs_c_0000000000000001.so");
        let first = staging_path(lib);
        let second = staging_path(lib);
        assert_ne!(first, second);
        assert!(first.to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn lookup_before_build_finds_nothing() {
        let compiler =
            CCompiler::with_cache_dir(Target::new(BACKEND_NAME, Arch::host()), "/unused");
        assert!(compiler.lookup("kernel_0").is_none());
        assert!(compiler.module_names().is_empty());
    }
}
