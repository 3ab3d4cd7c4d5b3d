#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fuse_rs::compiler::register_compiler;
use fuse_rs::{
    Arch, CompileError, CompileResult, CompiledArtifact, Compiler, FnAddr, FusedOp,
    FusionSignature, LoweredModule, SymbolArgBinding, SymbolArgBindings, Target,
};

pub extern "C" fn kernel_0(x: i64) -> i64 {
    x + 1
}

pub extern "C" fn kernel_0_infer(x: i64) -> i64 {
    x * 2
}

pub extern "C" fn kernel_0_x86(x: i64) -> i64 {
    x + 100
}

pub extern "C" fn kernel_1(x: i64) -> i64 {
    x - 1
}

pub extern "C" fn kernel_1_infer(x: i64) -> i64 {
    x * 3
}

type KernelFn = extern "C" fn(i64) -> i64;

fn catalogue() -> HashMap<&'static str, KernelFn> {
    let entries: [(&'static str, KernelFn); 5] = [
        ("kernel_0", kernel_0),
        ("kernel_0_infer", kernel_0_infer),
        ("kernel_0_x86", kernel_0_x86),
        ("kernel_1", kernel_1),
        ("kernel_1_infer", kernel_1_infer),
    ];
    entries.into_iter().collect()
}

pub fn addr_of(f: KernelFn) -> FnAddr {
    FnAddr::new(f as *const c_void).expect("function address is non-null")
}

/// Observations shared by every compiler a test backend creates.
#[derive(Default)]
pub struct Recorder {
    pub created: AtomicUsize,
    pub builds: AtomicUsize,
    lookups: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn lookup_count(&self, symbol: &str) -> usize {
        self.lookups().iter().filter(|name| *name == symbol).count()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

/// In-process backend: "building" a module exports every catalogue function whose
/// name appears as a whitespace separated token in the module source. A source
/// containing `#error` fails to build.
pub struct TableCompiler {
    target: Target,
    exported: Mutex<HashMap<String, FnAddr>>,
    recorder: Arc<Recorder>,
}

impl Compiler for TableCompiler {
    fn target(&self) -> &Target {
        &self.target
    }

    fn build(&self, module: &LoweredModule) -> CompileResult<()> {
        self.recorder.builds.fetch_add(1, Ordering::SeqCst);
        if module.source.contains("#error") {
            return Err(CompileError::backend(format!(
                "module '{}' failed to build",
                module.name
            )));
        }
        let catalogue = catalogue();
        let mut exported = self.exported.lock().unwrap();
        for token in module.source.split_whitespace() {
            if let Some(f) = catalogue.get(token) {
                exported.insert(token.to_string(), addr_of(*f));
            }
        }
        Ok(())
    }

    fn lookup(&self, symbol: &str) -> Option<FnAddr> {
        self.recorder.lookups.lock().unwrap().push(symbol.to_string());
        self.exported.lock().unwrap().get(symbol).copied()
    }
}

/// Registers a table backend under `name` and returns its recorder.
pub fn register_table_backend(name: &str) -> Arc<Recorder> {
    let recorder = Arc::new(Recorder::default());
    let shared = Arc::clone(&recorder);
    register_compiler(name, move |target| {
        shared.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TableCompiler {
            target: target.clone(),
            exported: Mutex::new(HashMap::new()),
            recorder: Arc::clone(&shared),
        }) as Arc<dyn Compiler>)
    });
    recorder
}

pub fn target(backend: &str) -> Target {
    Target::new(backend, Arch::X86)
}

pub fn signature(backend: &str, op: &str) -> FusionSignature {
    FusionSignature::builder(target(backend))
        .op(FusedOp::new(op).input(["S0", "S1"]).output(["S0", "S1"]))
        .finish()
}

pub fn bindings() -> SymbolArgBindings {
    let mut bindings = SymbolArgBindings::new();
    bindings.insert(
        2,
        SymbolArgBinding::Dim {
            arg_idx: 0,
            dim_idx: 0,
        },
    );
    bindings.insert(
        3,
        SymbolArgBinding::Dim {
            arg_idx: 0,
            dim_idx: 1,
        },
    );
    bindings
}

/// Creates an artifact for `host` and builds `source` into it.
pub fn compile(target: &Target, host: &str, source: &str) -> CompileResult<CompiledArtifact> {
    let artifact = CompiledArtifact::new(
        target,
        host,
        format!("{host}_infer"),
        bindings(),
        vec![256, 1024],
    )?;
    artifact
        .compiler()
        .build(&LoweredModule::new(host, source))?;
    Ok(artifact)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
