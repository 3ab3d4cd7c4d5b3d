use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::artifact::CompiledArtifact;
use crate::error::CompileResult;
use crate::kernel_info::KernelInfo;
use crate::target::Target;

const UNSET_ARTIFACT: &str = "compiled artifact is not set; call set_artifact first";

/// Cache value shared between the cache and whoever fetched it.
pub type SharedOutcome = Rc<CompilationOutcome>;

#[derive(Debug)]
enum OutcomeState {
    Pending,
    Ready(Arc<CompiledArtifact>),
}

/// Per-signature cache value.
///
/// Starts `Pending` so a cache slot can be reserved before compilation finishes, and
/// becomes `Ready` once an artifact is attached. Reading launch data from a pending
/// outcome is a caller bug and panics.
#[derive(Debug)]
pub struct CompilationOutcome {
    target: Target,
    need_x86_kernel: bool,
    state: RefCell<OutcomeState>,
}

impl CompilationOutcome {
    pub fn new(target: Target, need_x86_kernel: bool) -> Self {
        Self {
            target,
            need_x86_kernel,
            state: RefCell::new(OutcomeState::Pending),
        }
    }

    pub fn shared(target: Target, need_x86_kernel: bool) -> SharedOutcome {
        Rc::new(Self::new(target, need_x86_kernel))
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn need_x86_kernel(&self) -> bool {
        self.need_x86_kernel
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), OutcomeState::Ready(_))
    }

    /// Attaches the compiled artifact. A later call replaces the earlier artifact.
    pub fn set_artifact(&self, artifact: Arc<CompiledArtifact>) {
        *self.state.borrow_mut() = OutcomeState::Ready(artifact);
    }

    pub fn artifact(&self) -> Option<Arc<CompiledArtifact>> {
        match &*self.state.borrow() {
            OutcomeState::Pending => None,
            OutcomeState::Ready(artifact) => Some(Arc::clone(artifact)),
        }
    }

    /// # Panics
    /// If no artifact has been attached yet.
    pub fn host_fn_name(&self) -> String {
        self.ready_artifact().host_fn_name().to_string()
    }

    /// # Panics
    /// If no artifact has been attached yet.
    pub fn kernel_info(&self) -> CompileResult<KernelInfo> {
        self.ready_artifact().generate_kernel_info(self.need_x86_kernel)
    }

    fn ready_artifact(&self) -> Arc<CompiledArtifact> {
        self.artifact().unwrap_or_else(|| panic!("{UNSET_ARTIFACT}"))
    }
}
