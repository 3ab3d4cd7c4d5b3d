use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hashing;

/// Hardware architecture a kernel is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arch {
    X86,
    Arm,
    NvGpu,
    AmdGpu,
    Unknown,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::Arm => "arm",
            Arch::NvGpu => "nvgpu",
            Arch::AmdGpu => "amdgpu",
            Arch::Unknown => "unknown",
        }
    }

    /// Architecture of the process building this crate.
    pub fn host() -> Self {
        if cfg!(target_arch = "x86_64") || cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "aarch64") || cfg!(target_arch = "arm") {
            Arch::Arm
        } else {
            Arch::Unknown
        }
    }
}

/// Opaque descriptor of the hardware/runtime a fusion group is compiled for.
///
/// `backend` selects the compiler factory in the registry; `arch` and `features`
/// only take part in identity (signatures and digests).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    backend: String,
    arch: Arch,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    features: BTreeMap<String, String>,
}

impl Target {
    pub fn new(backend: impl Into<String>, arch: Arch) -> Self {
        Self {
            backend: backend.into(),
            arch,
            features: BTreeMap::new(),
        }
    }

    pub fn with_feature(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.features.insert(key.into(), value.into());
        self
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn features(&self) -> &BTreeMap<String, String> {
        &self.features
    }

    pub fn digest(&self) -> u64 {
        hashing::digest(self)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.backend, self.arch.as_str())?;
        for (key, value) in &self.features {
            write!(f, "+{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_tracks_features() {
        let base = Target::new("c", Arch::X86);
        let avx = base.clone().with_feature("avx512", "on");
        assert_eq!(base.digest(), Target::new("c", Arch::X86).digest());
        assert_ne!(base.digest(), avx.digest());
        assert_ne!(base.digest(), Target::new("c", Arch::Arm).digest());
    }

    #[test]
    fn display_lists_features_in_order() {
        let target = Target::new("cuda", Arch::NvGpu)
            .with_feature("sm", "80")
            .with_feature("fast_math", "1");
        assert_eq!(target.to_string(), "cuda/nvgpu+fast_math=1+sm=80");
    }
}
