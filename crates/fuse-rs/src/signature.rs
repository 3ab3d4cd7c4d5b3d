//! Identity of a fused operator group.
//!
//! The fusion analysis that decides *which* operators form a group lives outside this
//! crate; it describes the result through [`FusionSignature`], which the compilation
//! cache uses as its key. Two signatures compare equal iff they would compile to the
//! same code: same operator sequence, same (possibly symbolic) shapes, same attributes,
//! same target.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::hashing;
use crate::target::Target;

/// One dimension of a tensor shape, either known at compile time or named symbolically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimExpr {
    Static(i64),
    Symbol(String),
}

impl DimExpr {
    pub fn sym(name: impl Into<String>) -> Self {
        DimExpr::Symbol(name.into())
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, DimExpr::Symbol(_))
    }
}

impl From<i64> for DimExpr {
    fn from(value: i64) -> Self {
        DimExpr::Static(value)
    }
}

impl From<&str> for DimExpr {
    fn from(value: &str) -> Self {
        DimExpr::Symbol(value.to_string())
    }
}

impl fmt::Display for DimExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimExpr::Static(value) => write!(f, "{value}"),
            DimExpr::Symbol(name) => f.write_str(name),
        }
    }
}

pub type ShapeExpr = Vec<DimExpr>;

/// A single operator inside a fusion group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FusedOp {
    pub name: String,
    pub inputs: Vec<ShapeExpr>,
    pub outputs: Vec<ShapeExpr>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl FusedOp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn input<D: Into<DimExpr>>(mut self, shape: impl IntoIterator<Item = D>) -> Self {
        self.inputs.push(shape.into_iter().map(Into::into).collect());
        self
    }

    pub fn output<D: Into<DimExpr>>(mut self, shape: impl IntoIterator<Item = D>) -> Self {
        self.outputs.push(shape.into_iter().map(Into::into).collect());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SignatureBody {
    target: Target,
    ops: Vec<FusedOp>,
}

/// Deterministic, hashable key for a fusion group.
///
/// The fingerprint is computed once at construction so that hashing a signature on
/// every cache lookup is a single `u64` write.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "SignatureBody", into = "SignatureBody")]
pub struct FusionSignature {
    body: SignatureBody,
    fingerprint: u64,
}

impl FusionSignature {
    pub fn builder(target: Target) -> FusionSignatureBuilder {
        FusionSignatureBuilder {
            target,
            ops: Vec::new(),
        }
    }

    pub fn new(target: Target, ops: Vec<FusedOp>) -> Self {
        SignatureBody { target, ops }.into()
    }

    pub fn target(&self) -> &Target {
        &self.body.target
    }

    pub fn ops(&self) -> &[FusedOp] {
        &self.body.ops
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// True when any input or output dimension is symbolic.
    pub fn is_dynamic(&self) -> bool {
        self.body.ops.iter().any(|op| {
            op.inputs
                .iter()
                .chain(op.outputs.iter())
                .flatten()
                .any(DimExpr::is_symbolic)
        })
    }
}

impl From<SignatureBody> for FusionSignature {
    fn from(body: SignatureBody) -> Self {
        let fingerprint = hashing::digest(&body);
        Self { body, fingerprint }
    }
}

impl From<FusionSignature> for SignatureBody {
    fn from(signature: FusionSignature) -> Self {
        signature.body
    }
}

impl PartialEq for FusionSignature {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.body == other.body
    }
}

impl Eq for FusionSignature {}

impl Hash for FusionSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint);
    }
}

impl fmt::Debug for FusionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.body.ops.iter().map(|op| op.name.as_str()).collect();
        write!(
            f,
            "FusionSignature({:016x}, [{}] @ {})",
            self.fingerprint,
            names.join(", "),
            self.body.target
        )
    }
}

pub struct FusionSignatureBuilder {
    target: Target,
    ops: Vec<FusedOp>,
}

impl FusionSignatureBuilder {
    pub fn op(mut self, op: FusedOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn finish(self) -> FusionSignature {
        FusionSignature::new(self.target, self.ops)
    }
}
