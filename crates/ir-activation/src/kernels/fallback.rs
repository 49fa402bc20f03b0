use std::sync::Arc;

use ir_tensor::{ComputeBackend, CpuBackend, Tensor};

use super::{gated_mul, FallbackKernels};
use crate::activation::GeluMode;
use crate::error::Result;

/// Default external fallback: the gated activations composed from
/// `ComputeBackend` elementwise ops.
///
/// Deployments that link a third-party kernel library implement
/// [`FallbackKernels`] for it and hand it to `KernelDispatch::with_providers`.
#[derive(Debug, Clone)]
pub struct ReferenceFallback {
    backend: Arc<dyn ComputeBackend>,
}

impl ReferenceFallback {
    pub fn new(backend: Arc<dyn ComputeBackend>) -> Self {
        Self { backend }
    }
}

impl Default for ReferenceFallback {
    fn default() -> Self {
        Self::new(Arc::new(CpuBackend::new()))
    }
}

impl FallbackKernels for ReferenceFallback {
    fn name(&self) -> &str {
        "reference"
    }

    fn silu_and_mul(&self, x: &Tensor) -> Result<Tensor> {
        gated_mul(self.backend.as_ref(), x, |b, a| b.silu(a))
    }

    fn gelu_and_mul(&self, x: &Tensor, mode: GeluMode) -> Result<Tensor> {
        match mode {
            GeluMode::None => gated_mul(self.backend.as_ref(), x, |b, a| b.gelu(a)),
            GeluMode::Tanh => gated_mul(self.backend.as_ref(), x, |b, a| b.gelu_tanh(a)),
        }
    }
}
