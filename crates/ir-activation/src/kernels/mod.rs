//! Kernel provider interfaces and their host implementations.

mod fallback;
mod host;

pub use fallback::ReferenceFallback;
pub use host::HostFusedKernels;

use std::fmt::Debug;

use ir_tensor::{ComputeBackend, Tensor};

use crate::activation::GeluMode;
use crate::error::Result;

/// A vendor fused-kernel library.
///
/// Each gated kernel reads rows of `2 * d` inputs from `x` and writes rows of
/// `d` outputs into `out` in a single pass. `out` is allocated by the caller
/// and must hold `x.len() / 2` elements.
pub trait FusedKernels: Send + Sync + Debug {
    /// Returns the name of this kernel library.
    fn name(&self) -> &str;

    /// out = silu(x[.., :d]) * x[.., d:]
    fn silu_and_mul(&self, x: &[f32], d: usize, out: &mut [f32]) -> Result<()>;

    /// out = gelu(x[.., :d]) * x[.., d:] with the exact erf form.
    fn gelu_and_mul(&self, x: &[f32], d: usize, out: &mut [f32]) -> Result<()>;

    /// out = gelu_tanh(x[.., :d]) * x[.., d:]
    fn gelu_tanh_and_mul(&self, x: &[f32], d: usize, out: &mut [f32]) -> Result<()>;

    /// out = x * sigmoid(1.702 * x), elementwise. `out.len() == x.len()`.
    fn gelu_quick(&self, x: &[f32], out: &mut [f32]) -> Result<()>;
}

/// External reference kernel library used when the platform has no fused
/// kernels at all.
///
/// Only the gated activations are routed here; everything else uses the
/// reference formula directly.
pub trait FallbackKernels: Send + Sync + Debug {
    /// Returns the name of this kernel library.
    fn name(&self) -> &str;

    /// Gated SiLU over the last dimension: `[..., 2d] -> [..., d]`.
    fn silu_and_mul(&self, x: &Tensor) -> Result<Tensor>;

    /// Gated GELU over the last dimension: `[..., 2d] -> [..., d]`.
    fn gelu_and_mul(&self, x: &Tensor, mode: GeluMode) -> Result<Tensor>;
}

/// Split `x` into gate and up halves, apply `act` to the gate and multiply.
pub(crate) fn gated_mul<F>(backend: &dyn ComputeBackend, x: &Tensor, act: F) -> Result<Tensor>
where
    F: Fn(&dyn ComputeBackend, &[f32]) -> ir_tensor::Result<Vec<f32>>,
{
    let (gate, up) = x.split_last_half()?;
    let activated = act(backend, gate.as_f32_slice()?)?;
    let out = backend.mul(&activated, up.as_f32_slice()?)?;
    Ok(Tensor::new(out, gate.shape().clone())?)
}
