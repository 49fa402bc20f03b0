use rayon::prelude::*;

use ir_tensor::cpu::unary;

use super::FusedKernels;
use crate::error::{ActivationError, Result};

/// Inputs with fewer total elements than this run on the calling thread.
const PAR_MIN_ELEMS: usize = 1 << 14;

/// Single-pass host implementation of the fused kernels.
///
/// Reads each input row once and writes the output row directly, with no
/// intermediate gate tensor. Large inputs are split across rows with rayon.
/// Stands in for the device library wherever one is not linked.
#[derive(Debug, Clone, Default)]
pub struct HostFusedKernels;

impl HostFusedKernels {
    pub fn new() -> Self {
        HostFusedKernels
    }

    fn gated(&self, x: &[f32], d: usize, out: &mut [f32], act: fn(f32) -> f32) -> Result<()> {
        if d == 0 || x.len() % (2 * d) != 0 || out.len() * 2 != x.len() {
            return Err(ActivationError::ShapeMismatch {
                expected: vec![x.len() / 2],
                got: vec![out.len()],
            });
        }

        let row = |(src, dst): (&[f32], &mut [f32])| {
            let (gate, up) = src.split_at(d);
            for ((o, &g), &u) in dst.iter_mut().zip(gate).zip(up) {
                *o = act(g) * u;
            }
        };

        if x.len() >= PAR_MIN_ELEMS {
            x.par_chunks_exact(2 * d)
                .zip(out.par_chunks_exact_mut(d))
                .for_each(row);
        } else {
            x.chunks_exact(2 * d).zip(out.chunks_exact_mut(d)).for_each(row);
        }
        Ok(())
    }
}

impl FusedKernels for HostFusedKernels {
    fn name(&self) -> &str {
        "host-fused"
    }

    fn silu_and_mul(&self, x: &[f32], d: usize, out: &mut [f32]) -> Result<()> {
        self.gated(x, d, out, unary::silu)
    }

    fn gelu_and_mul(&self, x: &[f32], d: usize, out: &mut [f32]) -> Result<()> {
        self.gated(x, d, out, unary::gelu_erf)
    }

    fn gelu_tanh_and_mul(&self, x: &[f32], d: usize, out: &mut [f32]) -> Result<()> {
        self.gated(x, d, out, unary::gelu_tanh)
    }

    fn gelu_quick(&self, x: &[f32], out: &mut [f32]) -> Result<()> {
        if out.len() != x.len() {
            return Err(ActivationError::ShapeMismatch {
                expected: vec![x.len()],
                got: vec![out.len()],
            });
        }
        if x.len() >= PAR_MIN_ELEMS {
            out.par_iter_mut()
                .zip(x.par_iter())
                .for_each(|(o, &v)| *o = unary::quick_gelu(v));
        } else {
            for (o, &v) in out.iter_mut().zip(x) {
                *o = unary::quick_gelu(v);
            }
        }
        Ok(())
    }
}
