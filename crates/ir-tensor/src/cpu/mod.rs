pub mod unary;

use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};

/// Pure-Rust CPU compute backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance. Intended as the reference
/// implementation every other path is checked against.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }

    fn map(x: &[f32], f: impl Fn(f32) -> f32) -> Vec<f32> {
        x.iter().map(|&v| f(v)).collect()
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        if a.len() != b.len() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![a.len()],
                got: vec![b.len()],
            });
        }
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
    }

    fn div_rows(&self, x: &[f32], divisor: &[f32]) -> Result<Vec<f32>> {
        let n = divisor.len();
        if n == 0 {
            return Err(TensorError::Other(
                "div_rows: divisor must not be empty".to_string(),
            ));
        }
        if x.len() % n != 0 {
            return Err(TensorError::BroadcastError {
                a: vec![x.len()],
                b: vec![n],
            });
        }

        let mut result = Vec::with_capacity(x.len());
        for row in x.chunks_exact(n) {
            result.extend(row.iter().zip(divisor).map(|(v, d)| v / d));
        }
        Ok(result)
    }

    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>> {
        Ok(a.iter().map(|x| x * s).collect())
    }

    fn silu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(Self::map(x, unary::silu))
    }

    fn gelu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(Self::map(x, unary::gelu_erf))
    }

    fn gelu_tanh(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(Self::map(x, unary::gelu_tanh))
    }

    fn sigmoid(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(Self::map(x, unary::sigmoid))
    }

    fn relu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(Self::map(x, unary::relu))
    }

    fn tanh(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(Self::map(x, f32::tanh))
    }
}
