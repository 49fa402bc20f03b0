use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable compute backends.
///
/// These are the elementwise building blocks activations are composed from
/// when no fused kernel applies. All operations work on f32 slices. Data is
/// passed in as slices and returned as freshly allocated vectors; inputs are
/// never mutated.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Element-wise multiplication: result[i] = a[i] * b[i].
    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// Row-wise division by a vector.
    ///
    /// `x` is viewed as rows of `divisor.len()` elements and each row is
    /// divided element-wise by `divisor`: result[r*n + i] = x[r*n + i] / divisor[i].
    fn div_rows(&self, x: &[f32], divisor: &[f32]) -> Result<Vec<f32>>;

    /// Scalar multiplication: result[i] = a[i] * s.
    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>>;

    /// SiLU activation: result[i] = x[i] / (1 + exp(-x[i])).
    fn silu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Exact GELU: result[i] = 0.5 * x * (1 + erf(x / sqrt(2))).
    fn gelu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Tanh-approximated GELU:
    /// result[i] = 0.5 * x * (1 + tanh(sqrt(2/pi) * (x + 0.044715 * x^3))).
    fn gelu_tanh(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Logistic sigmoid: result[i] = 1 / (1 + exp(-x[i])).
    fn sigmoid(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Rectified linear unit: result[i] = max(0, x[i]).
    fn relu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Hyperbolic tangent.
    fn tanh(&self, x: &[f32]) -> Result<Vec<f32>>;
}
