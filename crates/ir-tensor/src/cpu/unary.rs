//! Scalar activation formulas.
//!
//! Shared by `CpuBackend` and by the single-pass fused host kernels, so both
//! code paths evaluate the exact same expression per element.

/// sqrt(2 / pi)
pub const SQRT_2_OVER_PI: f32 = 0.797_884_6;
/// Cubic coefficient of the tanh GELU approximation.
pub const GELU_TANH_COEF: f32 = 0.044_715;
/// Sigmoid slope used by quick GELU.
pub const QUICK_GELU_ALPHA: f32 = 1.702;

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
pub fn silu(x: f32) -> f32 {
    x / (1.0 + (-x).exp())
}

#[inline]
pub fn gelu_erf(x: f32) -> f32 {
    0.5 * x * (1.0 + libm::erff(x * std::f32::consts::FRAC_1_SQRT_2))
}

#[inline]
pub fn gelu_tanh(x: f32) -> f32 {
    0.5 * x * (1.0 + (SQRT_2_OVER_PI * (x + GELU_TANH_COEF * x * x * x)).tanh())
}

#[inline]
pub fn quick_gelu(x: f32) -> f32 {
    x * sigmoid(QUICK_GELU_ALPHA * x)
}

/// Rectifier that propagates NaN instead of clamping it to zero.
#[inline]
pub fn relu(x: f32) -> f32 {
    if x > 0.0 || x.is_nan() {
        x
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sqrt_2_over_pi() {
        let exact = (2.0f64 / std::f64::consts::PI).sqrt() as f32;
        assert_abs_diff_eq!(SQRT_2_OVER_PI, exact, epsilon = 1e-7);
    }

    #[test]
    fn test_gelu_forms_agree_closely() {
        for i in -40..=40 {
            let x = i as f32 * 0.1;
            assert_abs_diff_eq!(gelu_erf(x), gelu_tanh(x), epsilon = 1e-3);
        }
    }

    #[test]
    fn test_gelu_erf_known_value() {
        // 0.5 * (1 + erf(1/sqrt(2))) = Phi(1) ~= 0.8413447
        assert_abs_diff_eq!(gelu_erf(1.0), 0.841_344_7, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_fixed_points() {
        assert_eq!(silu(0.0), 0.0);
        assert_eq!(gelu_erf(0.0), 0.0);
        assert_eq!(gelu_tanh(0.0), 0.0);
        assert_eq!(quick_gelu(0.0), 0.0);
        assert_eq!(relu(-3.0), 0.0);
    }

    #[test]
    fn test_relu_keeps_nan() {
        assert!(relu(f32::NAN).is_nan());
        assert_eq!(relu(f32::INFINITY), f32::INFINITY);
        assert_eq!(relu(f32::NEG_INFINITY), 0.0);
        assert_eq!(relu(-0.0), 0.0);
    }
}
