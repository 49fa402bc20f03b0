use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ir_tensor::cpu::unary::QUICK_GELU_ALPHA;
use ir_tensor::{Tensor, TensorError};

use crate::dispatch::{KernelDispatch, KernelPath};
use crate::error::{ActivationError, Result};
use crate::kernels::gated_mul;

/// Approximation used by the GELU family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeluMode {
    /// Exact form, `0.5 * x * (1 + erf(x / sqrt(2)))`.
    None,
    /// `0.5 * x * (1 + tanh(sqrt(2/pi) * (x + 0.044715 * x^3)))`.
    Tanh,
}

impl GeluMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeluMode::None => "none",
            GeluMode::Tanh => "tanh",
        }
    }
}

impl FromStr for GeluMode {
    type Err = ActivationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(GeluMode::None),
            "tanh" => Ok(GeluMode::Tanh),
            other => Err(ActivationError::InvalidConfiguration(format!(
                "GELU approximation must be \"tanh\" or \"none\", got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for GeluMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The supported nonlinearities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationKind {
    /// `silu(a) * b` over the two halves of the last dimension.
    SiluAndMul,
    /// `gelu(a, mode) * b` over the two halves of the last dimension.
    GeluAndMul(GeluMode),
    /// Elementwise GELU.
    Gelu(GeluMode),
    /// Elementwise tanh-approximated GELU, never fused.
    NewGelu,
    /// `relu(x)^2`.
    Relu2,
    /// `x * sigmoid(1.702 * x)`.
    QuickGelu,
}

impl ActivationKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActivationKind::SiluAndMul => "silu_and_mul",
            ActivationKind::GeluAndMul(GeluMode::None) => "gelu_and_mul",
            ActivationKind::GeluAndMul(GeluMode::Tanh) => "gelu_tanh_and_mul",
            ActivationKind::Gelu(GeluMode::None) => "gelu",
            ActivationKind::Gelu(GeluMode::Tanh) => "gelu_pytorch_tanh",
            ActivationKind::NewGelu => "gelu_new",
            ActivationKind::Relu2 => "relu2",
            ActivationKind::QuickGelu => "quick_gelu",
        }
    }

    /// Gated kinds halve the last dimension.
    pub fn is_gated(&self) -> bool {
        matches!(self, ActivationKind::SiluAndMul | ActivationKind::GeluAndMul(_))
    }

    /// Which implementation runs for this kind on `path`.
    pub fn route(&self, path: KernelPath) -> Route {
        use ActivationKind::*;
        use KernelPath::*;

        match (self, path) {
            (SiluAndMul, Cuda | Rocm | Npu | CpuAmx) => Route::Fused,
            (GeluAndMul(_), Cuda | Rocm) => Route::Fused,
            (SiluAndMul | GeluAndMul(_), Portable) => Route::External,
            (QuickGelu, Rocm) => Route::Fused,
            _ => Route::Reference,
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The implementation an activation executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Formula composed from `ComputeBackend` ops.
    Reference,
    /// Single-pass vendor kernel.
    Fused,
    /// External kernel library.
    External,
}

/// Anything that maps an input tensor to an activated output tensor.
pub trait ActivationFn: Send + Sync {
    /// Returns the name of this activation.
    fn name(&self) -> &str;

    /// Apply the activation. Allocates a fresh output; the input is untouched.
    fn forward(&self, x: &Tensor) -> Result<Tensor>;
}

/// A configured activation bound to a kernel dispatch.
///
/// The route is fixed at construction from the dispatch's kernel path, so
/// exactly one implementation runs per call.
#[derive(Debug, Clone)]
pub struct Activation {
    kind: ActivationKind,
    route: Route,
    dispatch: Arc<KernelDispatch>,
}

impl Activation {
    pub fn new(kind: ActivationKind, dispatch: Arc<KernelDispatch>) -> Self {
        let route = kind.route(dispatch.path());
        Activation {
            kind,
            route,
            dispatch,
        }
    }

    pub fn silu_and_mul(dispatch: Arc<KernelDispatch>) -> Self {
        Self::new(ActivationKind::SiluAndMul, dispatch)
    }

    /// Gated GELU with the approximation given by name (`"tanh"` or `"none"`).
    pub fn gelu_and_mul(approximate: &str, dispatch: Arc<KernelDispatch>) -> Result<Self> {
        let mode = approximate.parse()?;
        Ok(Self::new(ActivationKind::GeluAndMul(mode), dispatch))
    }

    pub fn kind(&self) -> ActivationKind {
        self.kind
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn dispatch(&self) -> &KernelDispatch {
        &self.dispatch
    }

    /// Last dimension of the output for an input whose last dimension is `input_last_dim`.
    pub fn output_last_dim(&self, input_last_dim: usize) -> usize {
        if self.kind.is_gated() {
            input_last_dim / 2
        } else {
            input_last_dim
        }
    }

    /// Evaluate with the reference formula regardless of the route.
    pub fn forward_reference(&self, x: &Tensor) -> Result<Tensor> {
        let backend = self.dispatch.backend();
        let data = f32_data(x);
        let out = match self.kind {
            ActivationKind::SiluAndMul => return gated_mul(backend, x, |b, a| b.silu(a)),
            ActivationKind::GeluAndMul(GeluMode::None) => {
                return gated_mul(backend, x, |b, a| b.gelu(a))
            }
            ActivationKind::GeluAndMul(GeluMode::Tanh) => {
                return gated_mul(backend, x, |b, a| b.gelu_tanh(a))
            }
            ActivationKind::Gelu(GeluMode::None) => backend.gelu(&data)?,
            ActivationKind::Gelu(GeluMode::Tanh) | ActivationKind::NewGelu => {
                backend.gelu_tanh(&data)?
            }
            ActivationKind::Relu2 => {
                let r = backend.relu(&data)?;
                backend.mul(&r, &r)?
            }
            ActivationKind::QuickGelu => {
                let s = backend.sigmoid(&backend.scale(&data, QUICK_GELU_ALPHA)?)?;
                backend.mul(&data, &s)?
            }
        };
        Ok(Tensor::new(out, x.shape().clone())?)
    }

    fn forward_fused(&self, x: &Tensor) -> Result<Tensor> {
        let kernels = self.dispatch.fused();
        let data = f32_data(x);

        if self.kind == ActivationKind::QuickGelu {
            let mut out = vec![0.0f32; data.len()];
            kernels.gelu_quick(&data, &mut out)?;
            return Ok(Tensor::new(out, x.shape().clone())?);
        }

        let last = x.shape().last_dim()?;
        if last % 2 != 0 {
            return Err(TensorError::OddSplit(last).into());
        }
        let d = last / 2;
        let out_shape = x.shape().with_last_dim(d)?;
        let mut out = vec![0.0f32; out_shape.numel()];
        if out.is_empty() {
            return Ok(Tensor::new(out, out_shape)?);
        }

        match self.kind {
            ActivationKind::SiluAndMul => kernels.silu_and_mul(&data, d, &mut out)?,
            ActivationKind::GeluAndMul(GeluMode::Tanh) => {
                kernels.gelu_tanh_and_mul(&data, d, &mut out)?
            }
            ActivationKind::GeluAndMul(GeluMode::None) => {
                kernels.gelu_and_mul(&data, d, &mut out)?
            }
            other => {
                return Err(ActivationError::InvalidConfiguration(format!(
                    "no fused kernel for {}",
                    other
                )))
            }
        }
        Ok(Tensor::new(out, out_shape)?)
    }

    fn forward_external(&self, x: &Tensor) -> Result<Tensor> {
        let fallback = self.dispatch.fallback();
        match self.kind {
            ActivationKind::SiluAndMul => fallback.silu_and_mul(x),
            ActivationKind::GeluAndMul(mode) => fallback.gelu_and_mul(x, mode),
            _ => self.forward_reference(x),
        }
    }
}

impl ActivationFn for Activation {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        match self.route {
            Route::Reference => self.forward_reference(x),
            Route::Fused => self.forward_fused(x),
            Route::External => self.forward_external(x),
        }
    }
}

/// Borrow f32 storage directly, widening reduced precision inputs.
fn f32_data(x: &Tensor) -> Cow<'_, [f32]> {
    match x.as_f32_slice() {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(x.to_f32_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareProfile;
    use approx::assert_relative_eq;
    use ir_tensor::Shape;

    fn dispatch(hw: &str) -> Arc<KernelDispatch> {
        Arc::new(KernelDispatch::new(&HardwareProfile::from_override(hw)))
    }

    fn input(rows: usize, cols: usize) -> Tensor {
        let data = (0..rows * cols).map(|i| (i as f32 - 7.0) * 0.37).collect();
        Tensor::new(data, Shape::new(vec![rows, cols])).unwrap()
    }

    #[test]
    fn test_gelu_mode_parse() {
        assert_eq!("tanh".parse::<GeluMode>().unwrap(), GeluMode::Tanh);
        assert_eq!("none".parse::<GeluMode>().unwrap(), GeluMode::None);
        assert!(matches!(
            "sigmoid".parse::<GeluMode>(),
            Err(ActivationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_gelu_and_mul_rejects_unknown_mode() {
        assert!(Activation::gelu_and_mul("erf", dispatch("cuda")).is_err());
        let act = Activation::gelu_and_mul("none", dispatch("cuda")).unwrap();
        assert_eq!(act.kind(), ActivationKind::GeluAndMul(GeluMode::None));
    }

    #[test]
    fn test_routes_follow_kernel_path() {
        assert_eq!(Activation::silu_and_mul(dispatch("cuda")).route(), Route::Fused);
        assert_eq!(Activation::silu_and_mul(dispatch("none")).route(), Route::External);
        let quick_rocm = Activation::new(ActivationKind::QuickGelu, dispatch("rocm"));
        assert_eq!(quick_rocm.route(), Route::Fused);
        let quick_cuda = Activation::new(ActivationKind::QuickGelu, dispatch("cuda"));
        assert_eq!(quick_cuda.route(), Route::Reference);
    }

    #[test]
    fn test_silu_and_mul_output_shape() {
        for hw in ["cuda", "npu", "amx", "none"] {
            let act = Activation::silu_and_mul(dispatch(hw));
            let y = act.forward(&input(3, 10)).unwrap();
            assert_eq!(y.shape().dims(), &[3, 5], "path {}", hw);
        }
    }

    #[test]
    fn test_fused_matches_reference() {
        let x = input(4, 16);
        for kind in [
            ActivationKind::SiluAndMul,
            ActivationKind::GeluAndMul(GeluMode::Tanh),
            ActivationKind::GeluAndMul(GeluMode::None),
            ActivationKind::QuickGelu,
        ] {
            let act = Activation::new(kind, dispatch("rocm"));
            assert_eq!(act.route(), Route::Fused);
            let fused = act.forward(&x).unwrap();
            let reference = act.forward_reference(&x).unwrap();
            for (f, r) in fused.to_f32_vec().iter().zip(reference.to_f32_vec()) {
                assert_relative_eq!(*f, r, max_relative = 1e-3, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_fused_odd_last_dim() {
        let act = Activation::silu_and_mul(dispatch("cuda"));
        let err = act.forward(&input(2, 5)).unwrap_err();
        assert!(matches!(err, ActivationError::Tensor(TensorError::OddSplit(5))));
    }

    #[test]
    fn test_fused_empty_rows() {
        let act = Activation::silu_and_mul(dispatch("cuda"));
        let x = Tensor::zeros(Shape::new(vec![0, 8]));
        assert_eq!(act.forward(&x).unwrap().shape().dims(), &[0, 4]);
    }

    #[test]
    fn test_new_gelu_zero_and_reference_everywhere() {
        for hw in ["cuda", "rocm", "npu", "amx", "none"] {
            let act = Activation::new(ActivationKind::NewGelu, dispatch(hw));
            assert_eq!(act.route(), Route::Reference);
            let y = act.forward(&Tensor::from_vec(vec![0.0])).unwrap();
            assert_eq!(y.as_f32_slice().unwrap(), &[0.0]);
        }
    }

    #[test]
    fn test_relu2_values() {
        let act = Activation::new(ActivationKind::Relu2, dispatch("none"));
        let y = act.forward(&Tensor::from_vec(vec![-2.0, 0.0, 3.0])).unwrap();
        assert_eq!(y.as_f32_slice().unwrap(), &[0.0, 0.0, 9.0]);
    }

    #[test]
    fn test_relu2_propagates_nan() {
        let act = Activation::new(ActivationKind::Relu2, dispatch("none"));
        let y = act.forward(&Tensor::from_vec(vec![f32::NAN, -1.0])).unwrap();
        let y = y.as_f32_slice().unwrap();
        assert!(y[0].is_nan());
        assert_eq!(y[1], 0.0);
    }

    #[test]
    fn test_gelu_exact_one() {
        let act = Activation::new(ActivationKind::Gelu(GeluMode::None), dispatch("none"));
        let y = act.forward(&Tensor::from_vec(vec![1.0])).unwrap();
        assert_relative_eq!(y.as_f32_slice().unwrap()[0], 0.841_344_7, max_relative = 1e-5);
    }

    #[test]
    fn test_half_precision_input_is_widened() {
        let act = Activation::new(ActivationKind::Relu2, dispatch("none"));
        let mut x = Tensor::zeros_with_dtype(Shape::new(vec![2]), ir_tensor::DType::F16);
        x.copy_from(&Tensor::from_vec(vec![-1.0, 2.0])).unwrap();
        let y = act.forward(&x).unwrap();
        assert_eq!(y.as_f32_slice().unwrap(), &[0.0, 4.0]);
    }

    #[test]
    fn test_output_last_dim() {
        assert_eq!(Activation::silu_and_mul(dispatch("none")).output_last_dim(8), 4);
        let relu2 = Activation::new(ActivationKind::Relu2, dispatch("none"));
        assert_eq!(relu2.output_last_dim(8), 8);
    }
}
