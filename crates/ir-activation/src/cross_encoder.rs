use ir_tensor::{ComputeBackend, Tensor};

use crate::error::{ActivationError, Result};

/// Namespace a cross-encoder config may name activation classes from.
pub const TRUSTED_NAMESPACE: &str = "torch.nn.modules.";

/// Fully qualified class names that resolve, and their activation.
const ALLOWED: [(&str, CrossEncoderActivation); 6] = [
    ("torch.nn.modules.linear.Identity", CrossEncoderActivation::Identity),
    ("torch.nn.modules.activation.Sigmoid", CrossEncoderActivation::Sigmoid),
    ("torch.nn.modules.activation.Tanh", CrossEncoderActivation::Tanh),
    ("torch.nn.modules.activation.ReLU", CrossEncoderActivation::Relu),
    ("torch.nn.modules.activation.GELU", CrossEncoderActivation::Gelu),
    ("torch.nn.modules.activation.SiLU", CrossEncoderActivation::Silu),
];

/// Model configuration fields read when building a cross-encoder head.
pub trait CrossEncoderConfig {
    /// Qualified class name of the score activation, if the model sets one.
    fn sbert_ce_default_activation_function(&self) -> Option<&str>;
}

/// Minimal model config carrying only the cross-encoder activation field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelConfig {
    pub sbert_ce_default_activation_function: Option<String>,
}

impl CrossEncoderConfig for ModelConfig {
    fn sbert_ce_default_activation_function(&self) -> Option<&str> {
        self.sbert_ce_default_activation_function.as_deref()
    }
}

/// Score activation applied by a cross-encoder (reranker) head.
///
/// Class names from the config are matched against a closed table; nothing
/// is ever looked up dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossEncoderActivation {
    Identity,
    Sigmoid,
    Tanh,
    Relu,
    Gelu,
    Silu,
}

impl CrossEncoderActivation {
    /// Resolve the activation a model config asks for.
    ///
    /// A missing field yields `Identity` (bge-reranker style heads).
    pub fn resolve(config: &dyn CrossEncoderConfig) -> Result<Self> {
        match config.sbert_ce_default_activation_function() {
            Some(name) => Self::from_qualname(name),
            None => Ok(CrossEncoderActivation::Identity),
        }
    }

    /// Look up a qualified class name such as `torch.nn.modules.activation.Sigmoid`.
    ///
    /// Names outside [`TRUSTED_NAMESPACE`] are rejected outright; names
    /// inside it that are not in the table are unsupported.
    pub fn from_qualname(name: &str) -> Result<Self> {
        if !name.starts_with(TRUSTED_NAMESPACE) {
            log::warn!("refusing to load cross-encoder activation {:?}", name);
            return Err(ActivationError::SecurityRejection(name.to_string()));
        }
        ALLOWED
            .iter()
            .find(|(qualname, _)| *qualname == name)
            .map(|(_, act)| *act)
            .ok_or_else(|| ActivationError::UnsupportedActivation(name.to_string()))
    }

    /// Apply the activation elementwise using `backend`.
    pub fn forward(&self, x: &Tensor, backend: &dyn ComputeBackend) -> Result<Tensor> {
        let data = x.to_f32_vec();
        let out = match self {
            CrossEncoderActivation::Identity => return Ok(x.clone()),
            CrossEncoderActivation::Sigmoid => backend.sigmoid(&data)?,
            CrossEncoderActivation::Tanh => backend.tanh(&data)?,
            CrossEncoderActivation::Relu => backend.relu(&data)?,
            CrossEncoderActivation::Gelu => backend.gelu(&data)?,
            CrossEncoderActivation::Silu => backend.silu(&data)?,
        };
        Ok(Tensor::new(out, x.shape().clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ir_tensor::CpuBackend;

    fn config(name: Option<&str>) -> ModelConfig {
        ModelConfig {
            sbert_ce_default_activation_function: name.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_field_is_identity() {
        let act = CrossEncoderActivation::resolve(&config(None)).unwrap();
        assert_eq!(act, CrossEncoderActivation::Identity);
    }

    #[test]
    fn test_trusted_name_resolves() {
        let act =
            CrossEncoderActivation::resolve(&config(Some("torch.nn.modules.activation.Sigmoid")))
                .unwrap();
        assert_eq!(act, CrossEncoderActivation::Sigmoid);
    }

    #[test]
    fn test_untrusted_name_rejected() {
        for name in ["os.system", "torch.nn.functional.relu", "torch.nn.modulesX.Evil", ""] {
            let err = CrossEncoderActivation::from_qualname(name).unwrap_err();
            assert!(matches!(err, ActivationError::SecurityRejection(_)), "{:?}", name);
        }
    }

    #[test]
    fn test_trusted_namespace_but_unknown_class() {
        let err =
            CrossEncoderActivation::from_qualname("torch.nn.modules.conv.Conv2d").unwrap_err();
        assert!(matches!(err, ActivationError::UnsupportedActivation(_)));
    }

    #[test]
    fn test_forward() {
        let backend = CpuBackend::new();
        let x = Tensor::from_vec(vec![0.0, -1.0]);
        let y = CrossEncoderActivation::Sigmoid.forward(&x, &backend).unwrap();
        assert_abs_diff_eq!(y.as_f32_slice().unwrap()[0], 0.5, epsilon = 1e-7);
        let id = CrossEncoderActivation::Identity.forward(&x, &backend).unwrap();
        assert_eq!(id.as_f32_slice().unwrap(), &[0.0, -1.0]);
        let relu = CrossEncoderActivation::Relu.forward(&x, &backend).unwrap();
        assert_eq!(relu.as_f32_slice().unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_relu_head_keeps_nan_scores() {
        let backend = CpuBackend::new();
        let x = Tensor::from_vec(vec![f32::NAN, 2.0]);
        let y = CrossEncoderActivation::Relu.forward(&x, &backend).unwrap();
        let y = y.as_f32_slice().unwrap();
        assert!(y[0].is_nan());
        assert_eq!(y[1], 2.0);
    }
}
