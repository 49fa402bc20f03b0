use std::collections::HashMap;
use std::sync::Arc;

use ir_tensor::{DType, Tensor};

use crate::activation::{Activation, ActivationFn, ActivationKind, GeluMode};
use crate::dispatch::KernelDispatch;
use crate::error::{ActivationError, Result};
use crate::parallel::ParallelContext;
use crate::quant::QuantizationConfig;
use crate::scaled::ScaledActivation;

/// Names the registry resolves, and what they resolve to.
const ENTRIES: [(&str, ActivationKind); 4] = [
    ("gelu", ActivationKind::Gelu(GeluMode::None)),
    ("gelu_pytorch_tanh", ActivationKind::Gelu(GeluMode::Tanh)),
    ("gelu_new", ActivationKind::NewGelu),
    ("relu2", ActivationKind::Relu2),
];

/// Fixed lookup table from activation name to activation.
///
/// Built once at startup and then only read; pass it by reference to the
/// model builders that need it.
#[derive(Debug, Clone)]
pub struct ActivationRegistry {
    dispatch: Arc<KernelDispatch>,
    entries: HashMap<&'static str, ActivationKind>,
}

impl ActivationRegistry {
    pub fn new(dispatch: Arc<KernelDispatch>) -> Self {
        ActivationRegistry {
            dispatch,
            entries: ENTRIES.into_iter().collect(),
        }
    }

    pub fn dispatch(&self) -> &Arc<KernelDispatch> {
        &self.dispatch
    }

    /// Supported names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Resolve `name` (case-insensitive) to an activation.
    ///
    /// If `quant_config` post-scales this activation, the result is wrapped
    /// in a [`ScaledActivation`] sized for this worker's partition, which
    /// requires `intermediate_size`.
    pub fn get_act_fn(
        &self,
        name: &str,
        quant_config: Option<&dyn QuantizationConfig>,
        intermediate_size: Option<usize>,
        input_is_parallel: bool,
        params_dtype: Option<DType>,
        parallel: &ParallelContext,
    ) -> Result<ResolvedActivation> {
        let name = name.to_lowercase();
        let kind = *self
            .entries
            .get(name.as_str())
            .ok_or_else(|| ActivationError::UnsupportedActivation(name.clone()))?;
        let act = Activation::new(kind, self.dispatch.clone());

        match quant_config {
            Some(quant) if quant.requires_post_scale(&name) => {
                let intermediate_size =
                    intermediate_size.ok_or(ActivationError::MissingParameter("intermediate_size"))?;
                log::debug!(
                    "{} activation {} is post-scaled over {} channels",
                    quant.name(),
                    name,
                    intermediate_size
                );
                let scaled = ScaledActivation::new(
                    act,
                    intermediate_size,
                    input_is_parallel,
                    params_dtype,
                    *parallel,
                )?;
                Ok(ResolvedActivation::Scaled(scaled))
            }
            _ => Ok(ResolvedActivation::Plain(act)),
        }
    }
}

/// Result of a registry lookup.
#[derive(Debug, Clone)]
pub enum ResolvedActivation {
    Plain(Activation),
    Scaled(ScaledActivation),
}

impl ResolvedActivation {
    pub fn is_scaled(&self) -> bool {
        matches!(self, ResolvedActivation::Scaled(_))
    }

    pub fn as_scaled(&self) -> Option<&ScaledActivation> {
        match self {
            ResolvedActivation::Scaled(s) => Some(s),
            ResolvedActivation::Plain(_) => None,
        }
    }

    /// Mutable access for weight loading.
    pub fn as_scaled_mut(&mut self) -> Option<&mut ScaledActivation> {
        match self {
            ResolvedActivation::Scaled(s) => Some(s),
            ResolvedActivation::Plain(_) => None,
        }
    }

    /// The base activation, unwrapping any scaling.
    pub fn activation(&self) -> &Activation {
        match self {
            ResolvedActivation::Plain(a) => a,
            ResolvedActivation::Scaled(s) => s.inner(),
        }
    }
}

impl ActivationFn for ResolvedActivation {
    fn name(&self) -> &str {
        self.activation().name()
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        match self {
            ResolvedActivation::Plain(a) => a.forward(x),
            ResolvedActivation::Scaled(s) => s.forward(x),
        }
    }
}
