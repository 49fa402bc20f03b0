/// The part of a quantization method's config the activation layer reads.
pub trait QuantizationConfig: Send + Sync {
    /// Returns the name of the quantization method.
    fn name(&self) -> &str;

    /// Activation names whose output is divided by learned per-channel scales.
    fn scaled_act_names(&self) -> &[String];

    /// True if `act_name` (lowercase) needs post-scaling.
    fn requires_post_scale(&self, act_name: &str) -> bool {
        self.scaled_act_names().iter().any(|n| n == act_name)
    }
}

/// A quantization config that only carries its list of scaled activations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledActConfig {
    method: String,
    scaled_act_names: Vec<String>,
}

impl ScaledActConfig {
    pub fn new(method: impl Into<String>, scaled_act_names: &[&str]) -> Self {
        ScaledActConfig {
            method: method.into(),
            scaled_act_names: scaled_act_names.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// AWQ post-scales the GELU family.
    pub fn awq() -> Self {
        Self::new("awq", &["gelu", "gelu_fast", "gelu_new", "gelu_pytorch_tanh"])
    }
}

impl QuantizationConfig for ScaledActConfig {
    fn name(&self) -> &str {
        &self.method
    }

    fn scaled_act_names(&self) -> &[String] {
        &self.scaled_act_names
    }
}
