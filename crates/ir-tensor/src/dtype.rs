use std::fmt;

/// Supported data types for tensor storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 32-bit floating point. The process default dtype.
    #[default]
    F32,
    /// 16-bit IEEE 754 half precision (`half::f16`).
    F16,
    /// 16-bit brain floating point (`half::bf16`).
    BF16,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F16 => write!(f, "f16"),
            DType::BF16 => write!(f, "bf16"),
        }
    }
}
