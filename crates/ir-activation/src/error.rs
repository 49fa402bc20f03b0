use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActivationError {
    #[error("activation function {0:?} is not supported")]
    UnsupportedActivation(String),
    #[error("{0} must be specified for scaled activation functions")]
    MissingParameter(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("{total} is not evenly divisible into {parts} partitions")]
    UnevenPartition { total: usize, parts: usize },
    #[error("rejected {0:?}: activation functions may only be loaded from torch.nn.modules")]
    SecurityRejection(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] ir_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, ActivationError>;
