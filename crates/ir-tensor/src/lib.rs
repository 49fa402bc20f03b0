//! `ir-tensor` - Host tensor library with a pluggable compute backend for inference-runtime.
//!
//! This crate provides:
//! - A `Tensor` type backed by CPU storage (f32, f16, bf16)
//! - A `ComputeBackend` trait for the elementwise math activations are built from
//! - A reference `CpuBackend` implementation
//! - Shape utilities and broadcasting
//! - Data type definitions

pub mod backend;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use storage::CpuStorage;
pub use tensor::Tensor;
