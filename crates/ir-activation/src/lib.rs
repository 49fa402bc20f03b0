//! `ir-activation` - Activation functions for transformer feed-forward blocks.
//!
//! Each activation routes a tensor through one of three code paths, chosen once
//! from a [`HardwareProfile`] snapshot:
//! - a vendor fused kernel ([`FusedKernels`]) on CUDA, ROCm, NPU or AMX CPUs
//! - an external reference kernel library ([`FallbackKernels`]) when no fused
//!   kernels exist anywhere on the platform
//! - the reference formula composed from `ir_tensor::ComputeBackend` ops
//!
//! [`ActivationRegistry`] resolves activations by name and wraps them in a
//! [`ScaledActivation`] when the quantization method post-scales them.

pub mod activation;
pub mod cross_encoder;
pub mod dispatch;
pub mod error;
pub mod hardware;
pub mod kernels;
pub mod parallel;
pub mod quant;
pub mod registry;
pub mod scaled;

pub use activation::{Activation, ActivationFn, ActivationKind, GeluMode, Route};
pub use cross_encoder::{CrossEncoderActivation, CrossEncoderConfig, ModelConfig};
pub use dispatch::{KernelDispatch, KernelPath};
pub use error::{ActivationError, Result};
pub use hardware::HardwareProfile;
pub use kernels::{FallbackKernels, FusedKernels, HostFusedKernels, ReferenceFallback};
pub use parallel::ParallelContext;
pub use quant::{QuantizationConfig, ScaledActConfig};
pub use registry::{ActivationRegistry, ResolvedActivation};
pub use scaled::ScaledActivation;
