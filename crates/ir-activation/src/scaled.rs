use ir_tensor::{DType, Shape, Tensor, TensorError};

use crate::activation::{Activation, ActivationFn};
use crate::error::{ActivationError, Result};
use crate::parallel::ParallelContext;

/// An activation followed by division by learned per-channel scales.
///
/// Used by quantization methods such as AWQ that fold a scale into the
/// activation output. When the input is tensor-parallel the scale vector
/// holds only this worker's shard of the intermediate dimension.
#[derive(Debug, Clone)]
pub struct ScaledActivation {
    act: Activation,
    input_is_parallel: bool,
    parallel: ParallelContext,
    scales: Tensor,
}

impl ScaledActivation {
    /// Wrap `act` with a zero-initialised scale parameter.
    ///
    /// The scale length is `intermediate_size / world_size` when
    /// `input_is_parallel`, otherwise `intermediate_size`. A zero
    /// `intermediate_size` is rejected.
    pub fn new(
        act: Activation,
        intermediate_size: usize,
        input_is_parallel: bool,
        params_dtype: Option<DType>,
        parallel: ParallelContext,
    ) -> Result<Self> {
        if intermediate_size == 0 {
            return Err(ActivationError::InvalidConfiguration(format!(
                "{} scales need a positive intermediate_size",
                act.name()
            )));
        }
        let local_size = if input_is_parallel {
            parallel.shard_size(intermediate_size)?
        } else {
            intermediate_size
        };
        let dtype = params_dtype.unwrap_or_default();
        Ok(ScaledActivation {
            act,
            input_is_parallel,
            parallel,
            scales: Tensor::zeros_with_dtype(Shape::new(vec![local_size]), dtype),
        })
    }

    /// The wrapped activation.
    pub fn inner(&self) -> &Activation {
        &self.act
    }

    pub fn scales(&self) -> &Tensor {
        &self.scales
    }

    pub fn input_is_parallel(&self) -> bool {
        self.input_is_parallel
    }

    /// Load the full scale vector from a checkpoint.
    ///
    /// For a parallel input, this worker's contiguous shard starting at
    /// `rank * shard_size` is selected first. The data is copied into the
    /// existing parameter storage.
    pub fn load_weight(&mut self, loaded_weight: &Tensor) -> Result<()> {
        let expected = self.scales.shape().clone();
        let shard = if self.input_is_parallel {
            let shard_size = expected.dim(0)?;
            let start = self.parallel.rank() * shard_size;
            match loaded_weight.narrow(0, start, shard_size) {
                Ok(shard) => shard,
                Err(TensorError::NarrowOutOfRange { .. }) => {
                    return Err(ActivationError::ShapeMismatch {
                        expected: vec![start + shard_size],
                        got: loaded_weight.shape().dims().to_vec(),
                    })
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            loaded_weight.clone()
        };

        if shard.shape() != &expected {
            return Err(ActivationError::ShapeMismatch {
                expected: expected.dims().to_vec(),
                got: shard.shape().dims().to_vec(),
            });
        }
        self.scales.copy_from(&shard)?;
        log::trace!(
            "loaded {} activation scales for rank {}/{}",
            expected.numel(),
            self.parallel.rank(),
            self.parallel.world_size()
        );
        Ok(())
    }
}

impl ActivationFn for ScaledActivation {
    fn name(&self) -> &str {
        self.act.name()
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let y = self.act.forward(x)?;
        // The scales must broadcast over `y` without growing it.
        match Shape::broadcast_shape(y.shape(), self.scales.shape()) {
            Ok(ref out) if out == y.shape() => {}
            _ => {
                let n = self.scales.shape().numel();
                return Err(ActivationError::ShapeMismatch {
                    expected: y
                        .shape()
                        .with_last_dim(n)
                        .map(|s| s.dims().to_vec())
                        .unwrap_or_else(|_| vec![n]),
                    got: y.shape().dims().to_vec(),
                });
            }
        }
        let scales = self.scales.to_f32_vec();
        let backend = self.act.dispatch().backend();
        let out = backend.div_rows(y.as_f32_slice()?, &scales)?;
        Ok(Tensor::new(out, y.shape().clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationKind;
    use crate::dispatch::KernelDispatch;
    use crate::hardware::HardwareProfile;
    use std::sync::Arc;

    fn relu2() -> Activation {
        let dispatch = Arc::new(KernelDispatch::new(&HardwareProfile::NONE));
        Activation::new(ActivationKind::Relu2, dispatch)
    }

    fn ctx(rank: usize, world: usize) -> ParallelContext {
        ParallelContext::new(rank, world).unwrap()
    }

    #[test]
    fn test_scale_length_per_partition() {
        let s = ScaledActivation::new(relu2(), 128, true, None, ctx(0, 4)).unwrap();
        assert_eq!(s.scales().shape().dims(), &[32]);
        assert_eq!(s.scales().dtype(), DType::F32);

        let full = ScaledActivation::new(relu2(), 128, false, None, ctx(0, 4)).unwrap();
        assert_eq!(full.scales().shape().dims(), &[128]);
    }

    #[test]
    fn test_uneven_partition() {
        let err = ScaledActivation::new(relu2(), 130, true, None, ctx(0, 4)).unwrap_err();
        assert!(matches!(err, ActivationError::UnevenPartition { total: 130, parts: 4 }));
    }

    #[test]
    fn test_load_weight_selects_rank_shard() {
        let mut s = ScaledActivation::new(relu2(), 8, true, None, ctx(1, 2)).unwrap();
        let full = Tensor::from_vec((1..=8).map(|v| v as f32).collect());
        s.load_weight(&full).unwrap();
        assert_eq!(s.scales().to_f32_vec(), vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_load_weight_short_checkpoint() {
        let mut s = ScaledActivation::new(relu2(), 8, true, None, ctx(1, 2)).unwrap();
        let short = Tensor::from_vec(vec![1.0; 6]);
        assert!(matches!(
            s.load_weight(&short),
            Err(ActivationError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_load_weight_not_parallel_requires_exact_shape() {
        let mut s = ScaledActivation::new(relu2(), 4, false, None, ctx(1, 2)).unwrap();
        let err = s.load_weight(&Tensor::from_vec(vec![1.0; 8])).unwrap_err();
        assert!(matches!(
            err,
            ActivationError::ShapeMismatch { ref expected, ref got } if expected == &[4] && got == &[8]
        ));
        s.load_weight(&Tensor::from_vec(vec![2.0; 4])).unwrap();
        assert_eq!(s.scales().to_f32_vec(), vec![2.0; 4]);
    }

    #[test]
    fn test_load_weight_converts_to_params_dtype() {
        let mut s = ScaledActivation::new(relu2(), 2, false, Some(DType::F16), ctx(0, 1)).unwrap();
        s.load_weight(&Tensor::from_vec(vec![0.5, 2.0])).unwrap();
        assert_eq!(s.scales().dtype(), DType::F16);
        assert_eq!(s.scales().to_f32_vec(), vec![0.5, 2.0]);
    }

    #[test]
    fn test_forward_divides_by_scales() {
        let mut s = ScaledActivation::new(relu2(), 3, false, None, ctx(0, 1)).unwrap();
        s.load_weight(&Tensor::from_vec(vec![1.0, 2.0, 4.0])).unwrap();
        let x = Tensor::new(vec![-1.0, 2.0, 4.0, 1.0, 2.0, 2.0], Shape::new(vec![2, 3])).unwrap();
        let y = s.forward(&x).unwrap();
        assert_eq!(y.as_f32_slice().unwrap(), &[0.0, 2.0, 4.0, 1.0, 2.0, 1.0]);
        assert_eq!(s.name(), "relu2");
    }

    #[test]
    fn test_forward_width_mismatch() {
        let s = ScaledActivation::new(relu2(), 4, false, None, ctx(0, 1)).unwrap();
        let x = Tensor::from_vec(vec![1.0; 3]);
        assert!(matches!(s.forward(&x), Err(ActivationError::ShapeMismatch { .. })));

        // A width-1 output would broadcast up to the scale width; still a mismatch.
        let narrow = Tensor::new(vec![1.0, 2.0], Shape::new(vec![2, 1])).unwrap();
        assert!(matches!(
            s.forward(&narrow),
            Err(ActivationError::ShapeMismatch { ref expected, ref got })
                if expected == &[2, 4] && got == &[2, 1]
        ));
    }

    #[test]
    fn test_forward_scales_every_leading_row() {
        let mut s = ScaledActivation::new(relu2(), 2, false, None, ctx(0, 1)).unwrap();
        s.load_weight(&Tensor::from_vec(vec![1.0, 4.0])).unwrap();
        let x = Tensor::new(vec![2.0; 8], Shape::new(vec![2, 2, 2])).unwrap();
        let y = s.forward(&x).unwrap();
        assert_eq!(y.shape().dims(), &[2, 2, 2]);
        assert_eq!(y.to_f32_vec(), [4.0, 1.0].repeat(4));
    }

    #[test]
    fn test_zero_intermediate_size_rejected() {
        for parallel in [false, true] {
            let err = ScaledActivation::new(relu2(), 0, parallel, None, ctx(0, 2)).unwrap_err();
            assert!(matches!(err, ActivationError::InvalidConfiguration(_)), "{}", parallel);
        }
    }
}
