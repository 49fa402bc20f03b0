use half::{bf16, f16};

use crate::dtype::DType;
use crate::error::{Result, TensorError};

/// CPU-side tensor storage.
///
/// Activations compute in f32; the reduced precision variants hold
/// parameters created with a non-default `params_dtype`.
#[derive(Debug, Clone)]
pub enum CpuStorage {
    /// 32-bit floating point storage.
    F32(Vec<f32>),
    /// IEEE half precision storage.
    F16(Vec<f16>),
    /// bfloat16 storage.
    BF16(Vec<bf16>),
}

impl CpuStorage {
    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        match self {
            CpuStorage::F32(v) => v.len(),
            CpuStorage::F16(v) => v.len(),
            CpuStorage::BF16(v) => v.len(),
        }
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the data as an f32 slice.
    ///
    /// # Errors
    /// Returns an error if the storage is not F32.
    pub fn as_f32_slice(&self) -> Result<&[f32]> {
        match self {
            CpuStorage::F32(v) => Ok(v.as_slice()),
            other => Err(TensorError::DTypeMismatch {
                expected: DType::F32.to_string(),
                got: other.dtype().to_string(),
            }),
        }
    }

    /// Widen every element to f32.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            CpuStorage::F32(v) => v.clone(),
            CpuStorage::F16(v) => v.iter().map(|x| x.to_f32()).collect(),
            CpuStorage::BF16(v) => v.iter().map(|x| x.to_f32()).collect(),
        }
    }

    /// Overwrite the elements in place from f32 values, rounding to the
    /// storage dtype. The allocation is reused.
    ///
    /// # Errors
    /// Returns an error if `src.len() != self.len()`.
    pub fn copy_from_f32(&mut self, src: &[f32]) -> Result<()> {
        if src.len() != self.len() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.len()],
                got: vec![src.len()],
            });
        }
        match self {
            CpuStorage::F32(v) => v.copy_from_slice(src),
            CpuStorage::F16(v) => {
                for (dst, &s) in v.iter_mut().zip(src) {
                    *dst = f16::from_f32(s);
                }
            }
            CpuStorage::BF16(v) => {
                for (dst, &s) in v.iter_mut().zip(src) {
                    *dst = bf16::from_f32(s);
                }
            }
        }
        Ok(())
    }

    /// Create zero-filled storage for the given dtype and element count.
    pub fn zeros(dtype: DType, n: usize) -> Self {
        match dtype {
            DType::F32 => CpuStorage::F32(vec![0.0; n]),
            DType::F16 => CpuStorage::F16(vec![f16::ZERO; n]),
            DType::BF16 => CpuStorage::BF16(vec![bf16::ZERO; n]),
        }
    }

    /// Create storage from an f32 vector.
    pub fn from_f32_vec(data: Vec<f32>) -> Self {
        CpuStorage::F32(data)
    }

    /// Returns the dtype of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            CpuStorage::F32(_) => DType::F32,
            CpuStorage::F16(_) => DType::F16,
            CpuStorage::BF16(_) => DType::BF16,
        }
    }
}
