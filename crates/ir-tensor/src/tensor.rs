use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::CpuStorage;

/// A tensor backed by CPU storage.
///
/// Holds contiguous, row-major data with an associated shape. Activation math
/// runs on the f32 view; the storage dtype only matters for parameters.
#[derive(Debug, Clone)]
pub struct Tensor {
    storage: CpuStorage,
    shape: Shape,
}

impl Tensor {
    /// Create a new f32 tensor from data and a shape.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f32>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor {
            storage: CpuStorage::from_f32_vec(data),
            shape,
        })
    }

    /// Create a 1-D f32 tensor.
    pub fn from_vec(data: Vec<f32>) -> Self {
        let shape = Shape::new(vec![data.len()]);
        Tensor {
            storage: CpuStorage::from_f32_vec(data),
            shape,
        }
    }

    /// Create a zero-filled f32 tensor with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        Self::zeros_with_dtype(shape, DType::F32)
    }

    /// Create a zero-filled tensor with the given shape and storage dtype.
    pub fn zeros_with_dtype(shape: Shape, dtype: DType) -> Self {
        Tensor {
            storage: CpuStorage::zeros(dtype, shape.numel()),
            shape,
        }
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Borrow the data as f32 without conversion.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` for reduced precision storage.
    pub fn as_f32_slice(&self) -> Result<&[f32]> {
        self.storage.as_f32_slice()
    }

    /// Copy the data out as f32, widening reduced precision storage.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.storage.to_f32_vec()
    }

    /// Select `len` consecutive entries starting at `start` along `axis`.
    ///
    /// The result is a fresh, contiguous f32 tensor.
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Tensor> {
        let size = self.shape.dim(axis)?;
        if start.checked_add(len).map_or(true, |end| end > size) {
            return Err(TensorError::NarrowOutOfRange {
                axis,
                start,
                len,
                size,
            });
        }

        let dims = self.shape.dims();
        let outer: usize = dims[..axis].iter().product();
        let inner: usize = dims[axis + 1..].iter().product();
        let src = self.to_f32_vec();

        let mut out = Vec::with_capacity(outer * len * inner);
        for o in 0..outer {
            let base = (o * size + start) * inner;
            out.extend_from_slice(&src[base..base + len * inner]);
        }

        let mut new_dims = dims.to_vec();
        new_dims[axis] = len;
        Tensor::new(out, Shape::new(new_dims))
    }

    /// Split the last dimension into two equal halves `[..., d]` and `[..., d]`.
    ///
    /// This is the gate split used by the gated activations: the first half
    /// goes through the nonlinearity, the second half multiplies it.
    pub fn split_last_half(&self) -> Result<(Tensor, Tensor)> {
        let last = self.shape.last_dim()?;
        if last % 2 != 0 {
            return Err(TensorError::OddSplit(last));
        }
        let d = last / 2;
        let axis = self.shape.ndim() - 1;
        Ok((self.narrow(axis, 0, d)?, self.narrow(axis, d, d)?))
    }

    /// Copy `src` into this tensor's existing storage, converting to this
    /// tensor's dtype. Shapes must match exactly.
    pub fn copy_from(&mut self, src: &Tensor) -> Result<()> {
        if self.shape != src.shape {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: src.shape.dims().to_vec(),
            });
        }
        self.storage.copy_from_f32(&src.to_f32_vec())
    }
}
