use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the size of dimension `i`, or an error if the axis is out of range.
    pub fn dim(&self, i: usize) -> Result<usize> {
        self.dims.get(i).copied().ok_or(TensorError::InvalidAxis {
            axis: i,
            ndim: self.ndim(),
        })
    }

    /// Size of the innermost (channel) dimension.
    ///
    /// Scalars have no last dimension and return an error.
    pub fn last_dim(&self) -> Result<usize> {
        self.dims.last().copied().ok_or(TensorError::InvalidAxis { axis: 0, ndim: 0 })
    }

    /// Same leading dimensions with the last one replaced by `size`.
    pub fn with_last_dim(&self, size: usize) -> Result<Shape> {
        self.last_dim()?;
        let mut dims = self.dims.clone();
        let n = dims.len();
        dims[n - 1] = size;
        Ok(Shape { dims })
    }

    /// Returns a reference to the underlying dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Compute the broadcast shape of `a` and `b` using numpy-style broadcasting rules.
    ///
    /// Shapes are aligned from the right; missing leading dims count as 1, and
    /// each aligned pair must be equal or contain a 1.
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape> {
        let max_ndim = a.ndim().max(b.ndim());
        let aligned = |s: &Shape, i: usize| {
            if i < s.ndim() {
                s.dims[s.ndim() - 1 - i]
            } else {
                1
            }
        };

        let mut result = Vec::with_capacity(max_ndim);
        for i in 0..max_ndim {
            let (da, db) = (aligned(a, i), aligned(b, i));
            let d = match (da, db) {
                _ if da == db => da,
                (1, _) => db,
                (_, 1) => da,
                _ => {
                    return Err(TensorError::BroadcastError {
                        a: a.dims.clone(),
                        b: b.dims.clone(),
                    })
                }
            };
            result.push(d);
        }

        result.reverse();
        Ok(Shape::new(result))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}
