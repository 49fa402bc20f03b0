use crate::error::{ActivationError, Result};

/// This worker's position in the tensor-model-parallel group.
///
/// Established by the caller when the group is set up and read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelContext {
    rank: usize,
    world_size: usize,
}

impl ParallelContext {
    pub fn new(rank: usize, world_size: usize) -> Result<Self> {
        if world_size == 0 || rank >= world_size {
            return Err(ActivationError::InvalidConfiguration(format!(
                "tensor parallel rank {} is outside a group of {}",
                rank, world_size
            )));
        }
        Ok(ParallelContext { rank, world_size })
    }

    /// A group of one.
    pub fn single() -> Self {
        ParallelContext {
            rank: 0,
            world_size: 1,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn world_size(&self) -> usize {
        self.world_size
    }

    /// Size of this worker's shard of a dimension of `total` entries.
    pub fn shard_size(&self, total: usize) -> Result<usize> {
        divide(total, self.world_size)
    }
}

impl Default for ParallelContext {
    fn default() -> Self {
        Self::single()
    }
}

/// Exact division; partitions must be even.
pub fn divide(numerator: usize, denominator: usize) -> Result<usize> {
    if denominator == 0 || numerator % denominator != 0 {
        return Err(ActivationError::UnevenPartition {
            total: numerator,
            parts: denominator,
        });
    }
    Ok(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide() {
        assert_eq!(divide(128, 4).unwrap(), 32);
        assert!(matches!(
            divide(130, 4),
            Err(ActivationError::UnevenPartition { total: 130, parts: 4 })
        ));
        assert!(divide(8, 0).is_err());
    }

    #[test]
    fn test_context_bounds() {
        assert!(ParallelContext::new(3, 4).is_ok());
        assert!(ParallelContext::new(4, 4).is_err());
        assert!(ParallelContext::new(0, 0).is_err());
    }

    #[test]
    fn test_shard_size() {
        let ctx = ParallelContext::new(1, 2).unwrap();
        assert_eq!(ctx.shard_size(128).unwrap(), 64);
        assert_eq!(ParallelContext::single().shard_size(7).unwrap(), 7);
    }
}
