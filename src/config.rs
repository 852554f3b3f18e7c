//! Pool sizing configuration.

use crate::error::{PoolError, Result};

/// Sizing knobs for a [`HandlePool`](crate::HandlePool). Policy is fixed;
/// only the map's layout is configurable.
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Number of map shards. Must be a power of two greater than one.
    /// `None` lets the map pick from the CPU count.
    pub shard_amount: Option<usize>,
    /// Initial capacity in distinct identities.
    pub capacity: usize,
}

impl PoolConfig {
    pub fn shard_amount(mut self, shards: usize) -> Self {
        self.shard_amount = Some(shards);
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self.shard_amount {
            Some(n) if n <= 1 => Err(PoolError::InvalidConfig(
                "shard_amount must be greater than 1",
            )),
            Some(n) if !n.is_power_of_two() => Err(PoolError::InvalidConfig(
                "shard_amount must be a power of two",
            )),
            _ => Ok(()),
        }
    }
}
