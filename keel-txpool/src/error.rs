//! Transaction pool error types.

use std::fmt;

/// Result type for pool operations.
pub type TxPoolResult<T> = Result<T, TxPoolError>;

/// Errors that can occur when adding to the pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxPoolError {
    /// Pool has reached its capacity.
    PoolFull { capacity: usize },
}

impl fmt::Display for TxPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxPoolError::PoolFull { capacity } => {
                write!(f, "transaction pool full (capacity {})", capacity)
            }
        }
    }
}

impl std::error::Error for TxPoolError {}
