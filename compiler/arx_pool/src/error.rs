use thiserror::Error;

use crate::Handle;

/// Why a checked lookup rejected a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The index is past the end of the slot array.
    #[error("handle {handle} is out of bounds (capacity {capacity})")]
    OutOfBounds { handle: Handle, capacity: usize },
    /// The slot exists but holds no value.
    #[error("handle {handle} refers to a vacant slot")]
    Vacant { handle: Handle },
    /// The slot was reused after the handle's value was removed.
    #[error("stale handle {handle}: slot is at generation {current}")]
    StaleGeneration { handle: Handle, current: u32 },
    /// Every addressable index is in use.
    #[error("pool is full ({capacity} slots)")]
    Full { capacity: usize },
}
