//! Generational arena.
//!
//! Graph-shaped data lives in a [`Pool`] and is referenced through small,
//! copyable [`Handle`]s instead of pointers. A handle is an
//! `(index, generation)` pair; it is valid exactly while the slot at `index`
//! is occupied and still carries the same generation. Removing a value bumps
//! the slot's generation, so every outstanding handle to it goes stale
//! instead of silently observing whatever is inserted into the slot next.
//!
//! Generation 0 is never handed out, which gives `Option<Handle>` a free
//! niche: it is the same 8 bytes as `Handle`.

mod error;
mod handle;
mod pool;

pub use error::PoolError;
pub use handle::Handle;
pub use pool::{Iter, IterMut, Pool};
