//! Shared primitives for the Arx handle-safety analyses.
//!
//! Everything downstream (`arx_diagnostic`, `arx_check`) refers to source
//! locations through [`Span`] and to functions and locals through interned
//! [`Name`]s resolved through one [`StringInterner`] per program.

mod interner;
mod name;
mod span;

pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use span::Span;
