//! Diagnostic system for the handle-safety analyses.
//!
//! Every finding carries:
//! - an error code for searchability,
//! - a message (what went wrong),
//! - a primary span (where) and secondary spans (why, e.g. the statement
//!   that invalidated a handle),
//! - suggestions (how to fix).
//!
//! Hard errors block compilation; notes such as a retained bounds check
//! never do. [`DiagnosticQueue`] collects per-function batches and hands back
//! an [`ErrorGuaranteed`] proof whenever a hard error was recorded.

mod diagnostic;
pub mod emitter;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Applicability, Diagnostic, Label, Severity, Substitution, Suggestion};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue, DiagnosticSeverity};
