//! Diagnostic creation, severity management, and rendering for export runs.
//!
//! This crate provides structured [`Diagnostic`] messages with severity
//! levels, error codes, and the offending object's source-root-relative
//! path. The thread-safe [`DiagnosticSink`] accumulates diagnostics while an
//! export runs (including from rayon worker threads), and
//! [`TerminalRenderer`] formats them for the CLI at the end of a run.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
