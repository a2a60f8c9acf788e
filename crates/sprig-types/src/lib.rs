//! Shared types for the sprig toolchain.
//!
//! This crate defines the source spans, the AST arena, the diagnostic
//! trace, the runtime value representation, and the compiled bytecode
//! artifact shared by every stage from the lexer to the VM.

pub mod ast;
mod diag;
mod program;
mod span;
mod value;

pub use diag::{Diagnostic, Severity, Trace, MAX_DIAGNOSTICS};
pub use program::{ConstPool, Op, Program};
pub use span::{SourceFile, Span};
pub use value::{ArrayRef, Frame, MemAddr, Value};
