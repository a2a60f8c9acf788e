//! Codegen error types.

use thiserror::Error;

/// Errors that can occur during bytecode generation.
///
/// Any of these makes the pipeline hand back the empty program.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// The program has no `main` function to wire the entry point to.
    #[error("no entry point: function 'main' is not defined")]
    MissingEntryPoint,

    /// A call target is neither a declared function nor an extern.
    #[error("unresolved call target: {0}")]
    UnresolvedCall(String),

    /// A name in store/load position has no local slot.
    #[error("unresolved symbol: {0}")]
    UnresolvedSymbol(String),

    /// Frame counts are encoded in single bytes.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
