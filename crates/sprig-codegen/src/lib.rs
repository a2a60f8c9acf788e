//! sprig code generator: lowers a type-checked AST to stack-machine
//! bytecode.
//!
//! Emission goes through an intermediate instruction list so jump
//! targets can be patched by index; a final pass converts indices to
//! byte addresses and writes the [`sprig_types::Program`] artifact.

mod compiler;
mod error;

pub use compiler::generate;
pub use error::{CodegenError, CodegenResult};
