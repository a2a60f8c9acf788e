//! Runtime fault types.

use thiserror::Error;

/// A runtime fault. Faults abort execution immediately; the VM never
/// retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmFault {
    /// The cycle budget ran out before the program finished.
    #[error("cycle limit exceeded")]
    CycleLimitExceeded,

    /// Allocation failed even after a collection.
    #[error("heap exhausted: failed to allocate {0} slots")]
    HeapExhausted(u32),

    /// Bounds-checked array access failed.
    #[error("array index {index} out of range (length {len})")]
    IndexOutOfRange { index: i64, len: u32 },

    /// A native was called with the wrong number of arguments.
    #[error("native '{name}' expects {expected} arguments, got {got}")]
    NativeArityMismatch {
        name: String,
        expected: u32,
        got: u32,
    },

    /// A native name has no registration on this VM instance.
    #[error("unknown native '{0}'")]
    UnknownNative(String),

    /// Registration under an already-taken name.
    #[error("native '{0}' already registered")]
    DuplicateNative(String),

    /// The operand stack hit its configured limit.
    #[error("stack overflow")]
    StackOverflow,

    /// An instruction popped from an empty stack.
    #[error("stack underflow")]
    StackUnderflow,

    /// The byte at `addr` is not an opcode.
    #[error("invalid opcode {byte:#04x} at {addr:#06x}")]
    InvalidOpcode { byte: u8, addr: usize },

    /// An operand or stack value had the wrong shape for the opcode.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// Host-supplied argument count does not match the entry point.
    #[error("program entry expects {expected} arguments, got {got}")]
    ArgumentCountMismatch { expected: u32, got: u32 },

    /// The empty program is the "did not compile" signal.
    #[error("refusing to execute an empty program")]
    EmptyProgram,

    /// The instruction stream ended mid-instruction.
    #[error("truncated instruction at {0:#06x}")]
    TruncatedProgram(usize),
}
