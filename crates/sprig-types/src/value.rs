//! Runtime value representation.
//!
//! Every value is a fixed-size `Copy` tag. Compound data (arrays,
//! strings) lives behind an [`ArrayRef`] whose address distinguishes the
//! read-only constant pool from the garbage-collected heap.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tagged memory address.
///
/// Constant-pool addresses index into `Program::consts`; heap addresses
/// are slot indices into the VM heap. The two spaces never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemAddr {
    Const(u32),
    Heap(u32),
}

/// Reference to a run of values (array or string contents).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrayRef {
    pub addr: MemAddr,
    pub len: u32,
}

impl ArrayRef {
    pub fn new(addr: MemAddr, len: u32) -> Self {
        Self { addr, len }
    }
}

/// An activation record stored in-stack as an ordinary value.
///
/// Never visible to scripts; the call/return opcodes are the only
/// producers and consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Bytecode address to resume at; negative means "exit the VM".
    pub return_pc: i32,
    pub num_args: u8,
    pub num_locals: u8,
}

impl Frame {
    pub fn new(return_pc: i32, num_args: u8, num_locals: u8) -> Self {
        Self {
            return_pc,
            num_args,
            num_locals,
        }
    }
}

/// A sprig runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Number(f64),
    Char(char),
    /// Integer pair for host grid-style natives. The core language does
    /// not define arithmetic on these.
    IVec2(i16, i16),
    Array(ArrayRef),
    Frame(Frame),
}

impl Value {
    /// Tag name for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Char(_) => "char",
            Value::IVec2(_, _) => "ivec2",
            Value::Array(_) => "array",
            Value::Frame(_) => "frame",
        }
    }
}

impl fmt::Display for Value {
    /// Shallow rendering; array contents need heap or constant-pool
    /// access and are rendered by the VM.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::IVec2(x, y) => write!(f, "({x}, {y})"),
            Value::Array(r) => write!(f, "array[{}]", r.len),
            Value::Frame(fr) => write!(f, "frame<{}>", fr.return_pc),
        }
    }
}
