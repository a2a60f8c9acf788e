//! Compiled bytecode artifacts.
//!
//! A [`Program`] is the read-only output of compilation: a flat byte
//! stream of instructions plus a constant pool. Instructions are one
//! opcode byte followed by a fixed number of 4-byte little-endian
//! operands. Programs are immutable once produced and safe to share
//! across threads.

use crate::{ArrayRef, MemAddr, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Opcodes
// ══════════════════════════════════════════════════════════════════════════════

/// Every sprig VM opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Halt = 0x00,
    /// Push `consts[arg0]`.
    PushConst = 0x01,
    Pop = 0x02,
    Dup = 0x03,
    Swap = 0x04,

    Add = 0x10,
    Sub = 0x11,
    Mul = 0x12,
    Div = 0x13,
    Mod = 0x14,
    Neg = 0x15,

    CmpLt = 0x20,
    CmpLte = 0x21,
    CmpGt = 0x22,
    CmpGte = 0x23,
    CmpEq = 0x24,
    CmpNeq = 0x25,

    And = 0x30,
    Or = 0x31,
    Not = 0x32,

    /// Unconditional jump to byte address `arg0`.
    Jump = 0x40,
    /// Pop a bool; jump to `arg0` when false.
    JumpIfFalse = 0x41,

    /// Push a frame carrying the return address, jump to `arg0`.
    Call = 0x50,
    /// Program prologue: validates host args and enters `main` at
    /// `arg0` expecting `arg1` arguments.
    EntryPoint = 0x51,
    /// Function prologue: shape the stack into a frame with `arg0`
    /// args and `arg1` locals.
    MakeFrame = 0x52,
    /// Pop the return value, unwind to the frame, resume the caller.
    Return = 0x53,

    /// Pop into local slot `arg0` of the current frame.
    StoreLocal = 0x60,
    /// Push local slot `arg0` of the current frame.
    LoadLocal = 0x61,

    /// Pop `arg0` values, allocate them on the heap, push the handle.
    MakeArray = 0x70,
    /// Pop an array handle, push its length as a number.
    ArrayLen = 0x71,
    /// Pop an index and an array handle, push the element
    /// (bounds-checked).
    ArrayGet = 0x72,

    /// Call the native named by string constant `arg0` with `arg1`
    /// arguments.
    CallNative = 0x80,
}

impl Op {
    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<Op> {
        Some(match byte {
            0x00 => Op::Halt,
            0x01 => Op::PushConst,
            0x02 => Op::Pop,
            0x03 => Op::Dup,
            0x04 => Op::Swap,
            0x10 => Op::Add,
            0x11 => Op::Sub,
            0x12 => Op::Mul,
            0x13 => Op::Div,
            0x14 => Op::Mod,
            0x15 => Op::Neg,
            0x20 => Op::CmpLt,
            0x21 => Op::CmpLte,
            0x22 => Op::CmpGt,
            0x23 => Op::CmpGte,
            0x24 => Op::CmpEq,
            0x25 => Op::CmpNeq,
            0x30 => Op::And,
            0x31 => Op::Or,
            0x32 => Op::Not,
            0x40 => Op::Jump,
            0x41 => Op::JumpIfFalse,
            0x50 => Op::Call,
            0x51 => Op::EntryPoint,
            0x52 => Op::MakeFrame,
            0x53 => Op::Return,
            0x60 => Op::StoreLocal,
            0x61 => Op::LoadLocal,
            0x70 => Op::MakeArray,
            0x71 => Op::ArrayLen,
            0x72 => Op::ArrayGet,
            0x80 => Op::CallNative,
            _ => return None,
        })
    }

    /// Number of 4-byte operands following the opcode byte.
    pub fn operand_count(self) -> usize {
        match self {
            Op::PushConst
            | Op::Jump
            | Op::JumpIfFalse
            | Op::Call
            | Op::StoreLocal
            | Op::LoadLocal
            | Op::MakeArray => 1,
            Op::EntryPoint | Op::MakeFrame | Op::CallNative => 2,
            _ => 0,
        }
    }

    /// Encoded size in bytes, opcode included.
    pub fn encoded_size(self) -> usize {
        1 + 4 * self.operand_count()
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Halt => "halt",
            Op::PushConst => "push_const",
            Op::Pop => "pop",
            Op::Dup => "dup",
            Op::Swap => "swap",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::Neg => "neg",
            Op::CmpLt => "cmp_lt",
            Op::CmpLte => "cmp_lte",
            Op::CmpGt => "cmp_gt",
            Op::CmpGte => "cmp_gte",
            Op::CmpEq => "cmp_eq",
            Op::CmpNeq => "cmp_neq",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Jump => "jump",
            Op::JumpIfFalse => "jump_if_false",
            Op::Call => "call",
            Op::EntryPoint => "entry_point",
            Op::MakeFrame => "make_frame",
            Op::Return => "return",
            Op::StoreLocal => "store_local",
            Op::LoadLocal => "load_local",
            Op::MakeArray => "make_array",
            Op::ArrayLen => "array_len",
            Op::ArrayGet => "array_get",
            Op::CallNative => "call_native",
        };
        f.write_str(name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Program
// ══════════════════════════════════════════════════════════════════════════════

/// A compiled sprig program.
///
/// An empty instruction stream is the uniform "did not compile" signal
/// and must never be executed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<u8>,
    pub consts: Vec<Value>,
}

impl Program {
    /// Create a program from its parts.
    pub fn new(code: Vec<u8>, consts: Vec<Value>) -> Self {
        Self { code, consts }
    }

    /// The "did not compile" artifact.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this program may be handed to a VM.
    pub fn is_executable(&self) -> bool {
        !self.code.is_empty()
    }

    /// Read the little-endian u32 operand at `addr`.
    pub fn read_u32(&self, addr: usize) -> Option<u32> {
        let bytes = self.code.get(addr..addr + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Render a human-readable instruction listing.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut pc = 0usize;
        while pc < self.code.len() {
            let byte = self.code[pc];
            let Some(op) = Op::from_byte(byte) else {
                out.push_str(&format!("{pc:#06x}  .byte {byte:#04x}\n"));
                pc += 1;
                continue;
            };
            out.push_str(&format!("{pc:#06x}  {op}"));
            for i in 0..op.operand_count() {
                match self.read_u32(pc + 1 + 4 * i) {
                    Some(arg) => out.push_str(&format!(" {arg}")),
                    None => out.push_str(" <truncated>"),
                }
            }
            if op == Op::PushConst {
                if let Some(idx) = self.read_u32(pc + 1) {
                    if let Some(v) = self.consts.get(idx as usize) {
                        out.push_str(&format!("  ; {v}"));
                    }
                }
            }
            out.push('\n');
            pc += op.encoded_size();
        }
        out
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Constant Pool
// ══════════════════════════════════════════════════════════════════════════════

/// Append-only, deduplicated constant pool builder.
///
/// Interning the same value twice yields the same index. Strings are
/// stored as a run of char values followed by an array value whose
/// address points back into the pool; the returned index is the array
/// value's.
#[derive(Debug, Default)]
pub struct ConstPool {
    values: Vec<Value>,
}

impl ConstPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a scalar value.
    pub fn intern(&mut self, value: Value) -> u32 {
        if let Some(i) = self.values.iter().position(|v| same_const(v, &value)) {
            return i as u32;
        }
        self.values.push(value);
        (self.values.len() - 1) as u32
    }

    /// Intern a string as a char run plus a const-addressed array value.
    pub fn intern_string(&mut self, s: &str) -> u32 {
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len() as u32;
        // Reuse an existing identical run when present.
        for (i, v) in self.values.iter().enumerate() {
            if let Value::Array(r) = v {
                if let MemAddr::Const(addr) = r.addr {
                    if r.len == len && self.run_matches(addr, &chars) {
                        return i as u32;
                    }
                }
            }
        }
        let addr = self.values.len() as u32;
        self.values
            .extend(chars.iter().map(|&c| Value::Char(c)));
        self.values
            .push(Value::Array(ArrayRef::new(MemAddr::Const(addr), len)));
        (self.values.len() - 1) as u32
    }

    fn run_matches(&self, addr: u32, chars: &[char]) -> bool {
        chars.iter().enumerate().all(|(k, &c)| {
            matches!(
                self.values.get(addr as usize + k),
                Some(Value::Char(v)) if *v == c
            )
        })
    }

    /// Value at a pool index.
    pub fn get(&self, idx: u32) -> Option<&Value> {
        self.values.get(idx as usize)
    }

    /// Number of pool entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finish building and take the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Dedup equality for pool entries. Number payloads compare bitwise so
/// `0.0` and `-0.0` keep distinct slots and reads stay bit-identical.
fn same_const(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        let all = [
            Op::Halt,
            Op::PushConst,
            Op::Pop,
            Op::Dup,
            Op::Swap,
            Op::Add,
            Op::Sub,
            Op::Mul,
            Op::Div,
            Op::Mod,
            Op::Neg,
            Op::CmpLt,
            Op::CmpLte,
            Op::CmpGt,
            Op::CmpGte,
            Op::CmpEq,
            Op::CmpNeq,
            Op::And,
            Op::Or,
            Op::Not,
            Op::Jump,
            Op::JumpIfFalse,
            Op::Call,
            Op::EntryPoint,
            Op::MakeFrame,
            Op::Return,
            Op::StoreLocal,
            Op::LoadLocal,
            Op::MakeArray,
            Op::ArrayLen,
            Op::ArrayGet,
            Op::CallNative,
        ];
        for op in all {
            assert_eq!(Op::from_byte(op as u8), Some(op));
        }
        assert_eq!(Op::from_byte(0xff), None);
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Op::Add.operand_count(), 0);
        assert_eq!(Op::PushConst.operand_count(), 1);
        assert_eq!(Op::MakeFrame.operand_count(), 2);
        assert_eq!(Op::CallNative.encoded_size(), 9);
        assert_eq!(Op::Halt.encoded_size(), 1);
    }

    #[test]
    fn test_const_pool_dedup() {
        let mut pool = ConstPool::new();
        let a = pool.intern(Value::Number(1.5));
        let b = pool.intern(Value::Number(2.5));
        let c = pool.intern(Value::Number(1.5));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_const_pool_keeps_signed_zero_distinct() {
        let mut pool = ConstPool::new();
        let pos = pool.intern(Value::Number(0.0));
        let neg = pool.intern(Value::Number(-0.0));
        assert_ne!(pos, neg);
        assert_eq!(pool.intern(Value::Number(0.0)), pos);
        assert_eq!(pool.intern(Value::Number(-0.0)), neg);
    }

    #[test]
    fn test_const_pool_string_layout() {
        let mut pool = ConstPool::new();
        let idx = pool.intern_string("hi");
        // Two chars then the array value referring back to them.
        assert_eq!(pool.get(0), Some(&Value::Char('h')));
        assert_eq!(pool.get(1), Some(&Value::Char('i')));
        assert_eq!(
            pool.get(idx),
            Some(&Value::Array(ArrayRef::new(MemAddr::Const(0), 2)))
        );
    }

    #[test]
    fn test_const_pool_string_dedup() {
        let mut pool = ConstPool::new();
        let a = pool.intern_string("print");
        let b = pool.intern_string("print");
        assert_eq!(a, b);
        let c = pool.intern_string("prin");
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_program_is_not_executable() {
        assert!(!Program::empty().is_executable());
        assert!(Program::new(vec![Op::Halt as u8], vec![]).is_executable());
    }

    #[test]
    fn test_read_u32_little_endian() {
        let prog = Program::new(vec![0x01, 0x02, 0x00, 0x00, 0x00], vec![]);
        assert_eq!(prog.read_u32(1), Some(2));
        assert_eq!(prog.read_u32(3), None);
    }

    #[test]
    fn test_disassemble_lists_operands() {
        let mut code = vec![Op::PushConst as u8];
        code.extend_from_slice(&0u32.to_le_bytes());
        code.push(Op::Halt as u8);
        let prog = Program::new(code, vec![Value::Number(7.0)]);
        let listing = prog.disassemble();
        assert!(listing.contains("push_const 0"));
        assert!(listing.contains("; 7"));
        assert!(listing.contains("halt"));
    }

    #[test]
    fn test_program_json_round_trip_is_bit_identical() {
        let mut pool = ConstPool::new();
        pool.intern(Value::Number(0.1 + 0.2));
        pool.intern(Value::Bool(true));
        pool.intern_string("abc");
        let prog = Program::new(vec![Op::Halt as u8], pool.into_values());
        let json = serde_json::to_string(&prog).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(prog.code, back.code);
        assert_eq!(prog.consts.len(), back.consts.len());
        for (a, b) in prog.consts.iter().zip(back.consts.iter()) {
            match (a, b) {
                (Value::Number(x), Value::Number(y)) => {
                    assert_eq!(x.to_bits(), y.to_bits());
                }
                _ => assert_eq!(a, b),
            }
        }
    }
}
