//! The bytecode interpreter.
//!
//! One [`Vm`] owns an operand stack, a heap, and a native registry, and
//! executes one program at a time. Activation records live on the
//! operand stack as ordinary [`Value::Frame`] slots: `call` pushes an
//! incomplete frame carrying the return address, the callee's
//! `make_frame` prologue completes it and shapes the argument/local
//! window, and `return` unwinds to the topmost frame. A frame whose
//! return address is negative belongs to the entry function; returning
//! through it ends execution.
//!
//! Execution is cycle-budgeted: every decoded instruction costs one
//! cycle, and a non-zero budget that runs out raises
//! [`VmFault::CycleLimitExceeded`] no matter how close the program was
//! to finishing.

use crate::error::VmFault;
use crate::heap::Heap;
use crate::native::{HostContext, NativeFn, NativeRegistry};
use serde::{Deserialize, Serialize};
use sprig_types::{ArrayRef, Frame, MemAddr, Op, Program, Value};

/// Numeric equality tolerance for `==` and `!=`.
const EQ_EPSILON: f64 = 1e-9;

// ══════════════════════════════════════════════════════════════════════════════
// Configuration
// ══════════════════════════════════════════════════════════════════════════════

/// Sizing knobs fixed at VM construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConfig {
    /// Maximum operand stack depth, frames included.
    pub stack_size: usize,
    /// Heap capacity in value slots, rounded up to whole segments.
    pub heap_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_size: 256,
            heap_size: 4096,
        }
    }
}

/// Per-execution inputs.
#[derive(Debug, Clone, Default)]
pub struct ExecArgs {
    /// Arguments handed to the entry function.
    pub args: Vec<Value>,
    /// Instruction budget; zero means unbounded.
    pub cycle_limit: u64,
}

impl ExecArgs {
    pub fn new(args: Vec<Value>) -> Self {
        Self {
            args,
            cycle_limit: 0,
        }
    }

    pub fn with_cycle_limit(mut self, limit: u64) -> Self {
        self.cycle_limit = limit;
        self
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Vm
// ══════════════════════════════════════════════════════════════════════════════

/// A single-threaded sprig interpreter instance.
pub struct Vm {
    config: VmConfig,
    heap: Heap,
    stack: Vec<Value>,
    natives: NativeRegistry,
}

impl Vm {
    pub fn new(config: VmConfig) -> Self {
        let heap = Heap::new(config.heap_size);
        Self {
            config,
            heap,
            stack: Vec::new(),
            natives: NativeRegistry::new(),
        }
    }

    /// Bind a native on this instance. Names are unique per VM.
    pub fn register_native(
        &mut self,
        name: &str,
        sig: &str,
        arity: u32,
        func: NativeFn,
    ) -> Result<(), VmFault> {
        self.natives.register(name, sig, arity, func)
    }

    /// Registered natives, for host-side introspection.
    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Run a program to completion and return the entry function's
    /// result. The stack is reset on entry; the heap keeps its state
    /// across runs so handles returned earlier stay readable.
    pub fn execute(&mut self, program: &Program, exec: ExecArgs) -> Result<Value, VmFault> {
        if !program.is_executable() {
            return Err(VmFault::EmptyProgram);
        }
        self.stack.clear();

        let mut host_args = Some(exec.args);
        let mut pc = 0usize;
        let mut cycles = 0u64;

        loop {
            if exec.cycle_limit != 0 {
                if cycles >= exec.cycle_limit {
                    return Err(VmFault::CycleLimitExceeded);
                }
                cycles += 1;
            }

            let byte = *program
                .code
                .get(pc)
                .ok_or(VmFault::TruncatedProgram(pc))?;
            let op = Op::from_byte(byte).ok_or(VmFault::InvalidOpcode { byte, addr: pc })?;
            let mut args = [0u32; 2];
            for (i, slot) in args.iter_mut().enumerate().take(op.operand_count()) {
                *slot = program
                    .read_u32(pc + 1 + 4 * i)
                    .ok_or(VmFault::TruncatedProgram(pc))?;
            }
            // The return address is always the next instruction.
            let next_pc = pc + op.encoded_size();
            pc = next_pc;

            match op {
                Op::Halt => {
                    return Ok(self.stack.pop().unwrap_or(Value::None));
                }
                Op::PushConst => {
                    let value = *program.consts.get(args[0] as usize).ok_or_else(|| {
                        VmFault::InvalidOperand(format!("constant index {} out of range", args[0]))
                    })?;
                    self.push(value)?;
                }
                Op::Pop => {
                    self.pop()?;
                }
                Op::Dup => {
                    let top = *self.stack.last().ok_or(VmFault::StackUnderflow)?;
                    self.push(top)?;
                }
                Op::Swap => {
                    let depth = self.stack.len();
                    if depth < 2 {
                        return Err(VmFault::StackUnderflow);
                    }
                    self.stack.swap(depth - 1, depth - 2);
                }

                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => {
                    let b = self.pop_number(op)?;
                    let a = self.pop_number(op)?;
                    let out = match op {
                        Op::Add => a + b,
                        Op::Sub => a - b,
                        Op::Mul => a * b,
                        Op::Div => a / b,
                        _ => a % b,
                    };
                    self.push(Value::Number(out))?;
                }
                Op::Neg => {
                    let a = self.pop_number(op)?;
                    self.push(Value::Number(-a))?;
                }

                Op::CmpLt | Op::CmpLte | Op::CmpGt | Op::CmpGte => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let ordering = match (a, b) {
                        (Value::Number(x), Value::Number(y)) => x.partial_cmp(&y),
                        (Value::Char(x), Value::Char(y)) => Some(x.cmp(&y)),
                        _ => {
                            return Err(VmFault::InvalidOperand(format!(
                                "{op} needs two numbers or two chars, got {} and {}",
                                a.tag(),
                                b.tag()
                            )))
                        }
                    };
                    let Some(ordering) = ordering else {
                        // NaN compares false everywhere.
                        self.push(Value::Bool(false))?;
                        continue;
                    };
                    let out = match op {
                        Op::CmpLt => ordering.is_lt(),
                        Op::CmpLte => ordering.is_le(),
                        Op::CmpGt => ordering.is_gt(),
                        _ => ordering.is_ge(),
                    };
                    self.push(Value::Bool(out))?;
                }
                Op::CmpEq | Op::CmpNeq => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let eq = values_equal(a, b);
                    self.push(Value::Bool(if op == Op::CmpEq { eq } else { !eq }))?;
                }

                Op::And | Op::Or => {
                    let b = self.pop_bool(op)?;
                    let a = self.pop_bool(op)?;
                    let out = if op == Op::And { a && b } else { a || b };
                    self.push(Value::Bool(out))?;
                }
                Op::Not => {
                    let a = self.pop_bool(op)?;
                    self.push(Value::Bool(!a))?;
                }

                Op::Jump => {
                    pc = args[0] as usize;
                }
                Op::JumpIfFalse => {
                    if !self.pop_bool(op)? {
                        pc = args[0] as usize;
                    }
                }

                Op::Call => {
                    self.push(Value::Frame(Frame::new(next_pc as i32, 0, 0)))?;
                    pc = args[0] as usize;
                }
                Op::EntryPoint => {
                    let args_in = host_args.take().ok_or_else(|| {
                        VmFault::InvalidOperand("entry point executed twice".to_string())
                    })?;
                    if args_in.len() as u32 != args[1] {
                        return Err(VmFault::ArgumentCountMismatch {
                            expected: args[1],
                            got: args_in.len() as u32,
                        });
                    }
                    for value in args_in {
                        self.push(value)?;
                    }
                    // Negative return address marks the exit frame.
                    self.push(Value::Frame(Frame::new(-1, 0, 0)))?;
                    pc = args[0] as usize;
                }
                Op::MakeFrame => {
                    let (num_args, num_locals) = (args[0], args[1]);
                    if num_args > u8::MAX as u32 || num_locals > u8::MAX as u32 {
                        return Err(VmFault::InvalidOperand(format!(
                            "frame shape {num_args}/{num_locals} out of range"
                        )));
                    }
                    let Value::Frame(partial) = self.pop()? else {
                        return Err(VmFault::InvalidOperand(
                            "make_frame without a pending frame".to_string(),
                        ));
                    };
                    if self.stack.len() < num_args as usize {
                        return Err(VmFault::StackUnderflow);
                    }
                    // Sink the frame below the arguments so locals sit
                    // in a contiguous window above it.
                    let at = self.stack.len() - num_args as usize;
                    self.stack.insert(
                        at,
                        Value::Frame(Frame::new(
                            partial.return_pc,
                            num_args as u8,
                            num_locals as u8,
                        )),
                    );
                    if self.stack.len() > self.config.stack_size {
                        return Err(VmFault::StackOverflow);
                    }
                    for _ in num_args..num_locals {
                        self.push(Value::None)?;
                    }
                }
                Op::Return => {
                    let result = self.pop()?;
                    let frame_at = self
                        .stack
                        .iter()
                        .rposition(|v| matches!(v, Value::Frame(_)))
                        .ok_or(VmFault::StackUnderflow)?;
                    let Value::Frame(frame) = self.stack[frame_at] else {
                        unreachable!()
                    };
                    self.stack.truncate(frame_at);
                    if frame.return_pc < 0 {
                        return Ok(result);
                    }
                    self.push(result)?;
                    pc = frame.return_pc as usize;
                }

                Op::StoreLocal => {
                    let value = self.pop()?;
                    let slot = self.local_slot(args[0])?;
                    self.stack[slot] = value;
                }
                Op::LoadLocal => {
                    let slot = self.local_slot(args[0])?;
                    let value = self.stack[slot];
                    self.push(value)?;
                }

                Op::MakeArray => {
                    let n = args[0] as usize;
                    if self.stack.len() < n {
                        return Err(VmFault::StackUnderflow);
                    }
                    let values: Vec<Value> = self.stack.split_off(self.stack.len() - n);
                    let handle = self.alloc_collecting(&values)?;
                    self.push(handle)?;
                }
                Op::ArrayLen => {
                    let r = self.pop_array(op)?;
                    self.push(Value::Number(r.len as f64))?;
                }
                Op::ArrayGet => {
                    let index = self.pop_number(op)?;
                    let r = self.pop_array(op)?;
                    let index = index as i64;
                    if index < 0 || index as u64 >= r.len as u64 {
                        return Err(VmFault::IndexOutOfRange {
                            index,
                            len: r.len,
                        });
                    }
                    let value = self.element(program, r, index as u32)?;
                    self.push(value)?;
                }

                Op::CallNative => {
                    let name = const_string(program, args[0]).ok_or_else(|| {
                        VmFault::InvalidOperand(format!(
                            "constant {} is not a native name",
                            args[0]
                        ))
                    })?;
                    let argc = args[1] as usize;
                    if self.stack.len() < argc {
                        return Err(VmFault::StackUnderflow);
                    }
                    let call_args: Vec<Value> = self.stack.split_off(self.stack.len() - argc);
                    let entry = self
                        .natives
                        .get(&name)
                        .ok_or_else(|| VmFault::UnknownNative(name.clone()))?;
                    if entry.arity as usize != argc {
                        return Err(VmFault::NativeArityMismatch {
                            name,
                            expected: entry.arity,
                            got: argc as u32,
                        });
                    }
                    let mut ctx = HostContext {
                        heap: &mut self.heap,
                        consts: &program.consts,
                        roots: &self.stack,
                        args: &call_args,
                    };
                    let result = (entry.func)(&mut ctx, &call_args)?;
                    self.push(result)?;
                }
            }
        }
    }

    /// Render a value for display, following array handles into the
    /// heap or constant pool. Char arrays render as quoted strings.
    pub fn render(&self, value: Value, program: &Program) -> String {
        match value {
            Value::Array(r) => {
                let Some(elems) = self.elements(program, r) else {
                    return value.to_string();
                };
                if !elems.is_empty() && elems.iter().all(|v| matches!(v, Value::Char(_))) {
                    let s: String = elems
                        .iter()
                        .filter_map(|v| match v {
                            Value::Char(c) => Some(*c),
                            _ => None,
                        })
                        .collect();
                    return format!("\"{s}\"");
                }
                let parts: Vec<String> =
                    elems.iter().map(|v| self.render(*v, program)).collect();
                format!("[{}]", parts.join(", "))
            }
            other => other.to_string(),
        }
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Stack helpers
    // ──────────────────────────────────────────────────────────────────────────

    fn push(&mut self, value: Value) -> Result<(), VmFault> {
        if self.stack.len() >= self.config.stack_size {
            return Err(VmFault::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, VmFault> {
        self.stack.pop().ok_or(VmFault::StackUnderflow)
    }

    fn pop_number(&mut self, op: Op) -> Result<f64, VmFault> {
        match self.pop()? {
            Value::Number(n) => Ok(n),
            other => Err(VmFault::InvalidOperand(format!(
                "{op} needs a number, got {}",
                other.tag()
            ))),
        }
    }

    fn pop_bool(&mut self, op: Op) -> Result<bool, VmFault> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(VmFault::InvalidOperand(format!(
                "{op} needs a bool, got {}",
                other.tag()
            ))),
        }
    }

    fn pop_array(&mut self, op: Op) -> Result<ArrayRef, VmFault> {
        match self.pop()? {
            Value::Array(r) => Ok(r),
            other => Err(VmFault::InvalidOperand(format!(
                "{op} needs an array, got {}",
                other.tag()
            ))),
        }
    }

    /// Absolute stack index of local `slot` in the current frame.
    fn local_slot(&self, slot: u32) -> Result<usize, VmFault> {
        let frame_at = self
            .stack
            .iter()
            .rposition(|v| matches!(v, Value::Frame(_)))
            .ok_or(VmFault::StackUnderflow)?;
        let Value::Frame(frame) = self.stack[frame_at] else {
            unreachable!()
        };
        if slot >= frame.num_locals as u32 {
            return Err(VmFault::InvalidOperand(format!(
                "local slot {slot} out of range ({} locals)",
                frame.num_locals
            )));
        }
        Ok(frame_at + 1 + slot as usize)
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Heap helpers
    // ──────────────────────────────────────────────────────────────────────────

    /// Allocate, collecting once with the stack and the pending values
    /// as roots when the first attempt fails.
    fn alloc_collecting(&mut self, values: &[Value]) -> Result<Value, VmFault> {
        let len = values.len() as u32;
        let addr = match self.heap.alloc(len) {
            Some(addr) => addr,
            None => {
                self.heap.collect(&[&self.stack, values]);
                self.heap
                    .alloc(len)
                    .ok_or(VmFault::HeapExhausted(len))?
            }
        };
        self.heap.write(addr, values)?;
        Ok(Value::Array(ArrayRef::new(MemAddr::Heap(addr), len)))
    }

    fn element(&self, program: &Program, r: ArrayRef, index: u32) -> Result<Value, VmFault> {
        let value = match r.addr {
            MemAddr::Heap(addr) => self.heap.get(addr, index),
            MemAddr::Const(addr) => program.consts.get((addr + index) as usize).copied(),
        };
        value.ok_or(VmFault::IndexOutOfRange {
            index: index as i64,
            len: r.len,
        })
    }

    fn elements(&self, program: &Program, r: ArrayRef) -> Option<Vec<Value>> {
        match r.addr {
            MemAddr::Heap(_) => self.heap.slice(r).map(|s| s.to_vec()),
            MemAddr::Const(addr) => program
                .consts
                .get(addr as usize..(addr + r.len) as usize)
                .map(|s| s.to_vec()),
        }
    }
}

/// Structural equality with a numeric tolerance. Arrays compare by
/// handle, not contents.
fn values_equal(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => (x - y).abs() < EQ_EPSILON,
        (Value::Array(x), Value::Array(y)) => x.addr == y.addr && x.len == y.len,
        _ => a == b,
    }
}

/// Resolve a constant-pool string (a char run behind an array value).
fn const_string(program: &Program, idx: u32) -> Option<String> {
    let Value::Array(r) = program.consts.get(idx as usize)? else {
        return None;
    };
    let MemAddr::Const(addr) = r.addr else {
        return None;
    };
    program
        .consts
        .get(addr as usize..(addr + r.len) as usize)?
        .iter()
        .map(|v| match v {
            Value::Char(c) => Some(*c),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = VmConfig::default();
        assert_eq!(config.stack_size, 256);
        assert_eq!(config.heap_size, 4096);
    }

    #[test]
    fn test_empty_program_is_rejected() {
        let mut vm = Vm::new(VmConfig::default());
        let err = vm.execute(&Program::empty(), ExecArgs::default());
        assert_eq!(err, Err(VmFault::EmptyProgram));
    }

    #[test]
    fn test_numeric_equality_uses_epsilon() {
        assert!(values_equal(
            Value::Number(0.1 + 0.2),
            Value::Number(0.3)
        ));
        assert!(!values_equal(Value::Number(1.0), Value::Number(1.001)));
    }

    #[test]
    fn test_arrays_compare_by_handle() {
        let a = Value::Array(ArrayRef::new(MemAddr::Heap(64), 2));
        let b = Value::Array(ArrayRef::new(MemAddr::Heap(64), 2));
        let c = Value::Array(ArrayRef::new(MemAddr::Heap(256), 2));
        assert!(values_equal(a, b));
        assert!(!values_equal(a, c));
    }
}
