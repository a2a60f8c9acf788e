//! Native function registry and the host-side view of the VM.
//!
//! Natives are per-VM-instance: two VMs on separate threads register
//! independently and never share state. A callback receives a
//! [`HostContext`] for heap access (allocating return arrays, reading
//! strings) plus the popped argument slice, and returns one value or a
//! fault.

use crate::error::VmFault;
use crate::heap::Heap;
use sprig_types::{ArrayRef, MemAddr, Value};
use std::collections::HashMap;

/// Boxed native callback.
pub type NativeFn = Box<dyn Fn(&mut HostContext<'_>, &[Value]) -> Result<Value, VmFault>>;

/// One registered native.
pub struct NativeEntry {
    /// Parameter signature string kept for host-side integration
    /// checks, e.g. `"[c]"` for a print taking one string.
    pub sig: String,
    pub arity: u32,
    pub func: NativeFn,
}

impl std::fmt::Debug for NativeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEntry")
            .field("sig", &self.sig)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Name -> native binding table for one VM instance.
#[derive(Debug, Default)]
pub struct NativeRegistry {
    entries: HashMap<String, NativeEntry>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native. Duplicate names are rejected.
    pub fn register(
        &mut self,
        name: &str,
        sig: &str,
        arity: u32,
        func: NativeFn,
    ) -> Result<(), VmFault> {
        if self.entries.contains_key(name) {
            return Err(VmFault::DuplicateNative(name.to_string()));
        }
        self.entries.insert(
            name.to_string(),
            NativeEntry {
                sig: sig.to_string(),
                arity,
                func,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&NativeEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a native callback may touch while the VM is suspended.
pub struct HostContext<'a> {
    pub(crate) heap: &'a mut Heap,
    pub(crate) consts: &'a [Value],
    /// The operand stack, used as GC roots when a host allocation has
    /// to collect.
    pub(crate) roots: &'a [Value],
    /// The in-flight call's argument buffer. Rooted alongside the
    /// stack: the arguments are popped before the callback runs, so
    /// without this a collection could reclaim them mid-call.
    pub(crate) args: &'a [Value],
}

impl HostContext<'_> {
    /// Read the elements behind an array handle, const or heap.
    pub fn read_array(&self, r: ArrayRef) -> Option<Vec<Value>> {
        match r.addr {
            MemAddr::Heap(_) => self.heap.slice(r).map(|s| s.to_vec()),
            MemAddr::Const(addr) => self
                .consts
                .get(addr as usize..(addr + r.len) as usize)
                .map(|s| s.to_vec()),
        }
    }

    /// Read a char-array handle back as a string.
    pub fn read_string(&self, r: ArrayRef) -> Option<String> {
        self.read_array(r)?
            .iter()
            .map(|v| match v {
                Value::Char(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Allocate a heap array for a return value, collecting once on
    /// pressure.
    pub fn alloc_array(&mut self, values: &[Value]) -> Result<Value, VmFault> {
        let len = values.len() as u32;
        let addr = match self.heap.alloc(len) {
            Some(addr) => addr,
            None => {
                self.heap.collect(&[self.roots, self.args, values]);
                self.heap
                    .alloc(len)
                    .ok_or(VmFault::HeapExhausted(len))?
            }
        };
        self.heap.write(addr, values)?;
        Ok(Value::Array(ArrayRef::new(MemAddr::Heap(addr), len)))
    }

    /// Allocate a heap string (char array) for a return value.
    pub fn alloc_string(&mut self, s: &str) -> Result<Value, VmFault> {
        let chars: Vec<Value> = s.chars().map(Value::Char).collect();
        self.alloc_array(&chars)
    }
}
