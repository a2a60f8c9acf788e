//! sprig virtual machine.
//!
//! A stack interpreter over [`sprig_types::Program`] bytecode with a
//! per-instruction cycle budget, a segmented mark-bitmap heap with
//! mark-sweep collection, and a per-instance native-function registry
//! for host call-outs.

mod error;
mod heap;
mod native;
mod vm;

pub use error::VmFault;
pub use heap::{Heap, SEGMENT_SLOTS};
pub use native::{HostContext, NativeEntry, NativeRegistry};
pub use vm::{ExecArgs, Vm, VmConfig};
