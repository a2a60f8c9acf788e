//! Segmented mark-bitmap heap.
//!
//! The heap is a fixed run of value slots split into 64-slot segments,
//! with one `u64` mark word per segment (bit k covers slot k). An
//! allocation of N slots claims one *header* segment whose mark word is
//! fully set, followed by `ceil(N/64)` data segments; the last data
//! word keeps only its `N % 64` low bits, the unused high bits stay
//! clear. A segment is free exactly when its mark word is zero, so the
//! fully-set header acts as a barrier the allocator's free-scan cannot
//! mistake for reusable space.
//!
//! Collection is mark-sweep: clear every mark word, then re-mark each
//! allocation reachable from the roots. Tracing is one level deep
//! (arrays reached from a root have their element handles marked, no
//! further). There is no compaction; an address stays valid until its
//! segments are reclaimed.

use crate::error::VmFault;
use sprig_types::{ArrayRef, MemAddr, Value};

/// Slots per segment; one mark-word bit per slot.
pub const SEGMENT_SLOTS: u32 = 64;

/// The VM heap.
#[derive(Debug)]
pub struct Heap {
    slots: Vec<Value>,
    marks: Vec<u64>,
}

impl Heap {
    /// Create a heap with at least `capacity_slots` usable slots,
    /// rounded up to whole segments.
    pub fn new(capacity_slots: usize) -> Self {
        let segments = capacity_slots.div_ceil(SEGMENT_SLOTS as usize).max(1);
        Self {
            slots: vec![Value::None; segments * SEGMENT_SLOTS as usize],
            marks: vec![0; segments],
        }
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.marks.len()
    }

    /// Number of segments currently claimed (header or data).
    pub fn used_segments(&self) -> usize {
        self.marks.iter().filter(|&&m| m != 0).count()
    }

    /// Snapshot of the mark words, for introspection and tests.
    pub fn mark_words(&self) -> &[u64] {
        &self.marks
    }

    /// Allocate `len` slots. Returns the data address (the first slot
    /// after the header segment), or `None` when no contiguous run of
    /// free segments is large enough.
    pub fn alloc(&mut self, len: u32) -> Option<u32> {
        let data_words = len.div_ceil(SEGMENT_SLOTS) as usize;
        let needed = 1 + data_words;
        let mut start = 0usize;
        while start + needed <= self.marks.len() {
            match self.marks[start..start + needed].iter().position(|&m| m != 0) {
                // Skip past the claimed segment blocking this run.
                Some(busy) => start += busy + 1,
                None => {
                    self.claim(start, len);
                    return Some(((start + 1) * SEGMENT_SLOTS as usize) as u32);
                }
            }
        }
        None
    }

    /// Set the mark words of the allocation with header segment
    /// `header` and data length `len`.
    fn claim(&mut self, header: usize, len: u32) {
        self.marks[header] = u64::MAX;
        let data_words = len.div_ceil(SEGMENT_SLOTS) as usize;
        for k in 0..data_words {
            let remaining = len as usize - k * SEGMENT_SLOTS as usize;
            self.marks[header + 1 + k] = if remaining >= SEGMENT_SLOTS as usize {
                u64::MAX
            } else {
                (1u64 << remaining) - 1
            };
        }
    }

    /// Mark-sweep collection from the given root slices.
    ///
    /// Every heap handle found directly in a root slice is marked, and
    /// so are heap handles stored in those arrays' slots (one level).
    pub fn collect(&mut self, roots: &[&[Value]]) {
        for mark in &mut self.marks {
            *mark = 0;
        }
        let mut live: Vec<ArrayRef> = Vec::new();
        for slice in roots {
            for value in *slice {
                if let Value::Array(r) = value {
                    if matches!(r.addr, MemAddr::Heap(_)) {
                        live.push(*r);
                    }
                }
            }
        }
        for r in live {
            self.mark(r);
            // One level of element tracing.
            let MemAddr::Heap(addr) = r.addr else { continue };
            for i in 0..r.len {
                if let Some(Value::Array(elem)) =
                    self.slots.get((addr + i) as usize).copied()
                {
                    if matches!(elem.addr, MemAddr::Heap(_)) {
                        self.mark(elem);
                    }
                }
            }
        }
    }

    fn mark(&mut self, r: ArrayRef) {
        let MemAddr::Heap(addr) = r.addr else { return };
        let data_seg = (addr / SEGMENT_SLOTS) as usize;
        let data_words = r.len.div_ceil(SEGMENT_SLOTS) as usize;
        if data_seg == 0 || data_seg + data_words > self.marks.len() {
            return;
        }
        self.claim(data_seg - 1, r.len);
    }

    /// Read one slot of an allocation.
    pub fn get(&self, addr: u32, index: u32) -> Option<Value> {
        self.slots.get((addr + index) as usize).copied()
    }

    /// Write values starting at a data address.
    pub fn write(&mut self, addr: u32, values: &[Value]) -> Result<(), VmFault> {
        let start = addr as usize;
        let end = start + values.len();
        if end > self.slots.len() {
            return Err(VmFault::HeapExhausted(values.len() as u32));
        }
        self.slots[start..end].copy_from_slice(values);
        Ok(())
    }

    /// Borrow the slots of a heap allocation.
    pub fn slice(&self, r: ArrayRef) -> Option<&[Value]> {
        let MemAddr::Heap(addr) = r.addr else { return None };
        self.slots
            .get(addr as usize..(addr + r.len) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_types::{ArrayRef, MemAddr, Value};

    fn heap_ref(addr: u32, len: u32) -> Value {
        Value::Array(ArrayRef::new(MemAddr::Heap(addr), len))
    }

    #[test]
    fn test_first_allocation_lands_after_header() {
        let mut heap = Heap::new(1024);
        assert_eq!(heap.alloc(70), Some(64));
        // Header fully set, first data word full, second keeps 6 bits.
        assert_eq!(heap.mark_words()[0], u64::MAX);
        assert_eq!(heap.mark_words()[1], u64::MAX);
        assert_eq!(heap.mark_words()[2], (1 << 6) - 1);
        assert_eq!(heap.mark_words()[3], 0);
    }

    #[test]
    fn test_second_allocation_skips_claimed_segments() {
        let mut heap = Heap::new(1024);
        assert_eq!(heap.alloc(70), Some(64));
        assert_eq!(heap.alloc(2), Some(256));
        assert_eq!(heap.mark_words()[3], u64::MAX);
        assert_eq!(heap.mark_words()[4], 0b11);
    }

    #[test]
    fn test_exact_multiple_of_segment_has_full_last_word() {
        let mut heap = Heap::new(1024);
        assert_eq!(heap.alloc(128), Some(64));
        assert_eq!(heap.mark_words()[1], u64::MAX);
        assert_eq!(heap.mark_words()[2], u64::MAX);
        assert_eq!(heap.mark_words()[3], 0);
    }

    #[test]
    fn test_collect_reclaims_unrooted_allocations() {
        let mut heap = Heap::new(1024);
        let first = heap.alloc(70).unwrap();
        let second = heap.alloc(2).unwrap();
        assert_eq!((first, second), (64, 256));

        // Drop the first handle, keep the second rooted.
        let roots = [heap_ref(second, 2)];
        heap.collect(&[&roots]);
        assert_eq!(heap.mark_words()[0], 0);
        assert_eq!(heap.mark_words()[1], 0);
        assert_eq!(heap.mark_words()[2], 0);
        assert_eq!(heap.mark_words()[3], u64::MAX);
        assert_eq!(heap.mark_words()[4], 0b11);

        // The freed run is reused for an identical request.
        assert_eq!(heap.alloc(70), Some(64));
    }

    #[test]
    fn test_collect_traces_one_level_of_elements() {
        let mut heap = Heap::new(1024);
        let inner = heap.alloc(3).unwrap();
        let outer = heap.alloc(1).unwrap();
        heap.write(outer, &[heap_ref(inner, 3)]).unwrap();

        let roots = [heap_ref(outer, 1)];
        heap.collect(&[&roots]);
        // Both the outer array and the inner array it holds survive.
        assert!(heap.used_segments() >= 4);
        assert_ne!(heap.mark_words()[(inner / 64 - 1) as usize], 0);
    }

    #[test]
    fn test_alloc_fails_when_no_run_fits() {
        let mut heap = Heap::new(128); // 2 segments
        assert_eq!(heap.alloc(65), None); // needs 3 segments
        assert_eq!(heap.alloc(10), Some(64));
        assert_eq!(heap.alloc(1), None); // no free run left
    }

    #[test]
    fn test_zero_length_allocation_claims_only_a_header() {
        let mut heap = Heap::new(256);
        let addr = heap.alloc(0).unwrap();
        assert_eq!(addr, 64);
        assert_eq!(heap.used_segments(), 1);
    }

    #[test]
    fn test_write_and_read_back() {
        let mut heap = Heap::new(256);
        let addr = heap.alloc(3).unwrap();
        heap.write(addr, &[Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)])
            .unwrap();
        assert_eq!(heap.get(addr, 2), Some(Value::Number(3.0)));
        let r = ArrayRef::new(MemAddr::Heap(addr), 3);
        assert_eq!(heap.slice(r).unwrap().len(), 3);
    }
}
