//! The collector: owns the heap, the root list and the running statistics,
//! and is the one place allocation, collection and the barriers meet.
//!
//! A single struct holding everything mutable, passed by `&mut` reference
//! (or reached through the lazily-initialized [`global`] singleton) is the
//! same "global mutable state behind one handle" shape comet uses for its
//! `SemiSpace`/`GcBase` implementors.

use crate::config::HeapConfig;
use crate::fatal;
use crate::heap::{cell_size, Heap};
use crate::roots::{RootError, RootList, RootSlot};
use crate::stats::Stats;
use crate::tag::Tag;
use parking_lot::{Mutex, Once};
use std::mem::MaybeUninit;

pub struct Collector {
    pub(crate) heap: Heap,
    pub(crate) roots: RootList,
    pub(crate) stats: Stats,
    pub(crate) config: HeapConfig,
}

impl Collector {
    pub fn new(config: HeapConfig) -> Self {
        let heap = Heap::new(config.half_space_size);
        Collector {
            heap,
            roots: RootList::new(),
            stats: Stats::new(),
            config,
        }
    }

    // -- allocation ---------------------------------------------------

    pub fn alloc(&mut self, tag: Tag, field_count: usize) -> *mut u8 {
        let size = cell_size(field_count);
        if size > self.heap.half_space_size() {
            fatal::oversized_allocation(self, size, self.heap.half_space_size());
        }
        let ptr = if self.config.incremental {
            self.alloc_incremental(size)
        } else {
            self.alloc_stw(size)
        };
        Heap::write_header(ptr, tag, field_count);
        self.stats.record_allocation(size);
        if self.config.debug {
            eprintln!(
                "bakergc: alloc {} ({} bytes) -> {:p}",
                tag.name(),
                size,
                ptr
            );
        }
        ptr
    }

    fn alloc_incremental(&mut self, size: usize) -> *mut u8 {
        if let Some(ptr) = self.heap.try_alloc_incremental(size) {
            self.advance_scan_or_fatal(size);
            return ptr;
        }
        self.collect_cycle();
        match self.heap.try_alloc_incremental(size) {
            Some(ptr) => {
                self.advance_scan_or_fatal(size);
                ptr
            }
            None => fatal::out_of_memory(self),
        }
    }

    fn advance_scan_or_fatal(&mut self, budget: usize) {
        if self.heap.advance_scan(budget, &mut self.stats).is_err() {
            fatal::out_of_memory(self);
        }
    }

    fn alloc_stw(&mut self, size: usize) -> *mut u8 {
        if let Some(ptr) = self.heap.try_alloc_stw(size) {
            return ptr;
        }
        self.collect_cycle();
        if self.heap.copy_all_reachable(&mut self.stats).is_err() {
            fatal::out_of_memory(self);
        }
        match self.heap.try_alloc_stw(size) {
            Some(ptr) => ptr,
            None => fatal::out_of_memory(self),
        }
    }

    /// Convenience used by tests and the demo binary: allocates a cell and
    /// writes `fields` into it in one step.
    pub fn alloc_object(&mut self, tag: Tag, fields: &[*mut u8]) -> *mut u8 {
        let obj = self.alloc(tag, fields.len());
        for (i, &v) in fields.iter().enumerate() {
            self.heap.set_field(obj, i, v);
        }
        obj
    }

    // -- collection -----------------------------------------------------

    /// Flips the spaces and forwards every registered root. Called
    /// automatically when allocation can't be satisfied; also exposed for
    /// mutators that want to force a cycle.
    pub fn collect_cycle(&mut self) {
        if !self.heap.is_previous_cycle_complete() {
            fatal::previous_cycle_incomplete(self);
        }
        self.stats.begin_cycle();
        self.heap.flip();
        let slots: Vec<RootSlot> = self.roots.iter().copied().collect();
        for slot in slots {
            // SAFETY: registered slots are mutator-owned storage holding a
            // managed pointer, guaranteed live for as long as they remain
            // registered.
            unsafe {
                let old = *slot;
                match self.heap.forward(old, &mut self.stats) {
                    Ok(new) => *slot = new,
                    Err(_) => fatal::out_of_memory(self),
                }
            }
        }
        if self.config.debug {
            eprintln!(
                "bakergc: collection cycle #{} complete",
                self.stats.gc_cycles
            );
        }
    }

    // -- roots --------------------------------------------------------

    pub fn push_root(&mut self, slot: RootSlot) {
        self.roots.push(slot);
    }

    pub fn pop_root(&mut self, slot: RootSlot) {
        match self.roots.pop(slot) {
            Ok(()) => {}
            Err(RootError::Underflow) => fatal::root_stack_underflow(),
            Err(RootError::Mismatch { expected, actual }) => {
                fatal::root_stack_mismatch(expected, actual)
            }
        }
    }

    // -- barriers -------------------------------------------------------

    pub fn is_gc_managed(&self, p: *const u8) -> bool {
        self.heap.is_gc_managed(p)
    }

    pub fn read_barrier(&mut self, obj: *mut u8, field_index: usize) {
        if self.heap.is_gc_managed(obj) {
            self.stats.record_read();
        }
        if !self.config.incremental {
            return;
        }
        let v = self.heap.field(obj, field_index);
        if self.heap.in_from_space(v) {
            self.stats.record_read_barrier_activation();
            match self.heap.forward(v, &mut self.stats) {
                Ok(fv) => self.heap.set_field(obj, field_index, fv),
                Err(_) => fatal::out_of_memory(self),
            }
        }
    }

    /// Baker's algorithm needs no write forwarding: the write barrier exists
    /// only to keep statistics, never to touch `obj.field[field_index]`
    /// itself. It never activates -- there is no lingering from-space
    /// pointer for a write to fix up, since the read barrier already
    /// cleanses anything the mutator could have read -- so
    /// `write_barrier_activations` stays at zero, matching the original
    /// runtime's own comment on the counter.
    pub fn write_barrier(&mut self, obj: *mut u8, _field_index: usize, _contents: *mut u8) {
        if self.heap.is_gc_managed(obj) {
            self.stats.record_write();
        }
    }

    // -- accessors ------------------------------------------------------

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

static GLOBAL_INIT: Once = Once::new();
static mut GLOBAL: MaybeUninit<Mutex<Collector>> = MaybeUninit::uninit();

/// The process-wide collector instance backing [`crate::ffi`].
///
/// Initialization is idempotent and lazy: the first caller builds it, every
/// later caller observes the same instance. The mutex only serializes that
/// one-time construction and the FFI entry points; the collector's own
/// algorithms assume single-threaded, non-reentrant use once a lock is held.
pub fn global() -> &'static Mutex<Collector> {
    GLOBAL_INIT.call_once(|| unsafe {
        GLOBAL
            .as_mut_ptr()
            .write(Mutex::new(Collector::new(HeapConfig::default())));
    });
    // SAFETY: `call_once` above guarantees GLOBAL is initialized before this
    // read, on every thread, per `Once`'s happens-before guarantee.
    unsafe { &*GLOBAL.as_ptr() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Collector {
        Collector::new(HeapConfig::new(256))
    }

    #[test]
    fn allocates_and_reads_back_fields() {
        let mut gc = tiny();
        let x = gc.alloc(Tag::Zero, 0);
        let r = gc.alloc_object(Tag::Ref, &[x]);
        assert_eq!(gc.heap.field(r, 0), x);
        assert_eq!(gc.heap.tag_of(r), Tag::Ref);
    }

    #[test]
    fn collection_preserves_rooted_values_and_reclaims_garbage() {
        let mut gc = tiny();
        let mut root: *mut u8 = gc.alloc(Tag::Zero, 0);
        gc.push_root(&mut root as *mut *mut u8);

        // allocate garbage that becomes unreachable once root is overwritten
        for _ in 0..4 {
            let _garbage = gc.alloc_object(Tag::Succ, &[root]);
        }

        let before = root;
        gc.collect_cycle();
        // root survived and was relocated into the (new) to-space
        assert!(gc.heap.in_to_space(root));
        assert_eq!(gc.heap.tag_of(root), Tag::Zero);
        assert_ne!(root, before);

        gc.pop_root(&mut root as *mut *mut u8);
    }

    #[test]
    fn triggers_collection_automatically_on_exhaustion() {
        let mut gc = Collector::new(HeapConfig::new(128));
        let mut root: *mut u8 = gc.alloc(Tag::Zero, 0);
        gc.push_root(&mut root as *mut *mut u8);
        let cycles_before = gc.stats().gc_cycles;
        for _ in 0..20 {
            let _ = gc.alloc_object(Tag::Succ, &[root]);
        }
        assert!(gc.stats().gc_cycles > cycles_before);
        gc.pop_root(&mut root as *mut *mut u8);
    }

    #[test]
    fn non_incremental_mode_collects_stop_the_world() {
        let mut gc = Collector::new(HeapConfig::new(128).non_incremental());
        let mut root: *mut u8 = gc.alloc(Tag::Zero, 0);
        gc.push_root(&mut root as *mut *mut u8);
        for _ in 0..20 {
            let _ = gc.alloc_object(Tag::Succ, &[root]);
        }
        assert!(gc.stats().gc_cycles >= 1);
        assert!(gc.heap.is_previous_cycle_complete());
        gc.pop_root(&mut root as *mut *mut u8);
    }

    #[test]
    fn barriers_update_statistics() {
        let mut gc = tiny();
        let a = gc.alloc(Tag::Zero, 0);
        let b = gc.alloc_object(Tag::Ref, &[a]);
        gc.read_barrier(b, 0);
        gc.write_barrier(b, 0, a);
        assert_eq!(gc.stats().read_operations, 1);
        assert_eq!(gc.stats().write_operations, 1);
        // Baker's algorithm never needs to forward on a write: the read
        // barrier has already cleansed anything the mutator could read, so
        // this counter never leaves zero.
        assert_eq!(gc.stats().write_barrier_activations, 0);
    }

    #[test]
    fn sharing_is_preserved_as_a_single_copy() {
        let mut gc = tiny();
        let shared = gc.alloc(Tag::Zero, 0);
        let mut tuple = gc.alloc_object(Tag::Tuple, &[shared, shared]);
        gc.push_root(&mut tuple as *mut *mut u8);

        gc.collect_cycle();
        // Fields still carry the raw (pre-forwarding) address of `shared`
        // until scanned or read-barriered; forward each independently.
        gc.read_barrier(tuple, 0);
        gc.read_barrier(tuple, 1);

        let a = gc.heap.field(tuple, 0);
        let b = gc.heap.field(tuple, 1);
        assert!(gc.heap.in_to_space(a));
        assert_eq!(a, b);

        gc.pop_root(&mut tuple as *mut *mut u8);
    }

    #[test]
    fn read_barrier_forwards_lingering_from_space_pointer_once() {
        let mut gc = tiny();
        let inner = gc.alloc(Tag::Zero, 0);
        let mut outer = gc.alloc_object(Tag::Ref, &[inner]);
        gc.push_root(&mut outer as *mut *mut u8);

        gc.collect_cycle();
        // `outer` itself was forwarded as a root, but its own field was only
        // copied raw during evacuation and still points into from-space.
        assert!(gc.heap.in_from_space(gc.heap.field(outer, 0)));

        gc.read_barrier(outer, 0);
        assert!(gc.heap.in_to_space(gc.heap.field(outer, 0)));
        assert_eq!(gc.stats().read_barrier_activations, 1);

        gc.pop_root(&mut outer as *mut *mut u8);
    }
}
