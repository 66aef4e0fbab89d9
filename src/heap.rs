//! Heap layout, cursors and the object access primitives the evacuator and
//! scanner build on.
//!
//! A single `memmap2` reservation backs both half-spaces, the same way
//! comet's `BumpPointerSpace` wraps one `Mmap` per space but here split in
//! half up front: pointer comparisons between from-space and to-space then
//! always compare addresses carved out of one allocation, never two
//! independently obtained ones.

use crate::header::{Header, HEADER_SIZE};
use crate::stats::Stats;
use crate::tag::Tag;
use memmap2::MmapMut;
use std::mem::size_of;

pub const WORD_SIZE: usize = size_of::<*mut u8>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcFault {
    /// to-space was exhausted mid-evacuation or mid-allocation.
    OutOfMemory,
    /// a previous collection cycle never finished scanning before a new one
    /// was asked to start.
    CycleIncomplete,
}

pub struct Heap {
    // Kept alive for the lifetime of the heap; never read directly once the
    // derived pointers below are computed.
    _mapping: MmapMut,

    to_space_begin: *mut u8,
    to_space_end: *mut u8,
    from_space_begin: *mut u8,
    from_space_end: *mut u8,

    /// Boundary between objects whose fields are fully forwarded and the
    /// grey region still awaiting a scan.
    scan: *mut u8,
    /// Next free byte in to-space, also the high end of the grey region.
    next: *mut u8,
    /// Low end of the region reserved for this cycle's allocations; shrinks
    /// towards `next` as the mutator allocates.
    limit: *mut u8,
}

/// Cell size for an object with `field_count` fields: one header word plus
/// at least one field word, so that every cell -- including nullary
/// constructors such as `Zero` or `Unit` -- has a valid `field[0]` slot to
/// later hold a forwarding pointer.
pub fn cell_size(field_count: usize) -> usize {
    HEADER_SIZE + field_count.max(1) * WORD_SIZE
}

impl Heap {
    pub fn new(half_space_size: usize) -> Heap {
        let total = half_space_size
            .checked_mul(2)
            .expect("heap reservation size overflowed");
        let mapping = MmapMut::map_anon(total).expect("failed to reserve heap memory");
        let base = mapping.as_ptr() as *mut u8;
        // SAFETY: both halves lie within the single `total`-byte mapping.
        let half_b = unsafe { base.add(half_space_size) };
        Heap {
            _mapping: mapping,
            to_space_begin: base,
            to_space_end: unsafe { base.add(half_space_size) },
            from_space_begin: half_b,
            from_space_end: unsafe { half_b.add(half_space_size) },
            scan: base,
            next: base,
            limit: unsafe { base.add(half_space_size) },
        }
    }

    pub fn half_space_size(&self) -> usize {
        self.to_space_end as usize - self.to_space_begin as usize
    }

    #[inline]
    pub fn in_to_space(&self, p: *const u8) -> bool {
        !p.is_null() && p >= self.to_space_begin && p < self.to_space_end
    }

    #[inline]
    pub fn in_from_space(&self, p: *const u8) -> bool {
        !p.is_null() && p >= self.from_space_begin && p < self.from_space_end
    }

    #[inline]
    pub fn is_gc_managed(&self, p: *const u8) -> bool {
        self.in_to_space(p) || self.in_from_space(p)
    }

    pub fn scan(&self) -> *mut u8 {
        self.scan
    }
    pub fn next(&self) -> *mut u8 {
        self.next
    }
    pub fn limit(&self) -> *mut u8 {
        self.limit
    }
    pub fn to_space_begin(&self) -> *mut u8 {
        self.to_space_begin
    }
    pub fn to_space_end(&self) -> *mut u8 {
        self.to_space_end
    }

    pub fn is_previous_cycle_complete(&self) -> bool {
        self.scan == self.next
    }

    /// Swaps from/to space and resets the cursors for a new collection
    /// cycle. Caller must have already verified
    /// [`Heap::is_previous_cycle_complete`].
    pub fn flip(&mut self) {
        std::mem::swap(&mut self.from_space_begin, &mut self.to_space_begin);
        std::mem::swap(&mut self.from_space_end, &mut self.to_space_end);
        self.scan = self.to_space_begin;
        self.next = self.to_space_begin;
        self.limit = self.to_space_end;
    }

    // -- object access -----------------------------------------------------

    #[inline]
    fn header_ptr(obj: *mut u8) -> *mut Header {
        obj as *mut Header
    }

    pub fn tag_of(&self, obj: *mut u8) -> Tag {
        // SAFETY: callers only pass pointers to live cells written by
        // `write_header`.
        unsafe { (*Self::header_ptr(obj)).tag() }
    }

    pub fn field_count_of(&self, obj: *mut u8) -> usize {
        unsafe { (*Self::header_ptr(obj)).field_count() }
    }

    pub fn cell_size_of(&self, obj: *mut u8) -> usize {
        cell_size(self.field_count_of(obj))
    }

    pub fn write_header(obj: *mut u8, tag: Tag, field_count: usize) {
        unsafe { Self::header_ptr(obj).write(Header::new(tag, field_count)) };
    }

    #[inline]
    fn field_slot(obj: *mut u8, index: usize) -> *mut *mut u8 {
        unsafe { obj.add(HEADER_SIZE + index * WORD_SIZE) as *mut *mut u8 }
    }

    pub fn field(&self, obj: *mut u8, index: usize) -> *mut u8 {
        unsafe { *Self::field_slot(obj, index) }
    }

    pub fn set_field(&mut self, obj: *mut u8, index: usize, value: *mut u8) {
        unsafe { *Self::field_slot(obj, index) = value };
    }

    /// An object in from-space is forwarded once its `field[0]` points into
    /// to-space: before evacuation, an unforwarded from-space object's
    /// fields can only hold raw data or pointers into from-space itself,
    /// since to-space was entirely drained at the end of the previous
    /// cycle.
    pub fn is_forwarded(&self, obj: *mut u8) -> bool {
        self.in_to_space(self.field(obj, 0))
    }

    fn is_unforwarded_from_space_pointer(&self, v: *mut u8) -> bool {
        self.in_from_space(v) && !self.is_forwarded(v)
    }

    // -- evacuation ----------------------------------------------------

    /// Follows `p` to its to-space location, evacuating it first if needed.
    /// Pointers outside from-space (already in to-space, or not managed at
    /// all) pass through unchanged.
    pub fn forward(&mut self, p: *mut u8, stats: &mut Stats) -> Result<*mut u8, GcFault> {
        if !self.in_from_space(p) {
            return Ok(p);
        }
        if !self.is_forwarded(p) {
            self.chase(p, stats)?;
        }
        Ok(self.field(p, 0))
    }

    /// Copies `obj` and every unforwarded object reachable from it through a
    /// chain of single successor fields, iteratively rather than
    /// recursively. At each object, the first unforwarded from-space field
    /// (lowest index) becomes the next link in the chain; the rest are
    /// copied as raw, still-unforwarded values for a later `advance_scan`
    /// pass to fix up.
    fn chase(&mut self, mut obj: *mut u8, stats: &mut Stats) -> Result<(), GcFault> {
        while !obj.is_null() {
            let tag = self.tag_of(obj);
            let field_count = self.field_count_of(obj);
            let size = cell_size(field_count);

            let dest = self.next;
            let new_next = unsafe { dest.add(size) };
            if new_next > self.limit {
                return Err(GcFault::OutOfMemory);
            }
            self.next = new_next;

            // SAFETY: [obj, obj+size) and [dest, dest+size) are disjoint
            // cells within the single heap mapping, each large enough to
            // hold `size` bytes.
            unsafe { std::ptr::copy_nonoverlapping(obj, dest, size) };

            let mut successor: *mut u8 = std::ptr::null_mut();
            for i in 0..field_count {
                let v = self.field(obj, i);
                if successor.is_null() && self.is_unforwarded_from_space_pointer(v) {
                    successor = v;
                }
            }

            stats.record_evacuation(size);
            Self::write_header(dest, tag, field_count);
            self.set_field(obj, 0, dest);
            obj = successor;
        }
        Ok(())
    }

    // -- scanning --------------------------------------------------------

    /// Forwards fields of already-evacuated objects in the grey region
    /// `[scan, next)`, stopping once at least `budget` bytes have been
    /// scanned (or the region is exhausted). `budget == usize::MAX` scans to
    /// completion, implementing `copy_all_reachable`.
    pub fn advance_scan(&mut self, budget: usize, stats: &mut Stats) -> Result<(), GcFault> {
        let mut scanned = 0usize;
        while self.scan < self.next && scanned < budget {
            let obj = self.scan;
            let field_count = self.field_count_of(obj);
            for i in 0..field_count {
                let v = self.field(obj, i);
                let fv = self.forward(v, stats)?;
                self.set_field(obj, i, fv);
            }
            let size = cell_size(field_count);
            scanned += size;
            self.scan = unsafe { obj.add(size) };
        }
        Ok(())
    }

    pub fn copy_all_reachable(&mut self, stats: &mut Stats) -> Result<(), GcFault> {
        self.advance_scan(usize::MAX, stats)
    }

    // -- allocation primitives --------------------------------------------

    /// Bumps `limit` down by `size` for an incremental allocation. Returns
    /// `None` (without mutating state) if this would collide with `next`.
    pub fn try_alloc_incremental(&mut self, size: usize) -> Option<*mut u8> {
        let candidate = unsafe { self.limit.sub(size) };
        if (candidate as usize) < (self.next as usize) {
            return None;
        }
        self.limit = candidate;
        Some(candidate)
    }

    /// Bumps `next` up by `size` for a non-incremental (stop-the-world)
    /// allocation. Returns `None` (without mutating state) if this would
    /// collide with `limit`.
    pub fn try_alloc_stw(&mut self, size: usize) -> Option<*mut u8> {
        let candidate = unsafe { self.next.add(size) };
        if candidate > self.limit {
            return None;
        }
        let ptr = self.next;
        self.next = candidate;
        Some(ptr)
    }

    /// Iterates object cells in `[begin, end)`, calling `f` with each cell's
    /// address. Used by diagnostics to dump heap contents.
    pub fn for_each_object_in(&self, begin: *mut u8, end: *mut u8, mut f: impl FnMut(*mut u8)) {
        let mut cur = begin;
        while (cur as usize) + HEADER_SIZE <= end as usize {
            let size = self.cell_size_of(cur);
            if (cur as usize) + size > end as usize {
                break;
            }
            f(cur);
            cur = unsafe { cur.add(size) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_heap(half_size: usize) -> Heap {
        Heap::new(half_size)
    }

    #[test]
    fn fresh_heap_has_full_free_region_and_complete_cycle() {
        let heap = new_heap(256);
        assert!(heap.is_previous_cycle_complete());
        assert_eq!(heap.next(), heap.scan());
        assert_eq!(heap.limit(), heap.to_space_end());
    }

    #[test]
    fn nullary_object_round_trips_through_evacuation() {
        let mut heap = new_heap(256);
        let mut stats = Stats::new();
        let size = cell_size(0);
        let obj = heap.try_alloc_stw(size).unwrap();
        Heap::write_header(obj, Tag::Unit, 0);
        heap.flip();
        let forwarded = heap.forward(obj, &mut stats).unwrap();
        assert!(heap.in_to_space(forwarded));
        assert_eq!(heap.tag_of(forwarded), Tag::Unit);
    }

    #[test]
    fn chase_follows_a_chain_of_single_successors() {
        let mut heap = new_heap(256);
        let mut stats = Stats::new();
        // build: a -> b -> c (Cons cells with field[0] holding the link)
        let c = heap.try_alloc_stw(cell_size(1)).unwrap();
        Heap::write_header(c, Tag::Empty, 1);
        heap.set_field(c, 0, std::ptr::null_mut());

        let b = heap.try_alloc_stw(cell_size(1)).unwrap();
        Heap::write_header(b, Tag::Cons, 1);
        heap.set_field(b, 0, c);

        let a = heap.try_alloc_stw(cell_size(1)).unwrap();
        Heap::write_header(a, Tag::Cons, 1);
        heap.set_field(a, 0, b);

        heap.flip();
        let fa = heap.forward(a, &mut stats).unwrap();
        assert!(heap.in_to_space(fa));
        let fb = heap.field(fa, 0);
        assert!(heap.in_to_space(fb));
        let fc = heap.field(fb, 0);
        assert!(heap.in_to_space(fc));
        assert_eq!(stats.resident_objects, 3);
    }

    #[test]
    fn chase_reports_out_of_memory_instead_of_overrunning_limit() {
        let mut heap = new_heap(32);
        let mut stats = Stats::new();
        let obj = heap.try_alloc_stw(cell_size(0)).unwrap();
        Heap::write_header(obj, Tag::Unit, 0);
        heap.flip();
        // shrink available to-space so the copy can't fit
        heap.limit = heap.next;
        assert_eq!(
            heap.forward(obj, &mut stats),
            Err(GcFault::OutOfMemory)
        );
    }
}
