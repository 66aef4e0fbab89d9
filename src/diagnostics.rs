//! Heap and root dumping, in the spirit of the original runtime's
//! `dump_stella_object`/`print_gc_state`/`print_gc_roots`: a textual
//! rendering of cursor positions, evacuated and free-region object
//! contents (bounded by `stats_objects_to_dump` per region so a large heap
//! doesn't flood the console), and the full registered root list, with a
//! dereferenced tag/field dump for any root whose value is still
//! gc-managed.

use crate::collector::Collector;

impl Collector {
    pub fn print_state(&self) {
        let heap = &self.heap;
        println!("== collector state ==");
        println!(
            "to-space:   [{:p}, {:p})",
            heap.to_space_begin(),
            heap.to_space_end()
        );
        println!("  scan:  {:p}", heap.scan());
        println!("  next:  {:p}", heap.next());
        println!("  limit: {:p}", heap.limit());

        println!("-- evacuated + grey region --");
        self.dump_objects(heap.to_space_begin(), heap.next());

        if self.config.incremental {
            println!("-- free region reserved for this cycle's allocations --");
            self.dump_objects(heap.limit(), heap.to_space_end());
        }

        println!("-- roots ({}) --", self.roots.len());
        for (i, slot) in self.roots.iter().enumerate() {
            // SAFETY: a root slot is only ever popped by the mutator that
            // pushed it, so any slot still in the list points at live
            // mutator storage.
            let value = unsafe { **slot };
            print!("  [{}] slot={:p} value={:p}", i, slot, value);
            if self.heap.is_gc_managed(value) {
                print!(" -> ");
                self.dump_one_object(value);
            } else {
                println!();
            }
        }
    }

    fn dump_one_object(&self, obj: *mut u8) {
        let tag = self.heap.tag_of(obj);
        let field_count = self.heap.field_count_of(obj);
        print!("{} ({} field(s)):", tag.name(), field_count);
        for i in 0..field_count {
            print!(" {:p}", self.heap.field(obj, i));
        }
        println!();
    }

    fn dump_objects(&self, begin: *mut u8, end: *mut u8) {
        let limit = self.config.stats_objects_to_dump;
        let mut count = 0usize;
        self.heap.for_each_object_in(begin, end, |obj| {
            if count < limit {
                print!("  [{:p}] ", obj);
                self.dump_one_object(obj);
            }
            count += 1;
        });
        if count > limit {
            println!("  ... {} more object(s) elided", count - limit);
        }
    }

    pub fn print_stats(&self) {
        println!("{}", self.stats);
    }
}
