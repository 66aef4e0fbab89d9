use bakergc::{Collector, HeapConfig, Tag};

/// Builds a small linked list of `Succ` cells terminated by `Zero`, rooted at
/// the head, and runs it through a few collection cycles to demonstrate that
/// the live chain survives while everything else is reclaimed.
fn main() {
    let mut gc = Collector::new(HeapConfig::new(4096));

    let mut head: *mut u8 = gc.alloc(Tag::Zero, 0);
    gc.push_root(&mut head as *mut *mut u8);

    for _ in 0..8 {
        head = gc.alloc_object(Tag::Succ, &[head]);
    }

    // plenty of unreachable garbage, to be reclaimed on the next cycle
    for _ in 0..64 {
        let throwaway = gc.alloc_object(Tag::Succ, &[head]);
        let _ = throwaway;
    }

    gc.collect_cycle();
    gc.print_state();
    gc.print_stats();

    gc.pop_root(&mut head as *mut *mut u8);
}
