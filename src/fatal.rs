//! Fatal error reporting.
//!
//! Every failure mode the collector can hit -- exhausting to-space, an
//! allocation request bigger than a half-space, a root stack that underflows
//! or is popped out of order -- is unrecoverable: the original runtime
//! prints a full diagnostic dump and calls `exit`, and there is no exception
//! surface to catch it on. We keep that shape: each function here prints,
//! then terminates the process.

use crate::collector::Collector;
use crate::roots::RootSlot;

pub fn out_of_memory(collector: &Collector) -> ! {
    collector.print_state();
    eprintln!("fatal: out of memory (to-space exhausted)");
    // SAFETY: exit is always safe to call.
    unsafe { libc::exit(libc::ENOMEM) }
}

pub fn oversized_allocation(collector: &Collector, requested: usize, max: usize) -> ! {
    collector.print_state();
    eprintln!(
        "fatal: requested allocation of {} bytes exceeds half-space size {}",
        requested, max
    );
    unsafe { libc::exit(libc::ENOMEM) }
}

pub fn previous_cycle_incomplete(collector: &Collector) -> ! {
    collector.print_state();
    eprintln!("fatal: collection requested before the previous cycle finished scanning");
    unsafe { libc::exit(libc::ENOMEM) }
}

pub fn root_stack_underflow() -> ! {
    eprintln!("fatal: pop_root called with no roots registered");
    std::process::exit(1)
}

pub fn root_stack_mismatch(expected: RootSlot, actual: RootSlot) -> ! {
    eprintln!(
        "fatal: pop_root({:p}) does not match top of root stack ({:p})",
        actual, expected
    );
    std::process::exit(1)
}
