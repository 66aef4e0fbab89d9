//! C-callable entry points for an external interpreter linking against this
//! collector, matching the operation set the original runtime exposed as
//! `gc_alloc`/`gc_push_root`/`gc_pop_root`/`gc_read_barrier`/
//! `gc_write_barrier`/`print_gc_state`/`print_gc_alloc_stats`.
//!
//! Every entry point takes the global collector's lock. The collector's
//! contract is explicitly non-reentrant -- no entry point may call back into
//! the collector while already inside one -- so a reentrant call here is a
//! caller bug, not a recoverable condition; [`REENTRANT`] turns it into a
//! loud abort instead of a silent deadlock or corrupted cursor state.
//!
//! Every entry point also runs its body behind `catch_unwind`: a panic
//! (a corrupt tag byte, a poisoned lock) must never unwind across an
//! `extern "C"` boundary, so it is converted into the same abort a fatal
//! collector error would produce.

use crate::collector::global;
use crate::tag::Tag;
use atomic::{Atomic, Ordering};
use std::panic::{self, AssertUnwindSafe};

static REENTRANT: Atomic<bool> = Atomic::new(false);

struct ReentrancyGuard;

impl ReentrancyGuard {
    fn enter() -> ReentrancyGuard {
        if REENTRANT.swap(true, Ordering::SeqCst) {
            eprintln!("fatal: reentrant call into bakergc from within a collector operation");
            std::process::abort();
        }
        ReentrancyGuard
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        REENTRANT.store(false, Ordering::SeqCst);
    }
}

/// Runs `body` behind the reentrancy guard and `catch_unwind`, aborting
/// instead of unwinding into the caller's (non-Rust) frames on panic.
fn guarded<R>(body: impl FnOnce() -> R) -> R {
    let _guard = ReentrancyGuard::enter();
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(_) => {
            eprintln!("fatal: panic inside bakergc FFI boundary");
            std::process::abort();
        }
    }
}

/// Allocates a cell tagged `tag` with `field_count` fields, triggering a
/// collection first if necessary. Fields are left uninitialized; the caller
/// must fill them in before the next allocation or safepoint, since an
/// uninitialized field could be read as a bogus pointer by a later scan.
#[no_mangle]
pub unsafe extern "C" fn bakergc_alloc(tag: u8, field_count: usize) -> *mut u8 {
    guarded(|| global().lock().alloc(Tag::from_u8(tag), field_count))
}

#[no_mangle]
pub unsafe extern "C" fn bakergc_push_root(slot: *mut *mut u8) {
    guarded(|| global().lock().push_root(slot))
}

#[no_mangle]
pub unsafe extern "C" fn bakergc_pop_root(slot: *mut *mut u8) {
    guarded(|| global().lock().pop_root(slot))
}

#[no_mangle]
pub unsafe extern "C" fn bakergc_read_barrier(obj: *mut u8, field_index: usize) {
    guarded(|| global().lock().read_barrier(obj, field_index))
}

#[no_mangle]
pub unsafe extern "C" fn bakergc_write_barrier(
    obj: *mut u8,
    field_index: usize,
    contents: *mut u8,
) {
    guarded(|| global().lock().write_barrier(obj, field_index, contents))
}

#[no_mangle]
pub unsafe extern "C" fn bakergc_is_managed(p: *const u8) -> bool {
    guarded(|| global().lock().is_gc_managed(p))
}

#[no_mangle]
pub unsafe extern "C" fn bakergc_print_state() {
    guarded(|| global().lock().print_state())
}

#[no_mangle]
pub unsafe extern "C" fn bakergc_print_stats() {
    guarded(|| global().lock().print_stats())
}
