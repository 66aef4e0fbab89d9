//! Tunables for a [`crate::collector::Collector`] instance.
//!
//! The original runtime fixes these at compile time via preprocessor
//! constants (`MAX_ALLOC_SIZE`, `GC_STATS_OBJECTS_TO_DUMP`, the
//! `GC_NO_INCREMENT` switch, the `STELLA_GC_DEBUG` env toggle). Carrying
//! them as a constructible struct keeps the same defaults but lets tests
//! exercise both the incremental and stop-the-world allocator paths, and
//! tiny heaps, without recompiling.

use std::env;

/// Half-space size used when the C original was built as `gc.c` shipped it.
pub const DEFAULT_HALF_SPACE_SIZE: usize = 4096;

/// `GC_STATS_OBJECTS_TO_DUMP`: how many objects `print_state` dumps per region.
pub const DEFAULT_STATS_OBJECTS_TO_DUMP: usize = 16;

/// Environment variable toggling verbose collector logging, in the spirit of
/// `STELLA_GC_DEBUG`.
pub const DEBUG_ENV_VAR: &str = "BAKERGC_DEBUG";

#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Size in bytes of a single half-space. The heap reserves two of these.
    pub half_space_size: usize,
    /// When true (the default), allocation pays for collection work
    /// incrementally (`advance_scan` budgeted by bytes allocated) instead of
    /// doing a stop-the-world trace on exhaustion. Corresponds to the
    /// original's `#ifndef GC_NO_INCREMENT` branch; `false` reproduces
    /// `GC_NO_INCREMENT` builds.
    pub incremental: bool,
    /// Number of objects `print_state` dumps per heap region before eliding
    /// the rest.
    pub stats_objects_to_dump: usize,
    /// Verbose diagnostic logging on allocation/collection/barrier events.
    pub debug: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            half_space_size: DEFAULT_HALF_SPACE_SIZE,
            incremental: true,
            stats_objects_to_dump: DEFAULT_STATS_OBJECTS_TO_DUMP,
            debug: env::var_os(DEBUG_ENV_VAR).is_some(),
        }
    }
}

impl HeapConfig {
    pub fn new(half_space_size: usize) -> Self {
        Self {
            half_space_size,
            ..Default::default()
        }
    }

    pub fn non_incremental(mut self) -> Self {
        self.incremental = false;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
