//! An incremental, Baker-style copying collector for small functional-language
//! runtimes.
//!
//! The heap is split into two half-spaces. All mutation happens in
//! "to-space"; a collection cycle flips the spaces and incrementally
//! evacuates everything still reachable from the roots out of what is now
//! "from-space", a bit of work at a time, paid for by each allocation rather
//! than all at once. See [`collector::Collector`] for the entry points a
//! mutator actually calls.

pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod fatal;
pub mod ffi;
pub mod header;
pub mod heap;
pub mod linked_list;
pub mod roots;
pub mod stats;
pub mod tag;

pub use collector::{global, Collector};
pub use config::HeapConfig;
pub use tag::Tag;
