//! The runtime heap: object registry, interning, typed constructors and the
//! mark-and-sweep collector.
//!
//! One [`Heap`] is one isolated runtime instance. Constructors for each
//! object family live in their own file; all of them allocate through
//! `Heap::allocate`, and none of them ever triggers a collection. The VM
//! checks [`Heap::should_collect`] and calls [`Heap::collect`] with its roots.

pub mod collector;
pub mod config;
#[allow(clippy::module_inception)]
pub mod heap;
pub mod heap_callables;
pub mod heap_classes;
pub mod heap_containers;
pub mod heap_modules;
pub mod heap_strings;
pub mod roots;

pub use collector::{CollectionSummary, GcPhase, GcStats, RootSource, Tracer};
pub use config::HeapConfig;
pub use heap::{Heap, Objects};
pub use roots::RootScope;
