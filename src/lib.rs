//! Blade core: the value model and memory manager of the Blade runtime.
//!
//! Every runtime value is a [`Value`]. Heap entities (strings, containers,
//! callables, classes, modules, files) live in a [`Heap`], which owns them
//! through a registry and reclaims them with a mark-and-sweep collector.
//!
//! # Collection
//!
//! Allocation never collects on its own. The embedding VM watches
//! [`Heap::should_collect`] and calls [`Heap::collect`] with a [`RootSource`]
//! describing its stack, globals and open upvalues. Values held only by
//! native code across an allocation are protected with [`Heap::protect`].
//!
//! ```
//! use blade_core::{Heap, Value};
//!
//! let mut heap = Heap::new();
//! let list = heap.new_list()?;
//! let name = heap.new_string("blade")?;
//! heap.list_append(list, Value::Object(name))?;
//!
//! heap.collect(&list);
//! assert_eq!(heap.value_to_string(Value::Object(list)), "[blade]");
//! # Ok::<(), blade_core::RuntimeError>(())
//! ```

#![allow(clippy::module_inception)]
#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]

pub mod error;
pub mod heap;
pub mod object;

pub use error::RuntimeError;
pub use heap::{CollectionSummary, GcStats, Heap, HeapConfig, RootScope, RootSource, Tracer};
pub use object::{Obj, ObjRef, ObjType, Value};
