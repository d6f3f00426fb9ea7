//! Mark-and-sweep collection over the object registry.
//!
//! # Cycle
//!
//! - **Marking**: roots supplied by the VM, plus every value held by scoped
//!   rooting, are pushed onto a gray list. Each gray object whose mark does
//!   not yet match the current mark sense is marked and its references are
//!   pushed in turn. Objects already matching the sense are skipped, which is
//!   what terminates cycles.
//!
//! - **Sweeping**: the intern table drops strings that were not marked, then
//!   the registry list is walked once and every object whose mark does not
//!   match the sense is unlinked and released.
//!
//! - The mark sense is flipped instead of resetting every survivor's bit:
//!   after the flip all survivors read as unmarked for the next cycle.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::heap::Heap;
use crate::object::{ObjRef, Table, Value};

/// Collector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcPhase {
    #[default]
    Idle,
    Marking,
    Sweeping,
}

/// Cumulative collector statistics.
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    pub collections: u64,
    pub objects_allocated: u64,
    pub objects_freed: u64,
    pub bytes_freed: u64,
    pub peak_bytes: usize,
}

/// Outcome of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSummary {
    pub objects_freed: usize,
    pub bytes_freed: usize,
    pub live_objects: usize,
    pub live_bytes: usize,
}

/// Gray list built up during marking.
#[derive(Debug, Default)]
pub struct Tracer {
    gray: VecDeque<ObjRef>,
}

impl Tracer {
    pub fn mark_object(&mut self, r: ObjRef) {
        self.gray.push_back(r);
    }

    pub fn mark_optional(&mut self, r: Option<ObjRef>) {
        if let Some(r) = r {
            self.mark_object(r);
        }
    }

    pub fn mark_value(&mut self, value: Value) {
        if let Value::Object(r) = value {
            self.mark_object(r);
        }
    }

    pub fn mark_values(&mut self, values: &[Value]) {
        for value in values {
            self.mark_value(*value);
        }
    }

    /// Keys and values both.
    pub fn mark_table(&mut self, table: &Table) {
        for (key, value) in table.iter() {
            self.mark_value(key);
            self.mark_value(value);
        }
    }

    fn pop(&mut self) -> Option<ObjRef> {
        self.gray.pop_front()
    }
}

/// Something the VM hands to [`Heap::collect`] as part of the root set:
/// the operand stack, globals, open upvalues, frames.
pub trait RootSource {
    fn trace_roots(&self, tracer: &mut Tracer);
}

impl RootSource for () {
    fn trace_roots(&self, _tracer: &mut Tracer) {}
}

impl RootSource for Value {
    fn trace_roots(&self, tracer: &mut Tracer) {
        tracer.mark_value(*self);
    }
}

impl RootSource for ObjRef {
    fn trace_roots(&self, tracer: &mut Tracer) {
        tracer.mark_object(*self);
    }
}

impl RootSource for [Value] {
    fn trace_roots(&self, tracer: &mut Tracer) {
        tracer.mark_values(self);
    }
}

impl RootSource for [ObjRef] {
    fn trace_roots(&self, tracer: &mut Tracer) {
        for r in self {
            tracer.mark_object(*r);
        }
    }
}

impl<T: RootSource> RootSource for Vec<T> {
    fn trace_roots(&self, tracer: &mut Tracer) {
        for item in self {
            item.trace_roots(tracer);
        }
    }
}

impl<T: RootSource> RootSource for Option<T> {
    fn trace_roots(&self, tracer: &mut Tracer) {
        if let Some(item) = self {
            item.trace_roots(tracer);
        }
    }
}

impl RootSource for Table {
    fn trace_roots(&self, tracer: &mut Tracer) {
        tracer.mark_table(self);
    }
}

impl<T: RootSource + ?Sized> RootSource for &T {
    fn trace_roots(&self, tracer: &mut Tracer) {
        (**self).trace_roots(tracer);
    }
}

impl<A: RootSource, B: RootSource> RootSource for (A, B) {
    fn trace_roots(&self, tracer: &mut Tracer) {
        self.0.trace_roots(tracer);
        self.1.trace_roots(tracer);
    }
}

impl<A: RootSource, B: RootSource, C: RootSource> RootSource for (A, B, C) {
    fn trace_roots(&self, tracer: &mut Tracer) {
        self.0.trace_roots(tracer);
        self.1.trace_roots(tracer);
        self.2.trace_roots(tracer);
    }
}

impl Heap {
    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    /// Run a full collection with `roots` plus the protected values as the
    /// root set. Never fails; an incomplete root set only frees too much.
    pub fn collect<R: RootSource + ?Sized>(&mut self, roots: &R) -> CollectionSummary {
        let before_bytes = self.bytes_allocated;
        let before_objects = self.live_objects;
        debug!(
            collection = self.stats.collections + 1,
            live_bytes = before_bytes,
            live_objects = before_objects,
            "gc begin"
        );

        self.phase = GcPhase::Marking;
        let mut tracer = Tracer::default();
        roots.trace_roots(&mut tracer);
        tracer.mark_values(&self.protected);
        self.trace_references(&mut tracer);

        self.phase = GcPhase::Sweeping;
        self.remove_white_strings();
        let (objects_freed, bytes_freed) = self.sweep();

        self.mark_sense = !self.mark_sense;
        self.next_gc = self
            .bytes_allocated
            .saturating_mul(self.config.growth_factor)
            .max(self.config.initial_gc_threshold);
        self.phase = GcPhase::Idle;

        self.stats.collections += 1;
        self.stats.objects_freed += objects_freed as u64;
        self.stats.bytes_freed += bytes_freed as u64;

        debug!(
            collected = bytes_freed,
            objects_freed,
            live_bytes = self.bytes_allocated,
            next_gc = self.next_gc,
            "gc end"
        );

        CollectionSummary {
            objects_freed,
            bytes_freed,
            live_objects: self.live_objects,
            live_bytes: self.bytes_allocated,
        }
    }

    /// Collect only when live bytes crossed the threshold.
    pub fn maybe_collect<R: RootSource + ?Sized>(&mut self, roots: &R) -> Option<CollectionSummary> {
        if self.should_collect() {
            Some(self.collect(roots))
        } else {
            None
        }
    }

    fn trace_references(&mut self, tracer: &mut Tracer) {
        let sense = self.mark_sense;
        while let Some(r) = tracer.pop() {
            let Ok(entry) = self.entry_mut(r) else {
                // stale handle in a root or a field; nothing to keep alive
                continue;
            };
            if entry.header.mark == sense {
                continue;
            }
            entry.header.mark = sense;
            entry.obj.trace(tracer);
        }
    }

    fn remove_white_strings(&mut self) {
        let sense = self.mark_sense;
        let slots = &self.slots;
        self.strings.retain(|r| {
            slots
                .get(r.index as usize)
                .filter(|slot| slot.generation == r.generation)
                .and_then(|slot| slot.entry.as_ref())
                .map(|entry| entry.header.mark == sense)
                .unwrap_or(false)
        });
    }

    fn sweep(&mut self) -> (usize, usize) {
        let sense = self.mark_sense;
        let mut previous: Option<ObjRef> = None;
        let mut current = self.head;
        let mut freed = 0;
        let mut bytes = 0;

        while let Some(r) = current {
            let Ok(entry) = self.entry(r) else {
                break;
            };
            let next = entry.header.next;
            if entry.header.mark == sense {
                previous = Some(r);
            } else {
                match previous {
                    Some(p) => {
                        if let Ok(prev) = self.entry_mut(p) {
                            prev.header.next = next;
                        }
                    }
                    None => self.head = next,
                }
                bytes += self.release(r);
                freed += 1;
            }
            current = next;
        }

        (freed, bytes)
    }

    /// Drop an object's storage and recycle its slot under a new generation.
    fn release(&mut self, r: ObjRef) -> usize {
        let slot = &mut self.slots[r.index as usize];
        let Some(entry) = slot.entry.take() else {
            return 0;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(r.index);
        self.live_objects -= 1;
        let size = entry.header.size;
        self.bytes_allocated = self.bytes_allocated.saturating_sub(size);
        trace!(object = %r, kind = ?entry.obj.obj_type(), size, "free");
        size
    }
}
