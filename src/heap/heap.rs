//! The runtime context: object registry, live-byte accounting and typed
//! access to heap objects.
//!
//! Objects live in a slot arena. Each live slot carries a header with the
//! mark bit and the intrusive `next` link of the registry list, which runs
//! from the most recently allocated object to the oldest. The registry owns
//! every object; handles held anywhere else are non-owning.

use tracing::{error, trace};

use super::collector::{GcPhase, GcStats};
use super::config::HeapConfig;
use super::heap_strings::InternTable;
use crate::error::RuntimeError;
use crate::object::{
    Obj, ObjBoundMethod, ObjBytes, ObjClass, ObjClosure, ObjDict, ObjFile, ObjFunction,
    ObjInstance, ObjList, ObjModule, ObjNative, ObjRange, ObjRef, ObjString, ObjSwitch, ObjType,
    ObjUpvalue, Table, Value,
};

/// Per-object bookkeeping kept beside the payload.
#[derive(Debug)]
pub(crate) struct Header {
    pub(crate) mark: bool,
    pub(crate) next: Option<ObjRef>,
    /// Bytes currently charged for this object.
    pub(crate) size: usize,
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) header: Header,
    pub(crate) obj: Obj,
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) entry: Option<Entry>,
}

/// Owns every heap object of one runtime instance together with the intern
/// table and the collector state. Separate heaps share nothing.
pub struct Heap {
    pub(crate) slots: Vec<Slot>,
    pub(crate) free: Vec<u32>,
    /// Head of the registry list.
    pub(crate) head: Option<ObjRef>,
    pub(crate) strings: InternTable,
    /// Values protected from collection by scoped rooting.
    pub(crate) protected: Vec<Value>,
    /// Mark polarity of the current cycle; flipped after every collection.
    pub(crate) mark_sense: bool,
    pub(crate) phase: GcPhase,
    pub(crate) bytes_allocated: usize,
    pub(crate) next_gc: usize,
    pub(crate) live_objects: usize,
    pub(crate) config: HeapConfig,
    pub(crate) stats: GcStats,
}

/// A table-valued field of some object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableField {
    DictItems,
    InstanceProperties,
    ClassMethods,
    ClassProperties,
    ClassStatics,
    ModuleValues,
    SwitchCases,
}

impl TableField {
    fn owner(self) -> &'static str {
        match self {
            TableField::DictItems => "dictionary",
            TableField::InstanceProperties => "instance",
            TableField::ClassMethods | TableField::ClassProperties | TableField::ClassStatics => "class",
            TableField::ModuleValues => "module",
            TableField::SwitchCases => "switch",
        }
    }

    fn select(self, obj: &mut Obj) -> Result<&mut Table, RuntimeError> {
        match (self, obj) {
            (TableField::DictItems, Obj::Dict(dict)) => Ok(&mut dict.items),
            (TableField::InstanceProperties, Obj::Instance(instance)) => Ok(&mut instance.properties),
            (TableField::ClassMethods, Obj::Class(class)) => Ok(&mut class.methods),
            (TableField::ClassProperties, Obj::Class(class)) => Ok(&mut class.properties),
            (TableField::ClassStatics, Obj::Class(class)) => Ok(&mut class.static_properties),
            (TableField::ModuleValues, Obj::Module(module)) => Ok(&mut module.values),
            (TableField::SwitchCases, Obj::Switch(switch)) => Ok(&mut switch.table),
            (field, other) => Err(RuntimeError::expected(field.owner(), other.obj_type().name())),
        }
    }
}

macro_rules! typed_accessors {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty), $name:literal;)*) => {
        $(
            pub fn $get(&self, r: ObjRef) -> Result<&$ty, RuntimeError> {
                match self.get(r)? {
                    Obj::$variant(o) => Ok(o),
                    other => Err(RuntimeError::expected($name, other.obj_type().name())),
                }
            }

            #[allow(dead_code)]
            pub(crate) fn $get_mut(&mut self, r: ObjRef) -> Result<&mut $ty, RuntimeError> {
                match self.get_mut(r)? {
                    Obj::$variant(o) => Ok(o),
                    other => Err(RuntimeError::expected($name, other.obj_type().name())),
                }
            }
        )*
    };
}

impl Heap {
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    pub fn with_config(config: HeapConfig) -> Self {
        Self {
            slots: Vec::with_capacity(config.initial_capacity),
            free: Vec::new(),
            head: None,
            strings: InternTable::default(),
            protected: Vec::new(),
            mark_sense: true,
            phase: GcPhase::Idle,
            bytes_allocated: 0,
            next_gc: config.initial_gc_threshold,
            live_objects: 0,
            config,
            stats: GcStats::default(),
        }
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Live bytes currently charged to the heap.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    /// Threshold at which the next collection is advised.
    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    /// Number of objects in the registry.
    pub fn object_count(&self) -> usize {
        self.live_objects
    }

    /// Number of interned strings.
    pub fn interned_count(&self) -> usize {
        self.strings.len()
    }

    /// Whether live bytes crossed the collection threshold. The VM decides
    /// whether to act on it.
    pub fn should_collect(&self) -> bool {
        self.bytes_allocated > self.next_gc
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    /// Byte-tracked reallocation: move the live-byte account from
    /// `old_size` to `new_size`, refusing growth past the configured cap.
    pub(crate) fn reallocate(&mut self, old_size: usize, new_size: usize) -> Result<(), RuntimeError> {
        if new_size > old_size {
            let grown = self.bytes_allocated + (new_size - old_size);
            if let Some(limit) = self.config.max_heap_bytes {
                if grown > limit {
                    error!(
                        requested = new_size - old_size,
                        allocated = self.bytes_allocated,
                        limit,
                        "heap limit exceeded"
                    );
                    return Err(RuntimeError::out_of_memory(
                        new_size - old_size,
                        self.bytes_allocated,
                        Some(limit),
                    ));
                }
            }
            self.bytes_allocated = grown;
            self.stats.peak_bytes = self.stats.peak_bytes.max(grown);
        } else {
            self.bytes_allocated = self.bytes_allocated.saturating_sub(old_size - new_size);
        }
        Ok(())
    }

    /// Register a new object at the head of the registry.
    ///
    /// The new object starts unmarked for the current cycle: it survives the
    /// next collection only if it is rooted or protected by then.
    pub(crate) fn allocate(&mut self, obj: Obj) -> Result<ObjRef, RuntimeError> {
        let size = obj.heap_size();
        self.reallocate(0, size)?;
        let kind = obj.obj_type();

        let header = Header {
            mark: !self.mark_sense,
            next: self.head,
            size,
        };
        let entry = Entry { header, obj };

        let r = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ObjRef::new(index, slot.generation)
            }
            None => {
                if let Err(e) = self.slots.try_reserve(1) {
                    self.bytes_allocated -= size;
                    return Err(e.into());
                }
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                ObjRef::new(index, 0)
            }
        };

        self.head = Some(r);
        self.live_objects += 1;
        self.stats.objects_allocated += 1;
        trace!(object = %r, ?kind, size, "allocate");
        Ok(r)
    }

    /// Charge `additional` bytes to an object ahead of growing it.
    pub(crate) fn charge(&mut self, r: ObjRef, additional: usize) -> Result<(), RuntimeError> {
        self.entry(r)?;
        self.reallocate(0, additional)?;
        if let Ok(entry) = self.entry_mut(r) {
            entry.header.size += additional;
        }
        Ok(())
    }

    /// Recompute the charge of an object after it was mutated in place.
    pub(crate) fn refresh_size(&mut self, r: ObjRef) -> Result<(), RuntimeError> {
        let entry = self.entry(r)?;
        let (old, new) = (entry.header.size, entry.obj.heap_size());
        if old == new {
            return Ok(());
        }
        self.reallocate(old, new)?;
        self.entry_mut(r)?.header.size = new;
        Ok(())
    }

    /// Re-account an object at its actual size, bypassing the limit.
    fn sync_size(&mut self, r: ObjRef) {
        let Ok(entry) = self.entry_mut(r) else {
            return;
        };
        let (old, new) = (entry.header.size, entry.obj.heap_size());
        entry.header.size = new;
        self.bytes_allocated = self.bytes_allocated.saturating_sub(old) + new;
    }

    /// Reserve storage in an object through `grow` and charge it. When the
    /// reservation or the charge is refused, `shrink` gives the spare
    /// capacity back and the object keeps its contents and its charge.
    pub(crate) fn grow_checked(
        &mut self,
        r: ObjRef,
        grow: impl FnOnce(&mut Obj) -> Result<(), RuntimeError>,
        shrink: impl FnOnce(&mut Obj),
    ) -> Result<(), RuntimeError> {
        let result = grow(self.get_mut(r)?).and_then(|()| self.refresh_size(r));
        if result.is_err() {
            if let Ok(obj) = self.get_mut(r) {
                shrink(obj);
            }
            self.sync_size(r);
        }
        result
    }

    /// Insert or overwrite in one table of an object. A new key is only
    /// inserted once its storage is charged. Returns whether the key was new.
    pub(crate) fn table_set(
        &mut self,
        r: ObjRef,
        field: TableField,
        key: Value,
        value: Value,
    ) -> Result<bool, RuntimeError> {
        let table = field.select(self.get_mut(r)?)?;
        if table.contains(key) {
            return Ok(table.set(key, value));
        }
        self.grow_checked(
            r,
            |obj| field.select(obj)?.try_reserve(1),
            |obj| {
                if let Ok(table) = field.select(obj) {
                    table.shrink_to_fit();
                }
            },
        )?;
        Ok(field.select(self.get_mut(r)?)?.set(key, value))
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub(crate) fn entry(&self, r: ObjRef) -> Result<&Entry, RuntimeError> {
        self.slots
            .get(r.index as usize)
            .filter(|slot| slot.generation == r.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or_else(|| RuntimeError::invalid_reference(r))
    }

    pub(crate) fn entry_mut(&mut self, r: ObjRef) -> Result<&mut Entry, RuntimeError> {
        self.slots
            .get_mut(r.index as usize)
            .filter(|slot| slot.generation == r.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or_else(|| RuntimeError::invalid_reference(r))
    }

    /// Whether `r` still names a live object.
    pub fn is_live(&self, r: ObjRef) -> bool {
        self.entry(r).is_ok()
    }

    pub fn get(&self, r: ObjRef) -> Result<&Obj, RuntimeError> {
        self.entry(r).map(|entry| &entry.obj)
    }

    pub(crate) fn get_mut(&mut self, r: ObjRef) -> Result<&mut Obj, RuntimeError> {
        self.entry_mut(r).map(|entry| &mut entry.obj)
    }

    pub fn obj_type(&self, r: ObjRef) -> Result<ObjType, RuntimeError> {
        self.get(r).map(Obj::obj_type)
    }

    /// Whether `value` is an object of kind `kind`.
    pub fn is_obj_type(&self, value: Value, kind: ObjType) -> bool {
        match value {
            Value::Object(r) => self.obj_type(r).map(|t| t == kind).unwrap_or(false),
            _ => false,
        }
    }

    typed_accessors! {
        as_string, as_string_mut => String(ObjString), "string";
        as_list, as_list_mut => List(ObjList), "list";
        as_dict, as_dict_mut => Dict(ObjDict), "dictionary";
        as_range, as_range_mut => Range(ObjRange), "range";
        as_bytes, as_bytes_mut => Bytes(ObjBytes), "bytes";
        as_function, as_function_mut => Function(ObjFunction), "function";
        as_closure, as_closure_mut => Closure(ObjClosure), "closure";
        as_upvalue, as_upvalue_mut => Upvalue(ObjUpvalue), "up value";
        as_native, as_native_mut => Native(ObjNative), "native function";
        as_bound_method, as_bound_method_mut => BoundMethod(ObjBoundMethod), "bound method";
        as_class, as_class_mut => Class(ObjClass), "class";
        as_instance, as_instance_mut => Instance(ObjInstance), "instance";
        as_module, as_module_mut => Module(ObjModule), "module";
        as_switch, as_switch_mut => Switch(ObjSwitch), "switch";
        as_file, as_file_mut => File(ObjFile), "file";
    }

    /// Object behind a value, or a type error naming what was expected.
    pub fn expect_object(&self, value: Value, expected: &str) -> Result<ObjRef, RuntimeError> {
        match value {
            Value::Object(r) => Ok(r),
            other => Err(RuntimeError::expected(expected, &self.type_name(other))),
        }
    }

    /// Type name as reported to programs; instances report their class name.
    pub fn type_name(&self, value: Value) -> String {
        match value {
            Value::Nil => "nil".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::Object(r) => match self.get(r) {
                Ok(Obj::Instance(instance)) => self
                    .as_class(instance.class)
                    .and_then(|class| self.as_string(class.name))
                    .map(|name| name.as_str().into_owned())
                    .unwrap_or_else(|_| ObjType::Instance.name().to_string()),
                Ok(obj) => obj.obj_type().name().to_string(),
                Err(_) => "invalid".to_string(),
            },
        }
    }

    /// Falsey values: nil, false, zero, and empty strings, lists,
    /// dictionaries and byte arrays.
    pub fn is_falsey(&self, value: Value) -> bool {
        match value {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n == 0.0,
            Value::Object(r) => match self.get(r) {
                Ok(Obj::String(s)) => s.is_empty(),
                Ok(Obj::List(list)) => list.is_empty(),
                Ok(Obj::Dict(dict)) => dict.is_empty(),
                Ok(Obj::Bytes(bytes)) => bytes.is_empty(),
                _ => false,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Registry walk
    // -----------------------------------------------------------------------

    /// Iterate the registry from the newest object to the oldest.
    pub fn objects(&self) -> Objects<'_> {
        Objects {
            heap: self,
            next: self.head,
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the registry list.
pub struct Objects<'h> {
    heap: &'h Heap,
    next: Option<ObjRef>,
}

impl Iterator for Objects<'_> {
    type Item = ObjRef;

    fn next(&mut self) -> Option<ObjRef> {
        let current = self.next?;
        self.next = self.heap.entry(current).ok().and_then(|e| e.header.next);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjRange;

    #[test]
    fn test_allocate_links_registry_head() {
        let mut heap = Heap::new();
        let a = heap.allocate(Obj::Range(ObjRange::new(0, 1))).unwrap();
        let b = heap.allocate(Obj::Range(ObjRange::new(1, 2))).unwrap();
        let order: Vec<ObjRef> = heap.objects().collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(heap.object_count(), 2);
    }

    #[test]
    fn test_new_object_is_unmarked() {
        let mut heap = Heap::new();
        let r = heap.allocate(Obj::Range(ObjRange::new(0, 1))).unwrap();
        assert_ne!(heap.entry(r).unwrap().header.mark, heap.mark_sense);
    }

    #[test]
    fn test_heap_limit_is_out_of_memory() {
        let mut heap = Heap::with_config(HeapConfig::new().with_max_heap_bytes(64));
        let result = heap.allocate(Obj::List(ObjList::default()));
        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(heap.object_count(), 0);
        assert_eq!(heap.bytes_allocated(), 0);
    }

    #[test]
    fn test_wrong_kind_is_type_error() {
        let mut heap = Heap::new();
        let r = heap.allocate(Obj::Range(ObjRange::new(0, 1))).unwrap();
        let err = heap.as_list(r).unwrap_err();
        assert_eq!(err.to_string(), "Type error: expected list, found range");
    }

    #[test]
    fn test_bytes_are_charged() {
        let mut heap = Heap::new();
        assert_eq!(heap.bytes_allocated(), 0);
        heap.allocate(Obj::Range(ObjRange::new(0, 1))).unwrap();
        assert!(heap.bytes_allocated() >= std::mem::size_of::<Obj>());
        assert!(!heap.should_collect());
    }
}
