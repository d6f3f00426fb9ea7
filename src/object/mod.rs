//! Heap object model.
//!
//! Every heap entity is one variant of [`Obj`]. The closed enum keeps the
//! collector's tracing, the size accounting and the representation layer
//! exhaustive: adding a variant fails to compile until each of them
//! handles it.

pub mod callable;
pub mod class;
pub mod container;
pub mod module;
pub mod repr;
pub mod string;
pub mod table;
pub mod value;

use std::fmt;
use std::mem::size_of;

pub use callable::{
    Blob, FunctionKind, NativeFn, ObjBoundMethod, ObjClosure, ObjFunction, ObjNative, ObjUpvalue,
    UpvalueState,
};
pub use class::{ObjClass, ObjInstance};
pub use container::{ObjBytes, ObjDict, ObjList, ObjRange, RangeIter};
pub use module::{ModuleHook, ObjFile, ObjModule, ObjSwitch};
pub use repr::Repr;
pub use string::{hash_bytes, ObjString};
pub use table::Table;
pub use value::{format_number, Value};

use crate::heap::Tracer;

/// Non-owning handle to a heap object.
///
/// The generation is bumped every time a registry slot is freed, so a handle
/// that outlived its object is detected instead of aliasing whatever reuses
/// the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjRef {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Object type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjType {
    String,
    List,
    Dict,
    Range,
    Bytes,
    Function,
    Closure,
    Upvalue,
    Native,
    BoundMethod,
    Class,
    Instance,
    Module,
    Switch,
    File,
}

impl ObjType {
    /// Name reported to programs. Instances report their class name instead,
    /// which needs the heap; see `Heap::type_name`.
    pub fn name(&self) -> &'static str {
        match self {
            ObjType::String => "string",
            ObjType::List => "list",
            ObjType::Dict => "dictionary",
            ObjType::Range => "range",
            ObjType::Bytes => "bytes",
            ObjType::Function | ObjType::Closure | ObjType::Native | ObjType::BoundMethod => {
                "function"
            }
            ObjType::Upvalue => "up value",
            ObjType::Class => "class",
            ObjType::Instance => "instance",
            ObjType::Module => "module",
            ObjType::Switch => "switch",
            ObjType::File => "file",
        }
    }
}

/// A heap object payload.
#[derive(Debug)]
pub enum Obj {
    String(ObjString),
    List(ObjList),
    Dict(ObjDict),
    Range(ObjRange),
    Bytes(ObjBytes),
    Function(ObjFunction),
    Closure(ObjClosure),
    Upvalue(ObjUpvalue),
    Native(ObjNative),
    BoundMethod(ObjBoundMethod),
    Class(ObjClass),
    Instance(ObjInstance),
    Module(ObjModule),
    Switch(ObjSwitch),
    File(ObjFile),
}

impl Obj {
    pub fn obj_type(&self) -> ObjType {
        match self {
            Obj::String(_) => ObjType::String,
            Obj::List(_) => ObjType::List,
            Obj::Dict(_) => ObjType::Dict,
            Obj::Range(_) => ObjType::Range,
            Obj::Bytes(_) => ObjType::Bytes,
            Obj::Function(_) => ObjType::Function,
            Obj::Closure(_) => ObjType::Closure,
            Obj::Upvalue(_) => ObjType::Upvalue,
            Obj::Native(_) => ObjType::Native,
            Obj::BoundMethod(_) => ObjType::BoundMethod,
            Obj::Class(_) => ObjType::Class,
            Obj::Instance(_) => ObjType::Instance,
            Obj::Module(_) => ObjType::Module,
            Obj::Switch(_) => ObjType::Switch,
            Obj::File(_) => ObjType::File,
        }
    }

    /// Push every object this one references onto the tracer's gray list.
    pub(crate) fn trace(&self, tracer: &mut Tracer) {
        match self {
            Obj::String(_) | Obj::Range(_) | Obj::Bytes(_) | Obj::Native(_) => {}
            Obj::List(list) => tracer.mark_values(&list.items),
            Obj::Dict(dict) => tracer.mark_table(&dict.items),
            Obj::Function(function) => {
                tracer.mark_optional(function.name);
                tracer.mark_object(function.module);
                tracer.mark_values(&function.blob.constants);
            }
            Obj::Closure(closure) => {
                tracer.mark_object(closure.function);
                for upvalue in closure.upvalues.iter().flatten() {
                    tracer.mark_object(*upvalue);
                }
            }
            Obj::Upvalue(upvalue) => {
                if let UpvalueState::Closed(value) = upvalue.state {
                    tracer.mark_value(value);
                }
            }
            Obj::BoundMethod(bound) => {
                tracer.mark_value(bound.receiver);
                tracer.mark_object(bound.method);
            }
            Obj::Class(class) => {
                tracer.mark_object(class.name);
                tracer.mark_table(&class.properties);
                tracer.mark_table(&class.static_properties);
                tracer.mark_table(&class.methods);
                tracer.mark_optional(class.initializer);
                tracer.mark_optional(class.superclass);
            }
            Obj::Instance(instance) => {
                tracer.mark_object(instance.class);
                tracer.mark_table(&instance.properties);
            }
            Obj::Module(module) => tracer.mark_table(&module.values),
            Obj::Switch(switch) => tracer.mark_table(&switch.table),
            Obj::File(file) => {
                tracer.mark_object(file.path);
                tracer.mark_object(file.mode);
            }
        }
    }

    /// Bytes charged to the live-byte account for this object.
    pub(crate) fn heap_size(&self) -> usize {
        let table = |t: &Table| t.capacity() * (2 * size_of::<Value>());
        size_of::<Obj>()
            + match self {
                Obj::String(s) => s.len(),
                Obj::List(list) => list.items.capacity() * size_of::<Value>(),
                Obj::Dict(dict) => table(&dict.items),
                Obj::Range(_) | Obj::Native(_) | Obj::BoundMethod(_) | Obj::Upvalue(_) => 0,
                Obj::Bytes(bytes) => bytes.bytes.capacity(),
                Obj::Function(function) => function.blob.byte_size(),
                Obj::Closure(closure) => closure.upvalues.capacity() * size_of::<Option<ObjRef>>(),
                Obj::Class(class) => {
                    table(&class.properties) + table(&class.static_properties) + table(&class.methods)
                }
                Obj::Instance(instance) => table(&instance.properties),
                Obj::Module(module) => table(&module.values) + module.name.len() + module.file.len(),
                Obj::Switch(switch) => table(&switch.table),
                Obj::File(_) => size_of::<std::fs::File>(),
            }
    }
}
