//! Callable objects and the closure capture model.

use std::fmt;

use super::value::Value;
use super::ObjRef;
use crate::error::RuntimeError;
use crate::heap::Heap;

/// What kind of code unit a function was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionKind {
    #[default]
    Function,
    Method,
    Initializer,
    Private,
    Static,
    Script,
}

/// Compiled code owned by a function: raw instruction bytes, the source line
/// of each byte, and the constant pool. The bytes are opaque to this crate;
/// constants are traced by the collector.
#[derive(Debug, Default)]
pub struct Blob {
    pub code: Vec<u8>,
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Blob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub(crate) fn byte_size(&self) -> usize {
        self.code.capacity()
            + self.lines.capacity() * std::mem::size_of::<u32>()
            + self.constants.capacity() * std::mem::size_of::<Value>()
    }
}

#[derive(Debug)]
pub struct ObjFunction {
    pub arity: usize,
    pub is_variadic: bool,
    pub upvalue_count: usize,
    /// Interned name; `None` for the top-level script.
    pub name: Option<ObjRef>,
    pub kind: FunctionKind,
    pub module: ObjRef,
    pub blob: Blob,
}

impl ObjFunction {
    pub(crate) fn new(module: ObjRef, kind: FunctionKind) -> Self {
        Self {
            arity: 0,
            is_variadic: false,
            upvalue_count: 0,
            name: None,
            kind,
            module,
            blob: Blob::new(),
        }
    }
}

/// A function plus the upvalue cells it captured, one slot per free
/// variable. Slots start empty; the VM fills them while binding the closure.
#[derive(Debug)]
pub struct ObjClosure {
    pub function: ObjRef,
    pub(crate) upvalues: Vec<Option<ObjRef>>,
}

impl ObjClosure {
    pub fn upvalues(&self) -> &[Option<ObjRef>] {
        &self.upvalues
    }

    pub fn upvalue(&self, index: usize) -> Result<Option<ObjRef>, RuntimeError> {
        self.upvalues
            .get(index)
            .copied()
            .ok_or_else(|| RuntimeError::index_out_of_bounds(index as i64, self.upvalues.len()))
    }
}

/// While the variable is still on the stack the upvalue is open and names
/// the stack slot. Once the enclosing scope ends it is closed and owns the
/// last value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpvalueState {
    Open(usize),
    Closed(Value),
}

#[derive(Debug)]
pub struct ObjUpvalue {
    pub(crate) state: UpvalueState,
}

impl ObjUpvalue {
    pub fn state(&self) -> UpvalueState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, UpvalueState::Open(_))
    }

    /// The captured stack slot while open.
    pub fn slot(&self) -> Option<usize> {
        match self.state {
            UpvalueState::Open(slot) => Some(slot),
            UpvalueState::Closed(_) => None,
        }
    }
}

/// Host function signature. Natives receive the heap so they can build
/// return values through the public constructors.
pub type NativeFn = fn(&mut Heap, &[Value]) -> Result<Value, RuntimeError>;

#[derive(Clone)]
pub struct ObjNative {
    pub name: String,
    pub function: NativeFn,
    pub kind: FunctionKind,
}

impl fmt::Debug for ObjNative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjNative({})", self.name)
    }
}

/// A receiver paired with the closure it was looked up on.
#[derive(Debug, Clone, Copy)]
pub struct ObjBoundMethod {
    pub receiver: Value,
    pub method: ObjRef,
}
