//! Functions, closures, upvalues, natives and bound methods.

use super::heap::Heap;
use crate::error::RuntimeError;
use crate::object::{
    Blob, FunctionKind, NativeFn, Obj, ObjBoundMethod, ObjClosure, ObjFunction, ObjNative, ObjRef,
    ObjType, ObjUpvalue, UpvalueState, Value,
};

impl Heap {
    // -----------------------------------------------------------------------
    // Function
    // -----------------------------------------------------------------------

    /// An empty code unit owned by `module`.
    pub fn new_function(&mut self, module: ObjRef, kind: FunctionKind) -> Result<ObjRef, RuntimeError> {
        self.as_module(module)?;
        self.allocate(Obj::Function(ObjFunction::new(module, kind)))
    }

    pub fn set_function_name(&mut self, function: ObjRef, name: &str) -> Result<(), RuntimeError> {
        let name = self.new_string(name)?;
        self.as_function_mut(function)?.name = Some(name);
        Ok(())
    }

    /// Declare how the function is called and how many upvalues its
    /// closures capture.
    pub fn set_function_signature(
        &mut self,
        function: ObjRef,
        arity: usize,
        is_variadic: bool,
        upvalue_count: usize,
    ) -> Result<(), RuntimeError> {
        let f = self.as_function_mut(function)?;
        f.arity = arity;
        f.is_variadic = is_variadic;
        f.upvalue_count = upvalue_count;
        Ok(())
    }

    /// Append one instruction byte and the source line it came from.
    pub fn function_write(&mut self, function: ObjRef, byte: u8, line: u32) -> Result<(), RuntimeError> {
        self.as_function(function)?;
        self.grow_checked(
            function,
            |obj| {
                let blob = blob_of(obj)?;
                blob.code.try_reserve(1)?;
                blob.lines.try_reserve(1)?;
                Ok(())
            },
            |obj| {
                if let Ok(blob) = blob_of(obj) {
                    blob.code.shrink_to_fit();
                    blob.lines.shrink_to_fit();
                }
            },
        )?;
        let blob = &mut self.as_function_mut(function)?.blob;
        blob.code.push(byte);
        blob.lines.push(line);
        Ok(())
    }

    /// Add a constant to the pool and return its index.
    pub fn function_add_constant(&mut self, function: ObjRef, value: Value) -> Result<usize, RuntimeError> {
        self.as_function(function)?;
        let mut scope = self.protect(value);
        scope.grow_checked(
            function,
            |obj| Ok(blob_of(obj)?.constants.try_reserve(1)?),
            |obj| {
                if let Ok(blob) = blob_of(obj) {
                    blob.constants.shrink_to_fit();
                }
            },
        )?;
        let constants = &mut scope.as_function_mut(function)?.blob.constants;
        constants.push(value);
        Ok(constants.len() - 1)
    }

    // -----------------------------------------------------------------------
    // Closure and upvalue
    // -----------------------------------------------------------------------

    /// A closure over `function` with one empty slot per declared upvalue.
    pub fn new_closure(&mut self, function: ObjRef) -> Result<ObjRef, RuntimeError> {
        let count = self.as_function(function)?.upvalue_count;
        let mut upvalues = Vec::new();
        upvalues.try_reserve_exact(count)?;
        upvalues.resize(count, None);
        self.allocate(Obj::Closure(ObjClosure { function, upvalues }))
    }

    pub fn closure_set_upvalue(
        &mut self,
        closure: ObjRef,
        index: usize,
        upvalue: ObjRef,
    ) -> Result<(), RuntimeError> {
        self.as_upvalue(upvalue)?;
        let slots = &mut self.as_closure_mut(closure)?.upvalues;
        let length = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or_else(|| RuntimeError::index_out_of_bounds(index as i64, length))?;
        *slot = Some(upvalue);
        Ok(())
    }

    /// An open upvalue naming stack slot `slot`.
    pub fn new_upvalue(&mut self, slot: usize) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::Upvalue(ObjUpvalue {
            state: UpvalueState::Open(slot),
        }))
    }

    /// Read through an upvalue; open ones read the live stack slot.
    pub fn upvalue_get(&self, upvalue: ObjRef, stack: &[Value]) -> Result<Value, RuntimeError> {
        match self.as_upvalue(upvalue)?.state {
            UpvalueState::Open(slot) => stack
                .get(slot)
                .copied()
                .ok_or_else(|| RuntimeError::index_out_of_bounds(slot as i64, stack.len())),
            UpvalueState::Closed(value) => Ok(value),
        }
    }

    pub fn upvalue_set(
        &mut self,
        upvalue: ObjRef,
        stack: &mut [Value],
        value: Value,
    ) -> Result<(), RuntimeError> {
        let cell = self.as_upvalue_mut(upvalue)?;
        let state = cell.state;
        match state {
            UpvalueState::Open(slot) => {
                let length = stack.len();
                let target = stack
                    .get_mut(slot)
                    .ok_or_else(|| RuntimeError::index_out_of_bounds(slot as i64, length))?;
                *target = value;
            }
            UpvalueState::Closed(_) => cell.state = UpvalueState::Closed(value),
        }
        Ok(())
    }

    /// Snapshot the stack slot into the upvalue. Closing twice is a no-op.
    pub fn close_upvalue(&mut self, upvalue: ObjRef, stack: &[Value]) -> Result<(), RuntimeError> {
        let value = self.upvalue_get(upvalue, stack)?;
        let cell = self.as_upvalue_mut(upvalue)?;
        if cell.is_open() {
            cell.state = UpvalueState::Closed(value);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Native and bound method
    // -----------------------------------------------------------------------

    pub fn new_native(&mut self, function: NativeFn, name: &str) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::Native(ObjNative {
            name: name.to_string(),
            function,
            kind: FunctionKind::Function,
        }))
    }

    /// Pair `receiver` with a closure or native method.
    pub fn new_bound_method(&mut self, receiver: Value, method: ObjRef) -> Result<ObjRef, RuntimeError> {
        match self.obj_type(method)? {
            ObjType::Closure | ObjType::Native => {}
            other => return Err(RuntimeError::expected("closure", other.name())),
        }
        self.allocate(Obj::BoundMethod(ObjBoundMethod { receiver, method }))
    }

    /// Function name for display, `None` for the top-level script.
    pub fn callable_name(&self, callable: ObjRef) -> Result<Option<String>, RuntimeError> {
        let function = match self.get(callable)? {
            Obj::Function(_) => callable,
            Obj::Closure(closure) => closure.function,
            Obj::BoundMethod(bound) => return self.callable_name(bound.method),
            Obj::Native(native) => return Ok(Some(native.name.clone())),
            other => return Err(RuntimeError::expected("function", other.obj_type().name())),
        };
        let function = self.as_function(function)?;
        match function.name {
            Some(name) => Ok(Some(self.as_string(name)?.as_str().into_owned())),
            None => Ok(None),
        }
    }
}

fn blob_of(obj: &mut Obj) -> Result<&mut Blob, RuntimeError> {
    match obj {
        Obj::Function(function) => Ok(&mut function.blob),
        other => Err(RuntimeError::expected("function", other.obj_type().name())),
    }
}
