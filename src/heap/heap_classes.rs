//! Classes, single inheritance and instances.
//!
//! Lookup order for a property on an instance is its own table, then the
//! method table of its class, then each superclass in turn.

use super::heap::{Heap, TableField};
use crate::error::RuntimeError;
use crate::object::{Obj, ObjClass, ObjInstance, ObjRef, ObjType, Table, Value};

impl Heap {
    pub fn new_class(&mut self, name: &str) -> Result<ObjRef, RuntimeError> {
        let name = self.new_string(name)?;
        let mut scope = self.protect(Value::Object(name));
        scope.allocate(Obj::Class(ObjClass::new(name)))
    }

    pub fn define_method(&mut self, class: ObjRef, name: &str, method: ObjRef) -> Result<(), RuntimeError> {
        match self.obj_type(method)? {
            ObjType::Closure | ObjType::Native => {}
            other => return Err(RuntimeError::expected("closure", other.name())),
        }
        self.define_member(class, TableField::ClassMethods, name, Value::Object(method))
    }

    /// Set an instance-property default.
    pub fn define_property(&mut self, class: ObjRef, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.define_member(class, TableField::ClassProperties, name, value)
    }

    pub fn define_static(&mut self, class: ObjRef, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.define_member(class, TableField::ClassStatics, name, value)
    }

    fn define_member(
        &mut self,
        class: ObjRef,
        field: TableField,
        name: &str,
        value: Value,
    ) -> Result<(), RuntimeError> {
        self.as_class(class)?;
        let mut scope = self.protect(value);
        let key = Value::Object(scope.new_string(name)?);
        scope.table_set(class, field, key, value)?;
        Ok(())
    }

    pub fn set_initializer(&mut self, class: ObjRef, initializer: ObjRef) -> Result<(), RuntimeError> {
        self.as_closure(initializer)?;
        self.as_class_mut(class)?.initializer = Some(initializer);
        Ok(())
    }

    /// Copy the superclass' property defaults and methods into `subclass`
    /// and link it. Definitions made on the subclass afterwards override the
    /// copies.
    pub fn inherit(&mut self, subclass: ObjRef, superclass: ObjRef) -> Result<(), RuntimeError> {
        if subclass == superclass {
            return Err(RuntimeError::type_error("a class cannot inherit from itself"));
        }
        let mut ancestor = self.as_class(superclass)?.superclass;
        while let Some(c) = ancestor {
            if c == subclass {
                return Err(RuntimeError::type_error("inheritance would form a cycle"));
            }
            ancestor = self.as_class(c)?.superclass;
        }
        let (mut properties, mut methods) = {
            let sub = self.as_class(subclass)?;
            (sub.properties.clone(), sub.methods.clone())
        };
        {
            let sup = self.as_class(superclass)?;
            sup.properties.add_all(&mut properties)?;
            sup.methods.add_all(&mut methods)?;
        }
        let sub = self.as_class_mut(subclass)?;
        let properties = std::mem::replace(&mut sub.properties, properties);
        let methods = std::mem::replace(&mut sub.methods, methods);
        if let Err(e) = self.refresh_size(subclass) {
            let sub = self.as_class_mut(subclass)?;
            sub.properties = properties;
            sub.methods = methods;
            return Err(e);
        }
        self.as_class_mut(subclass)?.superclass = Some(superclass);
        Ok(())
    }

    /// First method named `name` along the superclass chain.
    pub fn find_method(&self, class: ObjRef, name: Value) -> Result<Option<Value>, RuntimeError> {
        let mut current = Some(class);
        while let Some(c) = current {
            let class = self.as_class(c)?;
            if let Some(method) = class.methods.get(name) {
                return Ok(Some(method));
            }
            current = class.superclass;
        }
        Ok(None)
    }

    /// A fresh instance whose property table is a shallow copy of the
    /// class defaults.
    pub fn new_instance(&mut self, class: ObjRef) -> Result<ObjRef, RuntimeError> {
        let mut properties = Table::new();
        self.as_class(class)?.properties.add_all(&mut properties)?;
        let mut scope = self.protect(Value::Object(class));
        scope.allocate(Obj::Instance(ObjInstance { class, properties }))
    }

    /// Own property first, then a method from the class chain.
    pub fn get_property(&self, instance: ObjRef, name: Value) -> Result<Option<Value>, RuntimeError> {
        let instance = self.as_instance(instance)?;
        if let Some(value) = instance.properties.get(name) {
            return Ok(Some(value));
        }
        self.find_method(instance.class, name)
    }

    /// Set an own property, shadowing any class default. Returns whether the
    /// property was new to this instance.
    pub fn set_property(&mut self, instance: ObjRef, name: Value, value: Value) -> Result<bool, RuntimeError> {
        self.table_set(instance, TableField::InstanceProperties, name, value)
    }

    /// Bind the method `name` of the instance's class to the instance.
    pub fn bind_method(&mut self, instance: ObjRef, name: Value) -> Result<Option<ObjRef>, RuntimeError> {
        let class = self.as_instance(instance)?.class;
        match self.find_method(class, name)? {
            Some(Value::Object(method)) => self
                .new_bound_method(Value::Object(instance), method)
                .map(Some),
            Some(other) => Err(RuntimeError::expected("closure", &self.type_name(other))),
            None => Ok(None),
        }
    }
}
