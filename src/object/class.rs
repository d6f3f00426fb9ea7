//! Classes and their instances.

use super::table::Table;
use super::ObjRef;

/// A class definition with single inheritance.
#[derive(Debug)]
pub struct ObjClass {
    /// Interned class name.
    pub name: ObjRef,
    /// Instance-property defaults, copied into every new instance.
    pub properties: Table,
    pub static_properties: Table,
    pub methods: Table,
    pub initializer: Option<ObjRef>,
    pub superclass: Option<ObjRef>,
}

impl ObjClass {
    pub(crate) fn new(name: ObjRef) -> Self {
        Self {
            name,
            properties: Table::new(),
            static_properties: Table::new(),
            methods: Table::new(),
            initializer: None,
            superclass: None,
        }
    }
}

#[derive(Debug)]
pub struct ObjInstance {
    pub class: ObjRef,
    /// Own properties, seeded from the class defaults at construction.
    pub properties: Table,
}
