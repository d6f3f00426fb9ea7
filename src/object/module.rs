//! Module namespaces, switch jump tables and file handles.

use std::fs::File;

use super::table::Table;
use super::ObjRef;
use crate::error::RuntimeError;
use crate::heap::Heap;

/// Hook run when a module is first imported or when it is unloaded. It
/// receives the module itself so it can populate or tear down its globals.
pub type ModuleHook = fn(&mut Heap, ObjRef) -> Result<(), RuntimeError>;

#[derive(Debug)]
pub struct ObjModule {
    pub name: String,
    /// Path of the source file backing this module.
    pub file: String,
    /// Module-level globals.
    pub values: Table,
    pub preloader: Option<ModuleHook>,
    pub unloader: Option<ModuleHook>,
    pub imported: bool,
}

impl ObjModule {
    pub(crate) fn new(name: String, file: String) -> Self {
        Self {
            name,
            file,
            values: Table::new(),
            preloader: None,
            unloader: None,
            imported: false,
        }
    }
}

/// Jump table for a compiled `using`/`when` statement.
#[derive(Debug, Default)]
pub struct ObjSwitch {
    /// Case value to jump offset.
    pub table: Table,
    pub default_jump: Option<usize>,
    pub exit_jump: Option<usize>,
}

#[derive(Debug)]
pub struct ObjFile {
    pub path: ObjRef,
    pub mode: ObjRef,
    pub is_open: bool,
    pub(crate) handle: Option<File>,
}

impl ObjFile {
    pub fn handle(&self) -> Option<&File> {
        self.handle.as_ref()
    }
}
