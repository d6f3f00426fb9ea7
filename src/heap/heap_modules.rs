//! Module namespaces, switch tables and file objects.

use std::fs::{File, OpenOptions};

use tracing::debug;

use super::heap::{Heap, TableField};
use crate::error::RuntimeError;
use crate::object::{ModuleHook, Obj, ObjFile, ObjModule, ObjRef, ObjSwitch, Value};

impl Heap {
    // -----------------------------------------------------------------------
    // Module
    // -----------------------------------------------------------------------

    pub fn new_module(&mut self, name: &str, file: &str) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::Module(ObjModule::new(name.to_string(), file.to_string())))
    }

    pub fn module_define(&mut self, module: ObjRef, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.as_module(module)?;
        let mut scope = self.protect(value);
        let key = Value::Object(scope.new_string(name)?);
        scope.table_set(module, TableField::ModuleValues, key, value)?;
        Ok(())
    }

    pub fn module_get(&self, module: ObjRef, name: Value) -> Result<Option<Value>, RuntimeError> {
        Ok(self.as_module(module)?.values.get(name))
    }

    pub fn set_module_hooks(
        &mut self,
        module: ObjRef,
        preloader: Option<ModuleHook>,
        unloader: Option<ModuleHook>,
    ) -> Result<(), RuntimeError> {
        let m = self.as_module_mut(module)?;
        m.preloader = preloader;
        m.unloader = unloader;
        Ok(())
    }

    /// Import the module: run its preload hook the first time only. Returns
    /// whether this call performed the import. A failing hook leaves the
    /// module unimported.
    pub fn module_load(&mut self, module: ObjRef) -> Result<bool, RuntimeError> {
        let m = self.as_module_mut(module)?;
        if m.imported {
            return Ok(false);
        }
        m.imported = true;
        let hook = m.preloader;
        debug!(module = %m.name, "module import");
        if let Some(hook) = hook {
            if let Err(e) = hook(self, module) {
                self.as_module_mut(module)?.imported = false;
                return Err(e);
            }
        }
        Ok(true)
    }

    /// Run the unload hook of an imported module and clear its imported flag.
    /// A failing hook leaves the module imported.
    pub fn module_unload(&mut self, module: ObjRef) -> Result<bool, RuntimeError> {
        let m = self.as_module_mut(module)?;
        if !m.imported {
            return Ok(false);
        }
        m.imported = false;
        let hook = m.unloader;
        if let Some(hook) = hook {
            if let Err(e) = hook(self, module) {
                self.as_module_mut(module)?.imported = true;
                return Err(e);
            }
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Switch
    // -----------------------------------------------------------------------

    pub fn new_switch(&mut self) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::Switch(ObjSwitch::default()))
    }

    /// Map a case value to a jump offset.
    pub fn switch_add_case(&mut self, switch: ObjRef, case: Value, offset: usize) -> Result<(), RuntimeError> {
        self.table_set(switch, TableField::SwitchCases, case, Value::from(offset as i64))?;
        Ok(())
    }

    pub fn switch_jump(&self, switch: ObjRef, case: Value) -> Result<Option<usize>, RuntimeError> {
        let switch = self.as_switch(switch)?;
        Ok(match switch.table.get(case).and_then(|v| v.as_number()) {
            Some(offset) => Some(offset as usize),
            None => switch.default_jump,
        })
    }

    pub fn set_switch_jumps(
        &mut self,
        switch: ObjRef,
        default_jump: Option<usize>,
        exit_jump: Option<usize>,
    ) -> Result<(), RuntimeError> {
        let s = self.as_switch_mut(switch)?;
        s.default_jump = default_jump;
        s.exit_jump = exit_jump;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // File
    // -----------------------------------------------------------------------

    /// A closed file object. An empty mode denotes a standard stream.
    pub fn new_file(&mut self, path: &str, mode: &str) -> Result<ObjRef, RuntimeError> {
        if path.is_empty() {
            return Err(RuntimeError::new("file path cannot be empty"));
        }
        let path = self.new_string(path)?;
        let mut scope = self.protect(Value::Object(path));
        let mode = scope.new_string(mode)?;
        scope.protect_also(Value::Object(mode));
        scope.allocate(Obj::File(ObjFile {
            path,
            mode,
            is_open: false,
            handle: None,
        }))
    }

    pub fn file_is_std(&self, file: ObjRef) -> Result<bool, RuntimeError> {
        let file = self.as_file(file)?;
        Ok(self.as_string(file.mode)?.is_empty())
    }

    /// Open the OS handle. Already-open files and standard streams are left
    /// as they are. `w+` opens as `a+` so existing content is kept.
    pub fn file_open(&mut self, file: ObjRef) -> Result<(), RuntimeError> {
        if self.file_is_std(file)? || self.as_file(file)?.is_open {
            return Ok(());
        }
        let (path, mode) = {
            let f = self.as_file(file)?;
            (
                self.as_string(f.path)?.as_str().into_owned(),
                self.as_string(f.mode)?.as_str().into_owned(),
            )
        };
        let options = open_options(&mode)?;
        let handle = options
            .open(&path)
            .map_err(|source| RuntimeError::io(path.as_str(), source))?;
        let f = self.as_file_mut(file)?;
        f.handle = Some(handle);
        f.is_open = true;
        debug!(path = %path, mode = %mode, "file open");
        Ok(())
    }

    /// The OS handle of an open file, for reading and writing.
    pub fn file_handle(&mut self, file: ObjRef) -> Result<&mut File, RuntimeError> {
        let f = self.as_file_mut(file)?;
        match f.handle.as_mut() {
            Some(handle) => Ok(handle),
            None => Err(RuntimeError::new("file is not open")),
        }
    }

    /// Release the OS handle. The object itself lives until swept.
    pub fn file_close(&mut self, file: ObjRef) -> Result<(), RuntimeError> {
        if self.file_is_std(file)? {
            return Ok(());
        }
        let f = self.as_file_mut(file)?;
        f.handle = None;
        f.is_open = false;
        Ok(())
    }
}

fn open_options(mode: &str) -> Result<OpenOptions, RuntimeError> {
    let mut options = OpenOptions::new();
    let update = mode.contains('+');
    match mode.chars().find(|c| matches!(c, 'r' | 'w' | 'a')) {
        Some('r') => {
            options.read(true).write(update);
        }
        Some('w') if update => {
            options.read(true).append(true).create(true);
        }
        Some('w') => {
            options.write(true).create(true).truncate(true);
        }
        Some('a') => {
            options.append(true).create(true).read(update);
        }
        _ => return Err(RuntimeError::type_error(format!("invalid file mode '{}'", mode))),
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn mark_loaded(heap: &mut Heap, module: ObjRef) -> Result<(), RuntimeError> {
        heap.module_define(module, "loaded", Value::Bool(true))
    }

    fn mark_unloaded(heap: &mut Heap, module: ObjRef) -> Result<(), RuntimeError> {
        heap.module_define(module, "loaded", Value::Bool(false))
    }

    fn refuse(_heap: &mut Heap, _module: ObjRef) -> Result<(), RuntimeError> {
        Err(RuntimeError::new("refused"))
    }

    #[test]
    fn test_module_globals() {
        let mut heap = Heap::new();
        let module = heap.new_module("math", "math.b").unwrap();
        heap.module_define(module, "pi", Value::Number(2.5)).unwrap();
        let pi = Value::Object(heap.new_string("pi").unwrap());
        assert_eq!(heap.module_get(module, pi).unwrap(), Some(Value::Number(2.5)));
        let e = Value::Object(heap.new_string("e").unwrap());
        assert_eq!(heap.module_get(module, e).unwrap(), None);
    }

    #[test]
    fn test_module_imports_once() {
        let mut heap = Heap::new();
        let module = heap.new_module("os", "os.b").unwrap();
        heap.set_module_hooks(module, Some(mark_loaded), Some(mark_unloaded)).unwrap();
        let loaded = Value::Object(heap.new_string("loaded").unwrap());
        assert!(heap.module_load(module).unwrap());
        assert!(!heap.module_load(module).unwrap());
        assert_eq!(heap.module_get(module, loaded).unwrap(), Some(Value::Bool(true)));
        assert_eq!(heap.protected_len(), 0);
        assert!(heap.as_module(module).unwrap().imported);

        assert!(heap.module_unload(module).unwrap());
        assert!(!heap.module_unload(module).unwrap());
        assert_eq!(heap.module_get(module, loaded).unwrap(), Some(Value::Bool(false)));
        assert_eq!(heap.protected_len(), 0);
    }

    #[test]
    fn test_failing_hook_leaves_import_state() {
        let mut heap = Heap::new();
        let module = heap.new_module("net", "net.b").unwrap();
        heap.set_module_hooks(module, Some(refuse), None).unwrap();
        assert!(heap.module_load(module).is_err());
        assert!(!heap.as_module(module).unwrap().imported);

        heap.set_module_hooks(module, None, Some(refuse)).unwrap();
        assert!(heap.module_load(module).unwrap());
        assert!(heap.module_unload(module).is_err());
        assert!(heap.as_module(module).unwrap().imported);
    }

    #[test]
    fn test_switch_jumps() {
        let mut heap = Heap::new();
        let switch = heap.new_switch().unwrap();
        heap.switch_add_case(switch, Value::Number(1.0), 10).unwrap();
        heap.set_switch_jumps(switch, Some(99), Some(120)).unwrap();
        assert_eq!(heap.switch_jump(switch, Value::Number(1.0)).unwrap(), Some(10));
        assert_eq!(heap.switch_jump(switch, Value::Nil).unwrap(), Some(99));
        assert_eq!(heap.as_switch(switch).unwrap().exit_jump, Some(120));
    }

    #[test]
    fn test_file_open_write_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let path = path.to_str().unwrap();

        let mut heap = Heap::new();
        let file = heap.new_file(path, "w").unwrap();
        assert!(!heap.as_file(file).unwrap().is_open);
        heap.file_open(file).unwrap();
        assert!(heap.as_file(file).unwrap().is_open);
        heap.file_handle(file).unwrap().write_all(b"hello").unwrap();
        heap.file_close(file).unwrap();
        assert!(heap.as_file(file).unwrap().handle().is_none());
        assert!(heap.file_handle(file).is_err());
        assert!(heap.is_live(file));

        let reader = heap.new_file(path, "rb").unwrap();
        heap.file_open(reader).unwrap();
        let mut text = String::new();
        heap.file_handle(reader).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_w_plus_keeps_content() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"keep").unwrap();
        let path = tmp.path().to_str().unwrap().to_string();

        let mut heap = Heap::new();
        let file = heap.new_file(&path, "w+").unwrap();
        heap.file_open(file).unwrap();
        heap.file_close(file).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep");
    }

    #[test]
    fn test_std_file_is_never_opened() {
        let mut heap = Heap::new();
        let stdout = heap.new_file("<stdout>", "").unwrap();
        assert!(heap.file_is_std(stdout).unwrap());
        heap.file_open(stdout).unwrap();
        assert!(heap.as_file(stdout).unwrap().handle().is_none());
    }

    #[test]
    fn test_open_errors() {
        let mut heap = Heap::new();
        let missing = heap.new_file("/definitely/not/here.txt", "r").unwrap();
        let err = heap.file_open(missing).unwrap_err();
        assert!(matches!(err, RuntimeError::Io { .. }));
        let bad = heap.new_file("x.txt", "q").unwrap();
        assert!(heap.file_open(bad).is_err());
        assert!(heap.new_file("", "r").is_err());
    }
}
