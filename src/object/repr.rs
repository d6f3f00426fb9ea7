//! Human-readable rendering of values.
//!
//! [`Repr`] is the single renderer behind both `Heap::print_value` and
//! `Heap::stringify`, so the printed and the stringified form of a value
//! always agree. Rendering never fails: a dangling handle renders as
//! `<invalid>`, and a container that contains itself renders the inner
//! occurrence as `[...]` or `{...}`.

use std::borrow::Cow;
use std::fmt;
use std::io;

use super::value::format_number;
use super::{Obj, ObjRef, Value};
use crate::error::RuntimeError;
use crate::heap::Heap;

/// Bytes shown before a byte array is elided.
const MAX_BYTES_SHOWN: usize = 100;

/// Display adapter for a value on a heap.
pub struct Repr<'h> {
    heap: &'h Heap,
    value: Value,
    quoted: bool,
}

impl<'h> Repr<'h> {
    pub fn new(heap: &'h Heap, value: Value) -> Self {
        Self {
            heap,
            value,
            quoted: false,
        }
    }

    /// Wrap strings in quotes, picking `"` when the text contains `'`.
    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }
}

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut renderer = Renderer {
            heap: self.heap,
            quoted: self.quoted,
            ancestors: Vec::new(),
        };
        renderer.value(self.value, f)
    }
}

struct Renderer<'h> {
    heap: &'h Heap,
    quoted: bool,
    /// Containers currently being rendered.
    ancestors: Vec<ObjRef>,
}

impl Renderer<'_> {
    fn value(&mut self, value: Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match value {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(n)),
            Value::Object(r) => self.object(r, f),
        }
    }

    fn object(&mut self, r: ObjRef, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heap = self.heap;
        let Ok(obj) = heap.get(r) else {
            return f.write_str("<invalid>");
        };
        match obj {
            Obj::String(s) => {
                let text = s.as_str();
                if !self.quoted {
                    f.write_str(&text)
                } else if text.contains('\'') {
                    write!(f, "\"{}\"", text)
                } else {
                    write!(f, "'{}'", text)
                }
            }
            Obj::List(list) => {
                if self.ancestors.contains(&r) {
                    return f.write_str("[...]");
                }
                self.ancestors.push(r);
                f.write_str("[")?;
                for (i, item) in list.items().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.value(*item, f)?;
                }
                self.ancestors.pop();
                f.write_str("]")
            }
            Obj::Dict(dict) => {
                if self.ancestors.contains(&r) {
                    return f.write_str("{...}");
                }
                self.ancestors.push(r);
                f.write_str("{")?;
                for (i, (key, value)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.value(key, f)?;
                    f.write_str(": ")?;
                    self.value(value, f)?;
                }
                self.ancestors.pop();
                f.write_str("}")
            }
            Obj::Bytes(bytes) => {
                f.write_str("(")?;
                for (i, byte) in bytes.as_slice().iter().take(MAX_BYTES_SHOWN).enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:#x}", byte)?;
                }
                if bytes.len() > MAX_BYTES_SHOWN {
                    f.write_str(" ...")?;
                }
                f.write_str(")")
            }
            Obj::Range(range) => write!(f, "<range {}-{}>", range.lower(), range.upper()),
            Obj::Function(_) => self.function(r, f),
            Obj::Closure(closure) => self.function(closure.function, f),
            Obj::BoundMethod(bound) => match heap.get(bound.method) {
                Ok(Obj::Closure(closure)) => self.function(closure.function, f),
                Ok(Obj::Native(native)) => write!(f, "<native-function {}>", native.name),
                _ => f.write_str("<invalid>"),
            },
            Obj::Native(native) => write!(f, "<native-function {}>", native.name),
            Obj::Upvalue(_) => f.write_str("<up value>"),
            Obj::Class(class) => write!(f, "<class {}>", self.text(class.name)),
            Obj::Instance(instance) => {
                let name = heap
                    .as_class(instance.class)
                    .map(|class| self.text(class.name))
                    .unwrap_or(Cow::Borrowed("<invalid>"));
                write!(f, "<instance of {}>", name)
            }
            Obj::Module(module) => write!(f, "<module {}>", module.name),
            Obj::Switch(_) => f.write_str("<switch>"),
            Obj::File(file) => write!(
                f,
                "<file at {} in mode {}>",
                self.text(file.path),
                self.text(file.mode)
            ),
        }
    }

    fn function(&self, r: ObjRef, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.heap.as_function(r) {
            Ok(function) => match function.name {
                Some(name) => write!(f, "<function {}>", self.text(name)),
                None => f.write_str("<script>"),
            },
            Err(_) => f.write_str("<invalid>"),
        }
    }

    fn text(&self, r: ObjRef) -> Cow<'_, str> {
        self.heap
            .as_string(r)
            .map(|s| s.as_str())
            .unwrap_or(Cow::Borrowed("<invalid>"))
    }
}

impl Heap {
    pub fn repr(&self, value: Value) -> Repr<'_> {
        Repr::new(self, value)
    }

    pub fn value_to_string(&self, value: Value) -> String {
        self.repr(value).to_string()
    }

    /// Write the rendered value to `out`.
    pub fn print_value<W: io::Write>(&self, out: &mut W, value: Value, quoted: bool) -> io::Result<()> {
        let repr = self.repr(value);
        if quoted {
            write!(out, "{}", repr.quoted())
        } else {
            write!(out, "{}", repr)
        }
    }

    /// Render `value` into an interned string. Strings are returned as is.
    pub fn stringify(&mut self, value: Value) -> Result<ObjRef, RuntimeError> {
        if let Value::Object(r) = value {
            if self.as_string(r).is_ok() {
                return Ok(r);
            }
        }
        let text = self.value_to_string(value);
        self.take_string(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::FunctionKind;
    use pretty_assertions::assert_eq;

    fn render(heap: &Heap, value: impl Into<Value>) -> String {
        heap.value_to_string(value.into())
    }

    #[test]
    fn test_scalars() {
        let heap = Heap::new();
        assert_eq!(render(&heap, Value::Nil), "nil");
        assert_eq!(render(&heap, true), "true");
        assert_eq!(render(&heap, 3.0), "3");
        assert_eq!(render(&heap, 0.5), "0.5");
    }

    #[test]
    fn test_containers() {
        let mut heap = Heap::new();
        let s = heap.new_string("it's").unwrap();
        let list = heap.new_list_from(&[Value::Number(1.0), s.into()]).unwrap();
        assert_eq!(render(&heap, list), "[1, it's]");

        let dict = heap.new_dict().unwrap();
        let k = heap.new_string("k").unwrap();
        heap.dict_set(dict, k.into(), list.into()).unwrap();
        assert_eq!(render(&heap, dict), "{k: [1, it's]}");

        let bytes = heap.copy_bytes(&[1, 255]).unwrap();
        assert_eq!(render(&heap, bytes), "(0x1 0xff)");

        let range = heap.new_range(3, 7).unwrap();
        assert_eq!(render(&heap, range), "<range 3-7>");
    }

    #[test]
    fn test_long_bytes_are_elided() {
        let mut heap = Heap::new();
        let bytes = heap.new_bytes(150).unwrap();
        let text = render(&heap, bytes);
        assert!(text.ends_with("0x0 ...)"));
        assert_eq!(text.matches("0x0").count(), MAX_BYTES_SHOWN);
    }

    #[test]
    fn test_self_reference() {
        let mut heap = Heap::new();
        let list = heap.new_list().unwrap();
        heap.list_append(list, list.into()).unwrap();
        assert_eq!(render(&heap, list), "[[...]]");

        let dict = heap.new_dict().unwrap();
        heap.dict_set(dict, Value::Nil, dict.into()).unwrap();
        assert_eq!(render(&heap, dict), "{nil: {...}}");
    }

    #[test]
    fn test_callables_and_classes() {
        let mut heap = Heap::new();
        let module = heap.new_module("geo", "geo.b").unwrap();
        assert_eq!(render(&heap, module), "<module geo>");

        let script = heap.new_function(module, FunctionKind::Script).unwrap();
        assert_eq!(render(&heap, script), "<script>");
        let area = heap.new_function(module, FunctionKind::Method).unwrap();
        heap.set_function_name(area, "area").unwrap();
        let closure = heap.new_closure(area).unwrap();
        assert_eq!(render(&heap, closure), "<function area>");

        let class = heap.new_class("Square").unwrap();
        let instance = heap.new_instance(class).unwrap();
        let bound = heap.new_bound_method(instance.into(), closure).unwrap();
        assert_eq!(render(&heap, bound), "<function area>");
        assert_eq!(render(&heap, class), "<class Square>");
        assert_eq!(render(&heap, instance), "<instance of Square>");

        let upvalue = heap.new_upvalue(0).unwrap();
        assert_eq!(render(&heap, upvalue), "<up value>");
        let switch = heap.new_switch().unwrap();
        assert_eq!(render(&heap, switch), "<switch>");
        let file = heap.new_file("a.txt", "r").unwrap();
        assert_eq!(render(&heap, file), "<file at a.txt in mode r>");
    }

    #[test]
    fn test_print_quoting() {
        let mut heap = Heap::new();
        let plain = heap.new_string("hi").unwrap();
        let apostrophe = heap.new_string("it's").unwrap();
        let mut out = Vec::new();
        heap.print_value(&mut out, plain.into(), true).unwrap();
        out.push(b' ');
        heap.print_value(&mut out, apostrophe.into(), true).unwrap();
        out.push(b' ');
        heap.print_value(&mut out, plain.into(), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "'hi' \"it's\" hi");
    }

    #[test]
    fn test_stringify_interns() {
        let mut heap = Heap::new();
        let list = heap.new_list_from(&[Value::Number(1.0), Value::Nil]).unwrap();
        let text = heap.stringify(list.into()).unwrap();
        assert_eq!(heap.as_string(text).unwrap().as_bytes(), b"[1, nil]");
        assert_eq!(heap.new_string("[1, nil]").unwrap(), text);
        assert_eq!(heap.stringify(text.into()).unwrap(), text);
    }

    #[test]
    fn test_dangling_handle_renders_placeholder() {
        let mut heap = Heap::new();
        let list = heap.new_list().unwrap();
        heap.collect(&());
        assert_eq!(render(&heap, list), "<invalid>");
    }
}
