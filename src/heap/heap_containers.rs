//! Constructors and accessors for lists, dictionaries, byte arrays and ranges.

use std::mem::size_of;

use super::heap::{Heap, TableField};
use crate::error::RuntimeError;
use crate::object::container::grow_capacity;
use crate::object::{Obj, ObjBytes, ObjDict, ObjList, ObjRange, ObjRef, Value};

impl Heap {
    // -----------------------------------------------------------------------
    // List
    // -----------------------------------------------------------------------

    pub fn new_list(&mut self) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::List(ObjList::default()))
    }

    /// A list holding a copy of `items`.
    pub fn new_list_from(&mut self, items: &[Value]) -> Result<ObjRef, RuntimeError> {
        let mut copy = Vec::new();
        copy.try_reserve_exact(items.len())?;
        copy.extend_from_slice(items);
        self.allocate(Obj::List(ObjList { items: copy }))
    }

    /// Append, doubling capacity when full.
    pub fn list_append(&mut self, list: ObjRef, value: Value) -> Result<(), RuntimeError> {
        let (len, capacity) = {
            let l = self.as_list(list)?;
            (l.len(), l.capacity())
        };
        if len == capacity {
            let grown = grow_capacity(capacity);
            self.charge(list, (grown - capacity) * size_of::<Value>())?;
            let reserved = self.as_list_mut(list)?.items.try_reserve_exact(grown - len);
            self.refresh_size(list)?;
            reserved?;
        }
        self.as_list_mut(list)?.items.push(value);
        Ok(())
    }

    pub fn list_get(&self, list: ObjRef, index: i64) -> Result<Value, RuntimeError> {
        self.as_list(list)?.get(index)
    }

    pub fn list_set(&mut self, list: ObjRef, index: i64, value: Value) -> Result<(), RuntimeError> {
        self.as_list_mut(list)?.set(index, value)
    }

    pub fn list_len(&self, list: ObjRef) -> Result<usize, RuntimeError> {
        Ok(self.as_list(list)?.len())
    }

    // -----------------------------------------------------------------------
    // Dict
    // -----------------------------------------------------------------------

    pub fn new_dict(&mut self) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::Dict(ObjDict::default()))
    }

    /// Insert or overwrite. An existing key keeps its position. Returns
    /// whether the key was new.
    pub fn dict_set(&mut self, dict: ObjRef, key: Value, value: Value) -> Result<bool, RuntimeError> {
        self.table_set(dict, TableField::DictItems, key, value)
    }

    /// Value under `key`; absence is `None`, never an error.
    pub fn dict_get(&self, dict: ObjRef, key: Value) -> Result<Option<Value>, RuntimeError> {
        Ok(self.as_dict(dict)?.get(key))
    }

    pub fn dict_delete(&mut self, dict: ObjRef, key: Value) -> Result<Option<Value>, RuntimeError> {
        Ok(self.as_dict_mut(dict)?.items.delete(key))
    }

    /// Keys in insertion order.
    pub fn dict_keys(&self, dict: ObjRef) -> Result<Vec<Value>, RuntimeError> {
        Ok(self.as_dict(dict)?.keys().collect())
    }

    pub fn dict_len(&self, dict: ObjRef) -> Result<usize, RuntimeError> {
        Ok(self.as_dict(dict)?.len())
    }

    // -----------------------------------------------------------------------
    // Bytes
    // -----------------------------------------------------------------------

    /// A zero-filled byte array of `length` bytes.
    pub fn new_bytes(&mut self, length: usize) -> Result<ObjRef, RuntimeError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(length)?;
        bytes.resize(length, 0);
        self.take_bytes(bytes)
    }

    pub fn copy_bytes(&mut self, bytes: &[u8]) -> Result<ObjRef, RuntimeError> {
        let mut copy = Vec::new();
        copy.try_reserve_exact(bytes.len())?;
        copy.extend_from_slice(bytes);
        self.take_bytes(copy)
    }

    /// Wrap an existing buffer without copying it.
    pub fn take_bytes(&mut self, bytes: Vec<u8>) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::Bytes(ObjBytes { bytes }))
    }

    pub fn bytes_append(&mut self, target: ObjRef, byte: u8) -> Result<(), RuntimeError> {
        let (len, capacity) = {
            let b = self.as_bytes(target)?;
            (b.len(), b.capacity())
        };
        if len == capacity {
            let grown = grow_capacity(capacity);
            self.charge(target, grown - capacity)?;
            let reserved = self.as_bytes_mut(target)?.bytes.try_reserve_exact(grown - len);
            self.refresh_size(target)?;
            reserved?;
        }
        self.as_bytes_mut(target)?.bytes.push(byte);
        Ok(())
    }

    pub fn bytes_get(&self, target: ObjRef, index: i64) -> Result<u8, RuntimeError> {
        self.as_bytes(target)?.get(index)
    }

    pub fn bytes_set(&mut self, target: ObjRef, index: i64, byte: u8) -> Result<(), RuntimeError> {
        self.as_bytes_mut(target)?.set(index, byte)
    }

    // -----------------------------------------------------------------------
    // Range
    // -----------------------------------------------------------------------

    pub fn new_range(&mut self, lower: i64, upper: i64) -> Result<ObjRef, RuntimeError> {
        self.allocate(Obj::Range(ObjRange::new(lower, upper)))
    }

    pub fn range_contains(&self, range: ObjRef, n: i64) -> Result<bool, RuntimeError> {
        Ok(self.as_range(range)?.contains(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_append_doubles_capacity() {
        let mut heap = Heap::new();
        let list = heap.new_list().unwrap();
        for i in 0..9 {
            heap.list_append(list, Value::from(i as i64)).unwrap();
        }
        let l = heap.as_list(list).unwrap();
        assert_eq!(l.len(), 9);
        assert!(l.capacity() >= 16);
        assert_eq!(heap.list_get(list, 8).unwrap(), Value::Number(8.0));
    }

    #[test]
    fn test_list_growth_is_charged() {
        let mut heap = Heap::new();
        let list = heap.new_list().unwrap();
        let before = heap.bytes_allocated();
        heap.list_append(list, Value::Nil).unwrap();
        assert!(heap.bytes_allocated() >= before + 8 * size_of::<Value>());
    }

    #[test]
    fn test_list_index_errors() {
        let mut heap = Heap::new();
        let list = heap.new_list_from(&[Value::Nil, Value::Bool(true)]).unwrap();
        assert!(heap.list_get(list, 2).is_err());
        assert!(heap.list_get(list, -1).is_err());
        heap.list_set(list, 1, Value::Number(3.0)).unwrap();
        assert_eq!(heap.list_get(list, 1).unwrap(), Value::Number(3.0));
        let err = heap.list_set(list, 5, Value::Nil).unwrap_err();
        assert_eq!(err.to_string(), "Index out of bounds: 5 (length 2)");
    }

    #[test]
    fn test_list_growth_respects_heap_limit() {
        let limit = size_of::<Obj>() + 4 * size_of::<Value>();
        let mut heap = Heap::with_config(HeapConfig::new().with_max_heap_bytes(limit));
        let list = heap.new_list().unwrap();
        let err = heap.list_append(list, Value::Nil).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(heap.list_len(list).unwrap(), 0);
    }

    #[test]
    fn test_dict_order_after_delete() {
        let mut heap = Heap::new();
        let dict = heap.new_dict().unwrap();
        let (a, b, c) = (
            heap.new_string("a").unwrap(),
            heap.new_string("b").unwrap(),
            heap.new_string("c").unwrap(),
        );
        heap.dict_set(dict, a.into(), 1.0.into()).unwrap();
        heap.dict_set(dict, b.into(), 2.0.into()).unwrap();
        assert_eq!(heap.dict_delete(dict, a.into()).unwrap(), Some(Value::Number(1.0)));
        heap.dict_set(dict, c.into(), 3.0.into()).unwrap();
        assert!(!heap.dict_set(dict, b.into(), 20.0.into()).unwrap());

        let pairs: Vec<(Value, Value)> = heap.as_dict(dict).unwrap().iter().collect();
        assert_eq!(
            pairs,
            vec![
                (Value::Object(b), Value::Number(20.0)),
                (Value::Object(c), Value::Number(3.0)),
            ]
        );
        assert_eq!(heap.dict_get(dict, a.into()).unwrap(), None);
        assert_eq!(heap.dict_len(dict).unwrap(), 2);
    }

    #[test]
    fn test_bytes_constructors() {
        let mut heap = Heap::new();
        let zeroed = heap.new_bytes(3).unwrap();
        assert_eq!(heap.as_bytes(zeroed).unwrap().as_slice(), &[0, 0, 0]);

        let taken = heap.take_bytes(vec![1, 2]).unwrap();
        heap.bytes_append(taken, 3).unwrap();
        heap.bytes_set(taken, 0, 9).unwrap();
        assert_eq!(heap.as_bytes(taken).unwrap().as_slice(), &[9, 2, 3]);
        assert!(heap.bytes_get(taken, 3).is_err());

        let copied = heap.copy_bytes(b"hi").unwrap();
        assert_eq!(heap.bytes_get(copied, 1).unwrap(), b'i');
    }

    #[test]
    fn test_range_contains() {
        let mut heap = Heap::new();
        let range = heap.new_range(3, 7).unwrap();
        assert_eq!(heap.as_range(range).unwrap().span(), 4);
        assert!(heap.range_contains(range, 5).unwrap());
        assert!(!heap.range_contains(range, 8).unwrap());
    }
}
