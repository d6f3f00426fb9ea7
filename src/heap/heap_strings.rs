//! String interning.

use std::collections::HashMap;

use ahash::RandomState;

use super::heap::Heap;
use crate::error::RuntimeError;
use crate::object::{hash_bytes, Obj, ObjRef, ObjString, Value};

/// Canonical string objects bucketed by content hash. Holds its strings
/// weakly: the collector removes entries whose string was not marked.
#[derive(Debug, Default)]
pub(crate) struct InternTable {
    buckets: HashMap<u32, Vec<ObjRef>, RandomState>,
    len: usize,
}

impl InternTable {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn candidates(&self, hash: u32) -> &[ObjRef] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn insert(&mut self, hash: u32, r: ObjRef) -> Result<(), RuntimeError> {
        self.buckets.try_reserve(1)?;
        let bucket = self.buckets.entry(hash).or_default();
        bucket.try_reserve(1)?;
        bucket.push(r);
        self.len += 1;
        Ok(())
    }

    /// Keep only the strings for which `keep` holds.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&ObjRef) -> bool) {
        let mut len = 0;
        self.buckets.retain(|_, bucket| {
            bucket.retain(|r| keep(r));
            len += bucket.len();
            !bucket.is_empty()
        });
        self.len = len;
    }
}

impl Heap {
    /// Canonical string with content `bytes`, if one is interned.
    pub fn find_string(&self, bytes: &[u8], hash: u32) -> Option<ObjRef> {
        self.strings.candidates(hash).iter().copied().find(|r| {
            self.as_string(*r)
                .map(|s| s.as_bytes() == bytes)
                .unwrap_or(false)
        })
    }

    /// Intern a copy of `bytes`.
    pub fn copy_string(&mut self, bytes: &[u8]) -> Result<ObjRef, RuntimeError> {
        let hash = hash_bytes(bytes);
        if let Some(existing) = self.find_string(bytes, hash) {
            return Ok(existing);
        }
        let mut owned = Vec::new();
        owned.try_reserve_exact(bytes.len())?;
        owned.extend_from_slice(bytes);
        self.allocate_string(owned, hash)
    }

    /// Intern `bytes`, taking ownership. On a hit the buffer is dropped.
    pub fn take_string(&mut self, bytes: Vec<u8>) -> Result<ObjRef, RuntimeError> {
        let hash = hash_bytes(&bytes);
        if let Some(existing) = self.find_string(&bytes, hash) {
            return Ok(existing);
        }
        self.allocate_string(bytes, hash)
    }

    pub fn new_string(&mut self, text: &str) -> Result<ObjRef, RuntimeError> {
        self.copy_string(text.as_bytes())
    }

    /// Intern the concatenation of two strings.
    pub fn concat_strings(&mut self, a: ObjRef, b: ObjRef) -> Result<ObjRef, RuntimeError> {
        let (left, right) = (self.as_string(a)?, self.as_string(b)?);
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(left.len() + right.len())?;
        bytes.extend_from_slice(left.as_bytes());
        bytes.extend_from_slice(right.as_bytes());
        self.take_string(bytes)
    }

    /// Text of a string value, or a type error.
    pub fn string_text(&self, value: Value) -> Result<String, RuntimeError> {
        let r = self.expect_object(value, "string")?;
        Ok(self.as_string(r)?.as_str().into_owned())
    }

    fn allocate_string(&mut self, bytes: Vec<u8>, hash: u32) -> Result<ObjRef, RuntimeError> {
        let r = self.allocate(Obj::String(ObjString::new(bytes, hash)))?;
        let mut scope = self.protect(Value::Object(r));
        scope.strings.insert(hash, r)?;
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_handle() {
        let mut heap = Heap::new();
        let a = heap.new_string("x").unwrap();
        let b = heap.copy_string(b"x").unwrap();
        let c = heap.take_string(b"x".to_vec()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(heap.interned_count(), 1);
        assert_eq!(heap.object_count(), 1);
    }

    #[test]
    fn test_concat_interns_result() {
        let mut heap = Heap::new();
        let abc = heap.new_string("abc").unwrap();
        let ab = heap.new_string("ab").unwrap();
        let c = heap.new_string("c").unwrap();
        assert_eq!(heap.concat_strings(ab, c).unwrap(), abc);
    }

    #[test]
    fn test_string_keeps_hash_and_utf8_length() {
        let mut heap = Heap::new();
        let r = heap.new_string("héllo").unwrap();
        let s = heap.as_string(r).unwrap();
        assert_eq!(s.len(), 6);
        assert_eq!(s.utf8_len(), 5);
        assert_eq!(s.hash(), hash_bytes("héllo".as_bytes()));
        assert_eq!(heap.find_string("héllo".as_bytes(), s.hash()), Some(r));
    }

    #[test]
    fn test_insert_leaves_protection_stack_balanced() {
        let mut heap = Heap::new();
        heap.new_string("a").unwrap();
        assert_eq!(heap.protected_len(), 0);
    }

    #[test]
    fn test_string_text_rejects_numbers() {
        let heap = Heap::new();
        let err = heap.string_text(Value::Number(1.0)).unwrap_err();
        assert_eq!(err.to_string(), "Type error: expected string, found number");
    }
}
