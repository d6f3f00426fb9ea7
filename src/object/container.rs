//! Aggregate objects: List, Bytes, Dict and Range.

use super::table::Table;
use super::value::Value;
use crate::error::RuntimeError;

/// Convert a language index into a slot, rejecting anything outside
/// `[0, length)`.
pub(crate) fn checked_index(index: i64, length: usize) -> Result<usize, RuntimeError> {
    if index < 0 || index as u64 >= length as u64 {
        return Err(RuntimeError::index_out_of_bounds(index, length));
    }
    Ok(index as usize)
}

/// Capacity after growing a full buffer: at least 8, otherwise doubled.
pub(crate) fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 {
        8
    } else {
        capacity * 2
    }
}

#[derive(Debug, Default)]
pub struct ObjList {
    pub(crate) items: Vec<Value>,
}

impl ObjList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn get(&self, index: i64) -> Result<Value, RuntimeError> {
        let i = checked_index(index, self.items.len())?;
        Ok(self.items[i])
    }

    pub fn set(&mut self, index: i64, value: Value) -> Result<(), RuntimeError> {
        let i = checked_index(index, self.items.len())?;
        self.items[i] = value;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ObjBytes {
    pub(crate) bytes: Vec<u8>,
}

impl ObjBytes {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn get(&self, index: i64) -> Result<u8, RuntimeError> {
        let i = checked_index(index, self.bytes.len())?;
        Ok(self.bytes[i])
    }

    pub fn set(&mut self, index: i64, byte: u8) -> Result<(), RuntimeError> {
        let i = checked_index(index, self.bytes.len())?;
        self.bytes[i] = byte;
        Ok(())
    }
}

/// Dictionary with insertion-order iteration.
///
/// The ordered table keeps the key sequence and the key set as one
/// structure, so the two can never disagree.
#[derive(Debug, Default)]
pub struct ObjDict {
    pub(crate) items: Table,
}

impl ObjDict {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: Value) -> Option<Value> {
        self.items.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = Value> + '_ {
        self.items.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.items.iter()
    }

    pub fn table(&self) -> &Table {
        &self.items
    }
}

/// An immutable inclusive integer interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjRange {
    lower: i64,
    upper: i64,
    span: u64,
}

impl ObjRange {
    pub fn new(lower: i64, upper: i64) -> Self {
        Self {
            lower,
            upper,
            span: upper.abs_diff(lower),
        }
    }

    pub fn lower(&self) -> i64 {
        self.lower
    }

    pub fn upper(&self) -> i64 {
        self.upper
    }

    /// `|upper - lower|`, exact over the whole `i64` domain.
    pub fn span(&self) -> u64 {
        self.span
    }

    pub fn contains(&self, n: i64) -> bool {
        n >= self.lower.min(self.upper) && n <= self.lower.max(self.upper)
    }

    /// A fresh walk from `lower` to `upper`, both included.
    pub fn iter(&self) -> RangeIter {
        RangeIter {
            next: self.lower,
            end: self.upper,
            step: if self.upper >= self.lower { 1 } else { -1 },
            done: false,
        }
    }
}

impl IntoIterator for &ObjRange {
    type Item = i64;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct RangeIter {
    next: i64,
    end: i64,
    step: i64,
    done: bool,
}

impl Iterator for RangeIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.done {
            return None;
        }
        let current = self.next;
        if current == self.end {
            self.done = true;
        } else {
            // moves toward `end`, so never leaves the interval
            self.next += self.step;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match usize::try_from(self.next.abs_diff(self.end))
            .ok()
            .and_then(|n| n.checked_add(1))
        {
            Some(n) => (n, Some(n)),
            None => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_checked_index() {
        assert_eq!(checked_index(0, 1).unwrap(), 0);
        assert!(checked_index(1, 1).is_err());
        assert!(checked_index(-1, 3).is_err());
        assert!(checked_index(0, 0).is_err());
    }

    #[test]
    fn test_grow_capacity() {
        assert_eq!(grow_capacity(0), 8);
        assert_eq!(grow_capacity(8), 16);
        assert_eq!(grow_capacity(100), 200);
    }

    #[test]
    fn test_range_span_and_contains() {
        let range = ObjRange::new(3, 7);
        assert_eq!(range.span(), 4);
        assert!(range.contains(5));
        assert!(range.contains(3));
        assert!(range.contains(7));
        assert!(!range.contains(8));
        assert!(!range.contains(2));
    }

    #[test]
    fn test_range_iterates_inclusive_both_directions() {
        let up: Vec<i64> = ObjRange::new(3, 7).iter().collect();
        assert_eq!(up, vec![3, 4, 5, 6, 7]);
        let down: Vec<i64> = ObjRange::new(2, -1).iter().collect();
        assert_eq!(down, vec![2, 1, 0, -1]);
        let single: Vec<i64> = ObjRange::new(4, 4).iter().collect();
        assert_eq!(single, vec![4]);
    }

    #[test]
    fn test_range_iteration_restarts() {
        let range = ObjRange::new(0, 2);
        let first: i64 = range.iter().sum();
        let second: i64 = (&range).into_iter().sum();
        assert_eq!(first, second);
        assert_eq!(range.iter().count(), 3);
        assert_eq!(range.iter().size_hint(), (3, Some(3)));
    }

    #[test]
    fn test_range_at_integer_extremes() {
        let full = ObjRange::new(i64::MIN, i64::MAX);
        assert_eq!(full.span(), u64::MAX);
        assert!(full.contains(0));
        assert!(full.contains(i64::MIN));
        assert!(full.contains(i64::MAX));
        let head: Vec<i64> = full.iter().take(2).collect();
        assert_eq!(head, vec![i64::MIN, i64::MIN + 1]);
        assert_eq!(full.iter().size_hint().1, None);

        let down = ObjRange::new(0, i64::MIN);
        assert_eq!(down.span(), 1u64 << 63);
        assert!(down.contains(-1));
        assert!(!down.contains(1));
        let head: Vec<i64> = down.iter().take(3).collect();
        assert_eq!(head, vec![0, -1, -2]);

        let tail: Vec<i64> = ObjRange::new(i64::MAX - 1, i64::MAX).iter().collect();
        assert_eq!(tail, vec![i64::MAX - 1, i64::MAX]);
        let tail: Vec<i64> = ObjRange::new(i64::MIN + 1, i64::MIN).iter().collect();
        assert_eq!(tail, vec![i64::MIN + 1, i64::MIN]);
    }

    #[test]
    fn test_list_bounds() {
        let mut list = ObjList::default();
        list.items.push(Value::Nil);
        assert!(list.set(0, Value::Bool(true)).is_ok());
        assert_eq!(list.get(0).unwrap(), Value::Bool(true));
        assert!(matches!(
            list.get(1),
            Err(RuntimeError::IndexOutOfBounds { index: 1, length: 1 })
        ));
    }
}
