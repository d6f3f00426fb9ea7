//! Scoped rooting.
//!
//! Values pushed here are part of every collection's root set until the
//! guard that pushed them is dropped. The guard dereferences to the heap, so
//! allocation and collection go through it while the protection is held.

use std::ops::{Deref, DerefMut};

use super::heap::Heap;
use crate::error::RuntimeError;
use crate::object::Value;

/// Keeps values alive until dropped, on every exit path.
pub struct RootScope<'h> {
    heap: &'h mut Heap,
    depth: usize,
}

impl<'h> RootScope<'h> {
    /// Protect one more value under the same guard.
    pub fn protect_also(&mut self, value: Value) -> &mut Self {
        self.heap.protected.push(value);
        self
    }

    /// Number of values this guard protects.
    pub fn len(&self) -> usize {
        self.heap.protected.len() - self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deref for RootScope<'_> {
    type Target = Heap;

    fn deref(&self) -> &Heap {
        self.heap
    }
}

impl DerefMut for RootScope<'_> {
    fn deref_mut(&mut self) -> &mut Heap {
        self.heap
    }
}

impl Drop for RootScope<'_> {
    fn drop(&mut self) {
        self.heap.protected.truncate(self.depth);
    }
}

impl Heap {
    /// Protect `value` for as long as the returned guard lives.
    pub fn protect(&mut self, value: Value) -> RootScope<'_> {
        let depth = self.protected.len();
        self.protected.push(value);
        RootScope { heap: self, depth }
    }

    /// Raw push onto the protection stack; pair with [`Heap::pop_root`].
    pub fn push_root(&mut self, value: Value) {
        self.protected.push(value);
    }

    pub fn pop_root(&mut self) -> Result<Value, RuntimeError> {
        self.protected
            .pop()
            .ok_or_else(|| RuntimeError::new("root protection stack underflow"))
    }

    pub fn protected_len(&self) -> usize {
        self.protected.len()
    }
}
