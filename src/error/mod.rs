//! Error types for the object model and heap.

use thiserror::Error;

use crate::object::ObjRef;

/// Errors raised by heap allocation and object access.
///
/// Only [`RuntimeError::OutOfMemory`] is fatal. Every other variant is a
/// logic error the VM may surface to the program as a language-level
/// exception. Absence (a missing dictionary key, an unset property) is never
/// reported through this type.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Out of memory: requested {requested} bytes with {allocated} bytes live")]
    OutOfMemory {
        requested: usize,
        allocated: usize,
        limit: Option<usize>,
    },

    #[error("Index out of bounds: {index} (length {length})")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("Type error: {message}")]
    TypeError { message: String },

    #[error("Invalid object reference {0}")]
    InvalidReference(ObjRef),

    #[error("Cannot open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    General { message: String },
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    pub fn out_of_memory(requested: usize, allocated: usize, limit: Option<usize>) -> Self {
        Self::OutOfMemory {
            requested,
            allocated,
            limit,
        }
    }

    pub fn index_out_of_bounds(index: i64, length: usize) -> Self {
        Self::IndexOutOfBounds { index, length }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Wrong object kind behind a handle.
    pub fn expected(expected: &str, found: &str) -> Self {
        Self::TypeError {
            message: format!("expected {}, found {}", expected, found),
        }
    }

    pub fn invalid_reference(obj: ObjRef) -> Self {
        Self::InvalidReference(obj)
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Fatal errors cannot be caught by the language runtime.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}

impl From<std::collections::TryReserveError> for RuntimeError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory {
            requested: 0,
            allocated: 0,
            limit: None,
        }
    }
}

impl From<indexmap::TryReserveError> for RuntimeError {
    fn from(_: indexmap::TryReserveError) -> Self {
        Self::OutOfMemory {
            requested: 0,
            allocated: 0,
            limit: None,
        }
    }
}
