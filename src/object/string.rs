//! Immutable interned strings.

use std::borrow::Cow;

/// An immutable byte string with its content hash and Unicode length cached.
///
/// Strings are only built through the heap's interning entry points, so two
/// live strings never share the same content.
#[derive(Debug)]
pub struct ObjString {
    bytes: Box<[u8]>,
    hash: u32,
    utf8_length: usize,
}

impl ObjString {
    pub(crate) fn new(bytes: Vec<u8>, hash: u32) -> Self {
        let utf8_length = utf8_length(&bytes);
        Self {
            bytes: bytes.into_boxed_slice(),
            hash,
            utf8_length,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The content as text, replacing invalid UTF-8 sequences.
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length in Unicode code points.
    pub fn utf8_len(&self) -> usize {
        self.utf8_length
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

/// 32-bit FNV-1a over the raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Count code points by counting every byte that does not continue a
/// multi-byte sequence.
fn utf8_length(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| (b & 0xC0) != 0x80).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_fnv1a() {
        assert_eq!(hash_bytes(b""), 2166136261);
        assert_eq!(hash_bytes(b"a"), 0xe40c292c);
    }

    #[test]
    fn test_utf8_length() {
        let s = ObjString::new("héllo wörld".as_bytes().to_vec(), 0);
        assert_eq!(s.len(), 13);
        assert_eq!(s.utf8_len(), 11);
    }

    #[test]
    fn test_lossy_view() {
        let s = ObjString::new(vec![b'o', b'k', 0xff], 0);
        assert_eq!(s.as_str(), "ok\u{fffd}");
    }
}
