use crate::error::LogError;

/// One committed record. Immutable once built; storage is released when the
/// owning ring slot drops it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    bytes: Vec<u8>,
}

impl Entry {
    /// Takes ownership of an already-allocated record.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copies `bytes` into freshly reserved storage.
    pub fn copy_from(bytes: &[u8]) -> Result<Self, LogError> {
        let mut v = Vec::new();
        v.try_reserve_exact(bytes.len())
            .map_err(|_| LogError::ResourceExhausted { requested: bytes.len() })?;
        v.extend_from_slice(bytes);
        Ok(Self { bytes: v })
    }

    pub fn len(&self) -> usize { self.bytes.len() }
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }
    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    pub fn into_bytes(self) -> Vec<u8> { self.bytes }
}

impl AsRef<[u8]> for Entry {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
