use crate::error::LogError;

/// Bytes of a record whose terminating newline has not arrived yet.
///
/// Owned by exactly one writer, so it needs no locking.
#[derive(Debug, Default)]
pub struct PendingWrite {
    buf: Vec<u8>,
}

impl PendingWrite {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.buf.len() }
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    /// Appends `chunk` and returns every record it completed, in arrival
    /// order. Each record keeps its trailing newline. Bytes after the last
    /// newline stay pending.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, LogError> {
        let mut records = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos + 1);
            self.extend(line)?;
            records.push(std::mem::take(&mut self.buf));
            rest = tail;
        }
        if !rest.is_empty() {
            self.extend(rest)?;
        }
        Ok(records)
    }

    /// Throws away the unterminated tail. Returns how many bytes were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buf.len();
        self.buf = Vec::new();
        dropped
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), LogError> {
        self.buf.try_reserve(bytes.len()).map_err(|_| LogError::ResourceExhausted {
            requested: self.buf.len() + bytes.len(),
        })?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}
