use std::io;
use thiserror::Error;

/// Errors raised by the ring log and everything layered on top of it.
#[derive(Debug, Error)]
pub enum LogError {
    /// Malformed seek target or a record that violates the entry contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Flat offset past the live data. Readers see this as end-of-file.
    #[error("offset {offset} is beyond the {total} live bytes")]
    OutOfRange { offset: usize, total: usize },

    #[error("could not allocate {requested} bytes of entry storage")]
    ResourceExhausted { requested: usize },

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// Reserved for interruptible lock acquisition. A poisoned `std` mutex
    /// is recovered by `SharedLog` and never reported as this.
    #[error("log lock could not be acquired")]
    LockAcquisitionFailed,
}

impl LogError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        LogError::InvalidArgument(msg.into())
    }

    /// The caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LogError::LockAcquisitionFailed)
    }
}

impl From<LogError> for io::Error {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Transport(e) => e,
            LogError::InvalidArgument(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            LogError::OutOfRange { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            LogError::ResourceExhausted { .. } => io::Error::new(io::ErrorKind::OutOfMemory, err),
            LogError::LockAcquisitionFailed => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lock_failures_are_retryable() {
        assert!(LogError::LockAcquisitionFailed.is_retryable());
        assert!(!LogError::invalid("x").is_retryable());
        assert!(!LogError::ResourceExhausted { requested: 8 }.is_retryable());
    }

    #[test]
    fn io_conversion_keeps_kind() {
        let e: io::Error = LogError::invalid("bad seek").into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);

        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let e: io::Error = LogError::Transport(inner).into();
        assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
    }
}
