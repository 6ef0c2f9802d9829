//! File-like access to the shared log: a position per open handle, byte
//! reads that advance it, line-buffered writes, and seek by flat offset or
//! by `(command, offset)`.

use crate::error::LogError;
use crate::models::SeekTo;
use crate::shared_log::SharedLog;
use crate::util::PendingWrite;
use log::debug;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

pub struct DeviceFile {
    log:     Arc<SharedLog>,
    pos:     u64,
    pending: PendingWrite,
}

impl DeviceFile {
    pub fn open(log: Arc<SharedLog>) -> Self {
        Self { log, pos: 0, pending: PendingWrite::new() }
    }

    pub fn position(&self) -> u64 { self.pos }

    /// Reads at most `count` bytes from the current position. Never spans
    /// two entries; empty means end of data.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, LogError> {
        let offset = usize::try_from(self.pos)
            .map_err(|_| LogError::invalid(format!("position {} does not fit in memory", self.pos)))?;
        let bytes = self.log.read_at(offset, count)?;
        self.pos += bytes.len() as u64;
        Ok(bytes)
    }

    /// Buffers `data` and commits each newline-terminated record it
    /// completes. The whole slice is always accepted.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize, LogError> {
        for record in self.pending.feed(data)? {
            self.log.append_line(record)?;
        }
        Ok(data.len())
    }

    /// Moves the position. The target must lie within the live data.
    pub fn seek_to(&mut self, target: SeekFrom) -> Result<u64, LogError> {
        let total = self.log.total_live_bytes()? as u64;
        let new_pos = match target {
            SeekFrom::Start(n)   => Some(n),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
            SeekFrom::End(d)     => total.checked_add_signed(d),
        };
        match new_pos {
            Some(p) if p <= total => {
                self.pos = p;
                Ok(p)
            }
            _ => Err(LogError::invalid(format!("seek {:?} outside 0..={}", target, total))),
        }
    }

    /// Positions the handle at `write_cmd_offset` bytes into the
    /// `write_cmd`-th live entry.
    pub fn ioctl_seek(&mut self, seek: SeekTo) -> Result<u64, LogError> {
        let flat = self.log.seek_to_entry(seek.write_cmd as usize, seek.write_cmd_offset as usize)?;
        self.pos = flat as u64;
        Ok(self.pos)
    }
}

impl Drop for DeviceFile {
    fn drop(&mut self) {
        let dropped = self.pending.discard();
        if dropped > 0 {
            debug!("device handle closed with {} unterminated bytes, discarded", dropped);
        }
    }
}

impl Read for DeviceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.read_bytes(buf.len())?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }
}

impl Write for DeviceFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for DeviceFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }
}
