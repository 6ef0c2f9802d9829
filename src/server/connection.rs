//! Per-connection state machine.
//!
//! `Accumulating → Committing → Draining → Accumulating …` until the peer
//! hangs up, the transport fails, or the supervisor cancels. All ring
//! mutation happens inside `SharedLog::append_line`, so an aborted worker
//! cannot leave the log half-written.

use crate::device::DeviceFile;
use crate::error::LogError;
use crate::models::seek::{self, SeekTo};
use crate::shared_log::SharedLog;
use crate::util::{CancelToken, PendingWrite};
use log::{debug, info, warn};
use std::sync::Arc;

use super::transport::{Received, Transport};

pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Accumulating,
    Committing,
    Draining,
    Closed,
}

/// Why a worker stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    EndOfStream,
    Cancelled,
}

pub struct ConnectionWorker<T> {
    transport:     T,
    log:           Arc<SharedLog>,
    cancel:        CancelToken,
    pending:       PendingWrite,
    state:         WorkerState,
    peer:          String,
    recv_buf_size: usize,
    seek_commands: bool,
}

impl<T: Transport> ConnectionWorker<T> {
    pub fn new(transport: T, log: Arc<SharedLog>, cancel: CancelToken, peer: impl Into<String>) -> Self {
        Self {
            transport,
            log,
            cancel,
            pending:       PendingWrite::new(),
            state:         WorkerState::Accumulating,
            peer:          peer.into(),
            recv_buf_size: DEFAULT_RECV_BUFFER_SIZE,
            seek_commands: true,
        }
    }

    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buf_size = size.max(1);
        self
    }

    /// When enabled, `AESDCHAR_IOCSEEKTO:X,Y` lines are executed instead of
    /// being appended.
    pub fn with_seek_commands(mut self, enabled: bool) -> Self {
        self.seek_commands = enabled;
        self
    }

    /// Serves the connection to completion and closes the transport.
    pub fn run(mut self) -> Result<WorkerExit, LogError> {
        let result = self.serve();
        if let Err(e) = &result {
            debug!("{} failed while {:?}: {}", self.peer, self.state, e);
        }
        self.close();
        result
    }

    fn serve(&mut self) -> Result<WorkerExit, LogError> {
        let mut buf = vec![0u8; self.recv_buf_size];
        loop {
            self.state = WorkerState::Accumulating;
            if self.cancel.is_cancelled() {
                return Ok(WorkerExit::Cancelled);
            }
            let n = match self.transport.receive(&mut buf)? {
                Received::Data(n)    => n,
                Received::Idle       => continue,
                Received::EndOfStream => return Ok(WorkerExit::EndOfStream),
            };
            for record in self.pending.feed(&buf[..n])? {
                if self.cancel.is_cancelled() {
                    return Ok(WorkerExit::Cancelled);
                }
                self.handle_record(record)?;
            }
        }
    }

    fn handle_record(&mut self, record: Vec<u8>) -> Result<(), LogError> {
        if self.seek_commands {
            match seek::parse_command(&record) {
                Some(Ok(target)) => return self.stream_from(target),
                Some(Err(e))     => return self.reject(&e),
                None             => {}
            }
        }

        self.state = WorkerState::Committing;
        self.log.append_line(record)?;

        self.state = WorkerState::Draining;
        let snapshot = self.log.read_all()?;
        self.transport.send_all(&snapshot)?;
        Ok(())
    }

    /// Sends the log from the seek target to the end of the live data.
    fn stream_from(&mut self, target: SeekTo) -> Result<(), LogError> {
        let mut file = DeviceFile::open(Arc::clone(&self.log));
        match file.ioctl_seek(target) {
            Ok(_) => {}
            Err(e @ LogError::InvalidArgument(_)) => return self.reject(&e),
            Err(e) => return Err(e),
        }
        self.state = WorkerState::Draining;
        loop {
            let chunk = file.read_bytes(self.recv_buf_size)?;
            if chunk.is_empty() {
                return Ok(());
            }
            self.transport.send_all(&chunk)?;
        }
    }

    fn reject(&mut self, err: &LogError) -> Result<(), LogError> {
        warn!("rejecting command from {}: {}", self.peer, err);
        let msg = format!("ERROR: {}\n", err);
        self.transport.send_all(msg.as_bytes())?;
        Ok(())
    }

    fn close(&mut self) {
        let dropped = self.pending.discard();
        if dropped > 0 {
            info!("{} disconnected mid-line, discarded {} unterminated bytes", self.peer, dropped);
        }
        self.state = WorkerState::Closed;
    }
}
