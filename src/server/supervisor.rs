use crate::error::LogError;
use crate::shared_log::SharedLog;
use crate::util::CancelToken;
use log::{debug, error, info, warn};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::connection::{ConnectionWorker, WorkerExit, DEFAULT_RECV_BUFFER_SIZE};
use super::timer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampSettings {
    pub interval: Duration,
    pub format:   String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// How often the accept loop and idle workers recheck for shutdown.
    pub poll_interval:    Duration,
    /// How long workers get to reach a cancellation point before their
    /// sockets are shut down under them.
    pub shutdown_grace:   Duration,
    pub recv_buffer_size: usize,
    pub seek_commands:    bool,
    pub timestamps:       Option<TimestampSettings>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            poll_interval:    Duration::from_millis(100),
            shutdown_grace:   Duration::from_secs(2),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            seek_commands:    true,
            timestamps:       Some(TimestampSettings {
                interval: timer::DEFAULT_INTERVAL,
                format:   timer::DEFAULT_FORMAT.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    pub accepted:         u64,
    /// Finished workers joined by the accept loop before shutdown began.
    pub reaped:           usize,
    pub force_closed:     usize,
    pub released_entries: usize,
}

struct WorkerHandle {
    peer:    SocketAddr,
    /// Second handle on the worker's socket, used only to force-close it.
    control: TcpStream,
    thread:  JoinHandle<()>,
}

/// Owns the listening socket and every connection worker.
pub struct Supervisor {
    listener: TcpListener,
    log:      Arc<SharedLog>,
    settings: ServerSettings,
    cancel:   CancelToken,
    workers:  Vec<WorkerHandle>,
    accepted: u64,
    reaped:   usize,
}

impl Supervisor {
    pub fn bind(addr: impl ToSocketAddrs, log: Arc<SharedLog>, settings: ServerSettings) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            log,
            settings,
            cancel:   CancelToken::new(),
            workers:  Vec::new(),
            accepted: 0,
            reaped:   0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown_requested` returns true, then
    /// tears everything down.
    pub fn run<F: Fn() -> bool>(mut self, shutdown_requested: F) -> Result<ShutdownReport, LogError> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("listening on {}", addr);
        }
        let timer = match &self.settings.timestamps {
            Some(ts) => Some(timer::spawn(
                Arc::clone(&self.log),
                ts.interval,
                ts.format.clone(),
                self.cancel.clone(),
                self.settings.poll_interval,
            )?),
            None => None,
        };

        while !shutdown_requested() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    self.reaped += self.reap_finished();
                    info!("Accepted connection from {}", peer.ip());
                    if let Err(e) = self.spawn_worker(stream, peer) {
                        error!("could not start worker for {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.settings.poll_interval);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("accept failed: {}", e);
                    thread::sleep(self.settings.poll_interval);
                }
            }
        }

        self.shutdown(timer)
    }

    fn spawn_worker(&mut self, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.settings.poll_interval))?;
        let control = stream.try_clone()?;

        let worker = ConnectionWorker::new(stream, Arc::clone(&self.log), self.cancel.clone(), peer.to_string())
            .with_recv_buffer_size(self.settings.recv_buffer_size)
            .with_seek_commands(self.settings.seek_commands);

        let thread = thread::Builder::new()
            .name(format!("conn-{}", peer))
            .spawn(move || {
                match worker.run() {
                    Ok(WorkerExit::EndOfStream) => {}
                    Ok(WorkerExit::Cancelled)   => debug!("worker for {} cancelled", peer),
                    Err(e) => warn!("connection {} aborted: {}", peer, e),
                }
                info!("Closed connection from {}", peer.ip());
            })?;

        self.accepted += 1;
        self.workers.push(WorkerHandle { peer, control, thread });
        Ok(())
    }

    /// Joins workers that have already exited so the registry stays bounded.
    /// Returns how many were removed.
    fn reap_finished(&mut self) -> usize {
        let (done, live): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.workers).into_iter().partition(|w| w.thread.is_finished());
        let count = done.len();
        for w in done {
            join_worker(w);
        }
        self.workers = live;
        count
    }

    fn shutdown(mut self, timer: Option<JoinHandle<()>>) -> Result<ShutdownReport, LogError> {
        self.reap_finished();
        info!("shutting down, {} connection(s) still open", self.workers.len());
        self.cancel.cancel();

        let deadline = Instant::now() + self.settings.shutdown_grace;
        while self.workers.iter().any(|w| !w.thread.is_finished()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        let mut force_closed = 0;
        for w in &self.workers {
            if !w.thread.is_finished() {
                warn!("force-closing connection from {}", w.peer);
                let _ = w.control.shutdown(Shutdown::Both);
                force_closed += 1;
            }
        }
        for w in self.workers.drain(..) {
            join_worker(w);
        }
        if let Some(t) = timer {
            if t.join().is_err() {
                error!("timestamp task panicked");
            }
        }

        let stats = self.log.stats()?;
        info!(
            "log held {} entries ({} bytes); {} appended, {} evicted over its lifetime",
            stats.entries, stats.live_bytes, stats.appended, stats.evicted
        );
        let released_entries = self.log.reset()?;

        Ok(ShutdownReport { accepted: self.accepted, reaped: self.reaped, force_closed, released_entries })
    }
}

fn join_worker(w: WorkerHandle) {
    if w.thread.join().is_err() {
        error!("worker for {} panicked", w.peer);
    }
}
