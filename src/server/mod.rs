pub mod connection;
pub mod supervisor;
pub mod timer;
pub mod transport;

pub use connection::{ConnectionWorker, WorkerExit, WorkerState};
pub use supervisor::{ServerSettings, ShutdownReport, Supervisor, TimestampSettings};
pub use transport::{Received, Transport};
