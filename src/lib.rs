//! Bounded ring log of newline-terminated records, addressable as one flat
//! byte stream, plus the threaded TCP server that feeds and drains it.

pub mod config;
pub mod device;
pub mod error;
pub mod models;
pub mod server;
pub mod shared_log;
pub mod util;

pub use error::LogError;
pub use shared_log::{LogStats, SharedLog};
