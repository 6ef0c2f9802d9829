pub mod cancel;
pub mod line_buffer;
pub mod ring_buffer;
pub mod signal;

pub use cancel::CancelToken;
pub use line_buffer::PendingWrite;
pub use ring_buffer::RingLog;
