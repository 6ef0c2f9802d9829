pub mod entry;
pub mod seek;

pub use entry::Entry;
pub use seek::SeekTo;
