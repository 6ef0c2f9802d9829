use std::io::{self, Read, Write};
use std::net::TcpStream;

/// Outcome of one receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Data(usize),
    /// Nothing arrived before the poll tick; the peer is still connected.
    Idle,
    EndOfStream,
}

/// Byte pipe a connection worker talks through.
pub trait Transport {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<Received>;
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Repeats `send` until every byte has gone out.
    fn send_all(&mut self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            match self.send(bytes) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "peer accepted no bytes")),
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl Transport for TcpStream {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<Received> {
        match self.read(buf) {
            Ok(0) => Ok(Received::EndOfStream),
            Ok(n) => Ok(Received::Data(n)),
            Err(e) if matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ) => Ok(Received::Idle),
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.write(bytes)
    }
}
