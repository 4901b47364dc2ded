use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::net::TcpStream;

/// A byte stream that a [`BufferedReader`](crate::BufferedReader) can read from.
///
/// `read` follows the usual [`Read`] rules: it may return fewer bytes than asked for, and it
/// returns `0` only when no more data will ever be available.
///
/// Streams that can seek expose that through [`as_seek`](InputStream::as_seek). The reader uses
/// it to find its initial position and bound, and to skip forward without reading. Streams that
/// cannot seek have an unlimited bound, and skipping reads and discards data instead.
pub trait InputStream: Read {
    /// Returns the seek capability of this stream, if it has one.
    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        None
    }
}

impl InputStream for &[u8] {}

impl InputStream for io::Empty {}

impl InputStream for io::Stdin {}

impl InputStream for io::StdinLock<'_> {}

impl InputStream for VecDeque<u8> {}

impl InputStream for TcpStream {}

impl InputStream for &TcpStream {}

impl InputStream for File {
    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        Some(self)
    }
}

impl<T: AsRef<[u8]>> InputStream for Cursor<T> {
    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        Some(self)
    }
}

impl<S: InputStream + ?Sized> InputStream for &mut S {
    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        (**self).as_seek()
    }
}

impl<S: InputStream + ?Sized> InputStream for Box<S> {
    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        (**self).as_seek()
    }
}

/// Adapts any `Read + Seek` type into a seekable [`InputStream`].
#[derive(Debug)]
pub struct Seekable<S>(pub S);

impl<S: Read> Read for Seekable<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<S: Read + Seek> InputStream for Seekable<S> {
    fn as_seek(&mut self) -> Option<&mut dyn Seek> {
        Some(&mut self.0)
    }
}

/// Adapts any `Read` type into an [`InputStream`] that does not seek, even if the inner type
/// could. Pipes and sockets wrapped in third-party types usually want this.
#[derive(Debug)]
pub struct Unseekable<R>(pub R);

impl<R: Read> Read for Unseekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> InputStream for Unseekable<R> {}
