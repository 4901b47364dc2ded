use core::fmt;
use core::ops::{Deref, DerefMut};
use std::io::{self, Read, SeekFrom};

use tracing::{debug, trace};

use crate::{Error, InputStream, Result, DEFAULT_BUFFER_SIZE};

/// Reads bytes from an [`InputStream`] through a fixed-size buffer.
///
/// The reader keeps a logical `position` (the number of bytes consumed, plus the stream offset
/// it started at) and a `bound`, the position past which reading is not allowed. For seekable
/// streams the bound starts at the stream length; for other streams it is unlimited.
///
/// The bound can be narrowed temporarily with [`window`](Self::window) or
/// [`read_scoped`](Self::read_scoped), which lets a parser confine itself to a length-prefixed
/// substructure. Windows nest, and each one restores the previous bound when it ends.
///
/// The stream is owned by the reader, but `S` may be a `&mut` reference when the caller wants to
/// keep ownership.
pub struct BufferedReader<S> {
    stream: S,
    buf: Box<[u8]>,
    /// Start of the valid data in `buf`. Always 0 when `buffered` is 0.
    cursor: usize,
    /// Number of valid bytes in `buf`, starting at `cursor`.
    buffered: usize,
    position: u64,
    bound: u64,
    /// Number of open windows.
    windows: usize,
}

impl<S: InputStream> BufferedReader<S> {
    /// Creates a reader with the default buffer size (4096 bytes).
    ///
    /// If the stream can seek, this queries its current offset and its length, which may fail.
    pub fn new(stream: S) -> Result<Self> {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, stream)
    }

    /// Creates a reader with a buffer of `capacity` bytes. A capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize, mut stream: S) -> Result<Self> {
        let (position, bound) = match stream.as_seek() {
            Some(seek) => {
                let position = seek.stream_position()?;
                let end = seek.seek(SeekFrom::End(0))?;
                if end != position {
                    seek.seek(SeekFrom::Start(position))?;
                }
                (position, end.max(position))
            }
            None => (0, u64::MAX),
        };

        Ok(Self {
            stream,
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            cursor: 0,
            buffered: 0,
            position,
            bound,
            windows: 0,
        })
    }

    /// The logical position: how far into the stream this reader has consumed.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The position past which reading is not allowed.
    ///
    /// This is `u64::MAX` for a stream that cannot seek, unless a window is open.
    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Number of bytes between the position and the bound.
    pub fn bytes_remaining(&self) -> u64 {
        self.bound - self.position
    }

    /// Returns `true` if the position has reached the bound.
    pub fn at_end(&self) -> bool {
        self.position == self.bound
    }

    /// Size of the internal buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Accesses the stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Accesses the stream mutably.
    ///
    /// Reading from the stream directly bypasses the buffer and the position accounting of this
    /// reader, so it is rarely correct to do so.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Extracts the stream. Any buffered data is lost.
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn shortfall(&self, requested: u64) -> Error {
        if self.windows > 0 {
            Error::BoundExceeded {
                requested,
                remaining: self.bytes_remaining(),
            }
        } else {
            Error::EndOfStream {
                position: self.position,
            }
        }
    }

    /// Fails if `count` more bytes would go past the bound.
    fn check(&self, count: u64) -> Result<u64> {
        match self.position.checked_add(count) {
            Some(p) if p <= self.bound => Ok(p),
            _ => Err(self.shortfall(count)),
        }
    }

    /// Moves the position forward by `count` bytes that have been delivered. Fails, without
    /// changing anything, if that would go past the bound. This is the only place where
    /// `position` increases.
    fn advance(&mut self, count: u64) -> Result<()> {
        self.position = self.check(count)?;
        Ok(())
    }

    fn consume(&mut self, count: usize) {
        self.buffered -= count;
        self.cursor = if self.buffered == 0 {
            0
        } else {
            self.cursor + count
        };
    }

    /// Makes sure at least `count` bytes are buffered, reading from the stream as needed.
    /// Bytes read before a failure stay buffered and the position does not move.
    fn fill(&mut self, count: usize) -> Result<()> {
        debug_assert!(count <= self.buf.len());

        if self.buffered >= count {
            return Ok(());
        }

        if self.cursor + count > self.buf.len() {
            self.buf
                .copy_within(self.cursor..self.cursor + self.buffered, 0);
            trace!(moved = self.buffered, "compacted read buffer");
            self.cursor = 0;
        }

        while self.buffered < count {
            let start = self.cursor + self.buffered;
            let n = read_retrying(&mut self.stream, &mut self.buf[start..])?;
            if n == 0 {
                return Err(Error::EndOfStream {
                    position: self.position + self.buffered as u64,
                });
            }
            trace!(bytes = n, "refilled read buffer");
            self.buffered += n;
        }

        Ok(())
    }

    /// Consumes `count` bytes and returns them as a region of the internal buffer. `count` must
    /// not exceed the capacity.
    pub(crate) fn take(&mut self, count: usize) -> Result<&mut [u8]> {
        self.check(count as u64)?;
        self.fill(count)?;
        self.advance(count as u64)?;
        let start = self.cursor;
        self.consume(count);
        Ok(&mut self.buf[start..start + count])
    }

    /// Reads a single byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads up to `dest.len()` bytes and returns how many were read.
    ///
    /// This calls the stream at most once, so it may return fewer bytes than asked for even if
    /// more would be available later. It returns 0 only when `dest` is empty, when the bound has
    /// been reached, or when the stream has ended.
    pub fn read_some(&mut self, dest: &mut [u8]) -> Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }

        let remaining = self.bytes_remaining();

        let available = (self.buffered as u64).min(remaining) as usize;
        if available > 0 {
            let n = available.min(dest.len());
            dest[..n].copy_from_slice(self.take(n)?);
            return Ok(n);
        }

        // The buffer is empty from here on.
        let max = remaining.min(dest.len() as u64) as usize;
        if max == 0 {
            return Ok(0);
        }

        if max >= self.buf.len() {
            let n = read_retrying(&mut self.stream, &mut dest[..max])?;
            self.advance(n as u64)?;
            Ok(n)
        } else {
            let n = read_retrying(&mut self.stream, &mut self.buf[..])?;
            if n == 0 {
                return Ok(0);
            }
            trace!(bytes = n, "refilled read buffer");
            self.buffered = n;
            let n = n.min(max);
            dest[..n].copy_from_slice(self.take(n)?);
            Ok(n)
        }
    }

    /// Fills `dest` completely.
    ///
    /// Fails if the bound or the end of the stream is reached first. In that case some bytes may
    /// already have been consumed.
    pub fn read_all(&mut self, mut dest: &mut [u8]) -> Result<()> {
        let needed = dest.len() as u64;
        if needed > self.bytes_remaining() {
            return Err(self.shortfall(needed));
        }

        while !dest.is_empty() {
            let n = self.read_some(dest)?;
            if n == 0 {
                return Err(Error::EndOfStream {
                    position: self.position,
                });
            }
            let rest = dest;
            dest = &mut rest[n..];
        }

        Ok(())
    }

    /// Reads `count` bytes into a new vector.
    ///
    /// Lengths larger than the buffer are read a buffer at a time, so the vector only grows as
    /// fast as data arrives. A bogus length on an unbounded stream fails with
    /// [`Error::EndOfStream`] instead of trying to allocate it up front.
    pub fn read_bytes(&mut self, count: u64) -> Result<Vec<u8>> {
        self.check(count)?;

        let cap = self.buf.len();
        if count <= cap as u64 {
            let mut bytes = vec![0; count as usize];
            self.read_all(&mut bytes)?;
            return Ok(bytes);
        }

        let mut bytes = Vec::with_capacity(cap);
        let mut chunk = vec![0; cap];
        let mut left = count;
        while left > 0 {
            let want = left.min(cap as u64) as usize;
            let n = self.read_some(&mut chunk[..want])?;
            if n == 0 {
                return Err(Error::EndOfStream {
                    position: self.position,
                });
            }
            bytes.extend_from_slice(&chunk[..n]);
            left -= n as u64;
        }
        Ok(bytes)
    }

    /// Reads a string of `count` bytes. The bytes are not required to be UTF-8.
    #[cfg(feature = "bstr")]
    pub fn read_bstring(&mut self, count: u64) -> Result<bstr::BString> {
        Ok(bstr::BString::from(self.read_bytes(count)?))
    }

    /// Reads everything up to the bound, or up to the end of the stream when the bound is
    /// unlimited.
    pub fn read_remaining_bytes(&mut self) -> Result<Vec<u8>> {
        if self.bound != u64::MAX {
            return self.read_bytes(self.bytes_remaining());
        }

        let mut bytes = Vec::new();
        let mut chunk = vec![0; self.buf.len()];
        loop {
            let n = self.read_some(&mut chunk)?;
            if n == 0 {
                return Ok(bytes);
            }
            bytes.extend_from_slice(&chunk[..n]);
        }
    }

    /// Advances the position by `count` bytes without copying them anywhere.
    ///
    /// Buffered bytes are used up first. The rest is skipped by seeking if the stream can seek,
    /// and otherwise by reading and discarding it.
    ///
    /// If the stream ends first, the position counts the bytes that were actually skipped.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.check(count)?;

        let from_buffer = (self.buffered as u64).min(count) as usize;
        self.advance(from_buffer as u64)?;
        self.consume(from_buffer);

        let mut rest = count - from_buffer as u64;
        if rest == 0 {
            return Ok(());
        }

        if let Some(seek) = self.stream.as_seek() {
            let offset = i64::try_from(rest)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "skip is too large"))?;
            seek.seek(SeekFrom::Current(offset))?;
            debug!(bytes = rest, "skipped by seeking");
            return self.advance(rest);
        }

        while rest > 0 {
            let n = rest.min(self.buf.len() as u64) as usize;
            let read = read_retrying(&mut self.stream, &mut self.buf[..n])?;
            if read == 0 {
                return Err(Error::EndOfStream {
                    position: self.position,
                });
            }
            self.advance(read as u64)?;
            rest -= read as u64;
        }

        Ok(())
    }

    /// Skips everything up to the bound, or up to the end of the stream when the bound is
    /// unlimited.
    pub fn skip_remaining(&mut self) -> Result<()> {
        if self.bound != u64::MAX {
            return self.skip(self.bytes_remaining());
        }

        let buffered = self.buffered;
        self.advance(buffered as u64)?;
        self.consume(buffered);
        loop {
            let n = read_retrying(&mut self.stream, &mut self.buf[..])?;
            if n == 0 {
                return Ok(());
            }
            self.advance(n as u64)?;
        }
    }

    /// Narrows the bound to the next `length` bytes until the returned guard is dropped.
    ///
    /// The guard dereferences to this reader, so all reads go through it. Dropping the guard
    /// restores the previous bound, whether or not the window was read completely; call
    /// [`Window::finish`] to also check that it was.
    ///
    /// Fails with [`Error::BoundExceeded`] if the window would extend past the current bound.
    pub fn window(&mut self, length: u64) -> Result<Window<'_, S>> {
        let end = match self.position.checked_add(length) {
            Some(end) if end <= self.bound => end,
            _ => {
                return Err(Error::BoundExceeded {
                    requested: length,
                    remaining: self.bytes_remaining(),
                })
            }
        };

        trace!(position = self.position, length, "opened window");
        let saved_bound = core::mem::replace(&mut self.bound, end);
        self.windows += 1;
        Ok(Window {
            start: self.position,
            length,
            saved_bound,
            reader: self,
        })
    }

    /// Runs `action` with the bound narrowed to the next `length` bytes, and checks that the
    /// action consumed exactly `length` bytes.
    ///
    /// If the action fails, its error is returned as-is. Otherwise, if it consumed fewer or more
    /// bytes than declared, this returns [`Error::ScopeConsumptionMismatch`]. The previous bound
    /// is restored in every case.
    ///
    /// ```
    /// use buffered_binary_io::{BufferedReader, Error};
    ///
    /// // A 2-byte length prefix followed by that many bytes, then a trailer.
    /// let data = [0, 3, b'a', b'b', b'c', 0xff];
    /// let mut r = BufferedReader::new(&data[..]).unwrap();
    /// let len = u64::from(u16::from_be_bytes([r.read_byte()?, r.read_byte()?]));
    /// let body = r.read_scoped(len, |r| r.read_bytes(3))?;
    /// assert_eq!(body, b"abc");
    /// assert_eq!(r.read_byte()?, 0xff);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn read_scoped<T, E, F>(&mut self, length: u64, action: F) -> core::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> core::result::Result<T, E>,
        E: From<Error>,
    {
        let mut window = self.window(length)?;
        let value = action(&mut *window)?;
        window.finish()?;
        Ok(value)
    }
}

impl BufferedReader<io::Empty> {
    /// Creates a reader over bytes that are already in memory. The vector becomes the buffer, so
    /// no copying takes place, and the bound is the length of the data.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            stream: io::empty(),
            buf: data.into_boxed_slice(),
            cursor: 0,
            buffered: len,
            position: 0,
            bound: len as u64,
            windows: 0,
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for BufferedReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedReader")
            .field("stream", &self.stream)
            .field("position", &self.position)
            .field("bound", &self.bound)
            .field(
                "buffer",
                &format_args!("{}/{}", self.buffered, self.buf.len()),
            )
            .finish()
    }
}

/// Calls `read` once, retrying only if it was interrupted.
fn read_retrying<S: Read + ?Sized>(stream: &mut S, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// A narrowed bound on a [`BufferedReader`], created by [`BufferedReader::window`].
///
/// Dereferences to the reader. The previous bound is restored when this is dropped.
pub struct Window<'a, S: InputStream> {
    reader: &'a mut BufferedReader<S>,
    start: u64,
    length: u64,
    saved_bound: u64,
}

impl<S: InputStream> Window<'_, S> {
    /// The length the window was opened with.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Returns `true` if the window was opened with a length of 0.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Closes the window, checking that exactly its length was consumed.
    pub fn finish(self) -> Result<()> {
        let consumed = self.reader.position - self.start;
        if consumed != self.length {
            debug!(
                declared = self.length,
                consumed, "window was not consumed exactly"
            );
            return Err(Error::ScopeConsumptionMismatch {
                declared: self.length,
                consumed,
            });
        }
        Ok(())
    }
}

impl<S: InputStream> Deref for Window<'_, S> {
    type Target = BufferedReader<S>;

    fn deref(&self) -> &Self::Target {
        self.reader
    }
}

impl<S: InputStream> DerefMut for Window<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reader
    }
}

impl<S: InputStream> Drop for Window<'_, S> {
    fn drop(&mut self) {
        self.reader.bound = self.saved_bound;
        self.reader.windows -= 1;
        trace!(position = self.reader.position, "closed window");
    }
}
