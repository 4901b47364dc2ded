use core::fmt;
use std::io::Write;

use tracing::{debug, trace};

use crate::{FlushMode, Result, DEFAULT_BUFFER_SIZE};

/// Writes bytes to a stream through a fixed-size buffer.
///
/// Small writes are collected in the buffer and reach the stream in batches. Writes larger than a
/// quarter of the buffer skip it and go straight to the stream, after the buffered bytes.
///
/// Nothing is flushed when the writer is dropped. Call [`flush`](Self::flush) or
/// [`into_inner`](Self::into_inner) before discarding it.
pub struct BufferedWriter<W: Write> {
    stream: W,
    buf: Box<[u8]>,
    /// Number of bytes in `buf` that have not been written to the stream.
    len: usize,
    /// Writes longer than this bypass the buffer.
    max_buffered_write: usize,
    position: u64,
}

impl<W: Write> BufferedWriter<W> {
    /// Creates a writer with the default buffer size (4096 bytes).
    pub fn new(stream: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, stream)
    }

    /// Creates a writer with a buffer of `capacity` bytes. A capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize, stream: W) -> Self {
        let capacity = capacity.max(1);
        Self {
            stream,
            buf: vec![0; capacity].into_boxed_slice(),
            len: 0,
            max_buffered_write: (capacity / 4).max(1),
            position: 0,
        }
    }

    /// Number of bytes written through this writer so far, including bytes that are still
    /// buffered. This counts from 0 even if the stream was not at its start.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Size of the internal buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes waiting in the buffer.
    pub fn buffered_len(&self) -> usize {
        self.len
    }

    /// Accesses the stream.
    pub fn get_ref(&self) -> &W {
        &self.stream
    }

    /// Accesses the stream mutably. Writing to it directly skips over any buffered bytes.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.stream
    }

    /// Writes out the buffer and returns the stream.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush(FlushMode::Shallow)?;
        Ok(self.stream)
    }

    /// Returns `count` bytes of the buffer to be written by the caller, flushing first if they do
    /// not fit. `count` must not exceed the capacity.
    pub(crate) fn reserve(&mut self, count: usize) -> Result<&mut [u8]> {
        debug_assert!(count <= self.buf.len());

        if self.len + count > self.buf.len() {
            self.flush_buffer()?;
        }

        let start = self.len;
        self.len += count;
        self.position += count as u64;
        Ok(&mut self.buf[start..start + count])
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?[0] = value;
        Ok(())
    }

    /// Writes `data`.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if data.len() <= self.max_buffered_write {
            self.reserve(data.len())?.copy_from_slice(data);
        } else {
            self.flush_buffer()?;
            self.stream.write_all(data)?;
            debug!(bytes = data.len(), "wrote directly to stream");
            self.position += data.len() as u64;
        }
        Ok(())
    }

    /// Writes `count` zero bytes, for padding.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.write_byte(0)?;
        }
        Ok(())
    }

    /// Writes the buffered bytes to the stream. With [`FlushMode::Deep`], also flushes the stream.
    pub fn flush(&mut self, mode: FlushMode) -> Result<()> {
        self.flush_buffer()?;
        if mode == FlushMode::Deep {
            self.stream.flush()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.len > 0 {
            self.stream.write_all(&self.buf[..self.len])?;
            trace!(bytes = self.len, "flushed write buffer");
            self.len = 0;
        }
        Ok(())
    }
}

impl<W: Write + fmt::Debug> fmt::Debug for BufferedWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedWriter")
            .field("stream", &self.stream)
            .field("position", &self.position)
            .field("buffer", &format_args!("{}/{}", self.len, self.buf.len()))
            .finish()
    }
}
