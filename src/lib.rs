//! Buffered reading and writing of binary data over byte streams.
//!
//! The crate is built in layers:
//!
//! * [`BufferedReader`] and [`BufferedWriter`] wrap a byte stream with a fixed-size buffer, so
//!   that many small reads and writes turn into few calls on the stream. The reader tracks a
//!   logical position and a bound, and supports nested, bounded [`Window`]s for parsing
//!   length-prefixed substructures.
//! * [`DataReader`] and [`DataWriter`] borrow a buffered reader or writer and add typed access to
//!   fixed-width numbers (`u16` through `f64`) in a chosen [`ByteOrder`].
//!
//! ```
//! use buffered_binary_io::{BufferedReader, BufferedWriter, ByteOrder, DataReader, DataWriter, FlushMode};
//!
//! let mut output = BufferedWriter::new(Vec::new());
//! let mut w = DataWriter::new(&mut output, ByteOrder::BigEndian);
//! w.write_u32(0x12345678).unwrap();
//! output.flush(FlushMode::Deep).unwrap();
//! let bytes = output.into_inner().unwrap();
//! assert_eq!(bytes, [0x12, 0x34, 0x56, 0x78]);
//!
//! let mut input = BufferedReader::new(bytes.as_slice()).unwrap();
//! let mut r = DataReader::new(&mut input, ByteOrder::BigEndian);
//! assert_eq!(r.read_u32().unwrap(), 0x12345678);
//! ```

#![forbid(unsafe_code)]
#![forbid(unused_must_use)]
#![warn(missing_docs)]

mod data;
mod error;
mod order;
mod reader;
pub mod socket;
mod stream;
mod writer;


pub use data::{DataReader, DataWriter};
pub use error::{Error, Result};
pub use order::{ByteOrder, FlushMode, Primitive};
pub use reader::{BufferedReader, Window};
pub use stream::{InputStream, Seekable, Unseekable};
pub use writer::BufferedWriter;

/// The buffer size used by [`BufferedReader::new`] and [`BufferedWriter::new`].
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
