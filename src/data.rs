use std::io::Write;

use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::{BufferedReader, BufferedWriter, ByteOrder, Error, InputStream, Primitive, Result};

/// Reads fixed-width numbers in a given byte order from a [`BufferedReader`].
///
/// A `DataReader` only borrows the reader, so it is cheap to create one where it is needed.
/// Several `DataReader`s with different byte orders can be used on the same reader in turn.
pub struct DataReader<'a, S: InputStream> {
    input: &'a mut BufferedReader<S>,
    order: ByteOrder,
}

impl<'a, S: InputStream> DataReader<'a, S> {
    /// Constructor
    pub fn new(input: &'a mut BufferedReader<S>, order: ByteOrder) -> Self {
        Self { input, order }
    }

    /// The byte order used for multi-byte values.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Accesses the underlying reader, e.g. to open a window.
    pub fn input(&mut self) -> &mut BufferedReader<S> {
        &mut *self.input
    }

    /// Reads a single `u8` value.
    #[inline(always)]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.input.read_byte()
    }

    /// Reads a single `i8` value.
    #[inline(always)]
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.input.read_byte()? as i8)
    }

    /// Reads a single value of any [`Primitive`] type.
    pub fn read<T: Primitive>(&mut self) -> Result<T> {
        let mut raw = T::Bytes::default();

        if T::WIDTH <= self.input.capacity() {
            let region = self.input.take(T::WIDTH)?;
            if !self.order.is_native() {
                region.reverse();
            }
            raw.as_mut().copy_from_slice(region);
        } else {
            // Tiny buffers cannot hold a whole value.
            self.input.read_all(raw.as_mut())?;
            if !self.order.is_native() {
                raw.as_mut().reverse();
            }
        }

        Ok(T::from_ne(raw))
    }

    /// Reads a `u16`.
    #[inline(always)]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read()
    }

    /// Reads an `i16`.
    #[inline(always)]
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read()
    }

    /// Reads a `u32`.
    #[inline(always)]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read()
    }

    /// Reads an `i32`.
    #[inline(always)]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read()
    }

    /// Reads a `u64`.
    #[inline(always)]
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read()
    }

    /// Reads an `i64`.
    #[inline(always)]
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read()
    }

    /// Reads an `f32`.
    #[inline(always)]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read()
    }

    /// Reads an `f64`.
    #[inline(always)]
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read()
    }

    /// Fills `data` with values.
    ///
    /// In native byte order the bytes are read straight into `data`. Otherwise each element is
    /// read and converted separately, which is slower.
    pub fn read_slice<T: Primitive>(&mut self, data: &mut [T]) -> Result<()> {
        if self.order.is_native() || T::WIDTH == 1 {
            self.input.read_all(data.as_mut_bytes())
        } else {
            for value in data.iter_mut() {
                *value = self.read()?;
            }
            Ok(())
        }
    }

    /// Fills `data` with the raw bytes of plain-data values, such as `#[repr(C)]` structs.
    ///
    /// There is no rule for swapping the bytes of such types, so this fails with
    /// [`Error::UnsupportedConversion`] unless the byte order is native or `T` is a single byte.
    pub fn read_raw_slice<T: FromBytes + IntoBytes>(&mut self, data: &mut [T]) -> Result<()> {
        if self.order.is_native() || core::mem::size_of::<T>() <= 1 {
            self.input.read_all(data.as_mut_bytes())
        } else {
            Err(Error::UnsupportedConversion {
                type_name: core::any::type_name::<T>(),
            })
        }
    }

    /// Returns how many elements of `width` bytes are left before the bound.
    ///
    /// Fails with [`Error::MisalignedRegion`] if the remaining bytes are not a whole number of
    /// elements.
    pub fn remaining_count(&self, width: usize) -> Result<u64> {
        let remaining = self.input.bytes_remaining();
        if width == 0 || remaining % width as u64 != 0 {
            return Err(Error::MisalignedRegion { remaining, width });
        }
        Ok(remaining / width as u64)
    }

    /// Returns how many values of type `T` are left before the bound.
    pub fn remaining_count_of<T: Primitive>(&self) -> Result<u64> {
        self.remaining_count(T::WIDTH)
    }
}

/// Writes fixed-width numbers in a given byte order to a [`BufferedWriter`].
pub struct DataWriter<'a, W: Write> {
    output: &'a mut BufferedWriter<W>,
    order: ByteOrder,
}

impl<'a, W: Write> DataWriter<'a, W> {
    /// Constructor
    pub fn new(output: &'a mut BufferedWriter<W>, order: ByteOrder) -> Self {
        Self { output, order }
    }

    /// The byte order used for multi-byte values.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Accesses the underlying writer, e.g. to flush it.
    pub fn output(&mut self) -> &mut BufferedWriter<W> {
        &mut *self.output
    }

    /// Writes a single `u8` value.
    #[inline(always)]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.output.write_byte(value)
    }

    /// Writes a single `i8` value.
    #[inline(always)]
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.output.write_byte(value as u8)
    }

    /// Writes a single value of any [`Primitive`] type.
    pub fn write<T: Primitive>(&mut self, value: T) -> Result<()> {
        let mut raw = value.to_ne();

        if T::WIDTH <= self.output.capacity() {
            let region = self.output.reserve(T::WIDTH)?;
            region.copy_from_slice(raw.as_ref());
            if !self.order.is_native() {
                region.reverse();
            }
            Ok(())
        } else {
            if !self.order.is_native() {
                raw.as_mut().reverse();
            }
            self.output.write_bytes(raw.as_ref())
        }
    }

    /// Writes a `u16`.
    #[inline(always)]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write(value)
    }

    /// Writes an `i16`.
    #[inline(always)]
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write(value)
    }

    /// Writes a `u32`.
    #[inline(always)]
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write(value)
    }

    /// Writes an `i32`.
    #[inline(always)]
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write(value)
    }

    /// Writes a `u64`.
    #[inline(always)]
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write(value)
    }

    /// Writes an `i64`.
    #[inline(always)]
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write(value)
    }

    /// Writes an `f32`.
    #[inline(always)]
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write(value)
    }

    /// Writes an `f64`.
    #[inline(always)]
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write(value)
    }

    /// Writes all values in `data`. In native byte order this is a single byte copy.
    pub fn write_slice<T: Primitive>(&mut self, data: &[T]) -> Result<()> {
        if self.order.is_native() || T::WIDTH == 1 {
            self.output.write_bytes(data.as_bytes())
        } else {
            for &value in data {
                self.write(value)?;
            }
            Ok(())
        }
    }

    /// Writes the raw bytes of plain-data values. See [`DataReader::read_raw_slice`].
    pub fn write_raw_slice<T: IntoBytes + Immutable>(&mut self, data: &[T]) -> Result<()> {
        if self.order.is_native() || core::mem::size_of::<T>() <= 1 {
            self.output.write_bytes(data.as_bytes())
        } else {
            Err(Error::UnsupportedConversion {
                type_name: core::any::type_name::<T>(),
            })
        }
    }

    /// Writes `count` zero bytes, for padding.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        self.output.write_zeros(count)
    }
}
