use zerocopy::{FromBytes, Immutable, IntoBytes};

/// The order in which the bytes of a multi-byte number are stored in a stream.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ByteOrder {
    /// Least significant byte first.
    LittleEndian,
    /// Most significant byte first.
    BigEndian,
}

impl ByteOrder {
    /// The byte order of the machine this code is running on.
    #[cfg(target_endian = "little")]
    pub const NATIVE: ByteOrder = ByteOrder::LittleEndian;

    /// The byte order of the machine this code is running on.
    #[cfg(target_endian = "big")]
    pub const NATIVE: ByteOrder = ByteOrder::BigEndian;

    /// Returns `true` if values in this order can be used without swapping bytes.
    #[inline(always)]
    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }
}

/// Controls how far [`BufferedWriter::flush`](crate::BufferedWriter::flush) pushes data.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FlushMode {
    /// Write the buffered bytes to the underlying stream.
    Shallow,
    /// Write the buffered bytes, then flush the underlying stream itself, so that the data
    /// reaches its final destination.
    Deep,
}

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width number that the data codecs know how to read and write.
///
/// This is implemented for `u8`, `i8`, `u16`, `i16`, `u32`, `i32`, `u64`, `i64`, `f32` and `f64`,
/// and cannot be implemented outside this crate.
pub trait Primitive: Copy + FromBytes + IntoBytes + Immutable + sealed::Sealed {
    /// Size of the value in bytes.
    const WIDTH: usize;

    /// Native-order byte representation, `[u8; WIDTH]`.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    /// Builds a value from its native-order bytes.
    fn from_ne(bytes: Self::Bytes) -> Self;

    /// Returns the native-order bytes of the value.
    fn to_ne(self) -> Self::Bytes;
}

macro_rules! primitive {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Primitive for $t {
                const WIDTH: usize = core::mem::size_of::<$t>();

                type Bytes = [u8; core::mem::size_of::<$t>()];

                #[inline(always)]
                fn from_ne(bytes: Self::Bytes) -> Self {
                    <$t>::from_ne_bytes(bytes)
                }

                #[inline(always)]
                fn to_ne(self) -> Self::Bytes {
                    self.to_ne_bytes()
                }
            }
        )*
    };
}

// f32 and f64 go through their IEEE-754 bit patterns.
primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
