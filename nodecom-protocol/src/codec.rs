//! Binary encoding contract
//!
//! Two kinds of types can travel over a Nodecom link:
//!
//! - **Scalars** (the arithmetic primitives): encoded as their raw
//!   little-endian bytes, exactly `size_of::<T>()` long. Decoding performs no
//!   validation; any byte sequence of the right length is a valid value.
//! - **Self-describing types**: implement [`Encode`]/[`Decode`] themselves,
//!   usually with [`Writer`]/[`Reader`] and 32-bit length prefixes.
//!
//! The kind is fixed at compile time through [`Encode::FORM`]; calling the
//! codec on a type that implements neither trait does not compile.

use heapless::{String, Vec};

/// Errors that can occur while encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Output buffer cannot hold the encoded value
    BufferTooSmall,
    /// Input ended before the value was complete
    UnexpectedEnd,
    /// Decoded string or byte field exceeds the destination capacity
    CapacityExceeded,
    /// Decoded string is not valid UTF-8
    InvalidUtf8,
    /// Field length does not fit its 32-bit length prefix
    LengthOverflow,
}

/// Wire size class of an encodable type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireForm {
    /// Always exactly this many bytes (scalars)
    Fixed(usize),
    /// Length depends on the value (self-describing types)
    Variable,
}

impl WireForm {
    /// Fixed size in bytes, if any
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            WireForm::Fixed(size) => Some(size),
            WireForm::Variable => None,
        }
    }
}

/// Types that can be written to the wire
pub trait Encode {
    /// Size class of this type's encoding
    const FORM: WireForm;

    /// Exact number of bytes [`encode`](Encode::encode) will write
    fn encoded_len(&self) -> usize;

    /// Encode into `out`
    ///
    /// Returns the number of bytes written.
    fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError>;

    /// Encode into a fixed-capacity vector
    fn encode_to_vec<const N: usize>(&self) -> Result<Vec<u8, N>, CodecError> {
        let mut out = Vec::new();
        out.resize_default(self.encoded_len())
            .map_err(|_| CodecError::BufferTooSmall)?;
        let len = self.encode(&mut out)?;
        out.truncate(len);
        Ok(out)
    }
}

/// Types that can be read back from the wire
pub trait Decode: Sized {
    /// Decode a value from the start of `input`
    ///
    /// Trailing bytes beyond the value are ignored.
    fn decode(input: &[u8]) -> Result<Self, CodecError>;
}

/// Arithmetic types with a fixed raw-byte encoding
///
/// Implementations always report `FORM == WireForm::Fixed(SIZE)`.
pub trait Scalar: Encode + Decode + Copy {
    /// Encoded size in bytes
    const SIZE: usize;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Encode for $ty {
                const FORM: WireForm = WireForm::Fixed(core::mem::size_of::<$ty>());

                fn encoded_len(&self) -> usize {
                    core::mem::size_of::<$ty>()
                }

                fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
                    let bytes = self.to_le_bytes();
                    out.get_mut(..bytes.len())
                        .ok_or(CodecError::BufferTooSmall)?
                        .copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
            }

            impl Decode for $ty {
                fn decode(input: &[u8]) -> Result<Self, CodecError> {
                    let src = input
                        .get(..core::mem::size_of::<$ty>())
                        .ok_or(CodecError::UnexpectedEnd)?;
                    let mut bytes = [0u8; core::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(src);
                    Ok(<$ty>::from_le_bytes(bytes))
                }
            }

            impl Scalar for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Encode for bool {
    const FORM: WireForm = WireForm::Fixed(1);

    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        (*self as u8).encode(out)
    }
}

impl Decode for bool {
    fn decode(input: &[u8]) -> Result<Self, CodecError> {
        u8::decode(input).map(|byte| byte != 0)
    }
}

impl Scalar for bool {
    const SIZE: usize = 1;
}

/// Cursor that appends encoded fields to a byte buffer
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    /// Create a writer at the start of `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Append a scalar
    pub fn put<T: Scalar>(&mut self, value: T) -> Result<(), CodecError> {
        let tail = self.buf.get_mut(self.pos..).ok_or(CodecError::BufferTooSmall)?;
        self.pos += value.encode(tail)?;
        Ok(())
    }

    /// Append raw bytes with no prefix
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let end = self.pos + bytes.len();
        self.buf
            .get_mut(self.pos..end)
            .ok_or(CodecError::BufferTooSmall)?
            .copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Append a 32-bit length prefix followed by the bytes of `s`
    pub fn put_str(&mut self, s: &str) -> Result<(), CodecError> {
        let len = u32::try_from(s.len()).map_err(|_| CodecError::LengthOverflow)?;
        self.put(len)?;
        self.put_bytes(s.as_bytes())
    }

    /// Finish writing, returning the number of bytes written
    pub fn finish(self) -> usize {
        self.pos
    }
}

/// Cursor that consumes encoded fields from a byte slice
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader at the start of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to consume
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consume a scalar
    pub fn get<T: Scalar>(&mut self) -> Result<T, CodecError> {
        let value = T::decode(&self.buf[self.pos..])?;
        self.pos += T::SIZE;
        Ok(value)
    }

    /// Consume exactly `len` raw bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEnd)?;
        let bytes = self.buf.get(self.pos..end).ok_or(CodecError::UnexpectedEnd)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Consume a fixed-size byte array
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Consume a 32-bit length prefix and the string that follows
    pub fn get_str<const N: usize>(&mut self) -> Result<String<N>, CodecError> {
        let len = self.get::<u32>()? as usize;
        let bytes = self.take(len)?;
        let s = core::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        let mut out = String::new();
        out.push_str(s).map_err(|_| CodecError::CapacityExceeded)?;
        Ok(out)
    }
}

/// Encoded size of a 32-bit length-prefixed string
pub const fn prefixed_len(s: &str) -> usize {
    core::mem::size_of::<u32>() + s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scalar_is_little_endian() {
        let mut buf = [0u8; 4];
        assert_eq!(0x1234_5678u32.encode(&mut buf), Ok(4));
        assert_eq!(buf, [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(u32::decode(&buf), Ok(0x1234_5678));
    }

    #[test]
    fn test_scalar_sizes() {
        assert_eq!(u16::SIZE, 2);
        assert_eq!(i32::SIZE, 4);
        assert_eq!(f64::SIZE, 8);
        assert_eq!(<u32 as Encode>::FORM, WireForm::Fixed(4));
        assert_eq!(<bool as Encode>::FORM.fixed_size(), Some(1));
    }

    #[test]
    fn test_scalar_decode_ignores_trailing_bytes() {
        assert_eq!(u16::decode(&[0x01, 0x02, 0xFF, 0xFF]), Ok(0x0201));
    }

    #[test]
    fn test_scalar_decode_short_input() {
        assert_eq!(u32::decode(&[1, 2, 3]), Err(CodecError::UnexpectedEnd));
    }

    #[test]
    fn test_every_width_decodes_from_prefix() {
        let input = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xFF];
        assert_eq!(u8::decode(&input), Ok(0x01));
        assert_eq!(i8::decode(&input), Ok(0x01));
        assert_eq!(u16::decode(&input), Ok(0x0201));
        assert_eq!(i16::decode(&input), Ok(0x0201));
        assert_eq!(u32::decode(&input), Ok(0x0403_0201));
        assert_eq!(i32::decode(&input), Ok(0x0403_0201));
        assert_eq!(u64::decode(&input), Ok(0x0807_0605_0403_0201));
        assert_eq!(i64::decode(&input), Ok(0x0807_0605_0403_0201));
        assert_eq!(f32::decode(&input), Ok(f32::from_le_bytes([1, 2, 3, 4])));
        assert_eq!(
            f64::decode(&input),
            Ok(f64::from_le_bytes([1, 2, 3, 4, 5, 6, 7, 8]))
        );
        assert_eq!(u64::decode(&input[..7]), Err(CodecError::UnexpectedEnd));
    }

    #[test]
    fn test_scalar_encode_buffer_too_small() {
        let mut buf = [0u8; 7];
        assert_eq!(1.5f64.encode(&mut buf), Err(CodecError::BufferTooSmall));
    }

    #[test]
    fn test_bool_nonzero_is_true() {
        assert_eq!(bool::decode(&[0]), Ok(false));
        assert_eq!(bool::decode(&[1]), Ok(true));
        assert_eq!(bool::decode(&[0x80]), Ok(true));
    }

    #[test]
    fn test_encode_to_vec() {
        let encoded: Vec<u8, 8> = 0xBEEFu16.encode_to_vec().unwrap();
        assert_eq!(encoded.as_slice(), &[0xEF, 0xBE]);

        let too_small: Result<Vec<u8, 2>, _> = 1u32.encode_to_vec();
        assert_eq!(too_small, Err(CodecError::BufferTooSmall));
    }

    #[test]
    fn test_writer_reader_fields() {
        let mut buf = [0u8; 32];
        let mut writer = Writer::new(&mut buf);
        writer.put(42u32).unwrap();
        writer.put(-3i8).unwrap();
        writer.put_str("temp").unwrap();
        let len = writer.finish();
        assert_eq!(len, 4 + 1 + 4 + 4);
        assert_eq!(&buf[5..9], &[4, 0, 0, 0]);

        let mut reader = Reader::new(&buf[..len]);
        assert_eq!(reader.get::<u32>(), Ok(42));
        assert_eq!(reader.get::<i8>(), Ok(-3));
        assert_eq!(reader.get_str::<8>().unwrap().as_str(), "temp");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_string_too_long_for_capacity() {
        let mut buf = [0u8; 16];
        let mut writer = Writer::new(&mut buf);
        writer.put_str("humidity").unwrap();
        let len = writer.finish();

        let mut reader = Reader::new(&buf[..len]);
        assert_eq!(reader.get_str::<4>(), Err(CodecError::CapacityExceeded));
    }

    #[test]
    fn test_reader_truncated_string() {
        // Prefix claims 10 bytes, only 2 follow
        let buf = [10, 0, 0, 0, b'o', b'k'];
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.get_str::<16>(), Err(CodecError::UnexpectedEnd));
    }

    #[test]
    fn test_reader_invalid_utf8() {
        let buf = [2, 0, 0, 0, 0xC3, 0x28];
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.get_str::<16>(), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_writer_overflow() {
        let mut buf = [0u8; 6];
        let mut writer = Writer::new(&mut buf);
        assert_eq!(writer.put_str("abc"), Err(CodecError::BufferTooSmall));
    }

    proptest! {
        #[test]
        fn prop_any_eight_bytes_decode_as_f64(bytes in any::<[u8; 8]>()) {
            let value = f64::decode(&bytes).unwrap();
            let mut out = [0u8; 8];
            value.encode(&mut out).unwrap();
            prop_assert_eq!(out, bytes);
        }

        #[test]
        fn prop_i64_roundtrip(value in any::<i64>()) {
            let encoded: Vec<u8, 8> = value.encode_to_vec().unwrap();
            prop_assert_eq!(i64::decode(&encoded), Ok(value));
        }
    }
}
