//! Little-endian stream codec primitives.
//!
//! Both the wire protocol and the persistence format are hand-framed
//! little-endian streams; this module is their shared vocabulary.  Multi-byte
//! integers are little-endian, floats are IEEE-754 in native bit order, and
//! variable-length collections carry a `u32` element-count prefix.
//!
//! Types encode by implementing [`Encode`]/[`Decode`]; composite types chain
//! field codecs with `?`.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Shorthand for the `InvalidData` errors decoders raise on malformed input.
pub fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_owned())
}

/// Serialize a value onto a little-endian byte stream.
pub trait Encode {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()>;

    /// Encode into a fresh buffer (frame bodies, tests).
    fn encode_to_vec(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }
}

/// Deserialize a value from a little-endian byte stream.
pub trait Decode: Sized {
    fn decode<R: Read + ?Sized>(input: &mut R) -> io::Result<Self>;

    /// Decode from a complete buffer, rejecting trailing garbage.
    fn decode_from_slice(mut bytes: &[u8]) -> io::Result<Self> {
        let value = Self::decode(&mut bytes)?;
        if !bytes.is_empty() {
            return Err(invalid_data("trailing bytes after payload"));
        }
        Ok(value)
    }
}

// ── Primitives ────────────────────────────────────────────────────────────────

macro_rules! primitive_codec {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encode for $ty {
            #[inline]
            fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
                out.$write::<LittleEndian>(*self)
            }
        }

        impl Decode for $ty {
            #[inline]
            fn decode<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
                input.$read::<LittleEndian>()
            }
        }
    };
}

primitive_codec!(u16, write_u16, read_u16);
primitive_codec!(u32, write_u32, read_u32);
primitive_codec!(u64, write_u64, read_u64);
primitive_codec!(i64, write_i64, read_i64);
primitive_codec!(f32, write_f32, read_f32);
primitive_codec!(f64, write_f64, read_f64);

impl Encode for u8 {
    #[inline]
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(*self)
    }
}

impl Decode for u8 {
    #[inline]
    fn decode<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        input.read_u8()
    }
}

impl Encode for bool {
    #[inline]
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(*self as u8)
    }
}

impl Decode for bool {
    fn decode<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        match input.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(invalid_data("bad bool byte")),
        }
    }
}

// ── Collections and strings ───────────────────────────────────────────────────

/// Element-count cap for decoded collections.  Frames are already bounded by
/// the transport, so this only guards against corrupt length prefixes.
const MAX_DECODED_LEN: u32 = 1 << 28;

impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        (self.len() as u32).encode(out)?;
        for item in self {
            item.encode(out)?;
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let len = u32::decode(input)?;
        if len > MAX_DECODED_LEN {
            return Err(invalid_data("collection length prefix too large"));
        }
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(T::decode(input)?);
        }
        Ok(items)
    }
}

impl Encode for String {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        (self.len() as u32).encode(out)?;
        out.write_all(self.as_bytes())
    }
}

impl Decode for String {
    fn decode<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let len = u32::decode(input)?;
        if len > MAX_DECODED_LEN {
            return Err(invalid_data("string length prefix too large"));
        }
        let mut bytes = vec![0u8; len as usize];
        input.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| invalid_data("string is not utf-8"))
    }
}

impl<A: Encode, B: Encode> Encode for (A, B) {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.0.encode(out)?;
        self.1.encode(out)
    }
}

impl<A: Decode, B: Decode> Decode for (A, B) {
    fn decode<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        Ok((A::decode(input)?, B::decode(input)?))
    }
}

/// Write a raw `f32` slice without a length prefix (dense grids whose shape
/// is known from configuration).
pub fn write_f32_grid<W: Write + ?Sized>(out: &mut W, grid: &[f32]) -> io::Result<()> {
    for &v in grid {
        out.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

/// Read exactly `len` raw `f32`s (counterpart of [`write_f32_grid`]).
pub fn read_f32_grid<R: Read + ?Sized>(input: &mut R, len: usize) -> io::Result<Vec<f32>> {
    let mut grid = vec![0.0f32; len];
    input.read_f32_into::<LittleEndian>(&mut grid)?;
    Ok(grid)
}
