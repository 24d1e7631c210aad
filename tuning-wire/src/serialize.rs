//! Byte-at-a-time serialization, trimmed from a richer framing library down
//! to what fixed-length packets need: no start/end markers, no obfuscation.

use crate::crc::{CrcDigest, CrcStyle};

pub trait Serializer {
    type Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error>;

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        for b in val.iter() {
            self.write_u8(*b)?;
        }
        Ok(())
    }

    fn write_le_u16(&mut self, val: u16) -> Result<(), Self::Error> {
        self.write_bytes(&[(val & 0xff) as u8, (val >> 8) as u8])
    }
}

impl<S> Serializer for &mut S
where
    S: Serializer,
{
    type Error = S::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        (*self).write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        (*self).write_bytes(val)
    }

    fn write_le_u16(&mut self, val: u16) -> Result<(), Self::Error> {
        (*self).write_le_u16(val)
    }
}

/// The fixed-size buffer ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferOverflow;

/// Serializes into a caller-owned `&mut [u8]`, tracking a cursor. This is
/// the `no_std` path: no allocation, no `std::io::Write`.
pub struct SerializerBuf<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SerializerBuf<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        SerializerBuf { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Serializer for SerializerBuf<'a> {
    type Error = BufferOverflow;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        let slot = self.buf.get_mut(self.pos).ok_or(BufferOverflow)?;
        *slot = val;
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        let end = self.pos.checked_add(val.len()).ok_or(BufferOverflow)?;
        let dest = self.buf.get_mut(self.pos..end).ok_or(BufferOverflow)?;
        dest.copy_from_slice(val);
        self.pos = end;
        Ok(())
    }
}

/// A serializer that only counts bytes written, used to compute lengths
/// before a real pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerLength {
    len: usize,
}

impl SerializerLength {
    pub fn new() -> Self {
        SerializerLength { len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SerializerLength {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for SerializerLength {
    type Error = core::convert::Infallible;

    fn write_u8(&mut self, _val: u8) -> Result<(), Self::Error> {
        self.len += 1;
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.len += val.len();
        Ok(())
    }

    fn write_le_u16(&mut self, _val: u16) -> Result<(), Self::Error> {
        self.len += 2;
        Ok(())
    }
}

/// Wraps another serializer, feeding every byte written through a CRC
/// digest on the side.
pub struct SerializerCrc<'a, C, T>
where
    C: CrcStyle + 'a,
{
    digest: C::Digest<'a>,
    inner: T,
}

impl<'a, C, T> SerializerCrc<'a, C, T>
where
    C: CrcStyle + 'a,
{
    pub fn new(crc: &'a C, inner: T) -> Self {
        Self {
            digest: crc.digest(),
            inner,
        }
    }

    pub fn finalize(self) -> (u16, T) {
        (self.digest.finalize(), self.inner)
    }
}

impl<'a, C, T> Serializer for SerializerCrc<'a, C, T>
where
    C: CrcStyle + 'a,
    T: Serializer,
{
    type Error = T::Error;

    fn write_u8(&mut self, val: u8) -> Result<(), Self::Error> {
        self.digest.update(&[val]);
        self.inner.write_u8(val)
    }

    fn write_bytes(&mut self, val: &[u8]) -> Result<(), Self::Error> {
        self.digest.update(val);
        self.inner.write_bytes(val)
    }
}
