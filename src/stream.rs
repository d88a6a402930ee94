//! Byte I/O adapters between the codec and the transport.
//!
//! `PackOutput` and `PackInput` are the only seams the codec has to the
//! outside world. Outputs may buffer; nothing is observable on the wire until
//! the enclosing session message is flushed. All multi-byte scalars are
//! big-endian.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{PackStreamError, PackStreamResult};

/// Byte sink the packer emits into.
pub trait PackOutput {
    fn write_u8(&mut self, byte: u8) -> PackStreamResult<()>;

    fn write_slice(&mut self, buf: &[u8]) -> PackStreamResult<()>;

    fn write_i8(&mut self, value: i8) -> PackStreamResult<()> {
        self.write_u8(value as u8)
    }

    fn write_i16(&mut self, value: i16) -> PackStreamResult<()> {
        self.write_slice(&value.to_be_bytes())
    }

    fn write_i32(&mut self, value: i32) -> PackStreamResult<()> {
        self.write_slice(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> PackStreamResult<()> {
        self.write_slice(&value.to_be_bytes())
    }

    fn write_u16(&mut self, value: u16) -> PackStreamResult<()> {
        self.write_slice(&value.to_be_bytes())
    }

    fn write_u32(&mut self, value: u32) -> PackStreamResult<()> {
        self.write_slice(&value.to_be_bytes())
    }

    fn write_f64(&mut self, value: f64) -> PackStreamResult<()> {
        self.write_slice(&value.to_be_bytes())
    }

    /// Flush buffered bytes to the transport. A no-op for in-memory sinks.
    fn flush(&mut self) -> PackStreamResult<()> {
        Ok(())
    }
}

impl PackOutput for Vec<u8> {
    fn write_u8(&mut self, byte: u8) -> PackStreamResult<()> {
        self.push(byte);
        Ok(())
    }

    fn write_slice(&mut self, buf: &[u8]) -> PackStreamResult<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

impl PackOutput for BytesMut {
    fn write_u8(&mut self, byte: u8) -> PackStreamResult<()> {
        self.put_u8(byte);
        Ok(())
    }

    fn write_slice(&mut self, buf: &[u8]) -> PackStreamResult<()> {
        self.put_slice(buf);
        Ok(())
    }
}

/// Adapter running a `std::io::Write` transport behind `PackOutput`.
/// Failures surface as `PackStreamError::Io`.
pub struct WriteOutput<W: std::io::Write> {
    inner: W,
}

impl<W: std::io::Write> WriteOutput<W> {
    pub fn new(inner: W) -> Self {
        WriteOutput { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: std::io::Write> PackOutput for WriteOutput<W> {
    fn write_u8(&mut self, byte: u8) -> PackStreamResult<()> {
        self.inner.write_all(&[byte])?;
        Ok(())
    }

    fn write_slice(&mut self, buf: &[u8]) -> PackStreamResult<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> PackStreamResult<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Byte source the unpacker reads from.
///
/// `remaining` bounds every declared size before the decoder allocates for
/// it; `position` attributes decode errors to a byte offset.
pub trait PackInput {
    /// Look at the next byte without consuming it.
    fn peek_u8(&mut self) -> PackStreamResult<u8>;

    fn read_u8(&mut self) -> PackStreamResult<u8>;

    fn read_exact(&mut self, buf: &mut [u8]) -> PackStreamResult<()>;

    /// Bytes left in the input.
    fn remaining(&self) -> usize;

    /// Offset of the next unread byte from the start of the input.
    fn position(&self) -> u64;

    fn read_i8(&mut self) -> PackStreamResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_i16(&mut self) -> PackStreamResult<i16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    fn read_i32(&mut self) -> PackStreamResult<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_i64(&mut self) -> PackStreamResult<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_u16(&mut self) -> PackStreamResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_u32(&mut self) -> PackStreamResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_f64(&mut self) -> PackStreamResult<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }
}

/// In-memory input over a `bytes::Bytes` buffer with position tracking.
#[derive(Debug, Clone)]
pub struct ByteReader {
    buf: Bytes,
    pos: usize,
}

impl ByteReader {
    pub fn new<B: Into<Bytes>>(buf: B) -> Self {
        ByteReader {
            buf: buf.into(),
            pos: 0,
        }
    }

    fn eof(&self) -> PackStreamError {
        PackStreamError::malformed_at("unexpected end of input", self.pos as u64)
    }
}

impl PackInput for ByteReader {
    fn peek_u8(&mut self) -> PackStreamResult<u8> {
        self.buf.get(self.pos).copied().ok_or_else(|| self.eof())
    }

    fn read_u8(&mut self) -> PackStreamResult<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> PackStreamResult<()> {
        let end = self.pos + buf.len();
        if end > self.buf.len() {
            return Err(self.eof());
        }
        buf.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }
}
