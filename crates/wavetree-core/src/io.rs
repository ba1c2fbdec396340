//! Binary primitives shared by every component's wire format.
//!
//! The source passes `read_function`/`write_function` callback pairs with
//! a libc `fread`/`fwrite`-shaped signature so the same serialisation
//! logic can target a file or an in-memory buffer. This port expresses
//! that seam as two small traits with blanket impls over
//! [`std::io::Read`]/[`std::io::Write`], so a `File` and a
//! `Cursor<Vec<u8>>` are both valid backings with no adapter code.
//!
//! Every multi-byte primitive is written little-endian, fixing the
//! endianness the source left as a host-width raw write.

use crate::error::{io_failure, short_io, Result};
use std::io::{Read, Write};

/// Little-endian binary reader, implemented for anything that is
/// [`std::io::Read`].
pub trait BinaryReader {
    /// Read a single little-endian `i32`.
    fn read_i32(&mut self) -> Result<i32>;
    /// Read a single little-endian `u32`.
    fn read_u32(&mut self) -> Result<u32>;
    /// Read a single little-endian IEEE-754 `f64`.
    fn read_f64(&mut self) -> Result<f64>;
    /// Read exactly `buf.len()` bytes, distinguishing a clean EOF (no
    /// bytes at all read before hitting end-of-stream) from a short read
    /// that stopped mid-record.
    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;
}

/// Whether a record-sized read landed cleanly on EOF or completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// All bytes were read.
    Complete,
    /// Zero bytes were available; the stream ended cleanly at a record
    /// boundary.
    Eof,
}

/// Little-endian binary writer, implemented for anything that is
/// [`std::io::Write`].
pub trait BinaryWriter {
    /// Write a single little-endian `i32`.
    fn write_i32(&mut self, v: i32) -> Result<()>;
    /// Write a single little-endian `u32`.
    fn write_u32(&mut self, v: u32) -> Result<()>;
    /// Write a single little-endian IEEE-754 `f64`.
    fn write_f64(&mut self, v: f64) -> Result<()>;
}

impl<R: Read> BinaryReader for R {
    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)
            .map_err(|e| io_failure("reading i32", e))?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)
            .map_err(|e| io_failure("reading u32", e))?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)
            .map_err(|e| io_failure("reading f64", e))?;
        Ok(f64::from_le_bytes(buf))
    }

    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let mut total = 0usize;
        while total < buf.len() {
            match self.read(&mut buf[total..]) {
                Ok(0) => {
                    return if total == 0 {
                        Ok(ReadOutcome::Eof)
                    } else {
                        tracing::warn!(total, wanted = buf.len(), "stream truncated mid-record");
                        Err(short_io("reading record (truncated)"))
                    }
                }
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_failure("reading record", e)),
            }
        }
        Ok(ReadOutcome::Complete)
    }
}

impl<W: Write> BinaryWriter for W {
    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_all(&v.to_le_bytes())
            .map_err(|e| io_failure("writing i32", e))
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_le_bytes())
            .map_err(|e| io_failure("writing u32", e))
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_all(&v.to_le_bytes())
            .map_err(|e| io_failure("writing f64", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_scalars() {
        let mut buf = Vec::new();
        buf.write_i32(-7).unwrap();
        buf.write_u32(42).unwrap();
        buf.write_f64(std::f64::consts::PI).unwrap();

        let mut cur = Cursor::new(buf);
        assert_eq!(cur.read_i32().unwrap(), -7);
        assert_eq!(cur.read_u32().unwrap(), 42);
        assert!((cur.read_f64().unwrap() - std::f64::consts::PI).abs() < 1e-15);
    }

    #[test]
    fn clean_eof_vs_truncated_record() {
        let mut cur = Cursor::new(Vec::<u8>::new());
        let mut scratch = [0u8; 4];
        assert_eq!(
            cur.read_exact_or_eof(&mut scratch).unwrap(),
            ReadOutcome::Eof
        );

        let mut cur = Cursor::new(vec![1u8, 2]);
        let mut scratch = [0u8; 4];
        assert!(cur.read_exact_or_eof(&mut scratch).is_err());
    }
}
