//! Bit-granular I/O for the arithmetic coder.

use core::slice::from_mut as into_slice;
use std::io::{self, ErrorKind, Read, Write};

pub trait ACRead {
    /// Read one bit, or 0 past end of stream.
    fn read_bit(&mut self) -> io::Result<u8>;
    /// Read 4 bytes big-endian, zero-padded past end of stream.
    fn read_u32(&mut self) -> io::Result<u32>;
}

pub trait ACWrite {
    /// Defer one parity bit; it is written, inverted, after the next bit.
    fn inc_parity(&mut self);
    /// Write one bit followed by any deferred parity bits.
    fn write_bit(&mut self, bit: u32) -> io::Result<()>;
    /// Pad to a byte boundary from `state` (MSB first) and flush. Always
    /// writes at least one bit.
    fn flush(&mut self, state: u32) -> io::Result<()>;
}

/// Reads bits MSB-first from an `io::Read`, turning EOF into zero bits so the
/// decoder can drain its final interval.
pub struct ACReader<R> {
    inner: R,
    buf: u8,
    mask: u8,
}

impl<R: Read> ACReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buf: 0, mask: 0 }
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = 0;
        match self.inner.read_exact(into_slice(&mut byte)) {
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(0),
            res => res.map(|_| byte),
        }
    }
}

impl<R: Read> ACRead for ACReader<R> {
    fn read_bit(&mut self) -> io::Result<u8> {
        if self.mask == 0 {
            self.buf = self.read_byte()?;
            self.mask = 1 << 7;
        }
        let bit = u8::from(self.buf & self.mask != 0);
        self.mask >>= 1;
        Ok(bit)
    }

    fn read_u32(&mut self) -> io::Result<u32> {
        debug_assert!(self.mask == 0, "u32 reads must be byte-aligned");
        let bytes = [
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
            self.read_byte()?,
        ];
        Ok(u32::from_be_bytes(bytes))
    }
}

/// Writes bits MSB-first into an `io::Write`, replaying deferred parity bits
/// inverted after each settled bit.
pub struct ACWriter<W> {
    inner: W,
    buf: u8,
    filled: u8,
    parity: u64,
}

impl<W: Write> ACWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, buf: 0, filled: 0, parity: 0 }
    }

    fn push_bit(&mut self, bit: u8) -> io::Result<()> {
        self.buf = (self.buf << 1) | bit;
        self.filled += 1;
        if self.filled == 8 {
            self.inner.write_all(&[self.buf])?;
            self.filled = 0;
        }
        Ok(())
    }
}

impl<W: Write> ACWrite for ACWriter<W> {
    fn write_bit(&mut self, bit: u32) -> io::Result<()> {
        debug_assert!(bit <= 1, "provided value wasn't a valid bit");
        let bit = (bit & 1) as u8;

        self.push_bit(bit)?;
        while self.parity > 0 {
            self.parity -= 1;
            self.push_bit(bit ^ 1)?;
        }
        Ok(())
    }

    fn inc_parity(&mut self) {
        self.parity += 1;
    }

    fn flush(&mut self, mut state: u32) -> io::Result<()> {
        // do-while: at least one state bit even when already aligned
        loop {
            self.write_bit(state >> 31)?;
            state <<= 1;
            if self.filled == 0 {
                break;
            }
        }
        self.inner.flush()
    }
}
