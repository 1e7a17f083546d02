//! Carry-propagating binary arithmetic coder.
//!
//! The coder narrows a 32-bit interval `[lo, hi]` one probability-weighted
//! bit at a time. Bits agreed on by both interval bounds are shifted out;
//! the E3 condition (interval straddling the midpoint) is resolved by
//! counting deferred parity bits which are replayed, inverted, after the
//! next settled bit. Probabilities are `u16` values giving P(bit = 1) in
//! units of 1/65536; zero is treated as the smallest non-zero split.

pub mod ac_io;

use ac_io::{ACRead, ACWrite};
use std::io;

const PREC_SHIFT: u32 = u32::BITS - 1; // 31
const Q1: u32 = 1 << (PREC_SHIFT - 1); // 0x40000000, lower quarter bound
const Q2: u32 = 2 << (PREC_SHIFT - 1); // 0x80000000, interval midpoint
const Q3: u32 = 3 << (PREC_SHIFT - 1); // 0xC0000000, upper quarter bound
const LO_MOD: u32 = (1 << PREC_SHIFT) - 1; // clears the top bit on E3 shift
const HI_MOD: u32 = (1 << PREC_SHIFT) + 1; // sets top and low bits on E3 shift

/// Interval split point for P(bit = 1) = `prob` / 2^16.
///
/// The multiply runs in u64 so the full 32-bit range never overflows; a zero
/// probability still leaves the one-bit a sliver of the interval.
#[inline(always)]
fn split(lo: u32, hi: u32, prob: u16) -> u32 {
    let p = if prob == 0 { 1 } else { u64::from(prob) << 16 };
    let range = u64::from(hi - lo);
    let mid = lo + ((range * p) >> 32) as u32;
    debug_assert!(mid >= lo && mid < hi);
    mid
}

/// Encoding half of the coder. `flush` consumes the encoder, so it cannot be
/// called twice and no `encode` can follow it.
pub struct Encoder<W: ACWrite> {
    lo: u32,
    hi: u32,
    io: W,
}

impl<W: ACWrite> Encoder<W> {
    pub fn new(io: W) -> Self {
        Self { lo: 0, hi: u32::MAX, io }
    }

    pub fn encode(&mut self, bit: u8, prob: u16) -> io::Result<()> {
        let mid = split(self.lo, self.hi, prob);
        match bit {
            0 => self.lo = mid + 1,
            _ => self.hi = mid,
        }

        // Shift out bits both bounds agree on
        while ((self.lo ^ self.hi) >> PREC_SHIFT) == 0 {
            self.io.write_bit(self.lo >> PREC_SHIFT)?;
            self.lo <<= 1;
            self.hi = (self.hi << 1) | 1;
        }

        // E3: interval straddles the midpoint, defer a parity bit
        while self.lo >= Q1 && self.hi < Q3 {
            self.io.inc_parity();
            self.lo = (self.lo << 1) & LO_MOD;
            self.hi = (self.hi << 1) | HI_MOD;
        }

        Ok(())
    }

    /// Emits the remaining interval state, padding to a byte boundary.
    pub fn flush(mut self) -> io::Result<()> {
        // after renormalization the top bits of lo/hi must disagree
        debug_assert!(self.lo >> PREC_SHIFT == 0 && self.hi >> PREC_SHIFT == 1);
        self.io.flush(self.hi)
    }
}

/// Decoding half. Tracks the same interval as the encoder plus a 32-bit
/// window of the coded stream, and keeps the two state machines in lock-step
/// given the identical probability sequence.
pub struct Decoder<R: ACRead> {
    lo: u32,
    hi: u32,
    window: u32,
    io: R,
}

impl<R: ACRead> Decoder<R> {
    pub fn new(mut io: R) -> io::Result<Self> {
        let window = io.read_u32()?;
        Ok(Self { lo: 0, hi: u32::MAX, window, io })
    }

    pub fn decode(&mut self, prob: u16) -> io::Result<u8> {
        let mid = split(self.lo, self.hi, prob);
        let bit = u8::from(self.window <= mid);
        match bit {
            0 => self.lo = mid + 1,
            _ => self.hi = mid,
        }

        while ((self.lo ^ self.hi) >> PREC_SHIFT) == 0 {
            self.lo <<= 1;
            self.hi = (self.hi << 1) | 1;
            self.window = (self.window << 1) | u32::from(self.io.read_bit()?);
        }

        while self.lo >= Q1 && self.hi < Q3 {
            self.lo = (self.lo << 1) & LO_MOD;
            self.hi = (self.hi << 1) | HI_MOD;
            self.window = ((self.window << 1) ^ Q2) | u32::from(self.io.read_bit()?);
        }

        Ok(bit)
    }
}


#[cfg(test)]
mod proptests {
    use super::ac_io::{ACReader, ACWriter};
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Correctness law: decoding with the probability sequence that
        // produced a coded stream reconstructs the bit sequence exactly.
        #[test]
        fn coder_roundtrip(steps in proptest::collection::vec((any::<bool>(), 1u16..u16::MAX), 0..512)) {
            let mut out = Vec::new();
            let mut enc = Encoder::new(ACWriter::new(&mut out));
            for &(bit, prob) in &steps {
                enc.encode(u8::from(bit), prob).unwrap();
            }
            enc.flush().unwrap();

            let mut dec = Decoder::new(ACReader::new(out.as_slice())).unwrap();
            for &(bit, prob) in &steps {
                prop_assert_eq!(dec.decode(prob).unwrap(), u8::from(bit));
            }
        }
    }
}
