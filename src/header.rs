//! Compressed-stream header.
//!
//! Layout: 5 bytes of payload length, most-significant first, then (only for
//! payloads of at least [`VOCAB_THRESHOLD`] bytes) a 32-byte vocabulary
//! bitmap, bit `j` of byte `i` covering value `8*i + j`. A zero length is the
//! sentinel for a stored (preprocessor-only) payload.

use crate::vocab::Vocabulary;
use std::io::{self, Read, Write};

/// Streams shorter than this skip the bitmap; the header overhead would not
/// pay for itself, so the full 256-value alphabet is assumed instead.
pub const VOCAB_THRESHOLD: u64 = 10_000;

/// Largest payload length the 5-byte field can carry.
pub const MAX_LENGTH: u64 = (1 << 40) - 1;

pub fn write_header<W: Write>(length: u64, vocab: &Vocabulary, w: &mut W) -> io::Result<()> {
    debug_assert!(length <= MAX_LENGTH);
    for i in (0..5).rev() {
        w.write_all(&[(length >> (8 * i)) as u8])?;
    }
    if length < VOCAB_THRESHOLD {
        return Ok(());
    }

    for i in 0..32usize {
        let mut byte = 0u8;
        for j in 0..8 {
            if vocab.contains((i * 8 + j) as u8) {
                byte |= 1 << j;
            }
        }
        w.write_all(&[byte])?;
    }
    Ok(())
}

/// Reads back `(length, vocabulary)`. A zero length leaves the vocabulary
/// empty; the caller owns the stored-payload sentinel. Lengths below the
/// threshold imply the full alphabet without consuming further bytes.
pub fn read_header<R: Read>(r: &mut R) -> io::Result<(u64, Vocabulary)> {
    let mut buf = [0u8; 5];
    r.read_exact(&mut buf)?;
    let mut length = 0u64;
    for byte in buf {
        length = (length << 8) | u64::from(byte);
    }

    if length == 0 {
        return Ok((0, Vocabulary::empty()));
    }
    if length < VOCAB_THRESHOLD {
        return Ok((length, Vocabulary::all()));
    }

    let mut bitmap = [0u8; 32];
    r.read_exact(&mut bitmap)?;
    let mut vocab = Vocabulary::empty();
    for (i, byte) in bitmap.iter().enumerate() {
        for j in 0..8 {
            if byte & (1 << j) != 0 {
                vocab.set((i * 8 + j) as u8);
            }
        }
    }
    Ok((length, vocab))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_stream_has_no_bitmap() {
        let mut out = Vec::new();
        write_header(4, &Vocabulary::scan(b"AAAA"), &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0, 4]);

        let (len, vocab) = read_header(&mut out.as_slice()).unwrap();
        assert_eq!(len, 4);
        assert_eq!(vocab, Vocabulary::all());
    }

    #[test]
    fn long_stream_carries_exact_bitmap() {
        let data: Vec<u8> = (0..20_000).map(|i| b'a' + (i % 26) as u8).collect();
        let vocab = Vocabulary::scan(&data);

        let mut out = Vec::new();
        write_header(data.len() as u64, &vocab, &mut out).unwrap();
        assert_eq!(out.len(), 5 + 32);
        assert_eq!(&out[..5], &[0, 0, 0, 0x4e, 0x20]);

        let (len, read_back) = read_header(&mut out.as_slice()).unwrap();
        assert_eq!(len, 20_000);
        assert_eq!(read_back, vocab);
        assert_eq!(read_back.len(), 26);
    }

    #[test]
    fn bitmap_bit_order_is_lsb_first() {
        let mut vocab = Vocabulary::empty();
        vocab.set(0); // byte 0, bit 0
        vocab.set(9); // byte 1, bit 1

        let mut out = Vec::new();
        write_header(VOCAB_THRESHOLD, &vocab, &mut out).unwrap();
        assert_eq!(out[5], 0b0000_0001);
        assert_eq!(out[6], 0b0000_0010);
    }

    #[test]
    fn zero_length_is_sentinel() {
        let mut out = Vec::new();
        write_header(0, &Vocabulary::all(), &mut out).unwrap();
        assert_eq!(out, [0; 5]);

        let (len, vocab) = read_header(&mut out.as_slice()).unwrap();
        assert_eq!(len, 0);
        assert!(vocab.is_empty());
    }

    #[test]
    fn threshold_boundary() {
        let mut below = Vec::new();
        write_header(VOCAB_THRESHOLD - 1, &Vocabulary::all(), &mut below).unwrap();
        assert_eq!(below.len(), 5);

        let mut at = Vec::new();
        write_header(VOCAB_THRESHOLD, &Vocabulary::all(), &mut at).unwrap();
        assert_eq!(at.len(), 5 + 32);
    }

    #[test]
    fn five_byte_big_endian_length() {
        let mut out = Vec::new();
        write_header(0x01_02_03_04_05, &Vocabulary::all(), &mut out).unwrap();
        assert_eq!(&out[..5], &[0x01, 0x02, 0x03, 0x04, 0x05]);
        let (len, _) = read_header(&mut out.as_slice()).unwrap();
        assert_eq!(len, 0x01_02_03_04_05);
    }
}
