//! Compression and decompression drivers.
//!
//! Both passes drive the same predictor with the same call sequence: per
//! byte, 8 tree-node predictions, 8 coded bits, 8 observations. Any
//! divergence between the two sequences desynchronizes the coder
//! irrecoverably, so the loops below are deliberate mirror images.

use crate::entropy_coding::ac_io::{ACReader, ACWriter};
use crate::entropy_coding::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::header::{read_header, write_header, VOCAB_THRESHOLD};
use crate::models::{BitPredictor, BitTreeLstm};
use crate::unroll_for;
use crate::vocab::Vocabulary;
use std::io::{ErrorKind, Read, Write};

/// Outcome of reading a compressed stream.
pub enum Decompressed {
    /// Entropy-coded payload, fully decoded.
    Plain(Vec<u8>),
    /// Zero-length sentinel: the payload (whatever follows the header) was
    /// stored by the preprocessing stage without entropy coding. The caller
    /// owns the rest of the stream.
    Stored,
}

/// Compresses `data` into `writer`: header, then the arithmetic-coded
/// bitstream. An empty input writes the bare zero header, which shares its
/// on-disk shape with stored payloads.
pub fn compress<W: Write>(data: &[u8], writer: &mut W) -> Result<()> {
    let length = data.len() as u64;
    // below the threshold the bitmap would cost more than it saves
    let vocab = if length < VOCAB_THRESHOLD {
        Vocabulary::all()
    } else {
        Vocabulary::scan(data)
    };
    write_header(length, &vocab, writer)?;
    if data.is_empty() {
        return Ok(());
    }

    let mut model = BitTreeLstm::new(&vocab);
    let mut enc = Encoder::new(ACWriter::new(writer));
    for &byte in data {
        let mut node: u16 = 1;
        unroll_for!(bit in byte, {
            enc.encode(bit, model.predict(node))?;
            model.observe(node, bit);
            node = (node << 1) | u16::from(bit);
        });
    }
    enc.flush()?;
    Ok(())
}

/// Decodes one compressed stream from `reader`. Rebuilds the identical
/// predictor the encoder used and replays its exact update sequence.
pub fn decompress<R: Read>(reader: &mut R) -> Result<Decompressed> {
    let (length, vocab) = read_header(reader).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::Truncated
        } else {
            Error::Io(e)
        }
    })?;
    if length == 0 {
        return Ok(Decompressed::Stored);
    }

    let mut model = BitTreeLstm::new(&vocab);
    let mut dec = Decoder::new(ACReader::new(reader))?;
    let mut out = Vec::with_capacity(length.min(1 << 20) as usize);
    for _ in 0..length {
        let mut node: u16 = 1;
        while node < 256 {
            let bit = dec.decode(model.predict(node))?;
            model.observe(node, bit);
            node = (node << 1) | u16::from(bit);
        }
        out.push((node & 0xff) as u8);
    }
    Ok(Decompressed::Plain(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::VOCAB_THRESHOLD;

    fn roundtrip(data: &[u8]) -> Vec<u8> {
        let mut coded = Vec::new();
        compress(data, &mut coded).unwrap();
        match decompress(&mut coded.as_slice()).unwrap() {
            Decompressed::Plain(out) => out,
            Decompressed::Stored => Vec::new(),
        }
    }

    fn lcg_bytes(n: usize) -> Vec<u8> {
        let mut seed = 0xdead_beef_cafe_f00du64;
        (0..n)
            .map(|_| {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (seed >> 56) as u8
            })
            .collect()
    }

    #[test]
    fn empty_input_writes_bare_header() {
        let mut coded = Vec::new();
        compress(&[], &mut coded).unwrap();
        assert_eq!(coded, [0; 5]);
        assert!(matches!(decompress(&mut coded.as_slice()).unwrap(), Decompressed::Stored));
        assert_eq!(roundtrip(&[]), Vec::<u8>::new());
    }

    #[test]
    fn four_repeated_bytes() {
        // Scenario B: short stream, no bitmap, exact round trip
        let data = b"AAAA";
        let mut coded = Vec::new();
        compress(data, &mut coded).unwrap();
        assert_eq!(&coded[..5], &[0, 0, 0, 0, 4]);
        assert_eq!(roundtrip(data), data);
    }

    #[test]
    fn all_byte_values_roundtrip() {
        let data: Vec<u8> = (0..1024).map(|i| (i % 256) as u8).collect();
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn high_entropy_roundtrip() {
        let data = lcg_bytes(2000);
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn repetitive_text_roundtrip() {
        let data = b"abcabcabc".repeat(200);
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn repeated_byte_compresses_well() {
        let data = vec![b'q'; 2000];
        let mut sink = crate::helpers::ByteCounter::new();
        compress(&data, &mut sink).unwrap();
        assert!(sink.count() < data.len() as u64 / 4, "coded {} bytes", sink.count());
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn threshold_boundary_roundtrips() {
        let below = vec![b'x'; (VOCAB_THRESHOLD - 1) as usize];
        assert_eq!(roundtrip(&below), below);

        let above = vec![b'x'; (VOCAB_THRESHOLD + 1) as usize];
        let mut coded = Vec::new();
        compress(&above, &mut coded).unwrap();
        // bitmap present past the threshold
        assert_eq!(coded[5..37].iter().map(|b| b.count_ones()).sum::<u32>(), 1);
        assert_eq!(roundtrip(&above), above);
    }

    #[test]
    fn lowercase_letters_scenario() {
        // Scenario A: 20000 bytes over the 26 lowercase letters
        let data: Vec<u8> = (0..20_000).map(|i| b'a' + ((i * i + i / 7) % 26) as u8).collect();
        let mut coded = Vec::new();
        compress(&data, &mut coded).unwrap();

        assert_eq!(&coded[..5], &[0, 0, 0, 0x4e, 0x20]);
        let bitmap_bits: u32 = coded[5..37].iter().map(|b| b.count_ones()).sum();
        assert_eq!(bitmap_bits, 26);

        match decompress(&mut coded.as_slice()).unwrap() {
            Decompressed::Plain(out) => assert_eq!(out, data),
            Decompressed::Stored => panic!("unexpected stored sentinel"),
        }
    }

    #[test]
    fn compression_is_deterministic() {
        let data = lcg_bytes(1200);
        let mut a = Vec::new();
        let mut b = Vec::new();
        compress(&data, &mut a).unwrap();
        compress(&data, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let coded = [0u8, 0, 0];
        assert!(matches!(decompress(&mut coded.as_slice()), Err(Error::Truncated)));
    }
}
