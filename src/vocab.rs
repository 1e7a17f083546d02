//! Stream alphabet handling.
//!
//! A `Vocabulary` records which of the 256 byte values can occur in a stream;
//! a `ByteMap` turns that into a dense index range so the model never wastes
//! probability mass on values guaranteed absent.

use crate::helpers::histogram;

/// 256-bit presence mask over byte values. Immutable once fixed for a stream.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Vocabulary {
    present: [bool; 256],
}

impl Vocabulary {
    pub fn empty() -> Self {
        Self { present: [false; 256] }
    }

    pub fn all() -> Self {
        Self { present: [true; 256] }
    }

    /// Mask of the byte values actually occurring in `buf`.
    pub fn scan(buf: &[u8]) -> Self {
        let mut vocab = Self::empty();
        for (value, &count) in histogram(buf).iter().enumerate() {
            if count > 0 {
                vocab.present[value] = true;
            }
        }
        vocab
    }

    pub fn set(&mut self, value: u8) {
        self.present[usize::from(value)] = true;
    }

    pub fn contains(&self, value: u8) -> bool {
        self.present[usize::from(value)]
    }

    /// Number of present byte values.
    pub fn len(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    pub fn is_empty(&self) -> bool {
        self.present.iter().all(|&p| !p)
    }

    /// Present byte values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0u16..256).filter(|&v| self.present[usize::from(v)]).map(|v| v as u8)
    }
}

/// Bijection between present byte values and `[0, vocab_size)`, preserving
/// ascending byte order. Built once per stream, then read-only.
pub struct ByteMap {
    to_index: [u16; 256],
    to_byte: Vec<u8>,
    // rank[v] = number of present values strictly below v, defined on 0..=256
    rank: [u16; 257],
}

impl ByteMap {
    pub fn new(vocab: &Vocabulary) -> Self {
        let mut to_index = [0u16; 256];
        let mut to_byte = Vec::with_capacity(vocab.len());
        let mut rank = [0u16; 257];

        let mut next = 0u16;
        for value in 0..256usize {
            rank[value] = next;
            to_index[value] = next;
            if vocab.contains(value as u8) {
                to_byte.push(value as u8);
                next += 1;
            }
        }
        rank[256] = next;

        Self { to_index, to_byte, rank }
    }

    /// Dense alphabet size.
    pub fn len(&self) -> usize {
        self.to_byte.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_byte.is_empty()
    }

    /// Byte value -> alphabet index. Only meaningful for present values.
    pub fn forward(&self, value: u8) -> usize {
        usize::from(self.to_index[usize::from(value)])
    }

    /// Alphabet index -> byte value.
    pub fn inverse(&self, index: usize) -> u8 {
        self.to_byte[index]
    }

    /// Count of present byte values strictly below `value` (0..=256).
    pub fn rank(&self, value: usize) -> usize {
        usize::from(self.rank[value])
    }
}
