//! Bit-tree walk over the byte-level LSTM.
//!
//! A byte is coded as 8 binary decisions, MSB first. The tree node (reset to
//! 1 per byte, `node = node*2 + bit`) encodes the partial byte, which maps to
//! a contiguous range of byte values and, because the alphabet preserves
//! ascending byte order, to a contiguous range of alphabet indices. P(bit=1)
//! is the probability mass of the upper half of that range over the whole
//! range. The recurrent state advances only at byte boundaries, so the 8
//! in-byte predictions share one recurrent context and differ only by node.

use super::{BitPredictor, Lstm, SequentialModel};
use crate::vocab::{ByteMap, Vocabulary};

pub struct BitTreeLstm {
    lstm: Lstm,
    map: ByteMap,
}

impl BitTreeLstm {
    /// The vocabulary must already be final; it sizes the model's alphabet.
    pub fn new(vocab: &Vocabulary) -> Self {
        let map = ByteMap::new(vocab);
        let lstm = Lstm::new(map.len());
        Self { lstm, map }
    }
}

impl BitPredictor for BitTreeLstm {
    fn predict(&self, node: u16) -> u16 {
        debug_assert!((1..256).contains(&node));
        let depth = node.ilog2();
        let span = 8 - depth;
        let prefix = usize::from(node) - (1usize << depth);

        let lo = self.map.rank(prefix << span);
        let mid = self.map.rank((prefix << span) + (1 << (span - 1)));
        let hi = self.map.rank((prefix + 1) << span);

        let dist = self.lstm.dist();
        let mut total = 0.0f32;
        for &p in &dist[lo..hi] {
            total += p;
        }
        let mut upper = 0.0f32;
        for &p in &dist[mid..hi] {
            upper += p;
        }

        // a zero-mass prefix can only come from corrupt input; stay neutral
        if total <= 0.0 {
            return 1 << 15;
        }
        ((upper / total * 65536.0) as i64).clamp(1, 65534) as u16
    }

    fn observe(&mut self, node: u16, bit: u8) {
        debug_assert!(bit <= 1);
        let next = (node << 1) | u16::from(bit);
        if next >= 256 {
            // byte boundary: train on the completed byte and advance
            let byte = (next & 0xff) as u8;
            self.lstm.perceive(self.map.forward(byte));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(model: &mut BitTreeLstm, byte: u8) -> Vec<u16> {
        let mut probs = Vec::with_capacity(8);
        let mut node: u16 = 1;
        for i in (0..8).rev() {
            let bit = (byte >> i) & 1;
            probs.push(model.predict(node));
            model.observe(node, bit);
            node = (node << 1) | u16::from(bit);
        }
        assert_eq!(node, 256 + u16::from(byte));
        probs
    }

    #[test]
    fn absent_values_get_no_mass() {
        // vocabulary {0x00, 0x80}: the first bit decides the byte entirely
        let vocab = Vocabulary::scan(&[0x00, 0x80]);
        let mut model = BitTreeLstm::new(&vocab);

        let first = model.predict(1);
        assert!(first > 1 && first < u16::MAX - 1);
        // after the first bit every remaining bit is forced
        model.observe(1, 1);
        let mut node: u16 = 0b11;
        for _ in 0..7 {
            assert_eq!(model.predict(node), 1);
            model.observe(node, 0);
            node <<= 1;
        }
    }

    #[test]
    fn repeated_byte_becomes_predictable() {
        let vocab = Vocabulary::all();
        let mut model = BitTreeLstm::new(&vocab);

        for _ in 0..300 {
            walk(&mut model, b'A');
        }
        // P(first bit = 1) should be far below neutral: b'A' = 0x41 starts 0
        let p = model.predict(1);
        assert!(p < 1 << 14, "p = {p}");
    }

    #[test]
    fn prediction_is_pure() {
        let vocab = Vocabulary::scan(b"abc");
        let model = BitTreeLstm::new(&vocab);
        let a = model.predict(1);
        let b = model.predict(1);
        assert_eq!(a, b);
    }
}
