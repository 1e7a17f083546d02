pub mod bit_tree;
pub mod lstm;

pub use self::{bit_tree::BitTreeLstm, lstm::Lstm};

/// Byte-level sequential predictor: an online-learning model over a dense
/// alphabet. `perceive` takes one training step on the just-revealed symbol
/// and advances the recurrent state; `advance` moves the state without
/// learning (free-running generation).
pub trait SequentialModel {
    /// Current distribution over the alphabet for the next symbol.
    fn dist(&self) -> &[f32];
    /// Train on `symbol` against the current distribution, then advance.
    fn perceive(&mut self, symbol: usize) -> &[f32];
    /// Advance on `symbol` without a weight update.
    fn advance(&mut self, symbol: usize) -> &[f32];
}

/// Bit-level predictor driven by the bit-tree walk. `predict` is a pure read;
/// all mutation happens in `observe`.
pub trait BitPredictor {
    /// P(next bit = 1) at tree `node`, in units of 1/65536.
    fn predict(&self, node: u16) -> u16;
    /// Account for the revealed bit at `node`.
    fn observe(&mut self, node: u16, bit: u8);
}
