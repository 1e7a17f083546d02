//! Online-learning stacked LSTM over a dense alphabet.
//!
//! One `perceive` call is one unit of online training: the log-loss of the
//! current distribution against the revealed symbol is backpropagated through
//! the cached activation window (truncated BPTT), weights take a clipped SGD
//! step, and the recurrent state advances by one symbol. Encoder and decoder
//! construct this model identically (fixed init seed) and drive it with the
//! identical call sequence, so every distribution it emits is bit-identical
//! on both sides.
//!
//! Determinism requirement: all float loops below run in one fixed order.
//! Do not "optimize" them into reductions the compiler may reassociate, and
//! do not introduce fused operations; probabilities must match bit-for-bit
//! between the encode and decode passes of the same stream.

use super::SequentialModel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

// Format constants: both coding sides must build the identical model, so
// these are as much part of the stream format as the header layout.
const CELLS: usize = 32;
const LAYERS: usize = 2;
const HORIZON: usize = 6;
const LEARNING_RATE: f32 = 0.03;
const GRAD_CLIP: f32 = 2.0;
const WEIGHT_SEED: u64 = 0x1b8f_23d5_9c04_77e1;

#[inline(always)]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Per-layer weight block. Each gate matrix has `cells` rows of
/// `in_size + cells + 1` columns: input section, recurrent section, bias.
struct Layer {
    in_size: usize,
    width: usize,
    wf: Vec<f32>,
    wi: Vec<f32>,
    wo: Vec<f32>,
    wg: Vec<f32>,
}

struct LayerGrads {
    wf: Vec<f32>,
    wi: Vec<f32>,
    wo: Vec<f32>,
    wg: Vec<f32>,
}

/// Activations of one layer at one time step, kept for truncated BPTT.
struct LayerState {
    prev_h: Vec<f32>,
    prev_c: Vec<f32>,
    f: Vec<f32>,
    i: Vec<f32>,
    o: Vec<f32>,
    g: Vec<f32>,
    tanh_c: Vec<f32>,
    h: Vec<f32>,
}

struct StepCache {
    sym: usize,
    layers: Vec<LayerState>,
}

/// Layer input: a one-hot symbol (bottom layer) or the hidden vector of the
/// layer below.
enum LayerInput<'a> {
    OneHot(usize),
    Dense(&'a [f32]),
}

fn preact(w: &[f32], row: usize, in_size: usize, input: &LayerInput, prev_h: &[f32]) -> f32 {
    let width = in_size + prev_h.len() + 1;
    let mut sum = w[row + width - 1]; // bias
    match *input {
        LayerInput::OneHot(sym) => sum += w[row + sym],
        LayerInput::Dense(x) => {
            for (j, &xj) in x.iter().enumerate() {
                sum += w[row + j] * xj;
            }
        }
    }
    for (j, &hj) in prev_h.iter().enumerate() {
        sum += w[row + in_size + j] * hj;
    }
    sum
}

pub struct Lstm {
    alphabet: usize,
    layers: Vec<Layer>,
    grads: Vec<LayerGrads>,
    w_out: Vec<f32>, // alphabet rows x CELLS columns
    b_out: Vec<f32>,
    gw_out: Vec<f32>,
    gb_out: Vec<f32>,
    hidden: Vec<Vec<f32>>,
    cell: Vec<Vec<f32>>,
    probs: Vec<f32>,
    window: VecDeque<StepCache>,
}

impl Lstm {
    /// Model over a dense alphabet of `alphabet` symbols. The output layer is
    /// sized to the alphabet, which is why the vocabulary must be fixed
    /// before the model is built.
    pub fn new(alphabet: usize) -> Self {
        assert!(alphabet >= 1, "alphabet must be non-empty");
        let mut rng = StdRng::seed_from_u64(WEIGHT_SEED);

        let mut layers = Vec::with_capacity(LAYERS);
        let mut grads = Vec::with_capacity(LAYERS);
        for l in 0..LAYERS {
            let in_size = if l == 0 { alphabet } else { CELLS };
            let width = in_size + CELLS + 1;
            let init = |rng: &mut StdRng| -> Vec<f32> {
                (0..CELLS * width).map(|_| rng.gen_range(-0.1..0.1)).collect()
            };
            let mut wf = init(&mut rng);
            let wi = init(&mut rng);
            let wo = init(&mut rng);
            let wg = init(&mut rng);
            // start with an open forget gate so early context survives
            for c in 0..CELLS {
                wf[c * width + width - 1] = 1.0;
            }
            layers.push(Layer { in_size, width, wf, wi, wo, wg });
            grads.push(LayerGrads {
                wf: vec![0.0; CELLS * width],
                wi: vec![0.0; CELLS * width],
                wo: vec![0.0; CELLS * width],
                wg: vec![0.0; CELLS * width],
            });
        }

        let w_out = (0..alphabet * CELLS).map(|_| rng.gen_range(-0.1..0.1)).collect();

        Self {
            alphabet,
            layers,
            grads,
            w_out,
            b_out: vec![0.0; alphabet],
            gw_out: vec![0.0; alphabet * CELLS],
            gb_out: vec![0.0; alphabet],
            hidden: vec![vec![0.0; CELLS]; LAYERS],
            cell: vec![vec![0.0; CELLS]; LAYERS],
            probs: vec![1.0 / alphabet as f32; alphabet],
            window: VecDeque::with_capacity(HORIZON + 1),
        }
    }

    pub fn alphabet(&self) -> usize {
        self.alphabet
    }

    /// One forward step: push `sym` through the stack, refresh the output
    /// distribution and cache the activations for later backprop.
    fn forward(&mut self, sym: usize) {
        debug_assert!(sym < self.alphabet);
        let mut states: Vec<LayerState> = Vec::with_capacity(LAYERS);

        for (l, layer) in self.layers.iter().enumerate() {
            let prev_h = self.hidden[l].clone();
            let prev_c = self.cell[l].clone();

            let mut f = Vec::with_capacity(CELLS);
            let mut i = Vec::with_capacity(CELLS);
            let mut o = Vec::with_capacity(CELLS);
            let mut g = Vec::with_capacity(CELLS);
            let mut c_new = Vec::with_capacity(CELLS);
            let mut tanh_c = Vec::with_capacity(CELLS);
            let mut h = Vec::with_capacity(CELLS);

            for c in 0..CELLS {
                let row = c * layer.width;
                let input = if l == 0 {
                    LayerInput::OneHot(sym)
                } else {
                    LayerInput::Dense(&states[l - 1].h)
                };
                let fz = sigmoid(preact(&layer.wf, row, layer.in_size, &input, &prev_h));
                let iz = sigmoid(preact(&layer.wi, row, layer.in_size, &input, &prev_h));
                let oz = sigmoid(preact(&layer.wo, row, layer.in_size, &input, &prev_h));
                let gz = preact(&layer.wg, row, layer.in_size, &input, &prev_h).tanh();
                let cz = fz * prev_c[c] + iz * gz;
                let tz = cz.tanh();
                f.push(fz);
                i.push(iz);
                o.push(oz);
                g.push(gz);
                c_new.push(cz);
                tanh_c.push(tz);
                h.push(oz * tz);
            }

            self.hidden[l].copy_from_slice(&h);
            self.cell[l].copy_from_slice(&c_new);
            states.push(LayerState { prev_h, prev_c, f, i, o, g, tanh_c, h });
        }

        // softmax over the top hidden state, fixed evaluation order
        let h_top = &states[LAYERS - 1].h;
        let mut max = f32::NEG_INFINITY;
        for k in 0..self.alphabet {
            let mut logit = self.b_out[k];
            for j in 0..CELLS {
                logit += self.w_out[k * CELLS + j] * h_top[j];
            }
            self.probs[k] = logit;
            if logit > max {
                max = logit;
            }
        }
        let mut total = 0.0;
        for p in self.probs.iter_mut() {
            *p = (*p - max).exp();
            total += *p;
        }
        for p in self.probs.iter_mut() {
            *p /= total;
        }

        self.window.push_back(StepCache { sym, layers: states });
        if self.window.len() > HORIZON {
            self.window.pop_front();
        }
    }

    /// Backprop the log-loss of the current distribution against `target`
    /// through the cached window, accumulating gradients.
    fn backward(&mut self, target: usize) {
        debug_assert!(!self.window.is_empty());
        for lg in self.grads.iter_mut() {
            lg.wf.iter_mut().for_each(|v| *v = 0.0);
            lg.wi.iter_mut().for_each(|v| *v = 0.0);
            lg.wo.iter_mut().for_each(|v| *v = 0.0);
            lg.wg.iter_mut().for_each(|v| *v = 0.0);
        }
        self.gw_out.iter_mut().for_each(|v| *v = 0.0);
        self.gb_out.iter_mut().for_each(|v| *v = 0.0);

        // softmax + NLL: dlogit = p - onehot(target)
        let last = self.window.len() - 1;
        let h_top = &self.window[last].layers[LAYERS - 1].h;
        let mut dh_seed = vec![0.0f32; CELLS];
        for k in 0..self.alphabet {
            let dlogit = self.probs[k] - f32::from(u8::from(k == target));
            self.gb_out[k] += dlogit;
            for j in 0..CELLS {
                self.gw_out[k * CELLS + j] += dlogit * h_top[j];
                dh_seed[j] += dlogit * self.w_out[k * CELLS + j];
            }
        }

        // gradients flowing backwards in time through each layer's recurrence
        let mut dh_rec = vec![vec![0.0f32; CELLS]; LAYERS];
        let mut dc_rec = vec![vec![0.0f32; CELLS]; LAYERS];

        for t in (0..self.window.len()).rev() {
            let step = &self.window[t];
            let mut d_from_above: Option<Vec<f32>> = None;

            for l in (0..LAYERS).rev() {
                let st = &step.layers[l];
                let layer = &self.layers[l];
                let lg = &mut self.grads[l];

                let mut dh = std::mem::replace(&mut dh_rec[l], vec![0.0; CELLS]);
                if l == LAYERS - 1 {
                    if t == last {
                        for j in 0..CELLS {
                            dh[j] += dh_seed[j];
                        }
                    }
                } else if let Some(d_above) = &d_from_above {
                    for j in 0..CELLS {
                        dh[j] += d_above[j];
                    }
                }

                let mut dh_prev = vec![0.0f32; CELLS];
                let mut dc_prev = vec![0.0f32; CELLS];
                let mut d_input = if l > 0 { Some(vec![0.0f32; CELLS]) } else { None };

                for c in 0..CELLS {
                    let row = c * layer.width;
                    let tz = st.tanh_c[c];
                    let d_o = dh[c] * tz;
                    let dpo = d_o * st.o[c] * (1.0 - st.o[c]);
                    let dc = dh[c] * st.o[c] * (1.0 - tz * tz) + dc_rec[l][c];
                    let d_f = dc * st.prev_c[c];
                    let dpf = d_f * st.f[c] * (1.0 - st.f[c]);
                    let d_i = dc * st.g[c];
                    let dpi = d_i * st.i[c] * (1.0 - st.i[c]);
                    let d_g = dc * st.i[c];
                    let dpg = d_g * (1.0 - st.g[c] * st.g[c]);
                    dc_prev[c] = dc * st.f[c];

                    let gates: [(f32, &Vec<f32>, &mut Vec<f32>); 4] = [
                        (dpf, &layer.wf, &mut lg.wf),
                        (dpi, &layer.wi, &mut lg.wi),
                        (dpo, &layer.wo, &mut lg.wo),
                        (dpg, &layer.wg, &mut lg.wg),
                    ];
                    for (dpre, w, gw) in gates {
                        if l == 0 {
                            gw[row + step.sym] += dpre;
                        } else {
                            let x = &step.layers[l - 1].h;
                            let dx = d_input.as_mut().expect("upper layers carry input grads");
                            for j in 0..CELLS {
                                gw[row + j] += dpre * x[j];
                                dx[j] += dpre * w[row + j];
                            }
                        }
                        for j in 0..CELLS {
                            gw[row + layer.in_size + j] += dpre * st.prev_h[j];
                            dh_prev[j] += dpre * w[row + layer.in_size + j];
                        }
                        gw[row + layer.width - 1] += dpre;
                    }
                }

                dh_rec[l] = dh_prev;
                dc_rec[l] = dc_prev;
                d_from_above = d_input;
            }
        }
    }

    /// Clipped SGD step over the accumulated gradients.
    fn apply(&mut self) {
        let clip = |g: f32| g.clamp(-GRAD_CLIP, GRAD_CLIP);
        for (layer, lg) in self.layers.iter_mut().zip(self.grads.iter()) {
            for (w, &g) in layer.wf.iter_mut().zip(&lg.wf) {
                *w -= LEARNING_RATE * clip(g);
            }
            for (w, &g) in layer.wi.iter_mut().zip(&lg.wi) {
                *w -= LEARNING_RATE * clip(g);
            }
            for (w, &g) in layer.wo.iter_mut().zip(&lg.wo) {
                *w -= LEARNING_RATE * clip(g);
            }
            for (w, &g) in layer.wg.iter_mut().zip(&lg.wg) {
                *w -= LEARNING_RATE * clip(g);
            }
        }
        for (w, &g) in self.w_out.iter_mut().zip(&self.gw_out) {
            *w -= LEARNING_RATE * clip(g);
        }
        for (b, &g) in self.b_out.iter_mut().zip(&self.gb_out) {
            *b -= LEARNING_RATE * clip(g);
        }
    }
}

impl SequentialModel for Lstm {
    fn dist(&self) -> &[f32] {
        &self.probs
    }

    fn perceive(&mut self, symbol: usize) -> &[f32] {
        // the very first symbol has no preceding forward pass to train
        if !self.window.is_empty() {
            self.backward(symbol);
            self.apply();
        }
        self.forward(symbol);
        &self.probs
    }

    fn advance(&mut self, symbol: usize) -> &[f32] {
        self.forward(symbol);
        &self.probs
    }
}
