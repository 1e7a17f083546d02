//! Reversible dictionary preprocessing.
//!
//! Runs ahead of the entropy core: known words collapse to 3-byte codes, the
//! decoder expands them back before anything else sees the data. The byte
//! values `0xFE` (word code) and `0xFF` (escape) are reserved in the encoded
//! stream, so literal occurrences are escaped. The entropy core treats the
//! encoded stream as opaque bytes.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const WORD_CODE: u8 = 0xFE;
const ESCAPE: u8 = 0xFF;
/// 3-byte codes only pay off past this length.
const MIN_WORD_LEN: usize = 4;

/// A word list, one word per line, indexed by file order. Only ASCII-alphabetic
/// words are usable; others keep their slot (indices must match between the
/// encoding and decoding side) but never match.
pub struct Dictionary {
    words: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, u16>,
}

impl Dictionary {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read(path).map_err(|source| Error::Resource {
            path: path.to_path_buf(),
            source,
        })?;
        let mut words = Vec::new();
        let mut index = HashMap::new();
        for line in text.split(|&b| b == b'\n') {
            let word = line.strip_suffix(b"\r").unwrap_or(line);
            if words.len() > usize::from(u16::MAX) {
                break;
            }
            let slot = words.len() as u16;
            if word.len() >= MIN_WORD_LEN && word.iter().all(u8::is_ascii_alphabetic) {
                index.entry(word.to_vec()).or_insert(slot);
            }
            words.push(word.to_vec());
        }
        Ok(Self { words, index })
    }

    #[cfg(test)]
    fn from_words(list: &[&str]) -> Self {
        let words: Vec<Vec<u8>> = list.iter().map(|w| w.as_bytes().to_vec()).collect();
        let mut index = HashMap::new();
        for (i, w) in words.iter().enumerate() {
            if w.len() >= MIN_WORD_LEN && w.iter().all(u8::is_ascii_alphabetic) {
                index.entry(w.clone()).or_insert(i as u16);
            }
        }
        Self { words, index }
    }
}

/// Transformation applied before compression and inverted after decompression.
pub enum Preprocessor {
    Dictionary(Dictionary),
    /// Identity; used when no dictionary is given.
    None,
}

impl Preprocessor {
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let dict = match self {
            Preprocessor::Dictionary(d) => d,
            Preprocessor::None => return data.to_vec(),
        };
        let mut out = Vec::with_capacity(data.len());
        let mut i = 0;
        while i < data.len() {
            let b = data[i];
            if b.is_ascii_alphabetic() {
                let run_end = data[i..]
                    .iter()
                    .position(|c| !c.is_ascii_alphabetic())
                    .map_or(data.len(), |n| i + n);
                let run = &data[i..run_end];
                if run.len() >= MIN_WORD_LEN {
                    if let Some(&code) = dict.index.get(run) {
                        out.push(WORD_CODE);
                        out.extend_from_slice(&code.to_be_bytes());
                        i = run_end;
                        continue;
                    }
                }
                out.extend_from_slice(run);
                i = run_end;
            } else {
                if b == WORD_CODE || b == ESCAPE {
                    out.push(ESCAPE);
                }
                out.push(b);
                i += 1;
            }
        }
        out
    }

    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let dict = match self {
            Preprocessor::Dictionary(d) => d,
            Preprocessor::None => return Ok(data.to_vec()),
        };
        let mut out = Vec::with_capacity(data.len());
        let mut i = 0;
        while i < data.len() {
            match data[i] {
                WORD_CODE => {
                    let raw = data.get(i + 1..i + 3).ok_or(Error::Truncated)?;
                    let code = u16::from_be_bytes([raw[0], raw[1]]);
                    let word = dict.words.get(usize::from(code)).ok_or(Error::Truncated)?;
                    out.extend_from_slice(word);
                    i += 3;
                }
                ESCAPE => {
                    let &b = data.get(i + 1).ok_or(Error::Truncated)?;
                    out.push(b);
                    i += 2;
                }
                b => {
                    out.push(b);
                    i += 1;
                }
            }
        }
        Ok(out)
    }
}
