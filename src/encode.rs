//! DFloat11 encoder.
//!
//! Builds a Huffman code over the exponent bytes of a bfloat16 tensor,
//! shapes it into chained 8-bit window tables, packs the codes MSB-first,
//! and records a resume point at every group boundary so decode lanes can
//! enter the bitstream independently.
//!
//! Code shaping works per table level. A symbol whose unconstrained
//! Huffman length is `len` starts at level `(len - 1) / 8` with a
//! relative length of `len - 8 * level`, clamped to `[1, 8]`. Each level
//! must satisfy the Kraft condition over its 256-window table (one
//! window reserved for the escape when a deeper level exists); symbols
//! are lengthened or demoted a level until it does, then high-frequency
//! symbols are shortened back into any remaining slack.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::bf16;
use crate::bundle::Bundle;
use crate::frequency::FrequencyTable;
use crate::table::{DecodeTables, LutEntry, MAX_LUTS, WINDOW_SIZE};
use crate::{Df11Error, Df11Result};

/// Encoder tuning knobs.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Elements per decode group. Smaller groups expose more
    /// parallelism; larger groups amortize the resume metadata.
    pub group_size: usize,
    /// Maximum number of chained tables to emit (1..=4).
    pub max_luts: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            group_size: 256,
            max_luts: MAX_LUTS,
        }
    }
}

/// Encode a bfloat16 tensor with the default configuration.
pub fn encode(values: &[u16]) -> Bundle {
    // The default config is always valid.
    encode_with(values, &EncoderConfig::default()).unwrap()
}

/// Encode a bfloat16 tensor with an explicit configuration.
pub fn encode_with(values: &[u16], cfg: &EncoderConfig) -> Df11Result<Bundle> {
    if cfg.group_size == 0 || cfg.max_luts == 0 || cfg.max_luts > MAX_LUTS {
        return Err(Df11Error::InvalidBundle);
    }

    let mut exponents = Vec::with_capacity(values.len());
    let mut sign_mantissa = Vec::with_capacity(values.len());
    for &word in values {
        let (exp, sm) = bf16::split(word);
        exponents.push(exp);
        sign_mantissa.push(sm);
    }

    let mut freq = FrequencyTable::new();
    freq.count_bytes(&exponents);

    let lengths = huffman_lengths(&freq);
    let code_book = CodeBook::build(&freq, &lengths, cfg.max_luts);

    let mut writer = BitWriter::new();
    let mut position_offsets = Vec::new();
    let mut gaps = Vec::new();
    let mut output_positions = Vec::new();

    for (i, &exp) in exponents.iter().enumerate() {
        if i % cfg.group_size == 0 {
            let (byte, bit) = writer.position();
            position_offsets.push(byte);
            gaps.push(bit);
            output_positions.push(i as u32);
        }
        let code = code_book.codes[exp as usize];
        writer.write(code.bits, code.len);
    }

    Ok(Bundle {
        luts: code_book.tables.as_bytes(),
        n_luts: code_book.tables.n_luts(),
        codes: writer.into_bytes(),
        sign_mantissa,
        position_offsets,
        gaps,
        output_positions,
        n_elements: values.len(),
    })
}

/// Unconstrained Huffman code lengths for each symbol (0 = unused).
///
/// Standard two-queue-free construction: a min-heap of `(count, node)`
/// pairs, a parent array, and a final walk from each leaf to the root.
fn huffman_lengths(freq: &FrequencyTable) -> [u8; 256] {
    let mut lengths = [0u8; 256];
    if freq.used == 0 {
        return lengths;
    }
    if freq.used == 1 {
        for sym in 0..256 {
            if freq.count[sym] > 0 {
                lengths[sym] = 1;
            }
        }
        return lengths;
    }

    // Nodes 0..256 are leaves; internal nodes are appended after.
    let mut parent = vec![usize::MAX; 256];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = (0..256)
        .filter(|&sym| freq.count[sym] > 0)
        .map(|sym| Reverse((freq.count[sym], sym)))
        .collect();

    while heap.len() > 1 {
        let Reverse((ca, a)) = heap.pop().unwrap();
        let Reverse((cb, b)) = heap.pop().unwrap();
        let node = parent.len();
        parent.push(usize::MAX);
        parent[a] = node;
        parent[b] = node;
        heap.push(Reverse((ca + cb, node)));
    }

    for sym in 0..256 {
        if freq.count[sym] == 0 {
            continue;
        }
        let mut depth = 0u8;
        let mut node = sym;
        while parent[node] != usize::MAX {
            node = parent[node];
            depth += 1;
        }
        lengths[sym] = depth;
    }
    lengths
}

/// Full code for one symbol: `8 * level` leading one-bits (the escape
/// prefix) followed by the symbol's window code.
#[derive(Debug, Clone, Copy, Default)]
struct SymbolCode {
    bits: u32,
    len: u32,
}

struct CodeBook {
    codes: [SymbolCode; 256],
    tables: DecodeTables,
}

impl CodeBook {
    fn build(freq: &FrequencyTable, lengths: &[u8; 256], max_luts: usize) -> Self {
        // Per-symbol level and relative (in-window) length.
        let mut level = [0usize; 256];
        let mut rel = [0u8; 256];
        for sym in 0..256 {
            let len = lengths[sym];
            if len == 0 {
                continue;
            }
            let lv = (((len as usize) - 1) / 8).min(max_luts - 1);
            level[sym] = lv;
            rel[sym] = (len as usize).saturating_sub(8 * lv).clamp(1, 8) as u8;
        }

        let n_levels = repair_levels(freq, lengths, &mut level, &mut rel, max_luts);

        // Canonical window assignment per level, lowest windows first,
        // sorted by (relative length, symbol) for determinism.
        let mut codes = [SymbolCode::default(); 256];
        let mut tables = vec![[LutEntry { symbol: 0, bits: 8 }; WINDOW_SIZE]; n_levels];
        for lv in 0..n_levels {
            let mut members: Vec<usize> = (0..256)
                .filter(|&s| lengths[s] > 0 && level[s] == lv)
                .collect();
            members.sort_by_key(|&s| (rel[s], s));

            let mut next_window = 0usize;
            for &sym in &members {
                let r = rel[sym] as u32;
                let weight = 1usize << (8 - r);
                for w in next_window..next_window + weight {
                    tables[lv][w] = LutEntry {
                        symbol: sym as u8,
                        bits: r as u8,
                    };
                }
                let window_code = (next_window >> (8 - r)) as u32;
                let prefix_bits = 8 * lv as u32;
                let prefix = if prefix_bits == 0 {
                    0
                } else {
                    ((1u64 << prefix_bits) - 1) as u32
                };
                codes[sym] = SymbolCode {
                    bits: (prefix << r) | window_code,
                    len: prefix_bits + r,
                };
                next_window += weight;
            }

            if lv + 1 < n_levels {
                tables[lv][0xFF] = LutEntry { symbol: 0, bits: 0 };
            }
        }

        Self {
            codes,
            tables: DecodeTables::new(tables),
        }
    }
}

/// Enforce the per-level Kraft condition, mutating levels and relative
/// lengths in place. Returns the number of levels actually used.
///
/// Window weight of a symbol is `2^(8 - rel)`. A level with a deeper
/// neighbor keeps 255 windows for symbols and one for the escape;
/// the deepest level keeps all 256.
fn repair_levels(
    freq: &FrequencyTable,
    lengths: &[u8; 256],
    level: &mut [usize; 256],
    rel: &mut [u8; 256],
    max_luts: usize,
) -> usize {
    let weight = |r: u8| 1usize << (8 - r as usize);

    for lv in 0..max_luts {
        let cap = if lv + 1 < max_luts {
            WINDOW_SIZE - 1
        } else {
            WINDOW_SIZE
        };

        let members = |level: &[usize; 256]| -> Vec<usize> {
            (0..256)
                .filter(|&s| lengths[s] > 0 && level[s] == lv)
                .collect()
        };

        // Shrink phase: lengthen the rarest symbols, demoting them a
        // level once they hit 8 bits.
        loop {
            let syms = members(level);
            let used: usize = syms.iter().map(|&s| weight(rel[s])).sum();
            if used <= cap {
                break;
            }
            let lengthenable = syms
                .iter()
                .copied()
                .filter(|&s| rel[s] < 8)
                .min_by_key(|&s| (freq.count[s], Reverse(rel[s]), s));
            match lengthenable {
                Some(s) => rel[s] += 1,
                None => {
                    // Everything already sits at 8 bits, so the level is
                    // simply over-full: demote the rarest symbol. Cannot
                    // happen at the deepest level, which fits all 256
                    // symbols at 8 bits each.
                    let victim = syms
                        .iter()
                        .copied()
                        .min_by_key(|&s| (freq.count[s], s))
                        .unwrap();
                    level[victim] = lv + 1;
                    rel[victim] = 8;
                }
            }
        }

        // Grow phase: give slack back to the most frequent symbols.
        loop {
            let syms = members(level);
            let used: usize = syms.iter().map(|&s| weight(rel[s])).sum();
            let candidate = syms
                .iter()
                .copied()
                .filter(|&s| rel[s] > 1 && used + weight(rel[s]) <= cap)
                .max_by_key(|&s| (freq.count[s], Reverse(s)));
            match candidate {
                Some(s) => rel[s] -= 1,
                None => break,
            }
        }
    }

    let deepest = (0..256)
        .filter(|&s| lengths[s] > 0)
        .map(|s| level[s])
        .max()
        .unwrap_or(0);
    deepest + 1
}

/// MSB-first bit packer.
struct BitWriter {
    bytes: Vec<u8>,
    nbits: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            nbits: 0,
        }
    }

    /// Append the low `len` bits of `code`, most significant first.
    fn write(&mut self, code: u32, len: u32) {
        for i in (0..len).rev() {
            if self.nbits % 8 == 0 {
                self.bytes.push(0);
            }
            if (code >> i) & 1 != 0 {
                self.bytes[self.nbits / 8] |= 1 << (7 - self.nbits % 8);
            }
            self.nbits += 1;
        }
    }

    /// Current cursor as `(byte_offset, bit_gap)`.
    fn position(&self) -> (u32, u8) {
        ((self.nbits / 8) as u32, (self.nbits % 8) as u8)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
