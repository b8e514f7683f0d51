//! DFloat11 decode engine (CPU).
//!
//! Every group in a bundle is independently decodable: its resume point
//! `(byte_offset, bit_gap)` positions a cursor mid-stream and its first
//! output element says where the reconstructed words land. Sequential
//! decode walks the groups in order; parallel decode hands contiguous
//! runs of groups to scoped threads, splitting the output at group
//! element boundaries so no two threads share a slot.

use crate::bf16;
use crate::bundle::Bundle;
use crate::table::DecodeTables;
use crate::{Df11Error, Df11Result};

/// Decode an entire bundle into a freshly allocated tensor.
pub fn decode(bundle: &Bundle) -> Df11Result<Vec<u16>> {
    let mut out = vec![0u16; bundle.n_elements];
    decode_into(bundle, &mut out)?;
    Ok(out)
}

/// Decode an entire bundle into the caller's buffer, sequentially.
///
/// `out` must hold at least `n_elements` slots; only the first
/// `n_elements` are written.
pub fn decode_into(bundle: &Bundle, out: &mut [u16]) -> Df11Result<()> {
    bundle.validate()?;
    if out.len() < bundle.n_elements {
        return Err(Df11Error::BufferTooSmall);
    }
    let tables = bundle.tables()?;

    for g in 0..bundle.n_groups() {
        let (first, count) = bundle.group_range(g);
        decode_group(
            &tables,
            &bundle.codes,
            &bundle.sign_mantissa,
            bundle.position_offsets[g],
            bundle.gaps[g],
            first,
            &mut out[first..first + count],
        );
    }
    Ok(())
}

/// Decode an entire bundle using up to `num_threads` scoped threads.
///
/// Groups are dealt out in contiguous runs so each thread's stream reads
/// and output writes stay sequential. Produces bit-identical output to
/// [`decode_into`].
pub fn decode_parallel(bundle: &Bundle, out: &mut [u16], num_threads: usize) -> Df11Result<()> {
    bundle.validate()?;
    if out.len() < bundle.n_elements {
        return Err(Df11Error::BufferTooSmall);
    }
    let tables = bundle.tables()?;

    let n_groups = bundle.n_groups();
    if n_groups == 0 {
        return Ok(());
    }
    let threads = num_threads.clamp(1, n_groups);
    let groups_per_thread = n_groups.div_ceil(threads);

    std::thread::scope(|scope| {
        let mut rest = &mut out[..bundle.n_elements];
        let mut consumed = 0usize;
        let mut g = 0usize;
        while g < n_groups {
            let g_end = (g + groups_per_thread).min(n_groups);
            let chunk_end = if g_end == n_groups {
                bundle.n_elements
            } else {
                bundle.output_positions[g_end] as usize
            };
            let (chunk, tail) = rest.split_at_mut(chunk_end - consumed);
            rest = tail;

            let tables = &tables;
            let base = consumed;
            scope.spawn(move || {
                for group in g..g_end {
                    let (first, count) = bundle.group_range(group);
                    decode_group(
                        tables,
                        &bundle.codes,
                        &bundle.sign_mantissa,
                        bundle.position_offsets[group],
                        bundle.gaps[group],
                        first,
                        &mut chunk[first - base..first - base + count],
                    );
                }
            });

            consumed = chunk_end;
            g = g_end;
        }
    });
    Ok(())
}

/// Decode one group's worth of elements.
///
/// The cursor starts `gap` bits into the byte at `byte_offset` and
/// advances by each symbol's consumed bit count. Every decoded exponent
/// is paired with its element's raw sign/mantissa byte to reassemble the
/// bfloat16 word.
pub fn decode_group(
    tables: &DecodeTables,
    codes: &[u8],
    sign_mantissa: &[u8],
    byte_offset: u32,
    gap: u8,
    first_element: usize,
    out: &mut [u16],
) {
    let mut byte = byte_offset as usize;
    let mut bit = gap as u32;

    for (i, slot) in out.iter_mut().enumerate() {
        let (symbol, consumed) = tables.lookup(codes, byte, bit as u8);
        let advanced = bit + consumed;
        byte += (advanced / 8) as usize;
        bit = advanced % 8;
        *slot = bf16::assemble(symbol, sign_mantissa[first_element + i]);
    }
}
