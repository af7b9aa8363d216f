/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{BlockCodec, InterpolativeBlock, BLOCK_SIZE};
use crate::bits::{BitReader, BitWriter};

/// 128-wide binary packing: one width byte, then every value in that
/// many bits. The portable layout packs the lanes sequentially instead
/// of interleaving them four ways as the SIMD variant does.
pub struct BinaryPackingBlock;

/// Packs `input` in `width`-bit slots; `width * input.len()` is a
/// multiple of 32 for full blocks, so no padding ambiguity arises.
pub(crate) fn pack(input: &[u32], width: u32, out: &mut Vec<u8>) {
    let mut words = Vec::new();
    let bits = {
        let mut bw = BitWriter::new(&mut words);
        for &value in input {
            bw.write(value, width);
        }
        bw.size()
    };
    let base = out.len();
    for word in &words {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.truncate(base + bits.div_ceil(8));
}

/// Inverse of [`pack`]; returns the input past the consumed bytes.
pub(crate) fn unpack<'a>(input: &'a [u8], out: &mut [u32], width: u32) -> &'a [u8] {
    let mut br = BitReader::new(input);
    for slot in out.iter_mut() {
        *slot = br.read(width);
    }
    &input[br.position().div_ceil(8)..]
}

impl BlockCodec for BinaryPackingBlock {
    fn encode(input: &[u32], sum_of_values: Option<u32>, out: &mut Vec<u8>) {
        debug_assert!(input.len() <= BLOCK_SIZE);
        if input.len() < BLOCK_SIZE {
            return InterpolativeBlock::encode(input, sum_of_values, out);
        }
        let max = input.iter().copied().max().unwrap_or(0);
        let width = if max == 0 { 0 } else { 32 - max.leading_zeros() };
        out.push(width as u8);
        if width > 0 {
            pack(input, width, out);
        }
    }

    fn decode<'a>(input: &'a [u8], out: &mut [u32], sum_of_values: Option<u32>) -> &'a [u8] {
        debug_assert!(out.len() <= BLOCK_SIZE);
        if out.len() < BLOCK_SIZE {
            return InterpolativeBlock::decode(input, out, sum_of_values);
        }
        let width = input[0] as u32;
        let input = &input[1..];
        if width == 0 {
            out.fill(0);
            return input;
        }
        unpack(input, out, width)
    }
}
