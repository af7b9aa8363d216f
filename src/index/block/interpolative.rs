/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{BlockCodec, TightVariableByte, BLOCK_SIZE};
use crate::bits::{BitReader, BitWriter};
use crate::utils::ceil_div;

/// Binary interpolative coding of a block: the values are turned into
/// prefix sums, the last one (the block sum) is either known to the
/// caller or stored as a varint prefix, and the interior sums are
/// recursively coded in centered minimal binary. This is also the
/// fallback every other codec uses for short tail blocks.
pub struct InterpolativeBlock;

impl BlockCodec for InterpolativeBlock {
    fn encode(input: &[u32], sum_of_values: Option<u32>, out: &mut Vec<u8>) {
        let n = input.len();
        debug_assert!(n > 0 && n <= BLOCK_SIZE);
        let mut inbuf = [0u32; BLOCK_SIZE];
        inbuf[0] = input[0];
        for i in 1..n {
            inbuf[i] = inbuf[i - 1] + input[i];
        }

        let sum_of_values = match sum_of_values {
            Some(sum) => sum,
            None => {
                let sum = inbuf[n - 1];
                TightVariableByte::encode_single(sum, out);
                sum
            }
        };

        let mut outbuf = Vec::new();
        let bits = {
            let mut bw = BitWriter::new(&mut outbuf);
            bw.write_interpolative(&inbuf[..n - 1], 0, sum_of_values);
            bw.size()
        };
        let bytes = ceil_div(bits as u64, 8) as usize;
        let base = out.len();
        for word in &outbuf {
            out.extend_from_slice(&word.to_le_bytes());
        }
        // drop the zero padding of the last word
        out.truncate(base + bytes);
    }

    fn decode<'a>(input: &'a [u8], out: &mut [u32], sum_of_values: Option<u32>) -> &'a [u8] {
        let n = out.len();
        debug_assert!(n > 0 && n <= BLOCK_SIZE);
        let (input, sum_of_values) = match sum_of_values {
            Some(sum) => (input, sum),
            None => {
                let mut sum = [0u32];
                let rest = TightVariableByte::decode(input, &mut sum);
                (rest, sum[0])
            }
        };

        out[n - 1] = sum_of_values;
        let mut read_interpolative = 0;
        if n > 1 {
            let mut br = BitReader::new(input);
            br.read_interpolative(&mut out[..n - 1], 0, sum_of_values);
            for i in (1..n).rev() {
                out[i] -= out[i - 1];
            }
            read_interpolative = ceil_div(br.position() as u64, 8) as usize;
        }

        &input[read_interpolative..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::block::tests::check_codec;

    #[test]
    fn test_interpolative_block() {
        check_codec(InterpolativeBlock::encode, InterpolativeBlock::decode);
    }
}
