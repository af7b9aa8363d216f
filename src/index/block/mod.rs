/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The block-codec index family: posting lists chopped into blocks of
//! 128 postings, each block encoded by one of the toolbox codecs, with a
//! skip table of per-block last documents and byte endpoints.
//!
//! Every codec implements the same contract ([`BlockCodec`]): full
//! blocks use the codec's native encoding, short tails fall back to
//! binary interpolative coding. A type-erased [`BlockCodecKind`] tag
//! with function-pointer dispatch supports runtime codec selection.

mod binary_packing;
mod block_index;
mod interpolative;
mod optpfor;
mod simple;
mod varint;

pub use binary_packing::BinaryPackingBlock;
pub use block_index::{BlockFreqIndex, BlockFreqIndexBuilder, BlockPostingCursor};
pub use interpolative::InterpolativeBlock;
pub use optpfor::OptPForBlock;
pub use simple::{Simple16Block, Simple8bBlock};
pub use varint::{
    MaskedVByteBlock, StreamVByteBlock, TightVariableByte, VarintG8IuBlock, VarintGbBlock,
};

/// Number of postings per block; the last block of a list may be
/// shorter.
pub const BLOCK_SIZE: usize = 128;

/// A fixed-size block codec.
///
/// `sum_of_values` is the sum of the encoded values when the caller
/// knows it (document gaps) and `None` when it does not (frequencies);
/// codecs that need it in the latter case store it themselves.
pub trait BlockCodec {
    /// Appends the encoding of `input` (at most [`BLOCK_SIZE`] values)
    /// to `out`.
    fn encode(input: &[u32], sum_of_values: Option<u32>, out: &mut Vec<u8>);

    /// Decodes `out.len()` values, returning the rest of the input.
    fn decode<'a>(input: &'a [u8], out: &mut [u32], sum_of_values: Option<u32>) -> &'a [u8];
}

/// Type-erased decoding entry point of a codec.
pub type DecodeFn = for<'a> fn(&'a [u8], &mut [u32], Option<u32>) -> &'a [u8];
/// Type-erased encoding entry point of a codec.
pub type EncodeFn = fn(&[u32], Option<u32>, &mut Vec<u8>);

/// Runtime tag over the codec toolbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCodecKind {
    OptPFor,
    BinaryPacking,
    StreamVByte,
    MaskedVByte,
    VarintGb,
    VarintG8Iu,
    Simple8b,
    Simple16,
    Interpolative,
}

impl BlockCodecKind {
    pub const ALL: [BlockCodecKind; 9] = [
        BlockCodecKind::OptPFor,
        BlockCodecKind::BinaryPacking,
        BlockCodecKind::StreamVByte,
        BlockCodecKind::MaskedVByte,
        BlockCodecKind::VarintGb,
        BlockCodecKind::VarintG8Iu,
        BlockCodecKind::Simple8b,
        BlockCodecKind::Simple16,
        BlockCodecKind::Interpolative,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BlockCodecKind::OptPFor => "block_optpfor",
            BlockCodecKind::BinaryPacking => "block_packed",
            BlockCodecKind::StreamVByte => "block_streamvbyte",
            BlockCodecKind::MaskedVByte => "block_maskedvbyte",
            BlockCodecKind::VarintGb => "block_varintgb",
            BlockCodecKind::VarintG8Iu => "block_varintg8iu",
            BlockCodecKind::Simple8b => "block_simple8b",
            BlockCodecKind::Simple16 => "block_simple16",
            BlockCodecKind::Interpolative => "block_interpolative",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn encode_fn(&self) -> EncodeFn {
        match self {
            BlockCodecKind::OptPFor => OptPForBlock::encode,
            BlockCodecKind::BinaryPacking => BinaryPackingBlock::encode,
            BlockCodecKind::StreamVByte => StreamVByteBlock::encode,
            BlockCodecKind::MaskedVByte => MaskedVByteBlock::encode,
            BlockCodecKind::VarintGb => VarintGbBlock::encode,
            BlockCodecKind::VarintG8Iu => VarintG8IuBlock::encode,
            BlockCodecKind::Simple8b => Simple8bBlock::encode,
            BlockCodecKind::Simple16 => Simple16Block::encode,
            BlockCodecKind::Interpolative => InterpolativeBlock::encode,
        }
    }

    pub fn decode_fn(&self) -> DecodeFn {
        match self {
            BlockCodecKind::OptPFor => OptPForBlock::decode,
            BlockCodecKind::BinaryPacking => BinaryPackingBlock::decode,
            BlockCodecKind::StreamVByte => StreamVByteBlock::decode,
            BlockCodecKind::MaskedVByte => MaskedVByteBlock::decode,
            BlockCodecKind::VarintGb => VarintGbBlock::decode,
            BlockCodecKind::VarintG8Iu => VarintG8IuBlock::decode,
            BlockCodecKind::Simple8b => Simple8bBlock::decode,
            BlockCodecKind::Simple16 => Simple16Block::decode,
            BlockCodecKind::Interpolative => InterpolativeBlock::decode,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_blocks() -> Vec<Vec<u32>> {
        let mut state = 0x2545f4914f6cdd1du64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        let mut blocks = vec![
            vec![0u32; BLOCK_SIZE],
            vec![1u32; BLOCK_SIZE],
            (0..BLOCK_SIZE as u32).collect(),
            vec![0, 5, 2, 0, 1000],
            vec![42],
            vec![u32::MAX >> 4; 7],
        ];
        // small values with occasional spikes
        blocks.push(
            (0..BLOCK_SIZE)
                .map(|_| {
                    let v = next();
                    if v % 17 == 0 {
                        (v >> 40) as u32
                    } else {
                        (v % 11) as u32
                    }
                })
                .collect(),
        );
        // wide values, bounded so that block prefix sums stay in 32 bits
        blocks.push((0..BLOCK_SIZE).map(|_| (next() >> 40) as u32).collect());
        blocks
    }

    pub(crate) fn check_codec(encode: EncodeFn, decode: DecodeFn) {
        for block in sample_blocks() {
            let sum: u64 = block.iter().map(|&v| v as u64).sum();
            let sums = if sum <= u32::MAX as u64 {
                vec![Some(sum as u32), None]
            } else {
                vec![None]
            };
            for sum_of_values in sums {
                let mut out = Vec::new();
                encode(&block, sum_of_values, &mut out);
                // trailing bytes must be returned untouched
                out.extend_from_slice(&[0xAB, 0xCD]);

                let mut decoded = vec![0u32; block.len()];
                let rest = decode(&out, &mut decoded, sum_of_values);
                assert_eq!(decoded, block, "sum_of_values {:?}", sum_of_values);
                assert_eq!(rest, &[0xAB, 0xCD], "sum_of_values {:?}", sum_of_values);
            }
        }
    }
}
