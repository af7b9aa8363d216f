/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{LinearQuantizer, TermBlocks, WandBlockCursor, WandDataVariant};
use crate::bits::{read_gamma_nonzero, BitVectorBuilder, write_gamma_nonzero};
use crate::collection::{BitVectorCollection, BitVectorCollectionBuilder};
use crate::config::{GlobalParameters, IndexConfig};
use crate::mapper::{MapSink, MapSource};
use crate::sequence::{CompactEliasFano, NextGeqEnumerator, Sequence, SequenceEnumerator};
use anyhow::{ensure, Context, Result};

pub(crate) const VARIANT_TAG: u64 = 1;

/// Quantized per-block channel: each `(last docid, max)` pair becomes
/// the single integer `(docid << q) | (bin − 1)`, and each term's pairs
/// form one Elias–Fano sequence. The quantizer rounds up, so pruning
/// bounds remain safe.
pub struct WandDataCompressed<'a> {
    params: GlobalParameters,
    quantization_bits: u32,
    quantizer: LinearQuantizer,
    universe: u64,
    sequences: BitVectorCollection<'a>,
}

pub(crate) fn freeze(
    sink: &mut MapSink,
    term_blocks: &[TermBlocks],
    num_docs: u64,
    config: &IndexConfig,
    params: &GlobalParameters,
) -> Result<()> {
    let q = config.quantization_bits;
    let max_block_score = term_blocks
        .iter()
        .flat_map(|blocks| blocks.block_maxes.iter().copied())
        .fold(0.0f32, f32::max);
    let quantizer = LinearQuantizer::new(max_block_score.max(f32::MIN_POSITIVE), q);

    let universe = (num_docs + 1) << q;
    let mut sequences = BitVectorCollectionBuilder::new(params);
    for blocks in term_blocks {
        let values: Vec<u64> = blocks
            .block_docids
            .iter()
            .zip(blocks.block_maxes.iter())
            .map(|(&docid, &max)| {
                ((docid as u64) << q) | (quantizer.quantize(max) - 1) as u64
            })
            .collect();
        let mut bits = BitVectorBuilder::new();
        write_gamma_nonzero(&mut bits, values.len() as u64);
        CompactEliasFano::write(&mut bits, &values, universe, params)?;
        sequences.append(&bits);
    }

    sink.push_u64(VARIANT_TAG);
    sink.push_u64(q as u64);
    sink.push_u64(max_block_score.to_bits() as u64);
    sink.push_u64(universe);
    sequences.freeze(sink)?;
    Ok(())
}

impl<'a> WandDataVariant<'a> for WandDataCompressed<'a> {
    type Cursor = WandCompressedCursor<'a>;

    fn parse(source: &mut MapSource<'a>, params: &GlobalParameters) -> Result<Self> {
        let tag = source.read_u64()?;
        ensure!(
            tag == VARIANT_TAG,
            "expected compressed WAND data (tag {}), found tag {}",
            VARIANT_TAG,
            tag
        );
        let quantization_bits = source.read_u64()? as u32;
        let max_block_score = f32::from_bits(source.read_u64()? as u32);
        let universe = source.read_u64()?;
        let sequences =
            BitVectorCollection::parse(source).context("cannot parse block sequences")?;
        Ok(Self {
            params: *params,
            quantization_bits,
            quantizer: LinearQuantizer::new(max_block_score, quantization_bits),
            universe,
            sequences,
        })
    }

    fn block_max_cursor(&self, term: u64) -> Result<Self::Cursor> {
        ensure!(
            term < self.sequences.len(),
            "term {} out of bounds ({})",
            term,
            self.sequences.len()
        );
        let mut it = self.sequences.get(&self.params, term);
        let n = read_gamma_nonzero(&mut it);
        let mut sequence = CompactEliasFano::enumerator(
            self.sequences.bits(),
            it.position(),
            self.universe,
            n,
            &self.params,
        );
        let first = sequence.move_to(0).1;
        Ok(WandCompressedCursor {
            sequence,
            q: self.quantization_bits,
            quantizer: self.quantizer,
            cur_docid: first >> self.quantization_bits,
            cur_bin: (first & ((1 << self.quantization_bits) - 1)) as u32 + 1,
        })
    }
}

/// Cursor over one term's quantized block sequence.
#[derive(Clone)]
pub struct WandCompressedCursor<'a> {
    sequence: crate::sequence::EliasFanoEnumerator<'a>,
    q: u32,
    quantizer: LinearQuantizer,
    cur_docid: u64,
    cur_bin: u32,
}

impl WandBlockCursor for WandCompressedCursor<'_> {
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.cur_docid
    }

    #[inline(always)]
    fn score(&mut self) -> f32 {
        self.quantizer.dequantize(self.cur_bin)
    }

    #[inline]
    fn next_geq(&mut self, lower_bound: u64) {
        if self.cur_docid < lower_bound {
            let value = self.sequence.next_geq(lower_bound << self.q).1;
            self.cur_docid = value >> self.q;
            self.cur_bin = (value & ((1 << self.q) - 1)) as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wand::WandBlockCursor;

    #[test]
    fn test_compressed_roundtrip() {
        let params = GlobalParameters::default();
        let config = IndexConfig::default();
        let term_blocks = vec![
            TermBlocks {
                max_weight: 2.5,
                occurrences: 10,
                block_docids: vec![9, 63, 64, 200],
                block_maxes: vec![1.5, 0.25, 2.5, 1.0],
            },
            TermBlocks {
                max_weight: 0.5,
                occurrences: 3,
                block_docids: vec![128],
                block_maxes: vec![0.5],
            },
        ];

        let mut sink = MapSink::new();
        freeze(&mut sink, &term_blocks, 256, &config, &params).unwrap();
        let words = sink.into_words();

        let mut source = MapSource::new(&words).unwrap();
        let data = WandDataCompressed::parse(&mut source, &params).unwrap();

        for (term, blocks) in term_blocks.iter().enumerate() {
            let mut cursor = data.block_max_cursor(term as u64).unwrap();
            for (&docid, &max) in blocks.block_docids.iter().zip(blocks.block_maxes.iter()) {
                cursor.next_geq(docid as u64);
                assert_eq!(cursor.docid(), docid as u64);
                let bound = cursor.score();
                assert!(bound >= max, "dequantized {} < true {}", bound, max);
                assert!(bound <= max * 1.02 + 0.01, "bound {} too loose for {}", bound, max);
            }
        }
    }
}
