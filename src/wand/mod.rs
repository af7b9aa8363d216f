/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! WAND data: per-term maximum impacts, per-block maximum impacts with
//! fixed or score-optimized boundaries, normalized document lengths, and
//! the collection statistics the scorers need. The per-block channel
//! comes in two variants: [`WandDataRaw`] stores `(last docid, max
//! score)` pairs verbatim, [`WandDataCompressed`] quantizes the maxima
//! and packs each pair into a single Elias–Fano-coded integer.

mod compressed;
mod partitioning;
mod quantizer;
mod raw;

pub use compressed::{WandCompressedCursor, WandDataCompressed};
pub use partitioning::{static_block_partition, variable_block_partition};
pub use quantizer::LinearQuantizer;
pub use raw::{WandDataRaw, WandRawCursor};

use crate::collection::BinaryFreqCollection;
use crate::config::{GlobalParameters, IndexConfig};
use crate::mapper::{MapSink, MapSource};
use crate::scorer::{CollectionStatistics, Scorer, TermScorer, TermStatistics};
use anyhow::{ensure, Context, Result};
use dsi_progress_logger::prelude::*;
use rayon::prelude::*;

/// How per-term score blocks are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPartition {
    /// Blocks of a fixed number of postings.
    Fixed,
    /// Score-aware boundaries from the windowed partition DP.
    Variable,
}

/// A cursor over the `(last docid, block max)` pairs of one term.
pub trait WandBlockCursor: Clone {
    /// The last document covered by the current block.
    fn docid(&self) -> u64;

    /// The maximum impact within the current block.
    fn score(&mut self) -> f32;

    /// Aligns the cursor to the block containing `lower_bound`.
    fn next_geq(&mut self, lower_bound: u64);
}

/// The per-block storage variant of the WAND data.
pub trait WandDataVariant<'a>: Sized {
    type Cursor: WandBlockCursor;

    fn parse(source: &mut MapSource<'a>, params: &GlobalParameters) -> Result<Self>;

    fn block_max_cursor(&self, term: u64) -> Result<Self::Cursor>;
}

/// Frozen WAND data, generic over the block-max storage variant.
pub struct WandData<'a, V> {
    collection: CollectionStatistics,
    norm_lens: &'a [f32],
    max_term_weights: &'a [f32],
    term_occurrences: &'a [u64],
    variant: V,
}

impl<'a, V: WandDataVariant<'a>> WandData<'a, V> {
    pub fn parse(words: &'a [u64]) -> Result<Self> {
        let mut source = MapSource::new(words)?;
        let params = GlobalParameters {
            ef_log_sampling0: source.read_u64()? as u8,
            ef_log_sampling1: source.read_u64()? as u8,
            rb_log_rank1_sampling: source.read_u64()? as u8,
            rb_log_sampling1: source.read_u64()? as u8,
            log_partition_size: source.read_u64()? as u8,
        };
        let num_docs = source.read_u64()?;
        let collection_len = source.read_u64()?;
        let avg_len = f32::from_bits(source.read_u64()? as u32);
        let norm_lens = source.read_f32_slice().context("cannot parse norm lengths")?;
        let max_term_weights = source
            .read_f32_slice()
            .context("cannot parse max term weights")?;
        let term_occurrences = source
            .read_u64_slice()
            .context("cannot parse term occurrence counts")?;
        ensure!(
            norm_lens.len() as u64 == num_docs,
            "norm length table does not match num_docs"
        );
        let variant = V::parse(&mut source, &params)?;
        Ok(Self {
            collection: CollectionStatistics {
                num_docs,
                avg_len,
                collection_len,
            },
            norm_lens,
            max_term_weights,
            term_occurrences,
            variant,
        })
    }

    #[inline(always)]
    pub fn collection_statistics(&self) -> CollectionStatistics {
        self.collection
    }

    #[inline(always)]
    pub fn num_docs(&self) -> u64 {
        self.collection.num_docs
    }

    #[inline(always)]
    pub fn norm_len(&self, docid: u64) -> f32 {
        self.norm_lens[docid as usize]
    }

    #[inline(always)]
    pub fn norm_lens(&self) -> &'a [f32] {
        self.norm_lens
    }

    #[inline(always)]
    pub fn max_term_weight(&self, term: u64) -> f32 {
        self.max_term_weights[term as usize]
    }

    pub fn term_statistics(&self, term: u64, doc_freq: u64) -> TermStatistics {
        TermStatistics {
            doc_freq,
            occurrences: self.term_occurrences[term as usize],
        }
    }

    pub fn block_max_cursor(&self, term: u64) -> Result<V::Cursor> {
        self.variant.block_max_cursor(term)
    }
}

/// Per-term data produced by the block partitioning pass.
pub(crate) struct TermBlocks {
    pub(crate) max_weight: f32,
    pub(crate) occurrences: u64,
    pub(crate) block_docids: Vec<u32>,
    pub(crate) block_maxes: Vec<f32>,
}

/// Normalized lengths and collection statistics from a `.sizes` vector.
pub fn normalize_lengths(sizes: &[u32]) -> (Vec<f32>, CollectionStatistics) {
    let collection_len: u64 = sizes.iter().map(|&s| s as u64).sum();
    let avg_len = collection_len as f32 / sizes.len() as f32;
    let norm_lens: Vec<f32> = sizes.iter().map(|&s| s as f32 / avg_len).collect();
    (
        norm_lens,
        CollectionStatistics {
            num_docs: sizes.len() as u64,
            avg_len,
            collection_len,
        },
    )
}

pub(crate) fn compute_term_blocks<S: Scorer>(
    collection: &BinaryFreqCollection,
    norm_lens: &[f32],
    stats: CollectionStatistics,
    scorer: &S,
    partition: BlockPartition,
    config: &IndexConfig,
) -> Result<Vec<TermBlocks>> {
    let lists: Vec<_> = collection.iter().collect();

    let mut pl = progress_logger![item_name = "list", expected_updates = Some(lists.len())];
    pl.start("Computing block upper bounds...");

    let blocks: Vec<Result<TermBlocks>> = lists
        .par_iter()
        .map(|sequence| {
            ensure!(
                sequence.docs.len() == sequence.freqs.len(),
                "docs/freqs length mismatch"
            );
            let occurrences: u64 = sequence.freqs.iter().map(|&f| f as u64).sum();
            let term_scorer = scorer.term_scorer(
                TermStatistics {
                    doc_freq: sequence.docs.len() as u64,
                    occurrences,
                },
                stats,
            );
            let scores: Vec<f32> = sequence
                .docs
                .iter()
                .zip(sequence.freqs.iter())
                .map(|(&d, &f)| term_scorer.score(f as u64, norm_lens[d as usize]))
                .collect();
            let max_weight = scores.iter().copied().fold(0.0f32, f32::max);

            let (block_docids, block_maxes) = match partition {
                BlockPartition::Fixed => {
                    static_block_partition(sequence.docs, &scores, config.wand_block_size)
                }
                BlockPartition::Variable => variable_block_partition(
                    sequence.docs,
                    &scores,
                    config.eps1_wand,
                    config.eps2_wand,
                    config.fixed_cost_wand_partition,
                ),
            };

            Ok(TermBlocks {
                max_weight,
                occurrences,
                block_docids,
                block_maxes,
            })
        })
        .collect();
    pl.done();

    blocks.into_iter().collect()
}

pub(crate) fn push_common_fields(
    sink: &mut MapSink,
    params: &GlobalParameters,
    stats: &CollectionStatistics,
    norm_lens: &[f32],
    term_blocks: &[TermBlocks],
) {
    sink.push_u64(params.ef_log_sampling0 as u64);
    sink.push_u64(params.ef_log_sampling1 as u64);
    sink.push_u64(params.rb_log_rank1_sampling as u64);
    sink.push_u64(params.rb_log_sampling1 as u64);
    sink.push_u64(params.log_partition_size as u64);
    sink.push_u64(stats.num_docs);
    sink.push_u64(stats.collection_len);
    sink.push_u64(stats.avg_len.to_bits() as u64);
    sink.push_f32_slice(norm_lens);
    let max_weights: Vec<f32> = term_blocks.iter().map(|b| b.max_weight).collect();
    sink.push_f32_slice(&max_weights);
    let occurrences: Vec<u64> = term_blocks.iter().map(|b| b.occurrences).collect();
    sink.push_u64_slice(&occurrences);
}

/// Builds the raw (uncompressed per-block channel) WAND data blob.
pub fn build_wand_data_raw<S: Scorer>(
    collection: &BinaryFreqCollection,
    sizes: &[u32],
    scorer: &S,
    partition: BlockPartition,
    config: &IndexConfig,
    params: &GlobalParameters,
) -> Result<MapSink> {
    let (norm_lens, stats) = normalize_lengths(sizes);
    let term_blocks =
        compute_term_blocks(collection, &norm_lens, stats, scorer, partition, config)?;

    let mut sink = MapSink::new();
    push_common_fields(&mut sink, params, &stats, &norm_lens, &term_blocks);
    raw::freeze(&mut sink, &term_blocks);
    Ok(sink)
}

/// Builds the quantized, Elias–Fano-compressed WAND data blob.
pub fn build_wand_data_compressed<S: Scorer>(
    collection: &BinaryFreqCollection,
    sizes: &[u32],
    scorer: &S,
    partition: BlockPartition,
    config: &IndexConfig,
    params: &GlobalParameters,
) -> Result<MapSink> {
    let (norm_lens, stats) = normalize_lengths(sizes);
    let term_blocks =
        compute_term_blocks(collection, &norm_lens, stats, scorer, partition, config)?;

    let mut sink = MapSink::new();
    push_common_fields(&mut sink, params, &stats, &norm_lens, &term_blocks);
    compressed::freeze(&mut sink, &term_blocks, stats.num_docs, config, params)?;
    Ok(sink)
}
