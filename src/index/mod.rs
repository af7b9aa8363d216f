/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Frozen posting indexes: the Elias–Fano family ([`FreqIndex`]) and the
//! block-codec family ([`BlockFreqIndex`](block::BlockFreqIndex)).

pub mod block;
mod freq_index;

pub use freq_index::{
    EfIndex, EfIndexBuilder, FreqIndex, FreqIndexBuilder, FreqIndexCursor, OptIndex,
    OptIndexBuilder, UniformIndex, UniformIndexBuilder,
};

use anyhow::Result;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Capacity of the prepared-job channel; bounds the memory held by
/// prepared-but-uncommitted buffers and applies backpressure to the
/// workers.
const PREPARE_QUEUE_CAPACITY: usize = 4096;

/// Runs `prepare` over the jobs in a worker pool and hands the results
/// to `commit` on this thread in input order, so the layout of the
/// output is deterministic regardless of scheduling. Results arriving
/// out of order are parked in a reorder buffer until their turn.
pub(crate) fn prepare_commit<I: Sync, T: Send>(
    jobs: &[I],
    prepare: impl Fn(&I) -> Result<T> + Sync,
    mut commit: impl FnMut(T) -> Result<()> + Send,
    mut progress: impl FnMut(usize) + Send,
) -> Result<()> {
    let (tx, rx) = crossbeam_channel::bounded::<(usize, Result<T>)>(PREPARE_QUEUE_CAPACITY);
    let mut failure: Option<anyhow::Error> = None;

    rayon::scope(|scope| {
        let prepare = &prepare;
        scope.spawn(move |_| {
            jobs.par_iter().enumerate().for_each_with(tx, |tx, (i, job)| {
                // send only fails when the committer bailed out
                let _ = tx.send((i, prepare(job)));
            });
        });

        // single committer, reordering out-of-order arrivals
        let mut pending: BTreeMap<usize, Result<T>> = BTreeMap::new();
        let mut next_id = 0usize;
        for (i, result) in rx.iter() {
            pending.insert(i, result);
            while let Some(result) = pending.remove(&next_id) {
                next_id += 1;
                if failure.is_none() {
                    match result.and_then(&mut commit) {
                        Ok(()) => progress(1),
                        Err(error) => failure = Some(error),
                    }
                }
            }
        }
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// The universal posting-list cursor interface: all index families and
/// their scored wrappers expose these operations, and the exhausted
/// cursor parks at `docid() == num_docs`.
pub trait PostingCursor {
    /// The current document, or the number of documents when exhausted.
    fn docid(&self) -> u64;

    /// The frequency of the current posting. Takes `&mut self` because
    /// block indexes decode the frequency block lazily.
    fn freq(&mut self) -> u64;

    /// Advances to the next posting.
    fn next(&mut self);

    /// Advances to the first posting with document `≥ lower_bound`.
    fn next_geq(&mut self, lower_bound: u64);

    /// The length of the posting list.
    fn size(&self) -> u64;
}

/// Dispatches a block of code over the index type named at runtime,
/// binding `$index` to the parsed index. The tools use this to
/// instantiate their generic drivers for every index family.
#[macro_export]
macro_rules! with_index_type {
    ($type_name:expr, $words:expr, |$index:ident| $body:expr) => {{
        use $crate::index::block::*;
        use $crate::index::*;
        match $type_name {
            "ef" => {
                let $index = EfIndex::parse($words)?;
                $body
            }
            "uniform" => {
                let $index = UniformIndex::parse($words)?;
                $body
            }
            "opt" => {
                let $index = OptIndex::parse($words)?;
                $body
            }
            "block_optpfor" => {
                let $index = BlockFreqIndex::<OptPForBlock>::parse($words)?;
                $body
            }
            "block_packed" => {
                let $index = BlockFreqIndex::<BinaryPackingBlock>::parse($words)?;
                $body
            }
            "block_streamvbyte" => {
                let $index = BlockFreqIndex::<StreamVByteBlock>::parse($words)?;
                $body
            }
            "block_maskedvbyte" => {
                let $index = BlockFreqIndex::<MaskedVByteBlock>::parse($words)?;
                $body
            }
            "block_varintgb" => {
                let $index = BlockFreqIndex::<VarintGbBlock>::parse($words)?;
                $body
            }
            "block_varintg8iu" => {
                let $index = BlockFreqIndex::<VarintG8IuBlock>::parse($words)?;
                $body
            }
            "block_simple8b" => {
                let $index = BlockFreqIndex::<Simple8bBlock>::parse($words)?;
                $body
            }
            "block_simple16" => {
                let $index = BlockFreqIndex::<Simple16Block>::parse($words)?;
                $body
            }
            "block_interpolative" => {
                let $index = BlockFreqIndex::<InterpolativeBlock>::parse($words)?;
                $body
            }
            other => anyhow::bail!("unknown index type {}", other),
        }
    }};
}

/// The builder-side companion of [`with_index_type!`]: binds `$builder`
/// to a fresh builder of the named type. All builders share the
/// `add_posting_list`/`build` surface.
#[macro_export]
macro_rules! with_index_builder {
    ($type_name:expr, $num_docs:expr, $params:expr, |$builder:ident| $body:expr) => {{
        use $crate::index::block::*;
        use $crate::index::*;
        match $type_name {
            "ef" => {
                let mut $builder = EfIndexBuilder::new($num_docs, $params);
                $body
            }
            "uniform" => {
                let mut $builder = UniformIndexBuilder::new($num_docs, $params);
                $body
            }
            "opt" => {
                let mut $builder = OptIndexBuilder::new($num_docs, $params);
                $body
            }
            "block_optpfor" => {
                let mut $builder = BlockFreqIndexBuilder::<OptPForBlock>::new($num_docs, $params);
                $body
            }
            "block_packed" => {
                let mut $builder =
                    BlockFreqIndexBuilder::<BinaryPackingBlock>::new($num_docs, $params);
                $body
            }
            "block_streamvbyte" => {
                let mut $builder =
                    BlockFreqIndexBuilder::<StreamVByteBlock>::new($num_docs, $params);
                $body
            }
            "block_maskedvbyte" => {
                let mut $builder =
                    BlockFreqIndexBuilder::<MaskedVByteBlock>::new($num_docs, $params);
                $body
            }
            "block_varintgb" => {
                let mut $builder = BlockFreqIndexBuilder::<VarintGbBlock>::new($num_docs, $params);
                $body
            }
            "block_varintg8iu" => {
                let mut $builder =
                    BlockFreqIndexBuilder::<VarintG8IuBlock>::new($num_docs, $params);
                $body
            }
            "block_simple8b" => {
                let mut $builder = BlockFreqIndexBuilder::<Simple8bBlock>::new($num_docs, $params);
                $body
            }
            "block_simple16" => {
                let mut $builder = BlockFreqIndexBuilder::<Simple16Block>::new($num_docs, $params);
                $body
            }
            "block_interpolative" => {
                let mut $builder =
                    BlockFreqIndexBuilder::<InterpolativeBlock>::new($num_docs, $params);
                $body
            }
            other => anyhow::bail!("unknown index type {}", other),
        }
    }};
}

/// The index type names accepted by [`with_index_type!`].
pub const INDEX_TYPES: [&str; 12] = [
    "ef",
    "uniform",
    "opt",
    "block_optpfor",
    "block_packed",
    "block_streamvbyte",
    "block_maskedvbyte",
    "block_varintgb",
    "block_varintg8iu",
    "block_simple8b",
    "block_simple16",
    "block_interpolative",
];

/// A frozen index able to open posting cursors; implemented by both the
/// Elias–Fano and the block families so that cursor factories and query
/// operators are family-agnostic.
pub trait PostingIndex<'a> {
    type Cursor: PostingCursor + Clone;

    fn num_docs(&self) -> u64;

    /// The number of posting lists.
    fn num_terms(&self) -> u64;

    fn postings(&self, term: u64) -> Result<Self::Cursor>;
}

/// Replays `collection` against `index`, checking every posting; the
/// regression check used after builds.
pub fn verify_against_collection<C: PostingCursor>(
    collection: &crate::collection::BinaryFreqCollection,
    index_len: u64,
    mut postings: impl FnMut(u64) -> Result<C>,
) -> Result<()> {
    use anyhow::ensure;
    ensure!(
        index_len == collection.iter().count() as u64,
        "index has {} lists, collection has {}",
        index_len,
        collection.iter().count()
    );
    for (term, sequence) in collection.iter().enumerate() {
        let mut cursor = postings(term as u64)?;
        ensure!(
            cursor.size() == sequence.docs.len() as u64,
            "list {}: size {} != {}",
            term,
            cursor.size(),
            sequence.docs.len()
        );
        for (i, (&d, &f)) in sequence.docs.iter().zip(sequence.freqs.iter()).enumerate() {
            ensure!(
                cursor.docid() == d as u64,
                "list {} position {}: docid {} != {}",
                term,
                i,
                cursor.docid(),
                d
            );
            let freq = cursor.freq();
            ensure!(
                freq == f as u64,
                "list {} position {}: freq {} != {}",
                term,
                i,
                freq,
                f
            );
            cursor.next();
        }
    }
    Ok(())
}
