/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{prepare_commit, PostingCursor};
use crate::bits::{read_gamma_nonzero, write_gamma_nonzero, BitVectorBuilder};
use crate::collection::{BitVectorCollection, BitVectorCollectionBuilder, PostingsSequence};
use crate::config::GlobalParameters;
use crate::mapper::{MapSink, MapSource};
use crate::sequence::{
    CompactEliasFano, IndexedSequence, NextGeqEnumerator, PartitionedSequence, PayloadEnumerator,
    PayloadSequence, PositiveSequence, Sequence, SequenceEnumerator, StrictEliasFano,
    StrictSequence, UniformPartitionedSequence,
};
use crate::utils::ceil_log2;
use anyhow::{ensure, Context, Result};
use dsi_progress_logger::prelude::*;
use std::marker::PhantomData;

/// Per-term Elias–Fano-family index: a document sequence over the
/// universe `num_docs` and a positive frequency sequence over
/// `occurrences + 1`, both stored in [`BitVectorCollection`]s. Each
/// list is preceded by a γ-coded occurrence count and, when the count
/// exceeds one, the list length in `⌈log₂(occurrences+1)⌉` bits.
pub struct FreqIndex<'a, D: Sequence, F: PayloadSequence> {
    params: GlobalParameters,
    num_docs: u64,
    docs_sequences: BitVectorCollection<'a>,
    freqs_sequences: BitVectorCollection<'a>,
    _marker: PhantomData<(D, F)>,
}

/// Plain Elias–Fano documents and strict Elias–Fano frequency sums.
pub type EfIndex<'a> = FreqIndex<'a, CompactEliasFano, PositiveSequence<StrictEliasFano>>;

/// Fixed-size partitions with per-partition variant selection.
pub type UniformIndex<'a> = FreqIndex<
    'a,
    UniformPartitionedSequence<IndexedSequence>,
    PositiveSequence<UniformPartitionedSequence<StrictSequence>>,
>;

/// Optimally partitioned documents and frequencies.
pub type OptIndex<'a> = FreqIndex<
    'a,
    PartitionedSequence<IndexedSequence>,
    PositiveSequence<PartitionedSequence<StrictSequence>>,
>;

pub type EfIndexBuilder<'c> =
    FreqIndexBuilder<'c, CompactEliasFano, PositiveSequence<StrictEliasFano>>;

pub type UniformIndexBuilder<'c> = FreqIndexBuilder<
    'c,
    UniformPartitionedSequence<IndexedSequence>,
    PositiveSequence<UniformPartitionedSequence<StrictSequence>>,
>;

pub type OptIndexBuilder<'c> = FreqIndexBuilder<
    'c,
    PartitionedSequence<IndexedSequence>,
    PositiveSequence<PartitionedSequence<StrictSequence>>,
>;

impl<'a, D: Sequence, F: PayloadSequence> FreqIndex<'a, D, F> {
    /// Parses a frozen blob, borrowing its vectors.
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
        let docs_sequences =
            BitVectorCollection::parse(&mut source).context("cannot parse document sequences")?;
        let freqs_sequences =
            BitVectorCollection::parse(&mut source).context("cannot parse frequency sequences")?;
        ensure!(
            docs_sequences.len() == freqs_sequences.len(),
            "mismatched docs/freqs collections"
        );
        Ok(Self {
            params,
            num_docs,
            docs_sequences,
            freqs_sequences,
            _marker: PhantomData,
        })
    }

    /// The number of posting lists.
    pub fn len(&self) -> u64 {
        self.docs_sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn params(&self) -> &GlobalParameters {
        &self.params
    }

    /// Opens a cursor over the postings of `term`.
    pub fn postings(&self, term: u64) -> Result<FreqIndexCursor<'a, D, F>> {
        ensure!(term < self.len(), "term {} out of bounds ({})", term, self.len());
        let mut docs_it = self.docs_sequences.get(&self.params, term);
        let occurrences = read_gamma_nonzero(&mut docs_it);
        let mut n = 1;
        if occurrences > 1 {
            n = docs_it.take(ceil_log2(occurrences + 1));
        }

        let docs_enum = D::enumerator(
            self.docs_sequences.bits(),
            docs_it.position(),
            self.num_docs,
            n,
            &self.params,
        );

        let freqs_it = self.freqs_sequences.get(&self.params, term);
        let freqs_enum = F::enumerator(
            self.freqs_sequences.bits(),
            freqs_it.position(),
            occurrences + 1,
            n,
            &self.params,
        );

        Ok(FreqIndexCursor::new(docs_enum, freqs_enum))
    }
}

/// A posting-list cursor over a [`FreqIndex`].
pub struct FreqIndexCursor<'a, D: Sequence, F: PayloadSequence> {
    cur_pos: u64,
    cur_docid: u64,
    docs_enum: D::Enumerator<'a>,
    freqs_enum: F::Enumerator<'a>,
}

impl<'a, D: Sequence, F: PayloadSequence> Clone for FreqIndexCursor<'a, D, F> {
    fn clone(&self) -> Self {
        Self {
            cur_pos: self.cur_pos,
            cur_docid: self.cur_docid,
            docs_enum: self.docs_enum.clone(),
            freqs_enum: self.freqs_enum.clone(),
        }
    }
}

impl<'a, D: Sequence, F: PayloadSequence> FreqIndexCursor<'a, D, F> {
    fn new(mut docs_enum: D::Enumerator<'a>, freqs_enum: F::Enumerator<'a>) -> Self {
        let (cur_pos, cur_docid) = docs_enum.move_to(0);
        Self {
            cur_pos,
            cur_docid,
            docs_enum,
            freqs_enum,
        }
    }

    /// The position of the current posting in the list.
    pub fn position(&self) -> u64 {
        self.cur_pos
    }

    /// Moves to an arbitrary position.
    pub fn move_to(&mut self, position: u64) {
        let (pos, docid) = self.docs_enum.move_to(position);
        self.cur_pos = pos;
        self.cur_docid = docid;
    }
}

impl<'a, D: Sequence, F: PayloadSequence> PostingCursor for FreqIndexCursor<'a, D, F>
where
    D::Enumerator<'a>: NextGeqEnumerator,
{
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.cur_docid
    }

    #[inline]
    fn freq(&mut self) -> u64 {
        self.freqs_enum.move_to(self.cur_pos).1
    }

    #[inline]
    fn next(&mut self) {
        let (pos, docid) = self.docs_enum.next();
        self.cur_pos = pos;
        self.cur_docid = docid;
    }

    #[inline]
    fn next_geq(&mut self, lower_bound: u64) {
        let (pos, docid) = self.docs_enum.next_geq(lower_bound);
        self.cur_pos = pos;
        self.cur_docid = docid;
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.docs_enum.size()
    }
}

impl<'a, D: Sequence, F: PayloadSequence> crate::index::PostingIndex<'a> for FreqIndex<'a, D, F>
where
    for<'any> D::Enumerator<'any>: NextGeqEnumerator,
{
    type Cursor = FreqIndexCursor<'a, D, F>;

    fn num_docs(&self) -> u64 {
        self.num_docs
    }

    fn num_terms(&self) -> u64 {
        self.len()
    }

    fn postings(&self, term: u64) -> Result<Self::Cursor> {
        FreqIndex::postings(self, term)
    }
}

/// Builds a [`FreqIndex`]: posting lists are queued by reference, encoded
/// in parallel batches, and committed in input order so the frozen layout
/// is deterministic.
pub struct FreqIndexBuilder<'c, D: Sequence, F: PayloadSequence> {
    params: GlobalParameters,
    num_docs: u64,
    lists: Vec<PostingsSequence<'c>>,
    _marker: PhantomData<(D, F)>,
}

impl<'c, D: Sequence, F: PayloadSequence> FreqIndexBuilder<'c, D, F> {
    pub fn new(num_docs: u64, params: &GlobalParameters) -> Self {
        Self {
            params: *params,
            num_docs,
            lists: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Queues a posting list for encoding.
    pub fn add_posting_list(&mut self, docs: &'c [u32], freqs: &'c [u32]) -> Result<()> {
        ensure!(!docs.is_empty(), "list {} is empty", self.lists.len());
        ensure!(
            docs.len() == freqs.len(),
            "list {}: {} documents but {} frequencies",
            self.lists.len(),
            docs.len(),
            freqs.len()
        );
        self.lists.push(PostingsSequence { docs, freqs });
        Ok(())
    }

    /// Encodes everything and serializes the frozen index.
    pub fn build(self) -> Result<MapSink> {
        let params = self.params;
        let num_docs = self.num_docs;

        let mut docs_sequences = BitVectorCollectionBuilder::new(&params);
        let mut freqs_sequences = BitVectorCollectionBuilder::new(&params);

        let mut pl = progress_logger![
            item_name = "list",
            expected_updates = Some(self.lists.len())
        ];
        pl.start("Encoding posting lists...");

        prepare_commit(
            &self.lists,
            |list| {
                let n = list.docs.len() as u64;
                let occurrences: u64 = list.freqs.iter().map(|&f| f as u64).sum();

                let mut docs_bits = BitVectorBuilder::new();
                write_gamma_nonzero(&mut docs_bits, occurrences);
                if occurrences > 1 {
                    docs_bits.append_bits(n, ceil_log2(occurrences + 1));
                }

                let docs: Vec<u64> = list.docs.iter().map(|&d| d as u64).collect();
                D::write(&mut docs_bits, &docs, num_docs, &params)?;

                let freqs: Vec<u64> = list.freqs.iter().map(|&f| f as u64).collect();
                let mut freqs_bits = BitVectorBuilder::new();
                F::write(&mut freqs_bits, &freqs, occurrences + 1, &params)?;

                Ok((docs_bits, freqs_bits))
            },
            |(docs_bits, freqs_bits)| {
                docs_sequences.append(&docs_bits);
                freqs_sequences.append(&freqs_bits);
                Ok(())
            },
            |count| pl.update_with_count(count),
        )
        .context("cannot encode posting lists")?;
        pl.done();

        let mut sink = MapSink::new();
        sink.push_u64(params.ef_log_sampling0 as u64);
        sink.push_u64(params.ef_log_sampling1 as u64);
        sink.push_u64(params.rb_log_rank1_sampling as u64);
        sink.push_u64(params.rb_log_sampling1 as u64);
        sink.push_u64(params.log_partition_size as u64);
        sink.push_u64(num_docs);
        docs_sequences.freeze(&mut sink)?;
        freqs_sequences.freeze(&mut sink)?;
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn tiny_collection() -> (u64, Vec<(Vec<u32>, Vec<u32>)>) {
        let num_docs = 64;
        let lists = vec![
            (vec![0, 1, 2, 3, 4], vec![1, 1, 1, 1, 1]),
            (vec![3, 7, 13, 14, 22], vec![2, 1, 5, 1, 3]),
            (vec![5], vec![9]),
            ((0..64).collect(), vec![1; 64]),
            (vec![10, 20, 30, 40, 50, 60], vec![1, 2, 3, 3, 2, 1]),
        ];
        (num_docs, lists)
    }

    fn roundtrip<D: Sequence, F: PayloadSequence>()
    where
        for<'any> D::Enumerator<'any>: NextGeqEnumerator,
    {
        let params = GlobalParameters::default();
        let (num_docs, lists) = tiny_collection();
        let mut builder = FreqIndexBuilder::<D, F>::new(num_docs, &params);
        for (docs, freqs) in &lists {
            builder.add_posting_list(docs, freqs).unwrap();
        }
        let words = builder.build().unwrap().into_words();

        let index = FreqIndex::<D, F>::parse(&words).unwrap();
        assert_eq!(index.len(), lists.len() as u64);
        assert_eq!(index.num_docs(), num_docs);

        for (term, (docs, freqs)) in lists.iter().enumerate() {
            let mut cursor = index.postings(term as u64).unwrap();
            assert_eq!(cursor.size(), docs.len() as u64);
            for (&d, &f) in docs.iter().zip(freqs.iter()) {
                assert_eq!(cursor.docid(), d as u64);
                assert_eq!(cursor.freq(), f as u64);
                cursor.next();
            }
            assert_eq!(cursor.docid(), num_docs);
        }

        // skipping
        let mut cursor = index.postings(1).unwrap();
        cursor.next_geq(10);
        assert_eq!(cursor.docid(), 13);
        assert_eq!(cursor.freq(), 5);
        cursor.next_geq(15);
        assert_eq!(cursor.docid(), 22);
        cursor.next_geq(23);
        assert_eq!(cursor.docid(), num_docs);
    }

    #[test]
    fn test_ef_index() {
        roundtrip::<CompactEliasFano, PositiveSequence<StrictEliasFano>>();
    }

    #[test]
    fn test_uniform_index() {
        roundtrip::<
            UniformPartitionedSequence<IndexedSequence>,
            PositiveSequence<UniformPartitionedSequence<StrictSequence>>,
        >();
    }

    #[test]
    fn test_opt_index() {
        roundtrip::<
            PartitionedSequence<IndexedSequence>,
            PositiveSequence<PartitionedSequence<StrictSequence>>,
        >();
    }
}
