/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{BlockCodec, TightVariableByte, BLOCK_SIZE};
use crate::collection::PostingsSequence;
use crate::config::GlobalParameters;
use crate::index::{prepare_commit, PostingCursor};
use crate::mapper::{MapSink, MapSource};
use crate::sequence::{CompactEliasFano, Sequence, SequenceEnumerator};
use crate::utils::ceil_div;
use anyhow::{ensure, Context, Result};
use dsi_progress_logger::prelude::*;
use std::marker::PhantomData;

/// Per-term layout of a block index list:
///
/// - the list length as a varint;
/// - the skip table: one `u32` last document per block, then the
///   cumulative byte endpoint of every block in the document stream,
///   then the same for the frequency stream;
/// - the document blocks (first document absolute, then gaps minus one);
/// - the frequency blocks (frequencies minus one), decoded lazily.
pub struct BlockFreqIndex<'a, C: BlockCodec> {
    params: GlobalParameters,
    num_docs: u64,
    lists: &'a [u8],
    endpoints: crate::bits::BitsRef<'a>,
    size: u64,
    _marker: PhantomData<C>,
}

impl<'a, C: BlockCodec> BlockFreqIndex<'a, C> {
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
        let size = source.read_u64()?;
        let endpoints = source.read_bits()?;
        let lists = source.read_u8_slice().context("cannot parse list bytes")?;
        Ok(Self {
            params,
            num_docs,
            lists,
            endpoints,
            size,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Opens a cursor over the postings of `term`.
    pub fn postings(&self, term: u64) -> Result<BlockPostingCursor<'a, C>> {
        ensure!(term < self.size, "term {} out of bounds ({})", term, self.size);
        let mut endpoints = CompactEliasFano::enumerator(
            self.endpoints,
            0,
            self.lists.len() as u64 + 1,
            self.size,
            &self.params,
        );
        let begin = endpoints.move_to(term).1 as usize;
        Ok(BlockPostingCursor::new(&self.lists[begin..], self.num_docs))
    }
}

impl<'a, C: BlockCodec> crate::index::PostingIndex<'a> for BlockFreqIndex<'a, C> {
    type Cursor = BlockPostingCursor<'a, C>;

    fn num_docs(&self) -> u64 {
        self.num_docs
    }

    fn num_terms(&self) -> u64 {
        self.size
    }

    fn postings(&self, term: u64) -> Result<Self::Cursor> {
        BlockFreqIndex::postings(self, term)
    }
}

/// Reads a `u32` from the little-endian skip table.
#[inline(always)]
fn read_u32(bytes: &[u8], index: usize) -> u32 {
    u32::from_le_bytes(bytes[index * 4..index * 4 + 4].try_into().unwrap())
}

/// A posting-list cursor over one block-encoded list.
pub struct BlockPostingCursor<'a, C: BlockCodec> {
    num_docs: u64,
    n: u64,
    blocks: u64,
    /// `blocks` last documents, then `blocks` document endpoints, then
    /// `blocks` frequency endpoints, each a little-endian `u32`.
    skip_table: &'a [u8],
    docs_stream: &'a [u8],
    freqs_stream: &'a [u8],

    cur_block: u64,
    pos_in_block: usize,
    cur_block_size: usize,
    cur_docid: u64,
    freqs_decoded: bool,
    docs_buf: Box<[u32; BLOCK_SIZE]>,
    freqs_buf: Box<[u32; BLOCK_SIZE]>,
    _marker: PhantomData<C>,
}

impl<C: BlockCodec> Clone for BlockPostingCursor<'_, C> {
    fn clone(&self) -> Self {
        Self {
            num_docs: self.num_docs,
            n: self.n,
            blocks: self.blocks,
            skip_table: self.skip_table,
            docs_stream: self.docs_stream,
            freqs_stream: self.freqs_stream,
            cur_block: self.cur_block,
            pos_in_block: self.pos_in_block,
            cur_block_size: self.cur_block_size,
            cur_docid: self.cur_docid,
            freqs_decoded: self.freqs_decoded,
            docs_buf: self.docs_buf.clone(),
            freqs_buf: self.freqs_buf.clone(),
            _marker: PhantomData,
        }
    }
}

impl<'a, C: BlockCodec> BlockPostingCursor<'a, C> {
    fn new(data: &'a [u8], num_docs: u64) -> Self {
        let mut n = [0u32];
        let rest = TightVariableByte::decode(data, &mut n);
        let n = n[0] as u64;
        let blocks = ceil_div(n, BLOCK_SIZE as u64);
        let skip_bytes = 3 * blocks as usize * 4;
        let skip_table = &rest[..skip_bytes];
        let docs_len = read_u32(skip_table, (2 * blocks - 1) as usize) as usize;
        let docs_stream = &rest[skip_bytes..skip_bytes + docs_len];
        let freqs_len = read_u32(skip_table, (3 * blocks - 1) as usize) as usize;
        let freqs_stream = &rest[skip_bytes + docs_len..skip_bytes + docs_len + freqs_len];

        let mut cursor = Self {
            num_docs,
            n,
            blocks,
            skip_table,
            docs_stream,
            freqs_stream,
            cur_block: 0,
            pos_in_block: 0,
            cur_block_size: 0,
            cur_docid: 0,
            freqs_decoded: false,
            docs_buf: Box::new([0; BLOCK_SIZE]),
            freqs_buf: Box::new([0; BLOCK_SIZE]),
            _marker: PhantomData,
        };
        cursor.decode_docs_block(0);
        cursor
    }

    #[inline(always)]
    fn block_last_docid(&self, block: u64) -> u64 {
        read_u32(self.skip_table, block as usize) as u64
    }

    #[inline(always)]
    fn block_size(&self, block: u64) -> usize {
        if block + 1 == self.blocks {
            (self.n - block * BLOCK_SIZE as u64) as usize
        } else {
            BLOCK_SIZE
        }
    }

    fn docs_block_range(&self, block: u64) -> (usize, usize) {
        let begin = if block == 0 {
            0
        } else {
            read_u32(self.skip_table, (self.blocks + block - 1) as usize) as usize
        };
        let end = read_u32(self.skip_table, (self.blocks + block) as usize) as usize;
        (begin, end)
    }

    fn freqs_block_range(&self, block: u64) -> (usize, usize) {
        let begin = if block == 0 {
            0
        } else {
            read_u32(self.skip_table, (2 * self.blocks + block - 1) as usize) as usize
        };
        let end = read_u32(self.skip_table, (2 * self.blocks + block) as usize) as usize;
        (begin, end)
    }

    fn decode_docs_block(&mut self, block: u64) {
        let size = self.block_size(block);
        let base = if block == 0 {
            0
        } else {
            self.block_last_docid(block - 1) + 1
        };
        let last = self.block_last_docid(block);
        let sum = (last - base - (size as u64 - 1)) as u32;
        let (begin, _) = self.docs_block_range(block);
        C::decode(&self.docs_stream[begin..], &mut self.docs_buf[..size], Some(sum));

        // turn stored gaps into absolute documents
        self.docs_buf[0] += base as u32;
        for i in 1..size {
            self.docs_buf[i] += self.docs_buf[i - 1] + 1;
        }

        self.cur_block = block;
        self.cur_block_size = size;
        self.pos_in_block = 0;
        self.cur_docid = self.docs_buf[0] as u64;
        self.freqs_decoded = false;
    }

    fn decode_freqs_block(&mut self) {
        let size = self.cur_block_size;
        let (begin, _) = self.freqs_block_range(self.cur_block);
        C::decode(&self.freqs_stream[begin..], &mut self.freqs_buf[..size], None);
        self.freqs_decoded = true;
    }

    /// The position of the current posting in the list.
    pub fn position(&self) -> u64 {
        self.cur_block * BLOCK_SIZE as u64 + self.pos_in_block as u64
    }
}

impl<C: BlockCodec> PostingCursor for BlockPostingCursor<'_, C> {
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.cur_docid
    }

    #[inline]
    fn freq(&mut self) -> u64 {
        if !self.freqs_decoded {
            self.decode_freqs_block();
        }
        self.freqs_buf[self.pos_in_block] as u64 + 1
    }

    #[inline]
    fn next(&mut self) {
        self.pos_in_block += 1;
        if self.pos_in_block == self.cur_block_size {
            if self.cur_block + 1 == self.blocks {
                self.cur_docid = self.num_docs;
                return;
            }
            self.decode_docs_block(self.cur_block + 1);
        } else {
            self.cur_docid = self.docs_buf[self.pos_in_block] as u64;
        }
    }

    fn next_geq(&mut self, lower_bound: u64) {
        if self.cur_docid >= self.num_docs {
            return;
        }
        if lower_bound > self.block_last_docid(self.cur_block) {
            // binary search the skip table for the first block that can
            // contain the bound
            let mut lo = self.cur_block + 1;
            let mut hi = self.blocks;
            while lo < hi {
                let mid = (lo + hi) / 2;
                if self.block_last_docid(mid) < lower_bound {
                    lo = mid + 1;
                } else {
                    hi = mid;
                }
            }
            if lo == self.blocks {
                self.cur_docid = self.num_docs;
                return;
            }
            self.decode_docs_block(lo);
        }
        while self.cur_docid < lower_bound {
            self.pos_in_block += 1;
            debug_assert!(self.pos_in_block < self.cur_block_size);
            self.cur_docid = self.docs_buf[self.pos_in_block] as u64;
        }
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.n
    }
}

/// Builds a [`BlockFreqIndex`], encoding lists in parallel batches and
/// committing them in input order.
pub struct BlockFreqIndexBuilder<'c, C: BlockCodec> {
    params: GlobalParameters,
    num_docs: u64,
    lists: Vec<PostingsSequence<'c>>,
    _marker: PhantomData<C>,
}

impl<'c, C: BlockCodec> BlockFreqIndexBuilder<'c, C> {
    pub fn new(num_docs: u64, params: &GlobalParameters) -> Self {
        Self {
            params: *params,
            num_docs,
            lists: Vec::new(),
            _marker: PhantomData,
        }
    }

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

    fn encode_list(num_docs: u64, list: &PostingsSequence<'_>) -> Result<Vec<u8>> {
        let n = list.docs.len();
        let blocks = n.div_ceil(BLOCK_SIZE);

        let mut out = Vec::new();
        TightVariableByte::encode_single(n as u32, &mut out);

        let mut block_maxs = Vec::with_capacity(blocks);
        let mut docs_endpoints = Vec::with_capacity(blocks);
        let mut freqs_endpoints = Vec::with_capacity(blocks);
        let mut docs_stream = Vec::new();
        let mut freqs_stream = Vec::new();

        let mut docs_buf = [0u32; BLOCK_SIZE];
        let mut freqs_buf = [0u32; BLOCK_SIZE];
        let mut last_doc: Option<u64> = None;

        for (block, (docs, freqs)) in list
            .docs
            .chunks(BLOCK_SIZE)
            .zip(list.freqs.chunks(BLOCK_SIZE))
            .enumerate()
        {
            let base = last_doc.map_or(0, |d| d + 1);
            for (i, (&d, &f)) in docs.iter().zip(freqs.iter()).enumerate() {
                let d = d as u64;
                ensure!(d < num_docs, "docid {} out of bounds ({})", d, num_docs);
                let prev = last_doc.map_or(0, |p| p + 1);
                ensure!(
                    last_doc.is_none() || d >= prev,
                    "sequence is not sorted at block {} offset {}",
                    block,
                    i
                );
                ensure!(f > 0, "zero frequency at block {} offset {}", block, i);
                docs_buf[i] = (d - prev) as u32;
                freqs_buf[i] = f - 1;
                last_doc = Some(d);
            }
            let last = last_doc.unwrap();
            block_maxs.push(last as u32);

            let sum = (last - base - (docs.len() as u64 - 1)) as u32;
            C::encode(&docs_buf[..docs.len()], Some(sum), &mut docs_stream);
            docs_endpoints.push(docs_stream.len() as u32);

            C::encode(&freqs_buf[..freqs.len()], None, &mut freqs_stream);
            freqs_endpoints.push(freqs_stream.len() as u32);
        }

        for &v in block_maxs
            .iter()
            .chain(docs_endpoints.iter())
            .chain(freqs_endpoints.iter())
        {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&docs_stream);
        out.extend_from_slice(&freqs_stream);
        Ok(out)
    }

    pub fn build(self) -> Result<MapSink> {
        let num_docs = self.num_docs;

        let mut lists_bytes: Vec<u8> = Vec::new();
        let mut endpoints: Vec<u64> = vec![0];

        let mut pl = progress_logger![
            item_name = "list",
            expected_updates = Some(self.lists.len())
        ];
        pl.start("Encoding block posting lists...");

        prepare_commit(
            &self.lists,
            |list| Self::encode_list(num_docs, list),
            |encoded| {
                lists_bytes.extend_from_slice(&encoded);
                endpoints.push(lists_bytes.len() as u64);
                Ok(())
            },
            |count| pl.update_with_count(count),
        )
        .context("cannot encode posting lists")?;
        pl.done();

        let size = (endpoints.len() - 1) as u64;
        let mut endpoints_bits = crate::bits::BitVectorBuilder::new();
        if size > 0 {
            CompactEliasFano::write(
                &mut endpoints_bits,
                &endpoints[..size as usize],
                lists_bytes.len() as u64 + 1,
                &self.params,
            )?;
        }

        let mut sink = MapSink::new();
        sink.push_u64(self.params.ef_log_sampling0 as u64);
        sink.push_u64(self.params.ef_log_sampling1 as u64);
        sink.push_u64(self.params.rb_log_rank1_sampling as u64);
        sink.push_u64(self.params.rb_log_sampling1 as u64);
        sink.push_u64(self.params.log_partition_size as u64);
        sink.push_u64(num_docs);
        sink.push_u64(size);
        sink.push_bits(&endpoints_bits.build());
        sink.push_u8_slice(&lists_bytes);
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::block::{
        BinaryPackingBlock, InterpolativeBlock, MaskedVByteBlock, OptPForBlock, Simple16Block,
        Simple8bBlock, StreamVByteBlock, VarintG8IuBlock, VarintGbBlock,
    };

    fn block_boundary_collection() -> (u64, Vec<(Vec<u32>, Vec<u32>)>) {
        let num_docs = 4000;
        let lists = vec![
            // spans a block boundary: 128 native + 2 interpolative tail
            ((0..130).collect(), vec![1; 130]),
            // multi-block with gaps
            ((0..1000).map(|i| i * 3 + 1).collect(), (0..1000).map(|i| i % 7 + 1).collect()),
            (vec![5], vec![9]),
            (vec![100, 2000, 3999], vec![1, 2, 1]),
        ];
        (num_docs, lists)
    }

    fn roundtrip<C: BlockCodec>() {
        let params = GlobalParameters::default();
        let (num_docs, lists) = block_boundary_collection();
        let mut builder = BlockFreqIndexBuilder::<C>::new(num_docs, &params);
        for (docs, freqs) in &lists {
            builder.add_posting_list(docs, freqs).unwrap();
        }
        let words = builder.build().unwrap().into_words();

        let index = BlockFreqIndex::<C>::parse(&words).unwrap();
        assert_eq!(index.len(), lists.len() as u64);

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

        // skipping across blocks
        let mut cursor = index.postings(1).unwrap();
        cursor.next_geq(1000);
        assert_eq!(cursor.docid(), 1000);
        cursor.next_geq(2995);
        assert_eq!(cursor.docid(), 2995);
        assert_eq!(cursor.freq(), (2995 / 3) % 7 + 1);
        cursor.next_geq(2996);
        assert_eq!(cursor.docid(), 2998);
        cursor.next_geq(2999);
        assert_eq!(cursor.docid(), num_docs);
    }

    #[test]
    fn test_block_indexes_all_codecs() {
        eprintln!("DEBUG start OptPForBlock"); roundtrip::<OptPForBlock>(); eprintln!("DEBUG done OptPForBlock");
        eprintln!("DEBUG start BinaryPackingBlock"); roundtrip::<BinaryPackingBlock>(); eprintln!("DEBUG done BinaryPackingBlock");
        eprintln!("DEBUG start StreamVByteBlock"); roundtrip::<StreamVByteBlock>(); eprintln!("DEBUG done StreamVByteBlock");
        eprintln!("DEBUG start MaskedVByteBlock"); roundtrip::<MaskedVByteBlock>(); eprintln!("DEBUG done MaskedVByteBlock");
        eprintln!("DEBUG start VarintGbBlock"); roundtrip::<VarintGbBlock>(); eprintln!("DEBUG done VarintGbBlock");
        eprintln!("DEBUG start VarintG8IuBlock"); roundtrip::<VarintG8IuBlock>(); eprintln!("DEBUG done VarintG8IuBlock");
        eprintln!("DEBUG start Simple8bBlock"); roundtrip::<Simple8bBlock>(); eprintln!("DEBUG done Simple8bBlock");
        eprintln!("DEBUG start Simple16Block"); roundtrip::<Simple16Block>(); eprintln!("DEBUG done Simple16Block");
        eprintln!("DEBUG start InterpolativeBlock"); roundtrip::<InterpolativeBlock>(); eprintln!("DEBUG done InterpolativeBlock");
    }
}
