/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{TermBlocks, WandBlockCursor, WandDataVariant};
use crate::config::GlobalParameters;
use crate::mapper::{MapSink, MapSource};
use anyhow::{ensure, Context, Result};

pub(crate) const VARIANT_TAG: u64 = 0;

/// Uncompressed per-block channel: a start-offset table indexed by term
/// over parallel arrays of last docids and block maxima.
#[derive(Debug, Clone, Copy)]
pub struct WandDataRaw<'a> {
    blocks_start: &'a [u64],
    block_docids: &'a [u32],
    block_maxes: &'a [f32],
}

pub(crate) fn freeze(sink: &mut MapSink, term_blocks: &[TermBlocks]) {
    sink.push_u64(VARIANT_TAG);
    let mut blocks_start = Vec::with_capacity(term_blocks.len() + 1);
    blocks_start.push(0u64);
    let mut block_docids = Vec::new();
    let mut block_maxes = Vec::new();
    for blocks in term_blocks {
        block_docids.extend_from_slice(&blocks.block_docids);
        block_maxes.extend_from_slice(&blocks.block_maxes);
        blocks_start.push(block_docids.len() as u64);
    }
    sink.push_u64_slice(&blocks_start);
    sink.push_u32_slice(&block_docids);
    sink.push_f32_slice(&block_maxes);
}

impl<'a> WandDataVariant<'a> for WandDataRaw<'a> {
    type Cursor = WandRawCursor<'a>;

    fn parse(source: &mut MapSource<'a>, _params: &GlobalParameters) -> Result<Self> {
        let tag = source.read_u64()?;
        ensure!(
            tag == VARIANT_TAG,
            "expected raw WAND data (tag {}), found tag {}",
            VARIANT_TAG,
            tag
        );
        let blocks_start = source.read_u64_slice().context("cannot parse block starts")?;
        let block_docids = source.read_u32_slice().context("cannot parse block docids")?;
        let block_maxes = source.read_f32_slice().context("cannot parse block maxima")?;
        ensure!(
            block_docids.len() == block_maxes.len(),
            "mismatched block tables"
        );
        Ok(Self {
            blocks_start,
            block_docids,
            block_maxes,
        })
    }

    fn block_max_cursor(&self, term: u64) -> Result<Self::Cursor> {
        let term = term as usize;
        ensure!(
            term + 1 < self.blocks_start.len(),
            "term {} out of bounds ({})",
            term,
            self.blocks_start.len().saturating_sub(1)
        );
        let begin = self.blocks_start[term] as usize;
        let end = self.blocks_start[term + 1] as usize;
        Ok(WandRawCursor {
            docids: &self.block_docids[begin..end],
            maxes: &self.block_maxes[begin..end],
            cur: 0,
        })
    }
}

/// Linear-probing cursor over one term's block table.
#[derive(Debug, Clone, Copy)]
pub struct WandRawCursor<'a> {
    docids: &'a [u32],
    maxes: &'a [f32],
    cur: usize,
}

impl WandBlockCursor for WandRawCursor<'_> {
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.docids[self.cur] as u64
    }

    #[inline(always)]
    fn score(&mut self) -> f32 {
        self.maxes[self.cur]
    }

    #[inline]
    fn next_geq(&mut self, lower_bound: u64) {
        while self.cur + 1 < self.docids.len() && (self.docids[self.cur] as u64) < lower_bound {
            self.cur += 1;
        }
    }
}
