/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Scored posting cursors and cursor combinators.
//!
//! A [`ScoredCursor`] joins a posting cursor with its term scorer and
//! query weight; [`MaxScoredCursor`] adds the list-wide impact upper
//! bound, [`BlockMaxScoredCursor`] a parallel cursor over the per-block
//! upper bounds of the WAND data. The combinators ([`CursorUnion`],
//! [`CursorIntersection`], [`LookupTransform`]) assemble cursors into
//! lazily merged views used by the selection-aware operator and the
//! intersection analytics.

mod combinators;

pub use combinators::{
    block_max_union, sum_scores, CursorIntersection, CursorUnion, LookupTransform,
};

use crate::index::{PostingCursor, PostingIndex};
use crate::scorer::{Scorer, TermScorer};
use crate::wand::{WandBlockCursor, WandData, WandDataVariant};
use crate::TermId;
use anyhow::Result;

/// A posting cursor able to score its current posting.
pub trait ScoredPostingCursor: PostingCursor {
    /// The impact of the current posting, query weight included.
    fn score(&mut self) -> f32;
}

/// A scored cursor with a list-wide upper bound on its impacts.
pub trait MaxScoredPostingCursor: ScoredPostingCursor {
    fn max_score(&self) -> f32;
}

/// A max-scored cursor that also exposes per-block upper bounds.
pub trait BlockMaxPostingCursor: MaxScoredPostingCursor {
    /// Aligns the block-max cursor to the block containing `lower_bound`.
    fn block_max_next_geq(&mut self, lower_bound: u64);

    /// The last document of the current block.
    fn block_max_docid(&self) -> u64;

    /// The upper bound of the current block, query weight included.
    fn block_max_score(&mut self) -> f32;
}

/// A posting cursor coupled with its scorer.
pub struct ScoredCursor<'a, C, T> {
    cursor: C,
    norm_lens: &'a [f32],
    term_scorer: T,
    q_weight: f32,
}

impl<C: Clone, T: Clone> Clone for ScoredCursor<'_, C, T> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor.clone(),
            norm_lens: self.norm_lens,
            term_scorer: self.term_scorer.clone(),
            q_weight: self.q_weight,
        }
    }
}

impl<'a, C: PostingCursor, T: TermScorer> ScoredCursor<'a, C, T> {
    pub fn new(cursor: C, norm_lens: &'a [f32], term_scorer: T, q_weight: f32) -> Self {
        Self {
            cursor,
            norm_lens,
            term_scorer,
            q_weight,
        }
    }

    #[inline(always)]
    pub fn q_weight(&self) -> f32 {
        self.q_weight
    }
}

impl<C: PostingCursor, T: TermScorer> PostingCursor for ScoredCursor<'_, C, T> {
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.cursor.docid()
    }

    #[inline(always)]
    fn freq(&mut self) -> u64 {
        self.cursor.freq()
    }

    #[inline(always)]
    fn next(&mut self) {
        self.cursor.next()
    }

    #[inline(always)]
    fn next_geq(&mut self, lower_bound: u64) {
        self.cursor.next_geq(lower_bound)
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.cursor.size()
    }
}

impl<C: PostingCursor, T: TermScorer> ScoredPostingCursor for ScoredCursor<'_, C, T> {
    #[inline]
    fn score(&mut self) -> f32 {
        let norm_len = self.norm_lens[self.cursor.docid() as usize];
        let freq = self.cursor.freq();
        self.q_weight * self.term_scorer.score(freq, norm_len)
    }
}

/// A scored cursor with its list-wide upper bound.
pub struct MaxScoredCursor<'a, C, T> {
    inner: ScoredCursor<'a, C, T>,
    max_score: f32,
}

impl<C: Clone, T: Clone> Clone for MaxScoredCursor<'_, C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            max_score: self.max_score,
        }
    }
}

impl<'a, C: PostingCursor, T: TermScorer> MaxScoredCursor<'a, C, T> {
    pub fn new(inner: ScoredCursor<'a, C, T>, max_score: f32) -> Self {
        Self { inner, max_score }
    }
}

impl<C: PostingCursor, T: TermScorer> PostingCursor for MaxScoredCursor<'_, C, T> {
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.inner.docid()
    }

    #[inline(always)]
    fn freq(&mut self) -> u64 {
        self.inner.freq()
    }

    #[inline(always)]
    fn next(&mut self) {
        self.inner.next()
    }

    #[inline(always)]
    fn next_geq(&mut self, lower_bound: u64) {
        self.inner.next_geq(lower_bound)
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.inner.size()
    }
}

impl<C: PostingCursor, T: TermScorer> ScoredPostingCursor for MaxScoredCursor<'_, C, T> {
    #[inline(always)]
    fn score(&mut self) -> f32 {
        self.inner.score()
    }
}

impl<C: PostingCursor, T: TermScorer> MaxScoredPostingCursor for MaxScoredCursor<'_, C, T> {
    #[inline(always)]
    fn max_score(&self) -> f32 {
        self.max_score
    }
}

/// A max-scored cursor joined with the per-block bounds of the WAND
/// data.
pub struct BlockMaxScoredCursor<'a, C, T, W> {
    inner: MaxScoredCursor<'a, C, T>,
    wand: W,
}

impl<C: Clone, T: Clone, W: Clone> Clone for BlockMaxScoredCursor<'_, C, T, W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            wand: self.wand.clone(),
        }
    }
}

impl<'a, C: PostingCursor, T: TermScorer, W: WandBlockCursor> BlockMaxScoredCursor<'a, C, T, W> {
    pub fn new(inner: MaxScoredCursor<'a, C, T>, wand: W) -> Self {
        Self { inner, wand }
    }
}

impl<C: PostingCursor, T: TermScorer, W: WandBlockCursor> PostingCursor
    for BlockMaxScoredCursor<'_, C, T, W>
{
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.inner.docid()
    }

    #[inline(always)]
    fn freq(&mut self) -> u64 {
        self.inner.freq()
    }

    #[inline(always)]
    fn next(&mut self) {
        self.inner.next()
    }

    #[inline(always)]
    fn next_geq(&mut self, lower_bound: u64) {
        self.inner.next_geq(lower_bound)
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.inner.size()
    }
}

impl<C: PostingCursor, T: TermScorer, W: WandBlockCursor> ScoredPostingCursor
    for BlockMaxScoredCursor<'_, C, T, W>
{
    #[inline(always)]
    fn score(&mut self) -> f32 {
        self.inner.score()
    }
}

impl<C: PostingCursor, T: TermScorer, W: WandBlockCursor> MaxScoredPostingCursor
    for BlockMaxScoredCursor<'_, C, T, W>
{
    #[inline(always)]
    fn max_score(&self) -> f32 {
        self.inner.max_score()
    }
}

impl<C: PostingCursor, T: TermScorer, W: WandBlockCursor> BlockMaxPostingCursor
    for BlockMaxScoredCursor<'_, C, T, W>
{
    #[inline(always)]
    fn block_max_next_geq(&mut self, lower_bound: u64) {
        self.wand.next_geq(lower_bound)
    }

    #[inline(always)]
    fn block_max_docid(&self) -> u64 {
        self.wand.docid()
    }

    #[inline(always)]
    fn block_max_score(&mut self) -> f32 {
        self.inner.inner.q_weight * self.wand.score()
    }
}

/// Opens scored cursors for the deduplicated `(term, multiplicity)`
/// pairs of a query; terms outside the index contribute nothing and are
/// skipped.
pub fn make_scored_cursors<'a, I, V, S>(
    index: &I,
    wand: &WandData<'a, V>,
    scorer: &S,
    terms: &[(TermId, u64)],
) -> Result<Vec<ScoredCursor<'a, I::Cursor, S::Term>>>
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
    S: Scorer,
{
    let mut cursors = Vec::with_capacity(terms.len());
    for &(term, multiplicity) in terms {
        if term >= index.num_terms() {
            continue;
        }
        let cursor = index.postings(term)?;
        let stats = wand.term_statistics(term, cursor.size());
        let term_scorer = scorer.term_scorer(stats, wand.collection_statistics());
        cursors.push(ScoredCursor::new(
            cursor,
            wand.norm_lens(),
            term_scorer,
            multiplicity as f32,
        ));
    }
    Ok(cursors)
}

/// As [`make_scored_cursors`], with per-list upper bounds attached.
pub fn make_max_scored_cursors<'a, I, V, S>(
    index: &I,
    wand: &WandData<'a, V>,
    scorer: &S,
    terms: &[(TermId, u64)],
) -> Result<Vec<MaxScoredCursor<'a, I::Cursor, S::Term>>>
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
    S: Scorer,
{
    let mut cursors = Vec::with_capacity(terms.len());
    for &(term, multiplicity) in terms {
        if term >= index.num_terms() {
            continue;
        }
        let cursor = index.postings(term)?;
        let stats = wand.term_statistics(term, cursor.size());
        let term_scorer = scorer.term_scorer(stats, wand.collection_statistics());
        let q_weight = multiplicity as f32;
        let max_score = q_weight * wand.max_term_weight(term);
        cursors.push(MaxScoredCursor::new(
            ScoredCursor::new(cursor, wand.norm_lens(), term_scorer, q_weight),
            max_score,
        ));
    }
    Ok(cursors)
}

/// As [`make_max_scored_cursors`], additionally joining each term with
/// its block-max cursor.
pub fn make_block_max_scored_cursors<'a, I, V, S>(
    index: &I,
    wand: &WandData<'a, V>,
    scorer: &S,
    terms: &[(TermId, u64)],
) -> Result<Vec<BlockMaxScoredCursor<'a, I::Cursor, S::Term, V::Cursor>>>
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
    S: Scorer,
{
    let mut cursors = Vec::with_capacity(terms.len());
    for &(term, multiplicity) in terms {
        if term >= index.num_terms() {
            continue;
        }
        let cursor = index.postings(term)?;
        let stats = wand.term_statistics(term, cursor.size());
        let term_scorer = scorer.term_scorer(stats, wand.collection_statistics());
        let q_weight = multiplicity as f32;
        let max_score = q_weight * wand.max_term_weight(term);
        cursors.push(BlockMaxScoredCursor::new(
            MaxScoredCursor::new(
                ScoredCursor::new(cursor, wand.norm_lens(), term_scorer, q_weight),
                max_score,
            ),
            wand.block_max_cursor(term)?,
        ));
    }
    Ok(cursors)
}
