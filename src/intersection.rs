/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Intersection analytics and materialized bigram lists.
//!
//! [`Intersection::compute`] reports, for a subset of query terms, the
//! length of their document intersection and the maximum sum of scores
//! within it: the statistics the offline planner feeds to its set-cover
//! selection. [`BigramIndex`] holds the two-term intersections the
//! planner decided to materialize, with precomputed pair scores, for the
//! selection-aware operator.

use crate::cursor::{CursorIntersection, MaxScoredPostingCursor, ScoredPostingCursor};
use crate::index::{PostingCursor, PostingIndex};
use crate::scorer::Scorer;
use crate::wand::{WandData, WandDataVariant};
use crate::TermId;
use anyhow::{ensure, Result};

/// Length and score statistics of one term-subset intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub length: u64,
    pub max_score: f32,
}

impl Intersection {
    /// Intersects the terms of `query_terms` selected by `subset` (a
    /// bitmask over query-term positions) and accumulates the length
    /// and maximal score sum.
    pub fn compute<'a, I, V, S>(
        index: &I,
        wand: &WandData<'a, V>,
        scorer: &S,
        query_terms: &[TermId],
        subset: Option<u64>,
    ) -> Result<Intersection>
    where
        I: PostingIndex<'a>,
        V: WandDataVariant<'a>,
        S: Scorer,
    {
        let terms: Vec<(TermId, u64)> = query_terms
            .iter()
            .enumerate()
            .filter(|&(position, _)| match subset {
                // bitmask positions address the first 64 query terms
                Some(mask) => position < 64 && mask >> position & 1 == 1,
                None => true,
            })
            .map(|(_, &term)| (term, 1))
            .collect();

        let mut cursors = crate::cursor::make_scored_cursors(index, wand, scorer, &terms)?;
        if cursors.is_empty() || cursors.len() < terms.len() {
            // a term outside the index empties the whole intersection
            return Ok(Intersection {
                length: 0,
                max_score: 0.0,
            });
        }

        let sentinel = index.num_docs();
        let mut length = 0;
        let mut max_score = 0.0f32;
        if cursors.len() == 1 {
            let cursor = &mut cursors[0];
            while cursor.docid() < sentinel {
                length += 1;
                max_score = max_score.max(cursor.score());
                cursor.next();
            }
        } else {
            let mut intersection =
                CursorIntersection::new(cursors, sentinel, 0.0f32, |acc, cursor| {
                    acc + cursor.score()
                });
            while !intersection.is_exhausted() {
                length += 1;
                max_score = max_score.max(intersection.payload());
                intersection.next();
            }
        }
        Ok(Intersection { length, max_score })
    }
}

/// One materialized two-term intersection: common documents with their
/// precomputed pair scores.
struct BigramList {
    docids: Vec<u32>,
    scores: Vec<f32>,
    max_score: f32,
}

/// The bigram posting lists selected by the offline planner.
pub struct BigramIndex {
    pairs: Vec<(TermId, TermId)>,
    lists: Vec<BigramList>,
    num_docs: u64,
}

impl BigramIndex {
    /// Materializes the given pairs by intersecting the underlying
    /// posting lists and scoring each common document once.
    pub fn build<'a, I, V, S>(
        index: &I,
        wand: &WandData<'a, V>,
        scorer: &S,
        pairs: &[(TermId, TermId)],
    ) -> Result<Self>
    where
        I: PostingIndex<'a>,
        V: WandDataVariant<'a>,
        S: Scorer,
    {
        let num_docs = index.num_docs();
        let mut lists = Vec::with_capacity(pairs.len());
        for &(left, right) in pairs {
            ensure!(left != right, "bigram of a term with itself");
            let cursors = crate::cursor::make_scored_cursors(
                index,
                wand,
                scorer,
                &[(left, 1), (right, 1)],
            )?;
            ensure!(
                cursors.len() == 2,
                "bigram <{}, {}> refers to unknown terms",
                left,
                right
            );

            let mut docids = Vec::new();
            let mut scores = Vec::new();
            let mut max_score = 0.0f32;
            let mut intersection =
                CursorIntersection::new(cursors, num_docs, 0.0f32, |acc, cursor| {
                    acc + cursor.score()
                });
            while !intersection.is_exhausted() {
                docids.push(intersection.docid() as u32);
                let score = intersection.payload();
                scores.push(score);
                max_score = max_score.max(score);
                intersection.next();
            }
            lists.push(BigramList {
                docids,
                scores,
                max_score,
            });
        }
        Ok(Self {
            pairs: pairs.to_vec(),
            lists,
            num_docs,
        })
    }

    /// A cursor over the materialized pair, in either order; `None` when
    /// the pair was not materialized.
    pub fn cursor(&self, left: TermId, right: TermId) -> Option<BigramCursor<'_>> {
        let position = self
            .pairs
            .iter()
            .position(|&(l, r)| (l, r) == (left, right) || (l, r) == (right, left))?;
        let list = &self.lists[position];
        Some(BigramCursor {
            docids: &list.docids,
            scores: &list.scores,
            max_score: list.max_score,
            sentinel: self.num_docs,
            pos: 0,
        })
    }
}

/// A max-scored cursor over one bigram list; `freq` is meaningless and
/// reported as one.
#[derive(Clone)]
pub struct BigramCursor<'a> {
    docids: &'a [u32],
    scores: &'a [f32],
    max_score: f32,
    sentinel: u64,
    pos: usize,
}

impl PostingCursor for BigramCursor<'_> {
    #[inline(always)]
    fn docid(&self) -> u64 {
        self.docids
            .get(self.pos)
            .map_or(self.sentinel, |&d| d as u64)
    }

    fn freq(&mut self) -> u64 {
        1
    }

    #[inline]
    fn next(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn next_geq(&mut self, lower_bound: u64) {
        while self.pos < self.docids.len() && (self.docids[self.pos] as u64) < lower_bound {
            self.pos += 1;
        }
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.docids.len() as u64
    }
}

impl ScoredPostingCursor for BigramCursor<'_> {
    #[inline(always)]
    fn score(&mut self) -> f32 {
        self.scores[self.pos]
    }
}

impl MaxScoredPostingCursor for BigramCursor<'_> {
    #[inline(always)]
    fn max_score(&self) -> f32 {
        self.max_score
    }
}
