/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{BlockMaxPostingCursor, MaxScoredPostingCursor, ScoredPostingCursor};
use crate::index::PostingCursor;

/// Lazily merges cursors into their union: each call to
/// [`next`](Self::next) yields the smallest unseen document and the
/// payload accumulated over the cursors positioned on it.
pub struct CursorUnion<C, P, A> {
    cursors: Vec<C>,
    sentinel: u64,
    init: P,
    accumulate: A,
    current_docid: u64,
    current_payload: P,
    next_docid: u64,
}

impl<C, P, A> CursorUnion<C, P, A>
where
    C: PostingCursor,
    P: Copy,
    A: FnMut(P, &mut C) -> P,
{
    pub fn new(cursors: Vec<C>, sentinel: u64, init: P, accumulate: A) -> Self {
        let next_docid = cursors
            .iter()
            .map(|c| c.docid())
            .min()
            .unwrap_or(sentinel);
        let mut union = Self {
            cursors,
            sentinel,
            init,
            accumulate,
            current_docid: 0,
            current_payload: init,
            next_docid,
        };
        union.next();
        union
    }

    #[inline(always)]
    pub fn docid(&self) -> u64 {
        self.current_docid
    }

    #[inline(always)]
    pub fn payload(&self) -> P {
        self.current_payload
    }

    #[inline(always)]
    pub fn is_exhausted(&self) -> bool {
        self.current_docid >= self.sentinel
    }

    pub fn next(&mut self) {
        if self.next_docid >= self.sentinel {
            self.current_docid = self.sentinel;
            self.current_payload = self.init;
            return;
        }
        self.current_payload = self.init;
        self.current_docid = self.next_docid;
        self.next_docid = self.sentinel;
        for cursor in self.cursors.iter_mut() {
            if cursor.docid() == self.current_docid {
                self.current_payload = (self.accumulate)(self.current_payload, cursor);
                cursor.next();
            }
            if cursor.docid() < self.next_docid {
                self.next_docid = cursor.docid();
            }
        }
    }
}

/// Lazily merges cursors into their intersection, accumulating a
/// payload over every member at each common document. The first cursor
/// should be the shortest, as it drives the candidate generation.
pub struct CursorIntersection<C, P, A> {
    cursors: Vec<C>,
    sentinel: u64,
    init: P,
    accumulate: A,
    current_docid: u64,
    current_payload: P,
}

impl<C, P, A> CursorIntersection<C, P, A>
where
    C: PostingCursor,
    P: Copy,
    A: FnMut(P, &mut C) -> P,
{
    pub fn new(mut cursors: Vec<C>, sentinel: u64, init: P, accumulate: A) -> Self {
        debug_assert!(!cursors.is_empty());
        // the shortest list drives the scan
        cursors.sort_by_key(|c| c.size());
        let current_docid = cursors[0].docid();
        let mut intersection = Self {
            cursors,
            sentinel,
            init,
            accumulate,
            current_docid,
            current_payload: init,
        };
        intersection.align();
        intersection
    }

    #[inline(always)]
    pub fn docid(&self) -> u64 {
        self.current_docid
    }

    #[inline(always)]
    pub fn payload(&self) -> P {
        self.current_payload
    }

    #[inline(always)]
    pub fn is_exhausted(&self) -> bool {
        self.current_docid >= self.sentinel
    }

    /// Advances past the current document.
    pub fn next(&mut self) {
        self.cursors[0].next();
        self.current_docid = self.cursors[0].docid();
        self.align();
    }

    /// Moves every cursor to the smallest common document at or after
    /// the candidate held by the first cursor.
    fn align(&mut self) {
        let mut candidate = self.current_docid;
        let mut i = 1;
        while candidate < self.sentinel {
            while i < self.cursors.len() {
                self.cursors[i].next_geq(candidate);
                if self.cursors[i].docid() != candidate {
                    candidate = self.cursors[i].docid();
                    i = 1;
                    self.cursors[0].next_geq(candidate);
                    if self.cursors[0].docid() != candidate {
                        candidate = self.cursors[0].docid();
                    }
                    break;
                }
                i += 1;
            }
            if i == self.cursors.len() {
                // all aligned
                self.current_docid = candidate;
                self.current_payload = self.init;
                for cursor in self.cursors.iter_mut() {
                    self.current_payload = (self.accumulate)(self.current_payload, cursor);
                }
                return;
            }
        }
        self.current_docid = self.sentinel;
        self.current_payload = self.init;
    }
}

/// Completes a partial score by probing lookup cursors (sorted by
/// decreasing upper bound) with the MaxScore short-circuit: once the
/// achievable total cannot pass the threshold, the remaining lookups
/// are skipped.
pub struct LookupTransform<C> {
    lookup_cursors: Vec<C>,
    lookup_upper_bound: f32,
}

impl<C: MaxScoredPostingCursor> LookupTransform<C> {
    pub fn new(mut lookup_cursors: Vec<C>) -> Self {
        lookup_cursors.sort_by(|l, r| {
            r.max_score()
                .partial_cmp(&l.max_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let lookup_upper_bound = lookup_cursors.iter().map(|c| c.max_score()).sum();
        Self {
            lookup_cursors,
            lookup_upper_bound,
        }
    }

    /// The summed upper bound of all lookup cursors.
    pub fn upper_bound(&self) -> f32 {
        self.lookup_upper_bound
    }

    /// Adds to `score` the contributions of the lookup cursors at
    /// `docid`, short-circuiting through `would_enter`.
    pub fn apply(
        &mut self,
        docid: u64,
        mut score: f32,
        mut would_enter: impl FnMut(f32) -> bool,
    ) -> f32 {
        let mut upper_bound = score + self.lookup_upper_bound;
        for lookup in self.lookup_cursors.iter_mut() {
            if !would_enter(upper_bound) {
                return score;
            }
            lookup.next_geq(docid);
            if lookup.docid() == docid {
                let partial = lookup.score();
                score += partial;
                upper_bound += partial;
            }
            upper_bound -= lookup.max_score();
        }
        score
    }
}

/// A union whose payload is the sum of the members' block upper bounds
/// at each candidate document: a cheap overestimate that callers test
/// against the threshold before paying for real scoring.
pub fn block_max_union<C: BlockMaxPostingCursor>(
    cursors: Vec<C>,
    sentinel: u64,
) -> CursorUnion<C, f32, impl FnMut(f32, &mut C) -> f32> {
    CursorUnion::new(cursors, sentinel, 0.0f32, |acc, cursor| {
        let docid = cursor.docid();
        cursor.block_max_next_geq(docid);
        acc + cursor.block_max_score()
    })
}

/// Scores a document against a set of scored cursors without pruning;
/// the reference evaluation used by tests and analytics.
pub fn sum_scores<C: ScoredPostingCursor>(cursors: &mut [C], docid: u64) -> f32 {
    let mut score = 0.0;
    for cursor in cursors.iter_mut() {
        if cursor.docid() == docid {
            score += cursor.score();
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A posting cursor over an in-memory list, for combinator tests.
    #[derive(Clone)]
    pub(crate) struct VecCursor {
        postings: Vec<(u64, u64)>,
        sentinel: u64,
        pos: usize,
    }

    impl VecCursor {
        pub(crate) fn new(postings: Vec<(u64, u64)>, sentinel: u64) -> Self {
            Self {
                postings,
                sentinel,
                pos: 0,
            }
        }
    }

    impl PostingCursor for VecCursor {
        fn docid(&self) -> u64 {
            self.postings
                .get(self.pos)
                .map_or(self.sentinel, |&(d, _)| d)
        }

        fn freq(&mut self) -> u64 {
            self.postings[self.pos].1
        }

        fn next(&mut self) {
            self.pos += 1;
        }

        fn next_geq(&mut self, lower_bound: u64) {
            while self.pos < self.postings.len() && self.postings[self.pos].0 < lower_bound {
                self.pos += 1;
            }
        }

        fn size(&self) -> u64 {
            self.postings.len() as u64
        }
    }

    #[test]
    fn test_union() {
        let a = VecCursor::new(vec![(1, 1), (4, 1), (9, 1)], 100);
        let b = VecCursor::new(vec![(4, 1), (5, 1)], 100);
        let mut union = CursorUnion::new(vec![a, b], 100, 0u64, |acc, c: &mut VecCursor| {
            acc + c.freq()
        });
        let mut seen = Vec::new();
        while !union.is_exhausted() {
            seen.push((union.docid(), union.payload()));
            union.next();
        }
        assert_eq!(seen, vec![(1, 1), (4, 2), (5, 1), (9, 1)]);
    }

    #[test]
    fn test_intersection() {
        let a = VecCursor::new(vec![(1, 1), (4, 1), (9, 1), (11, 1)], 100);
        let b = VecCursor::new(vec![(4, 1), (5, 1), (11, 1)], 100);
        let c = VecCursor::new(vec![(0, 1), (4, 1), (9, 1), (11, 1), (12, 1)], 100);
        let mut intersection =
            CursorIntersection::new(vec![a, b, c], 100, 0u64, |acc, c: &mut VecCursor| {
                acc + c.freq()
            });
        let mut seen = Vec::new();
        while !intersection.is_exhausted() {
            seen.push((intersection.docid(), intersection.payload()));
            intersection.next();
        }
        assert_eq!(seen, vec![(4, 3), (11, 3)]);
    }
}
