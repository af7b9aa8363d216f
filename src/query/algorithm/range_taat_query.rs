/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cursor::ScoredPostingCursor;
use crate::query::TopKQueue;

/// Term-at-a-time over contiguous document ranges: within each range of
/// `range_size` documents every cursor is drained into an accumulator
/// array, whose positive entries are then offered to the top-k queue.
/// Worth choosing when `range_size × num_terms` accumulator traffic
/// stays in cache.
pub fn range_taat_query<C: ScoredPostingCursor>(
    cursors: &mut [C],
    max_docid: u64,
    range_size: u64,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        topk.finalize();
        return;
    }
    debug_assert!(range_size > 0);

    let mut accumulator = vec![0.0f32; range_size as usize];
    let mut range_start = 0;
    while range_start < max_docid {
        let range_end = (range_start + range_size).min(max_docid);
        accumulator.fill(0.0);

        // term at a time within the range
        for cursor in cursors.iter_mut() {
            while cursor.docid() < range_end {
                accumulator[(cursor.docid() - range_start) as usize] += cursor.score();
                cursor.next();
            }
        }

        for (offset, &score) in accumulator[..(range_end - range_start) as usize]
            .iter()
            .enumerate()
        {
            if score > 0.0 && topk.would_enter(score) {
                topk.insert(score, range_start + offset as u64);
            }
        }

        range_start = range_end;
    }

    topk.finalize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::algorithm::tests::{
        assert_topk_eq, exhaustive_topk, random_scored_lists, ScoredVecCursor,
    };

    #[test]
    fn test_range_taat_matches_exhaustive() {
        let lists = random_scored_lists(4, 700, 31);
        for range_size in [64u64, 100, 1024] {
            let mut cursors: Vec<_> = lists
                .iter()
                .map(|l| ScoredVecCursor::new(l.clone(), 700, 16))
                .collect();
            let mut topk = TopKQueue::new(10);
            range_taat_query(&mut cursors, 700, range_size, &mut topk);
            assert_topk_eq(topk.topk(), &exhaustive_topk(&lists, 700, 10));
        }
    }
}
