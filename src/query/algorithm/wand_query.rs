/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cursor::MaxScoredPostingCursor;
use crate::query::TopKQueue;

/// WAND: cursors stay sorted by current document; the pivot is the
/// shortest prefix whose summed upper bounds could enter the top-k. An
/// aligned pivot is scored, otherwise the deepest lagging cursor jumps
/// to the pivot document and bubbles back into sorted position.
pub fn wand_query<C: MaxScoredPostingCursor>(
    cursors: &mut [C],
    max_docid: u64,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        topk.finalize();
        return;
    }

    // sort (indirectly) by increasing docid
    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by_key(|&i| cursors[i].docid());

    loop {
        // find pivot
        let mut upper_bound = 0.0;
        let mut found_pivot = false;
        let mut pivot = 0;
        for (position, &i) in order.iter().enumerate() {
            if cursors[i].docid() >= max_docid {
                break;
            }
            upper_bound += cursors[i].max_score();
            if topk.would_enter(upper_bound) {
                found_pivot = true;
                pivot = position;
                break;
            }
        }

        // no pivot found, we can stop the search
        if !found_pivot {
            break;
        }

        // check if pivot is a possible match
        let pivot_id = cursors[order[pivot]].docid();
        if pivot_id == cursors[order[0]].docid() {
            let mut score = 0.0;
            for &i in order.iter() {
                if cursors[i].docid() != pivot_id {
                    break;
                }
                score += cursors[i].score();
                cursors[i].next();
            }

            topk.insert(score, pivot_id);
            // resort by docid
            order.sort_by_key(|&i| cursors[i].docid());
        } else {
            // no match, move the deepest lagging list up to the pivot
            let mut next_list = pivot;
            while cursors[order[next_list]].docid() == pivot_id {
                next_list -= 1;
            }
            cursors[order[next_list]].next_geq(pivot_id);
            // bubble down the advanced list
            for position in next_list + 1..order.len() {
                if cursors[order[position]].docid() < cursors[order[position - 1]].docid() {
                    order.swap(position, position - 1);
                } else {
                    break;
                }
            }
        }
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
    fn test_wand_matches_exhaustive() {
        for seed in [3u64, 17, 99] {
            let lists = random_scored_lists(4, 800, seed);
            let mut cursors: Vec<_> = lists
                .iter()
                .map(|l| ScoredVecCursor::new(l.clone(), 800, 16))
                .collect();
            let mut topk = TopKQueue::new(10);
            wand_query(&mut cursors, 800, &mut topk);
            assert_topk_eq(topk.topk(), &exhaustive_topk(&lists, 800, 10));
        }
    }

    #[test]
    fn test_wand_single_term() {
        let lists = random_scored_lists(1, 300, 5);
        let mut cursors = vec![ScoredVecCursor::new(lists[0].clone(), 300, 16)];
        let mut topk = TopKQueue::new(3);
        wand_query(&mut cursors, 300, &mut topk);
        assert_topk_eq(topk.topk(), &exhaustive_topk(&lists, 300, 3));
    }
}
