/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cursor::MaxScoredPostingCursor;
use crate::query::TopKQueue;

/// MaxScore: cursors sorted by increasing list bound with prefix-summed
/// upper bounds. The growing non-essential prefix is visited only
/// through lookups, short-circuited as soon as the residual bound
/// cannot beat the threshold; the essential suffix drives the DAAT
/// scan.
pub fn maxscore_query<C: MaxScoredPostingCursor>(
    cursors: &mut [C],
    max_docid: u64,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        topk.finalize();
        return;
    }

    // sort (indirectly) by increasing max score
    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by(|&l, &r| {
        cursors[l]
            .max_score()
            .partial_cmp(&cursors[r].max_score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut upper_bounds = vec![0.0f32; order.len()];
    upper_bounds[0] = cursors[order[0]].max_score();
    for position in 1..order.len() {
        upper_bounds[position] = upper_bounds[position - 1] + cursors[order[position]].max_score();
    }

    let mut non_essential = 0;
    let mut cur_doc = cursors.iter().map(|c| c.docid()).min().unwrap_or(max_docid);

    while non_essential < order.len() && cur_doc < max_docid {
        let mut score = 0.0;
        let mut next_doc = max_docid;
        for &i in order.iter().skip(non_essential) {
            if cursors[i].docid() == cur_doc {
                score += cursors[i].score();
                cursors[i].next();
            }
            if cursors[i].docid() < next_doc {
                next_doc = cursors[i].docid();
            }
        }

        // try to complete the evaluation with the non-essential lists,
        // most promising first
        for position in (0..non_essential).rev() {
            if !topk.would_enter(score + upper_bounds[position]) {
                break;
            }
            let i = order[position];
            cursors[i].next_geq(cur_doc);
            if cursors[i].docid() == cur_doc {
                score += cursors[i].score();
            }
        }

        if topk.insert(score, cur_doc) {
            // the threshold rose: grow the non-essential prefix
            while non_essential < order.len()
                && !topk.would_enter(upper_bounds[non_essential])
            {
                non_essential += 1;
            }
        }

        cur_doc = next_doc;
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
    fn test_maxscore_matches_exhaustive() {
        for seed in [2u64, 42, 1000] {
            let lists = random_scored_lists(5, 900, seed);
            let mut cursors: Vec<_> = lists
                .iter()
                .map(|l| ScoredVecCursor::new(l.clone(), 900, 16))
                .collect();
            let mut topk = TopKQueue::new(10);
            maxscore_query(&mut cursors, 900, &mut topk);
            assert_topk_eq(topk.topk(), &exhaustive_topk(&lists, 900, 10));
        }
    }

    #[test]
    fn test_maxscore_small_k_prunes_safely() {
        let lists = random_scored_lists(3, 600, 77);
        let mut cursors: Vec<_> = lists
            .iter()
            .map(|l| ScoredVecCursor::new(l.clone(), 600, 16))
            .collect();
        let mut topk = TopKQueue::new(1);
        maxscore_query(&mut cursors, 600, &mut topk);
        assert_topk_eq(topk.topk(), &exhaustive_topk(&lists, 600, 1));
    }
}
