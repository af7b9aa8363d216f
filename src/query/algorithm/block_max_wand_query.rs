/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cursor::BlockMaxPostingCursor;
use crate::query::TopKQueue;

/// BlockMaxWAND: WAND pivoting refined with the per-block upper bounds.
/// After the pivot passes the list-wide test, the block-max cursors are
/// aligned to it and the tighter block bound is checked; during scoring
/// the bound shrinks with every scored term, aborting as soon as the
/// document can no longer enter. When the block bound fails, the
/// cursors jump past the earliest block boundary instead of crawling.
pub fn block_max_wand_query<C: BlockMaxPostingCursor>(
    cursors: &mut [C],
    max_docid: u64,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        topk.finalize();
        return;
    }

    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by_key(|&i| cursors[i].docid());

    loop {
        // find pivot
        let mut upper_bound = 0.0;
        let mut found_pivot = false;
        let mut pivot = 0;
        let mut pivot_id = max_docid;
        for (position, &i) in order.iter().enumerate() {
            if cursors[i].docid() >= max_docid {
                break;
            }
            upper_bound += cursors[i].max_score();
            if topk.would_enter(upper_bound) {
                found_pivot = true;
                pivot_id = cursors[i].docid();
                pivot = position;
                // extend the pivot over every cursor already aligned on it
                while pivot + 1 < order.len() && cursors[order[pivot + 1]].docid() == pivot_id {
                    pivot += 1;
                }
                break;
            }
        }

        if !found_pivot {
            break;
        }

        // the tighter block-level bound
        let mut block_upper_bound = 0.0;
        for &i in order.iter().take(pivot + 1) {
            if cursors[i].block_max_docid() < pivot_id {
                cursors[i].block_max_next_geq(pivot_id);
            }
            block_upper_bound += cursors[i].block_max_score();
        }

        if topk.would_enter(block_upper_bound) {
            // check if pivot is a possible match
            if pivot_id == cursors[order[0]].docid() {
                let mut score = 0.0;
                for &i in order.iter() {
                    if cursors[i].docid() != pivot_id {
                        break;
                    }
                    let part_score = cursors[i].score();
                    score += part_score;
                    block_upper_bound -= cursors[i].block_max_score() - part_score;
                    if !topk.would_enter(block_upper_bound) {
                        break;
                    }
                }
                for &i in order.iter() {
                    if cursors[i].docid() != pivot_id {
                        break;
                    }
                    cursors[i].next();
                }

                topk.insert(score, pivot_id);
                order.sort_by_key(|&i| cursors[i].docid());
            } else {
                let mut next_list = pivot;
                while cursors[order[next_list]].docid() == pivot_id {
                    next_list -= 1;
                }
                cursors[order[next_list]].next_geq(pivot_id);
                for position in next_list + 1..order.len() {
                    if cursors[order[position]].docid() <= cursors[order[position - 1]].docid() {
                        order.swap(position, position - 1);
                    } else {
                        break;
                    }
                }
            }
        } else {
            // the block bound failed: advance the heaviest list in the
            // pivot prefix past the earliest block end
            let mut next_list = pivot;
            let mut best_weight = cursors[order[next_list]].max_score();
            for position in 0..pivot {
                let weight = cursors[order[position]].max_score();
                if weight > best_weight {
                    next_list = position;
                    best_weight = weight;
                }
            }

            let mut next_jump = max_docid;
            if pivot + 1 < order.len() {
                next_jump = next_jump.min(cursors[order[pivot + 1]].docid());
            }
            for &i in order.iter().take(pivot + 1) {
                next_jump = next_jump.min(cursors[i].block_max_docid() + 1);
            }
            let mut next = next_jump;
            if next <= cursors[order[pivot]].docid() {
                next = cursors[order[pivot]].docid() + 1;
            }

            cursors[order[next_list]].next_geq(next);
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
    fn test_bmw_matches_exhaustive() {
        for seed in [1u64, 29, 404] {
            let lists = random_scored_lists(4, 1000, seed);
            let mut cursors: Vec<_> = lists
                .iter()
                .map(|l| ScoredVecCursor::new(l.clone(), 1000, 16))
                .collect();
            let mut topk = TopKQueue::new(7);
            block_max_wand_query(&mut cursors, 1000, &mut topk);
            assert_topk_eq(topk.topk(), &exhaustive_topk(&lists, 1000, 7));
        }
    }

    #[test]
    fn test_bmw_two_terms() {
        let lists = random_scored_lists(2, 400, 12345);
        let mut cursors: Vec<_> = lists
            .iter()
            .map(|l| ScoredVecCursor::new(l.clone(), 400, 8))
            .collect();
        let mut topk = TopKQueue::new(5);
        block_max_wand_query(&mut cursors, 400, &mut topk);
        assert_topk_eq(topk.topk(), &exhaustive_topk(&lists, 400, 5));
    }
}
