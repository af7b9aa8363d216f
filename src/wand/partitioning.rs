/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Score-block boundaries for the WAND data: either fixed-size blocks or
//! the score-aware windowed DP, whose objective is the expected waste of
//! a block, `|block| · max(block) − Σ scores`, plus a fixed per-block
//! cost.

use std::collections::VecDeque;

/// Chops the list into blocks of `block_size` postings; returns the last
/// docid and the maximum score of each block.
pub fn static_block_partition(
    docs: &[u32],
    scores: &[f32],
    block_size: u64,
) -> (Vec<u32>, Vec<f32>) {
    debug_assert_eq!(docs.len(), scores.len());
    let mut block_docids = Vec::new();
    let mut block_maxes = Vec::new();
    for (doc_chunk, score_chunk) in docs
        .chunks(block_size as usize)
        .zip(scores.chunks(block_size as usize))
    {
        block_docids.push(doc_chunk[doc_chunk.len() - 1]);
        block_maxes.push(score_chunk.iter().copied().fold(0.0f32, f32::max));
    }
    (block_docids, block_maxes)
}

/// A sliding window over the scores, maintaining their sum and maximum
/// (monotone deque) so that the block cost is O(1) per move.
struct ScoreWindow<'a> {
    scores: &'a [f32],
    start: usize,
    end: usize,
    sum: f64,
    max_queue: VecDeque<f32>,
    cost_upper_bound: f32,
    fixed_cost: f32,
}

impl<'a> ScoreWindow<'a> {
    fn new(scores: &'a [f32], cost_upper_bound: f32, fixed_cost: f32) -> Self {
        Self {
            scores,
            start: 0,
            end: 0,
            sum: 0.0,
            max_queue: VecDeque::new(),
            cost_upper_bound,
            fixed_cost,
        }
    }

    fn size(&self) -> usize {
        self.end - self.start
    }

    fn max(&self) -> f32 {
        self.max_queue.front().copied().unwrap_or(0.0)
    }

    fn cost(&self) -> f32 {
        if self.size() < 2 {
            self.fixed_cost
        } else {
            self.size() as f32 * self.max() - self.sum as f32 + self.fixed_cost
        }
    }

    fn advance_start(&mut self) {
        let v = self.scores[self.start];
        if self.max_queue.front() == Some(&v) {
            self.max_queue.pop_front();
        }
        self.sum -= v as f64;
        self.start += 1;
    }

    fn advance_end(&mut self) {
        let v = self.scores[self.end];
        self.sum += v as f64;
        while matches!(self.max_queue.back(), Some(&back) if back < v) {
            self.max_queue.pop_back();
        }
        self.max_queue.push_back(v);
        self.end += 1;
    }
}

/// Score-aware boundaries minimizing `Σ_b (|b| · max(b) − Σ_{d∈b} s_d)
/// + F` with the same windowed ε-approximation as the posting-list
/// partition DP. Returns the last docid and the maximum score of each
/// block.
pub fn variable_block_partition(
    docs: &[u32],
    scores: &[f32],
    eps1: f32,
    eps2: f32,
    fixed_cost: f32,
) -> (Vec<u32>, Vec<f32>) {
    debug_assert_eq!(docs.len(), scores.len());
    let size = scores.len();

    let max_all = scores.iter().copied().fold(0.0f32, f32::max);
    let sum_all: f64 = scores.iter().map(|&s| s as f64).sum();
    let single_block_cost = (size as f64 * max_all as f64 - sum_all) as f32 + fixed_cost;

    let mut min_cost = vec![single_block_cost; size + 1];
    min_cost[0] = 0.0;

    // one window per power of the approximation factor
    let mut windows = Vec::new();
    let cost_lb = fixed_cost;
    let mut cost_bound = cost_lb;
    while eps1 == 0.0 || cost_bound < cost_lb / eps1 {
        windows.push(ScoreWindow::new(scores, cost_bound, fixed_cost));
        if cost_bound >= single_block_cost {
            break;
        }
        cost_bound *= 1.0 + eps2;
    }

    let mut path = vec![0usize; size + 1];
    let mut maxs = vec![0.0f32; size + 1];
    maxs[size] = max_all;

    for i in 0..size {
        let mut last_end = i + 1;
        for window in windows.iter_mut() {
            debug_assert_eq!(window.start, i);
            while window.end < last_end {
                window.advance_end();
            }

            loop {
                let window_cost = window.cost();
                if min_cost[i] + window_cost < min_cost[window.end] {
                    min_cost[window.end] = min_cost[i] + window_cost;
                    path[window.end] = i;
                    maxs[window.end] = window.max();
                }
                last_end = window.end;
                if window.end == size {
                    break;
                }
                if window_cost >= window.cost_upper_bound {
                    break;
                }
                window.advance_end();
            }

            window.advance_start();
        }
    }

    let mut endpoints = Vec::new();
    let mut block_maxes = Vec::new();
    let mut curr_pos = size;
    while curr_pos != 0 {
        endpoints.push(curr_pos);
        block_maxes.push(maxs[curr_pos]);
        curr_pos = path[curr_pos];
    }
    endpoints.reverse();
    block_maxes.reverse();

    let block_docids = endpoints.iter().map(|&e| docs[e - 1]).collect();
    (block_docids, block_maxes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_partition() {
        let docs: Vec<u32> = (0..10).map(|i| i * 5).collect();
        let scores: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let (block_docids, block_maxes) = static_block_partition(&docs, &scores, 4);
        assert_eq!(block_docids, vec![15, 35, 45]);
        assert_eq!(block_maxes, vec![3.0, 7.0, 9.0]);
    }

    #[test]
    fn test_variable_partition_covers_and_bounds() {
        // one high-score cluster among low scores: boundaries should
        // isolate it, and block maxima must dominate their members
        let docs: Vec<u32> = (0..200u32).collect();
        let mut scores = vec![0.1f32; 200];
        for score in scores.iter_mut().take(120).skip(100) {
            *score = 5.0;
        }
        let (block_docids, block_maxes) = variable_block_partition(&docs, &scores, 0.01, 0.4, 12.0);

        assert_eq!(*block_docids.last().unwrap(), 199);
        assert_eq!(block_docids.len(), block_maxes.len());
        // every posting's score is bounded by its block maximum
        let mut block = 0;
        for (i, &score) in scores.iter().enumerate() {
            while block_docids[block] < i as u32 {
                block += 1;
            }
            assert!(block_maxes[block] >= score);
        }
        // more than one block, or the DP did nothing
        assert!(block_docids.len() > 1);
    }
}
