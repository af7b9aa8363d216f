/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The ε-approximate optimal-partition shortest path of Ottaviano and
//! Venturini: partition boundaries minimizing total encoded bits, within
//! a factor `(1 + eps1)` of the optimum, computed with a geometric ladder
//! of sliding cost windows.

/// Cost of the interval `[start, end)`: a window keeps the interval
/// endpoints plus the bounds needed to evaluate the base-encoder cost.
struct CostWindow<'a> {
    values: &'a [u64],
    /// starting and ending position of the window; the `end`-th position
    /// is not in the current window
    start: usize,
    end: usize,
    /// element preceding the first element of the window
    min_p: u64,
    max_p: u64,
    /// the maximum cost for this window
    cost_upper_bound: u64,
}

impl<'a> CostWindow<'a> {
    fn new(values: &'a [u64], cost_upper_bound: u64) -> Self {
        Self {
            values,
            start: 0,
            end: 0,
            min_p: values[0],
            max_p: 0,
            cost_upper_bound,
        }
    }

    fn universe(&self) -> u64 {
        self.max_p - self.min_p + 1
    }

    fn size(&self) -> u64 {
        (self.end - self.start) as u64
    }

    fn advance_start(&mut self) {
        self.min_p = self.values[self.start] + 1;
        self.start += 1;
    }

    fn advance_end(&mut self) {
        self.max_p = self.values[self.end];
        self.end += 1;
    }
}

/// Returns the partition endpoints (the last one is `values.len()`)
/// minimizing `Σ cost(universe, size)` over the partition, up to the
/// approximation factors `eps1` and `eps2`.
pub fn optimal_partition(
    values: &[u64],
    universe: u64,
    cost: impl Fn(u64, u64) -> u64,
    eps1: f64,
    eps2: f64,
) -> Vec<u64> {
    let size = values.len();
    let single_block_cost = cost(universe, size as u64);
    let mut min_cost = vec![single_block_cost; size + 1];
    min_cost[0] = 0;

    // create the required windows: one for each power of the
    // approximation factor
    let mut windows = Vec::new();
    let cost_lb = cost(1, 1); // minimum cost
    let mut cost_bound = cost_lb;
    while eps1 == 0.0 || (cost_bound as f64) < cost_lb as f64 / eps1 {
        windows.push(CostWindow::new(values, cost_bound));
        if cost_bound >= single_block_cost {
            break;
        }
        cost_bound = (cost_bound as f64 * (1.0 + eps2)) as u64;
    }

    let mut path = vec![0usize; size + 1];
    for i in 0..size {
        let mut last_end = i + 1;
        for window in windows.iter_mut() {
            debug_assert_eq!(window.start, i);
            while window.end < last_end {
                window.advance_end();
            }

            loop {
                let window_cost = cost(window.universe(), window.size());
                if min_cost[i] + window_cost < min_cost[window.end] {
                    min_cost[window.end] = min_cost[i] + window_cost;
                    path[window.end] = i;
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

    let mut partition = Vec::new();
    let mut curr_pos = size;
    while curr_pos != 0 {
        partition.push(curr_pos as u64);
        curr_pos = path[curr_pos];
    }
    partition.reverse();
    partition
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        // uniform gaps: one partition is optimal
        let values: Vec<u64> = (0..100).map(|i| i * 3).collect();
        let partition = optimal_partition(&values, 300, |u, n| u + n, 0.03, 0.3);
        assert_eq!(*partition.last().unwrap(), 100);
        let mut prev = 0;
        for &p in &partition {
            assert!(p > prev || p == partition[0]);
            prev = p;
        }
    }

    #[test]
    fn test_clustered_splits() {
        // two tight clusters far apart: splitting must win over one block
        let mut values: Vec<u64> = (0..64).collect();
        values.extend((0..64).map(|i| 1_000_000 + i));
        let cost = |u: u64, n: u64| u.min(n * 32) + 64;
        let partition = optimal_partition(&values, 1_000_100, cost, 0.03, 0.3);
        assert!(partition.len() >= 2);
        assert_eq!(*partition.last().unwrap(), 128);
        assert!(partition.contains(&64));
    }
}
