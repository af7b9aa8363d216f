/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// A bounded min-heap of `(score, docid)` entries with a running
/// threshold: the smallest score in a full heap. The threshold only
/// grows, which is what makes it a safe pruning oracle for the
/// WAND-family operators.
#[derive(Debug, Clone)]
pub struct TopKQueue {
    threshold: f32,
    k: usize,
    entries: Vec<(f32, u64)>,
}

#[inline]
fn min_heap_order(lhs: &(f32, u64), rhs: &(f32, u64)) -> bool {
    // parent "less than" child in heap terms means higher score sinks
    lhs.0 > rhs.0
}

impl TopKQueue {
    pub fn new(k: usize) -> Self {
        Self {
            threshold: 0.0,
            k,
            entries: Vec::with_capacity(k + 1),
        }
    }

    /// The retrieval depth.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The current entry threshold: zero until the heap fills up.
    #[inline(always)]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether a document with score `score` would enter the queue.
    #[inline(always)]
    pub fn would_enter(&self, score: f32) -> bool {
        self.entries.len() < self.k || score > self.threshold
    }

    /// Offers `(score, docid)`; returns whether it was taken.
    pub fn insert(&mut self, score: f32, docid: u64) -> bool {
        if self.entries.len() >= self.k && score <= self.threshold {
            return false;
        }
        self.entries.push((score, docid));
        self.sift_up(self.entries.len() - 1);
        if self.entries.len() > self.k {
            self.pop_min();
        }
        if self.entries.len() == self.k {
            self.threshold = self.entries[0].0;
        }
        true
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if min_heap_order(&self.entries[parent], &self.entries[i]) {
                self.entries.swap(parent, i);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn pop_min(&mut self) {
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        self.entries.pop();
        // sift down
        let mut i = 0;
        loop {
            let left = 2 * i + 1;
            if left >= self.entries.len() {
                break;
            }
            let mut smallest = left;
            let right = left + 1;
            if right < self.entries.len()
                && min_heap_order(&self.entries[left], &self.entries[right])
            {
                smallest = right;
            }
            if min_heap_order(&self.entries[i], &self.entries[smallest]) {
                self.entries.swap(i, smallest);
                i = smallest;
            } else {
                break;
            }
        }
    }

    /// Sorts by descending score (ties broken by ascending docid) and
    /// drops nonpositive entries.
    pub fn finalize(&mut self) {
        self.entries.sort_by(|l, r| {
            r.0.partial_cmp(&l.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| l.1.cmp(&r.1))
        });
        let cutoff = self.entries.partition_point(|&(score, _)| score > 0.0);
        self.entries.truncate(cutoff);
    }

    /// The collected entries; meaningful after [`finalize`](Self::finalize).
    pub fn topk(&self) -> &[(f32, u64)] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.threshold = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_rise() {
        // single-term scenario with k = 1: the threshold tracks the
        // running maximum and never decreases
        let scores = [0.5f32, 0.2, 0.9, 0.1, 1.5, 1.4];
        let mut queue = TopKQueue::new(1);
        let mut running_max = 0.0f32;
        let mut last_threshold = 0.0f32;
        for (docid, &score) in scores.iter().enumerate() {
            queue.insert(score, docid as u64);
            running_max = running_max.max(score);
            assert!(queue.threshold() >= last_threshold);
            assert_eq!(queue.threshold(), running_max);
            last_threshold = queue.threshold();
        }
        queue.finalize();
        assert_eq!(queue.topk(), &[(1.5, 4)]);
    }

    #[test]
    fn test_topk_with_ties() {
        let mut queue = TopKQueue::new(3);
        for (docid, score) in [(10u64, 1.0f32), (3, 2.0), (7, 1.0), (1, 1.0), (5, 0.5)] {
            queue.insert(score, docid);
        }
        queue.finalize();
        // the late tie does not displace an incumbent; output ties are
        // ordered by ascending docid
        assert_eq!(queue.topk(), &[(2.0, 3), (1.0, 7), (1.0, 10)]);
    }

    #[test]
    fn test_would_enter() {
        let mut queue = TopKQueue::new(2);
        assert!(queue.would_enter(0.0));
        queue.insert(1.0, 0);
        queue.insert(2.0, 1);
        assert!(!queue.would_enter(0.9));
        assert!(!queue.would_enter(1.0));
        assert!(queue.would_enter(1.1));
        queue.insert(3.0, 2);
        assert_eq!(queue.threshold(), 2.0);
    }

    #[test]
    fn test_drops_nonpositive() {
        let mut queue = TopKQueue::new(5);
        queue.insert(0.0, 1);
        queue.insert(1.0, 2);
        queue.finalize();
        assert_eq!(queue.topk(), &[(1.0, 2)]);
    }
}
