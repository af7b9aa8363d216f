/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{
    PayloadEnumerator, PayloadSequence, PosValue, Sequence, SequenceEnumerator, StrictSequence,
};
use crate::bits::{BitVectorBuilder, BitsRef};
use crate::config::GlobalParameters;
use anyhow::{ensure, Result};
use std::marker::PhantomData;

/// Strictly positive values stored as their running prefix sums in a
/// strictly increasing base sequence. Only positional access makes sense:
/// the value at position `i` is the difference of two consecutive prefix
/// sums, and the enumerator caches the last one so that in-order access
/// costs one base move per value.
pub struct PositiveSequence<B = StrictSequence> {
    _marker: PhantomData<B>,
}

impl<B: Sequence> PayloadSequence for PositiveSequence<B> {
    type Enumerator<'a> = PositiveEnumerator<'a, B>;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
    ) -> Result<()> {
        debug_assert!(!values.is_empty());
        let mut cumulative = Vec::with_capacity(values.len());
        let mut sum = 0u64;
        for (i, &v) in values.iter().enumerate() {
            ensure!(v > 0, "value at position {} is not positive", i);
            sum += v;
            cumulative.push(sum);
        }
        ensure!(sum < universe, "prefix sum {} exceeds universe {}", sum, universe);
        B::write(bvb, &cumulative, universe, params)
    }

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        let base_enum = B::enumerator(bits, offset, universe, n, params);
        PositiveEnumerator {
            position: base_enum.size(),
            cur: 0,
            base_enum,
        }
    }
}

pub struct PositiveEnumerator<'a, B: Sequence> {
    base_enum: B::Enumerator<'a>,
    position: u64,
    cur: u64,
}

impl<'a, B: Sequence> Clone for PositiveEnumerator<'a, B> {
    fn clone(&self) -> Self {
        Self {
            base_enum: self.base_enum.clone(),
            position: self.position,
            cur: self.cur,
        }
    }
}

impl<'a, B: Sequence> PositiveEnumerator<'a, B> {
    /// The underlying prefix-sum enumerator.
    pub fn base(&self) -> &B::Enumerator<'a> {
        &self.base_enum
    }
}

impl<B: Sequence> PayloadEnumerator for PositiveEnumerator<'_, B> {
    fn move_to(&mut self, position: u64) -> PosValue {
        debug_assert!(position < self.base_enum.size());
        // cache the position and last prefix sum to avoid the second base
        // move in the common in-order case
        let mut prev = self.cur;
        if position != self.position + 1 {
            if position == 0 {
                self.cur = self.base_enum.move_to(0).1;
                self.position = 0;
                return (0, self.cur);
            }
            prev = self.base_enum.move_to(position - 1).1;
        }

        self.cur = self.base_enum.next().1;
        self.position = position;
        (position, self.cur - prev)
    }

    fn size(&self) -> u64 {
        self.base_enum.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_roundtrip() {
        let params = GlobalParameters::default();
        let values = [3u64, 1, 1, 7, 2, 1, 1, 1, 10, 4];
        let occurrences: u64 = values.iter().sum();
        let mut bvb = BitVectorBuilder::new();
        PositiveSequence::<StrictSequence>::write(&mut bvb, &values, occurrences + 1, &params)
            .unwrap();
        let bv = bvb.build();

        let mut en = PositiveSequence::<StrictSequence>::enumerator(
            bv.as_bits(),
            0,
            occurrences + 1,
            values.len() as u64,
            &params,
        );
        // in order
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(en.move_to(i as u64), (i as u64, v));
        }
        // out of order
        for &i in &[5u64, 0, 9, 3, 4, 1] {
            assert_eq!(en.move_to(i), (i, values[i as usize]));
        }
    }
}
