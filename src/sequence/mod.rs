/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Succinct monotone sequences.
//!
//! All representations share a common contract: a sequence of `n`
//! nondecreasing values over a universe `U` (all values `< U`) written
//! into a [`BitVectorBuilder`](crate::bits::BitVectorBuilder) at the
//! current position, and later enumerated from a bit offset. Enumerators
//! report `(position, value)` pairs; moving to position `n` yields the
//! sentinel value `U`.
//!
//! The representations are:
//!
//! - [`CompactEliasFano`]: Elias–Fano with two-level skip pointers over
//!   the zeros and ones of the high-bit stream;
//! - [`CompactRankedBitVector`]: a plain bitmap with rank and select
//!   samples, preferable for dense sequences;
//! - [`AllOnesSequence`]: the contiguous-range case, stored in zero bits;
//! - [`IndexedSequence`]/[`StrictSequence`]: per-sequence pickers of the
//!   smallest of the above (the strict variant for strictly increasing
//!   sequences);
//! - [`UniformPartitionedSequence`] and [`PartitionedSequence`]: two-level
//!   partitioned representations, with fixed-size partitions or
//!   boundaries chosen by the [`optimal_partition`] dynamic program;
//! - [`PositiveSequence`]: strictly positive values stored as the prefix
//!   sums of a strict sequence.

mod all_ones;
mod compact_elias_fano;
mod indexed_sequence;
mod optimal_partition;
mod partitioned;
mod positive_sequence;
mod ranked_bitvector;
mod strict_elias_fano;
mod strict_sequence;
mod uniform_partitioned;

pub use all_ones::{AllOnesEnumerator, AllOnesSequence};
pub use compact_elias_fano::{CompactEliasFano, EliasFanoEnumerator};
pub use indexed_sequence::{IndexedSequence, IndexedSequenceEnumerator};
pub use optimal_partition::optimal_partition;
pub use partitioned::{PartitionedEnumerator, PartitionedSequence};
pub use positive_sequence::{PositiveEnumerator, PositiveSequence};
pub use ranked_bitvector::{CompactRankedBitVector, RankedBitVectorEnumerator};
pub use strict_elias_fano::{StrictEliasFano, StrictEliasFanoEnumerator};
pub use strict_sequence::{StrictSequence, StrictSequenceEnumerator};
pub use uniform_partitioned::{UniformPartitionedEnumerator, UniformPartitionedSequence};

use crate::bits::{BitVectorBuilder, BitsRef};
use crate::config::GlobalParameters;
use anyhow::Result;

/// A `(position, value)` pair reported by sequence enumerators.
pub type PosValue = (u64, u64);

/// A monotone-sequence representation.
pub trait Sequence {
    type Enumerator<'a>: SequenceEnumerator;

    /// The exact number of bits [`write`](Self::write) would append, or
    /// `u64::MAX` if the representation does not apply.
    fn bitsize(params: &GlobalParameters, universe: u64, n: u64) -> u64;

    /// Appends the encoding of `values` (nondecreasing, all `< universe`)
    /// to `bvb`.
    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
    ) -> Result<()>;

    /// An enumerator over a sequence written at bit `offset`.
    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a>;
}

/// Positioned access to an encoded monotone sequence.
pub trait SequenceEnumerator: Clone {
    /// Moves to `position` and returns `(position, value)`; position `n`
    /// yields the universe as sentinel.
    fn move_to(&mut self, position: u64) -> PosValue;

    /// Advances by one position.
    fn next(&mut self) -> PosValue;

    /// The number of values.
    fn size(&self) -> u64;

    /// The value preceding the current position (zero at position 0).
    fn prev_value(&self) -> u64;
}

/// Skipping access: the smallest value at least `lower_bound`.
///
/// Implemented by the document-sequence representations; frequency
/// sequences only need positional access.
pub trait NextGeqEnumerator: SequenceEnumerator {
    /// Moves to the first value `≥ lower_bound` and returns it, or to the
    /// end sentinel if there is none. Calling it twice with the same bound
    /// is a no-op after the first call.
    fn next_geq(&mut self, lower_bound: u64) -> PosValue;
}

/// A sequence accessed by position only, as frequency payloads are.
///
/// Implemented by [`PositiveSequence`], whose values (differences of
/// prefix sums) are not monotone and therefore support no skipping.
pub trait PayloadSequence {
    type Enumerator<'a>: PayloadEnumerator;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
    ) -> Result<()>;

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a>;
}

/// Positional access to a payload sequence.
pub trait PayloadEnumerator: Clone {
    fn move_to(&mut self, position: u64) -> PosValue;
    fn size(&self) -> u64;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A deterministic mix of dense runs and wide jumps, the shape that
    /// exercises both the bitmap and the Elias-Fano variants across
    /// partitions.
    pub(crate) fn clustered_sequence(n: usize, seed: u64) -> (Vec<u64>, u64) {
        let mut state = seed.wrapping_mul(0x9e3779b97f4a7c15) | 1;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        let mut values = Vec::with_capacity(n);
        let mut v = next() % 100;
        while values.len() < n {
            let run = (next() % 200 + 1).min((n - values.len()) as u64);
            // dense run
            for _ in 0..run {
                values.push(v);
                v += 1 + next() % 3;
            }
            // wide jump
            v += next() % 100_000;
        }
        let universe = v + 1;
        (values, universe)
    }

    /// Checks in-order and random access against the reference values.
    pub(crate) fn check_enumerator<E: SequenceEnumerator>(
        en: &mut E,
        values: &[u64],
        universe: u64,
    ) {
        assert_eq!(en.size(), values.len() as u64);
        en.move_to(0);
        assert_eq!(en.move_to(0).1, values[0]);
        for (i, &v) in values.iter().enumerate().skip(1) {
            assert_eq!(en.next(), (i as u64, v), "next at {}", i);
        }
        assert_eq!(en.next(), (values.len() as u64, universe));

        let n = values.len() as u64;
        for k in 0..50u64 {
            let i = k.wrapping_mul(2654435761) % n;
            assert_eq!(en.move_to(i), (i, values[i as usize]), "move_to {}", i);
        }
    }

    /// Checks `next_geq` against a linear reference scan, both from a
    /// fresh enumerator and monotonically.
    pub(crate) fn check_next_geq<E: NextGeqEnumerator>(
        mut fresh: impl FnMut() -> E,
        values: &[u64],
        universe: u64,
    ) {
        let reference = |lb: u64| -> (u64, u64) {
            match values.iter().position(|&v| v >= lb) {
                Some(i) => (i as u64, values[i]),
                None => (values.len() as u64, universe),
            }
        };

        let n = values.len();
        let probes: Vec<u64> = (0..40u64)
            .map(|k| values[(k as usize * 97) % n].saturating_sub(k % 3))
            .chain([0, universe - 1, universe / 2].into_iter())
            .collect();

        for &lb in &probes {
            let mut en = fresh();
            assert_eq!(en.next_geq(lb), reference(lb), "fresh next_geq({})", lb);
            // idempotence
            assert_eq!(en.next_geq(lb), reference(lb), "repeated next_geq({})", lb);
        }

        // monotone usage on a single enumerator
        let mut en = fresh();
        let mut sorted = probes.clone();
        sorted.sort_unstable();
        for &lb in &sorted {
            assert_eq!(en.next_geq(lb), reference(lb), "monotone next_geq({})", lb);
        }
    }
}
