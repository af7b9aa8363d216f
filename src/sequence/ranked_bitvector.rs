/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{NextGeqEnumerator, PosValue, Sequence, SequenceEnumerator};
use crate::bits::{BitVectorBuilder, BitsRef, UnaryEnumerator};
use crate::config::GlobalParameters;
use crate::utils::{ceil_div, ceil_log2};
use anyhow::{bail, ensure, Result};

/// A plain bitmap over the universe with rank samples (one every
/// `2^rb_log_rank1_sampling` bits) and select samples (one every
/// `2^rb_log_sampling1` ones). Chosen by the variant pickers when the
/// sequence is too dense for Elias–Fano to pay off.
pub struct CompactRankedBitVector;

#[derive(Debug, Clone, Copy, Default)]
struct Offsets {
    universe: u64,
    n: u64,
    log_rank1_sampling: u64,
    log_sampling1: u64,

    rank1_sample_size: u64,
    pointer_size: u64,
    rank1_samples: u64,
    pointers1: u64,

    rank1_samples_offset: u64,
    pointers1_offset: u64,
    bits_offset: u64,
    end: u64,
}

impl Offsets {
    fn new(base_offset: u64, universe: u64, n: u64, params: &GlobalParameters) -> Self {
        let log_rank1_sampling = params.rb_log_rank1_sampling as u64;
        let log_sampling1 = params.rb_log_sampling1 as u64;
        let rank1_sample_size = ceil_log2(n + 1);
        let pointer_size = ceil_log2(universe);
        let rank1_samples = universe >> log_rank1_sampling;
        let pointers1 = n >> log_sampling1;

        let rank1_samples_offset = base_offset;
        let pointers1_offset = rank1_samples_offset + rank1_samples * rank1_sample_size;
        let bits_offset = pointers1_offset + pointers1 * pointer_size;
        let end = bits_offset + universe;

        Self {
            universe,
            n,
            log_rank1_sampling,
            log_sampling1,
            rank1_sample_size,
            pointer_size,
            rank1_samples,
            pointers1,
            rank1_samples_offset,
            pointers1_offset,
            bits_offset,
            end,
        }
    }
}

impl CompactRankedBitVector {
    fn set_rank1_samples(
        bvb: &mut BitVectorBuilder,
        of: &Offsets,
        begin: u64,
        end: u64,
        rank: u64,
    ) {
        let mut sample = ceil_div(begin, 1u64 << of.log_rank1_sampling);
        while sample << of.log_rank1_sampling < end {
            if sample != 0 {
                let offset = of.rank1_samples_offset + (sample - 1) * of.rank1_sample_size;
                debug_assert!(offset + of.rank1_sample_size <= of.pointers1_offset);
                bvb.set_bits(offset, rank, of.rank1_sample_size);
            }
            sample += 1;
        }
    }
}

impl Sequence for CompactRankedBitVector {
    type Enumerator<'a> = RankedBitVectorEnumerator<'a>;

    fn bitsize(params: &GlobalParameters, universe: u64, n: u64) -> u64 {
        Offsets::new(0, universe, n, params).end
    }

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
    ) -> Result<()> {
        let n = values.len() as u64;
        ensure!(n > 0, "sequence must be nonempty");
        let base_offset = bvb.len();
        let of = Offsets::new(base_offset, universe, n, params);
        bvb.zero_extend(of.end - base_offset);

        let sample1_mask = (1u64 << of.log_sampling1) - 1;
        let mut last = 0u64;
        for (i, &v) in values.iter().enumerate() {
            let i = i as u64;
            if i > 0 && v <= last {
                bail!("sequence is not strictly increasing");
            }
            ensure!(v < universe, "value {} out of universe {}", v, universe);

            bvb.set(of.bits_offset + v, true);

            if i > 0 && i & sample1_mask == 0 {
                let ptr1 = i >> of.log_sampling1;
                let offset = of.pointers1_offset + (ptr1 - 1) * of.pointer_size;
                debug_assert!(offset + of.pointer_size <= of.bits_offset);
                bvb.set_bits(offset, v, of.pointer_size);
            }

            Self::set_rank1_samples(bvb, &of, last + 1, v + 1, i);
            last = v;
        }
        Self::set_rank1_samples(bvb, &of, last + 1, of.universe, n);
        Ok(())
    }

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        let of = Offsets::new(offset, universe, n, params);
        RankedBitVectorEnumerator {
            bits,
            of,
            position: n,
            value: universe,
            enumerator: UnaryEnumerator::new(bits, of.bits_offset),
        }
    }
}

const LINEAR_SCAN_THRESHOLD: u64 = 8;
/// Bit distance under which `next_geq` scans ones instead of using rank
/// samples.
const GEQ_LINEAR_SCAN_BITS: u64 = 64;

#[derive(Debug, Clone, Copy)]
pub struct RankedBitVectorEnumerator<'a> {
    bits: BitsRef<'a>,
    of: Offsets,
    position: u64,
    value: u64,
    enumerator: UnaryEnumerator<'a>,
}

impl<'a> RankedBitVectorEnumerator<'a> {
    #[inline(always)]
    fn value_pair(&self) -> PosValue {
        (self.position, self.value)
    }

    #[inline(always)]
    fn read_next(&mut self) -> u64 {
        self.enumerator.next() - self.of.bits_offset
    }

    fn pointer1(&self, i: u64) -> u64 {
        if i == 0 {
            0
        } else {
            self.bits.get_bits(
                self.of.pointers1_offset + (i - 1) * self.of.pointer_size,
                self.of.pointer_size,
            )
        }
    }

    fn rank1_sample(&self, i: u64) -> u64 {
        if i == 0 {
            0
        } else {
            self.bits.get_bits(
                self.of.rank1_samples_offset + (i - 1) * self.of.rank1_sample_size,
                self.of.rank1_sample_size,
            )
        }
    }

    /// Ones of the bitmap in the value range `[from, to)`.
    fn rank_in_range(&self, from: u64, to: u64) -> u64 {
        let mut rank = 0u64;
        let mut p = self.of.bits_offset + from;
        let end = self.of.bits_offset + to;
        while p + 64 <= end {
            rank += self.bits.get_bits(p, 64).count_ones() as u64;
            p += 64;
        }
        if p < end {
            rank += self.bits.get_bits(p, end - p).count_ones() as u64;
        }
        rank
    }

    #[cold]
    fn slow_move(&mut self, position: u64) -> PosValue {
        if position == self.of.n {
            self.position = position;
            self.value = self.of.universe;
            return self.value_pair();
        }

        let skip = position.wrapping_sub(self.position);
        let to_skip;
        if position > self.position && skip >> self.of.log_sampling1 == 0 {
            to_skip = skip - 1;
        } else {
            let ptr = position >> self.of.log_sampling1;
            let sampled_value = self.pointer1(ptr);
            self.enumerator =
                UnaryEnumerator::new(self.bits, self.of.bits_offset + sampled_value);
            to_skip = position - (ptr << self.of.log_sampling1);
        }

        self.enumerator.skip(to_skip);
        self.position = position;
        self.value = self.read_next();
        self.value_pair()
    }
}

impl SequenceEnumerator for RankedBitVectorEnumerator<'_> {
    fn move_to(&mut self, position: u64) -> PosValue {
        debug_assert!(position <= self.of.n);
        if position == self.position {
            return self.value_pair();
        }

        let skip = position.wrapping_sub(self.position);
        if position > self.position && position < self.of.n && skip <= LINEAR_SCAN_THRESHOLD {
            let mut he = self.enumerator;
            for _ in 1..skip {
                he.next();
            }
            self.enumerator = he;
            self.position = position;
            self.value = self.read_next();
            return self.value_pair();
        }

        self.slow_move(position)
    }

    #[inline]
    fn next(&mut self) -> PosValue {
        self.position += 1;
        debug_assert!(self.position <= self.of.n);
        if self.position < self.of.n {
            self.value = self.read_next();
        } else {
            self.value = self.of.universe;
        }
        self.value_pair()
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.of.n
    }

    fn prev_value(&self) -> u64 {
        if self.position == 0 {
            return 0;
        }
        let from = if self.position < self.of.n {
            self.value
        } else {
            self.of.universe
        };
        self.bits.predecessor1(self.of.bits_offset + from - 1) - self.of.bits_offset
    }
}

impl NextGeqEnumerator for RankedBitVectorEnumerator<'_> {
    fn next_geq(&mut self, lower_bound: u64) -> PosValue {
        if lower_bound == self.value {
            return self.value_pair();
        }
        if lower_bound >= self.of.universe {
            return self.move_to(self.of.n);
        }

        if lower_bound > self.value && lower_bound - self.value <= GEQ_LINEAR_SCAN_BITS {
            // scan the few intervening bits through the ones enumerator
            while self.value < lower_bound {
                if self.next().0 == self.of.n {
                    break;
                }
            }
            return self.value_pair();
        }

        // jump via the rank samples
        let sample = lower_bound >> self.of.log_rank1_sampling;
        let sampled_rank = self.rank1_sample(sample);
        let scan_from = sample << self.of.log_rank1_sampling;
        let rank = sampled_rank + self.rank_in_range(scan_from, lower_bound);

        self.position = rank;
        if self.position == self.of.n {
            self.value = self.of.universe;
        } else {
            self.enumerator =
                UnaryEnumerator::new(self.bits, self.of.bits_offset + lower_bound);
            self.value = self.read_next();
        }
        self.value_pair()
    }
}
