/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{NextGeqEnumerator, PosValue, Sequence, SequenceEnumerator};
use crate::bits::{BitVectorBuilder, BitsRef, UnaryEnumerator};
use crate::config::GlobalParameters;
use crate::utils::{ceil_div, ceil_log2, msb};
use anyhow::{bail, ensure, Result};

/// Elias–Fano representation of a nondecreasing sequence.
///
/// The layout comprises, in order: a table of sampled zero positions of
/// the high-bit stream (one every `2^ef_log_sampling0` zeros), a table of
/// sampled one positions (one every `2^ef_log_sampling1` ones), the
/// high-bit unary stream padded with one zero sentinel on each side, and
/// the packed low-bit array. The zero samples make
/// [`next_geq`](NextGeqEnumerator::next_geq) constant-time on average, the
/// one samples do the same for [`move_to`](SequenceEnumerator::move_to).
pub struct CompactEliasFano;

/// Derived offsets of the Elias–Fano layout regions.
#[derive(Debug, Clone, Copy, Default)]
struct Offsets {
    universe: u64,
    n: u64,
    log_sampling0: u64,
    log_sampling1: u64,

    lower_bits: u64,
    mask: u64,
    higher_bits_length: u64,
    pointer_size: u64,
    pointers0: u64,
    pointers1: u64,

    pointers0_offset: u64,
    pointers1_offset: u64,
    higher_bits_offset: u64,
    lower_bits_offset: u64,
    end: u64,
}

impl Offsets {
    fn new(
        base_offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self {
        debug_assert!(n > 0);
        let log_sampling0 = params.ef_log_sampling0 as u64;
        let log_sampling1 = params.ef_log_sampling1 as u64;
        let lower_bits = if universe > n { msb(universe / n) } else { 0 };
        // pad with a zero on both sides as sentinels
        let higher_bits_length = n + (universe >> lower_bits) + 2;
        let pointer_size = ceil_log2(higher_bits_length);
        let pointers0 = (higher_bits_length - n) >> log_sampling0;
        let pointers1 = n >> log_sampling1;

        let pointers0_offset = base_offset;
        let pointers1_offset = pointers0_offset + pointers0 * pointer_size;
        let higher_bits_offset = pointers1_offset + pointers1 * pointer_size;
        let lower_bits_offset = higher_bits_offset + higher_bits_length;
        let end = lower_bits_offset + n * lower_bits;

        Self {
            universe,
            n,
            log_sampling0,
            log_sampling1,
            lower_bits,
            mask: (1u64 << lower_bits) - 1,
            higher_bits_length,
            pointer_size,
            pointers0,
            pointers1,
            pointers0_offset,
            pointers1_offset,
            higher_bits_offset,
            lower_bits_offset,
            end,
        }
    }
}

impl CompactEliasFano {
    fn set_ptr0s(
        bvb: &mut BitVectorBuilder,
        of: &Offsets,
        begin: u64,
        end: u64,
        rank_end: u64,
    ) {
        let begin_zeros = begin - rank_end;
        let end_zeros = end - rank_end;

        let mut ptr0 = ceil_div(begin_zeros, 1u64 << of.log_sampling0);
        while ptr0 << of.log_sampling0 < end_zeros {
            if ptr0 != 0 {
                let offset = of.pointers0_offset + (ptr0 - 1) * of.pointer_size;
                debug_assert!(offset + of.pointer_size <= of.pointers1_offset);
                bvb.set_bits(offset, (ptr0 << of.log_sampling0) + rank_end, of.pointer_size);
            }
            ptr0 += 1;
        }
    }
}

impl Sequence for CompactEliasFano {
    type Enumerator<'a> = EliasFanoEnumerator<'a>;

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
        // initialize all the bits to 0
        bvb.zero_extend(of.end - base_offset);

        let sample1_mask = (1u64 << of.log_sampling1) - 1;

        let mut last = 0u64;
        let mut last_high = 0u64;
        for (i, &v) in values.iter().enumerate() {
            let i = i as u64;
            if i > 0 && v < last {
                bail!("sequence is not sorted");
            }
            ensure!(v < universe, "value {} out of universe {}", v, universe);
            let high = (v >> of.lower_bits) + i + 1;
            let low = v & of.mask;

            bvb.set(of.higher_bits_offset + high, true);

            let offset = of.lower_bits_offset + i * of.lower_bits;
            debug_assert!(offset + of.lower_bits <= of.end);
            bvb.set_bits(offset, low, of.lower_bits);

            if i > 0 && i & sample1_mask == 0 {
                let ptr1 = i >> of.log_sampling1;
                let offset = of.pointers1_offset + (ptr1 - 1) * of.pointer_size;
                debug_assert!(offset + of.pointer_size <= of.higher_bits_offset);
                bvb.set_bits(offset, high, of.pointer_size);
            }

            // write pointers for the run of zeros in [last_high, high)
            Self::set_ptr0s(bvb, &of, last_high + 1, high, i);
            last_high = high;
            last = v;
        }

        // pointers to zeros after the last 1
        Self::set_ptr0s(bvb, &of, last_high + 1, of.higher_bits_length, n);
        Ok(())
    }

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        EliasFanoEnumerator::new(bits, offset, universe, n, params)
    }
}

const LINEAR_SCAN_THRESHOLD: u64 = 8;

/// Enumerator over a [`CompactEliasFano`] sequence.
#[derive(Debug, Clone, Copy)]
pub struct EliasFanoEnumerator<'a> {
    bits: BitsRef<'a>,
    of: Offsets,
    position: u64,
    value: u64,
    high_enumerator: UnaryEnumerator<'a>,
}

impl<'a> EliasFanoEnumerator<'a> {
    pub fn new(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self {
        let of = Offsets::new(offset, universe, n, params);
        Self {
            bits,
            of,
            position: n,
            value: universe,
            high_enumerator: UnaryEnumerator::new(bits, of.higher_bits_offset),
        }
    }

    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline(always)]
    fn value_pair(&self) -> PosValue {
        (self.position, self.value)
    }

    #[inline(always)]
    fn read_low(&self) -> u64 {
        self.bits
            .get_word56(self.of.lower_bits_offset + self.position * self.of.lower_bits)
            & self.of.mask
    }

    #[inline(always)]
    fn read_next(&mut self) -> u64 {
        debug_assert!(self.position < self.of.n);
        let high = self.high_enumerator.next() - self.of.higher_bits_offset;
        (high - self.position - 1) << self.of.lower_bits | self.read_low()
    }

    #[inline]
    fn pointer(&self, offset: u64, i: u64) -> u64 {
        if i == 0 {
            0
        } else {
            self.bits
                .get_bits(offset + (i - 1) * self.of.pointer_size, self.of.pointer_size)
        }
    }

    #[inline]
    fn pointer0(&self, i: u64) -> u64 {
        self.pointer(self.of.pointers0_offset, i)
    }

    #[inline]
    fn pointer1(&self, i: u64) -> u64 {
        self.pointer(self.of.pointers1_offset, i)
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
            let high_pos = self.pointer1(ptr);
            let high_rank = ptr << self.of.log_sampling1;
            self.high_enumerator =
                UnaryEnumerator::new(self.bits, self.of.higher_bits_offset + high_pos);
            to_skip = position - high_rank;
        }

        self.high_enumerator.skip(to_skip);
        self.position = position;
        self.value = self.read_next();
        self.value_pair()
    }

    #[cold]
    fn slow_next_geq(&mut self, lower_bound: u64) -> PosValue {
        if lower_bound >= self.of.universe {
            return self.move_to(self.of.n);
        }

        let high_lower_bound = lower_bound >> self.of.lower_bits;
        let cur_high = self.value >> self.of.lower_bits;
        let high_diff = high_lower_bound.wrapping_sub(cur_high);

        let to_skip;
        if lower_bound > self.value && high_diff >> self.of.log_sampling0 == 0 {
            // note: at the current position in the bitvector there should
            // be a 1, but since we already consumed it, it is 0 in the
            // enumerator, so we need to skip it
            to_skip = high_diff;
        } else {
            let ptr = high_lower_bound >> self.of.log_sampling0;
            let high_pos = self.pointer0(ptr);
            let high_rank0 = ptr << self.of.log_sampling0;

            self.high_enumerator =
                UnaryEnumerator::new(self.bits, self.of.higher_bits_offset + high_pos);
            to_skip = high_lower_bound - high_rank0;
        }

        self.high_enumerator.skip0(to_skip);
        self.position =
            self.high_enumerator.position() - self.of.higher_bits_offset - high_lower_bound;

        let mut he = self.high_enumerator;
        let mut high_base = self.of.higher_bits_offset + self.position + 1;
        let mut lower_base = self.of.lower_bits_offset + self.position * self.of.lower_bits;
        loop {
            if self.position == self.of.n {
                self.high_enumerator = he;
                self.value = self.of.universe;
                return self.value_pair();
            }
            let high = he.next() - high_base;
            let low = self.bits.get_word56(lower_base) & self.of.mask;
            high_base += 1;
            lower_base += self.of.lower_bits;
            let val = high << self.of.lower_bits | low;
            if val >= lower_bound {
                self.high_enumerator = he;
                self.value = val;
                return self.value_pair();
            }
            self.position += 1;
        }
    }
}

impl SequenceEnumerator for EliasFanoEnumerator<'_> {
    fn move_to(&mut self, position: u64) -> PosValue {
        debug_assert!(position <= self.of.n);

        if position == self.position {
            return self.value_pair();
        }

        let skip = position.wrapping_sub(self.position);
        // optimize small forward skips
        if position > self.position && skip <= LINEAR_SCAN_THRESHOLD {
            self.position = position;
            if self.position == self.of.n {
                self.value = self.of.universe;
            } else {
                let mut he = self.high_enumerator;
                for _ in 0..skip {
                    he.next();
                }
                self.value = (he.position() - self.of.higher_bits_offset - self.position - 1)
                    << self.of.lower_bits
                    | self.read_low();
                self.high_enumerator = he;
            }
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

        let mut prev_high = if self.position < self.of.n {
            self.bits.predecessor1(self.high_enumerator.position() - 1)
        } else {
            self.bits.predecessor1(self.of.lower_bits_offset - 1)
        };
        prev_high -= self.of.higher_bits_offset;

        let prev_pos = self.position - 1;
        let prev_low = self
            .bits
            .get_word56(self.of.lower_bits_offset + prev_pos * self.of.lower_bits)
            & self.of.mask;
        (prev_high - prev_pos - 1) << self.of.lower_bits | prev_low
    }
}

impl NextGeqEnumerator for EliasFanoEnumerator<'_> {
    fn next_geq(&mut self, lower_bound: u64) -> PosValue {
        if lower_bound == self.value {
            return self.value_pair();
        }

        let high_lower_bound = lower_bound >> self.of.lower_bits;
        let cur_high = self.value >> self.of.lower_bits;
        let high_diff = high_lower_bound.wrapping_sub(cur_high);

        if lower_bound > self.value && high_diff <= LINEAR_SCAN_THRESHOLD {
            // optimize small skips
            let mut he = self.high_enumerator;
            let mut high_base = self.of.higher_bits_offset + self.position + 1 + 1;
            let mut lower_base =
                self.of.lower_bits_offset + (self.position + 1) * self.of.lower_bits;
            let mut val;
            loop {
                self.position += 1;
                if self.position < self.of.n {
                    let high = he.next() - high_base;
                    let low = self.bits.get_word56(lower_base) & self.of.mask;
                    high_base += 1;
                    lower_base += self.of.lower_bits;
                    val = high << self.of.lower_bits | low;
                } else {
                    val = self.of.universe;
                    break;
                }
                if val >= lower_bound {
                    break;
                }
            }
            self.high_enumerator = he;
            self.value = val;
            self.value_pair()
        } else {
            self.slow_next_geq(lower_bound)
        }
    }
}
