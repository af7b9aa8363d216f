/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{
    CompactEliasFano, EliasFanoEnumerator, IndexedSequence, NextGeqEnumerator, PosValue,
    Sequence, SequenceEnumerator,
};
use crate::bits::{
    read_delta, read_gamma, read_gamma_nonzero, write_delta, write_gamma, write_gamma_nonzero,
    BitEnumerator, BitVectorBuilder, BitsRef,
};
use crate::config::GlobalParameters;
use crate::utils::{ceil_div, ceil_log2};
use anyhow::Result;
use std::marker::PhantomData;

/// A two-level representation with partitions of fixed size
/// `2^log_partition_size` (the last possibly shorter): no partition
/// search is needed, so only the per-partition upper bounds are stored as
/// an Elias–Fano sequence next to the fixed-width bit endpoints of the
/// per-partition streams.
pub struct UniformPartitionedSequence<B = IndexedSequence> {
    _marker: PhantomData<B>,
}

impl<B: Sequence> Sequence for UniformPartitionedSequence<B> {
    type Enumerator<'a> = UniformPartitionedEnumerator<'a, B>;

    fn bitsize(_params: &GlobalParameters, _universe: u64, _n: u64) -> u64 {
        // data-dependent; never used as a base sequence of another picker
        u64::MAX
    }

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
    ) -> Result<()> {
        let n = values.len() as u64;
        debug_assert!(n > 0);
        let partition_size = 1u64 << params.log_partition_size;
        let partitions = ceil_div(n, partition_size);
        write_gamma_nonzero(bvb, partitions);

        let mut cur_partition = Vec::new();
        if partitions == 1 {
            let cur_base = values[0];
            for &v in values {
                cur_partition.push(v - cur_base);
            }

            let universe_bits = ceil_log2(universe);
            bvb.append_bits(cur_base, universe_bits);

            // write universe only if non-singleton and not tight
            if n > 1 {
                if cur_base + cur_partition[cur_partition.len() - 1] + 1 == universe {
                    // tight universe
                    write_delta(bvb, 0);
                } else {
                    write_delta(bvb, cur_partition[cur_partition.len() - 1]);
                }
            }

            B::write(
                bvb,
                &cur_partition,
                cur_partition[cur_partition.len() - 1] + 1,
                params,
            )?;
        } else {
            let mut bv_sequences = BitVectorBuilder::new();
            let mut endpoints = Vec::new();
            let mut upper_bounds = Vec::new();

            let mut cur_i = 0usize;
            let mut cur_base = values[0];
            upper_bounds.push(cur_base);

            for p in 0..partitions {
                cur_partition.clear();
                let mut value = 0;
                while (cur_i as u64) < ((p + 1) * partition_size).min(n) {
                    value = values[cur_i];
                    cur_partition.push(value - cur_base);
                    cur_i += 1;
                }
                debug_assert!(cur_partition.len() as u64 <= partition_size);
                debug_assert!(
                    p == partitions - 1 || cur_partition.len() as u64 == partition_size
                );

                let upper_bound = value;
                debug_assert!(!cur_partition.is_empty());
                B::write(
                    &mut bv_sequences,
                    &cur_partition,
                    cur_partition[cur_partition.len() - 1] + 1,
                    params,
                )?;
                endpoints.push(bv_sequences.len());
                upper_bounds.push(upper_bound);
                cur_base = upper_bound + 1;
            }

            let mut bv_upper_bounds = BitVectorBuilder::new();
            CompactEliasFano::write(&mut bv_upper_bounds, &upper_bounds, universe, params)?;

            let endpoint_bits = ceil_log2(bv_sequences.len() + 1);
            write_gamma(bvb, endpoint_bits);
            bvb.append(&bv_upper_bounds);

            for &e in &endpoints[..endpoints.len() - 1] {
                bvb.append_bits(e, endpoint_bits);
            }

            bvb.append(&bv_sequences);
        }
        Ok(())
    }

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        UniformPartitionedEnumerator::new(bits, offset, universe, n, params)
    }
}

struct Multi<'a> {
    upper_bounds: EliasFanoEnumerator<'a>,
    endpoints_offset: u64,
    endpoint_bits: u64,
    sequences_offset: u64,
}

impl Clone for Multi<'_> {
    fn clone(&self) -> Self {
        Self {
            upper_bounds: self.upper_bounds,
            endpoints_offset: self.endpoints_offset,
            endpoint_bits: self.endpoint_bits,
            sequences_offset: self.sequences_offset,
        }
    }
}

pub struct UniformPartitionedEnumerator<'a, B: Sequence> {
    bits: BitsRef<'a>,
    params: GlobalParameters,
    partitions: u64,
    size: u64,
    universe: u64,

    position: u64,
    cur_partition: u64,
    cur_begin: u64,
    cur_end: u64,
    cur_base: u64,
    cur_upper_bound: u64,

    multi: Option<Multi<'a>>,
    partition_enum: B::Enumerator<'a>,
}

impl<'a, B: Sequence> Clone for UniformPartitionedEnumerator<'a, B> {
    fn clone(&self) -> Self {
        Self {
            bits: self.bits,
            params: self.params,
            partitions: self.partitions,
            size: self.size,
            universe: self.universe,
            position: self.position,
            cur_partition: self.cur_partition,
            cur_begin: self.cur_begin,
            cur_end: self.cur_end,
            cur_base: self.cur_base,
            cur_upper_bound: self.cur_upper_bound,
            multi: self.multi.clone(),
            partition_enum: self.partition_enum.clone(),
        }
    }
}

impl<'a, B: Sequence> UniformPartitionedEnumerator<'a, B> {
    fn new(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self {
        let mut it = BitEnumerator::new(bits, offset);
        let partitions = read_gamma_nonzero(&mut it);

        if partitions == 1 {
            let universe_bits = ceil_log2(universe);
            let cur_base = it.take(universe_bits);
            let mut ub = 0;
            if n > 1 {
                let universe_delta = read_delta(&mut it);
                ub = if universe_delta != 0 {
                    universe_delta
                } else {
                    universe - cur_base - 1
                };
            }

            let mut partition_enum = B::enumerator(bits, it.position(), ub + 1, n, params);
            partition_enum.move_to(n);

            Self {
                bits,
                params: *params,
                partitions,
                size: n,
                universe,
                position: n,
                cur_partition: 0,
                cur_begin: 0,
                cur_end: n,
                cur_base,
                cur_upper_bound: cur_base + ub,
                multi: None,
                partition_enum,
            }
        } else {
            let endpoint_bits = read_gamma(&mut it);
            let mut cur_offset = it.position();

            let upper_bounds =
                CompactEliasFano::enumerator(bits, cur_offset, universe, partitions + 1, params);
            cur_offset += CompactEliasFano::bitsize(params, universe, partitions + 1);

            let endpoints_offset = cur_offset;
            cur_offset += endpoint_bits * (partitions - 1);

            let sequences_offset = cur_offset;

            let mut multi = Multi {
                upper_bounds,
                endpoints_offset,
                endpoint_bits,
                sequences_offset,
            };

            let (state, mut partition_enum) =
                Self::load_partition(bits, params, &mut multi, partitions - 1, n);
            let sz = partition_enum.size();
            partition_enum.move_to(sz);

            Self {
                bits,
                params: *params,
                partitions,
                size: n,
                universe,
                position: n,
                cur_partition: state.partition,
                cur_begin: state.begin,
                cur_end: state.end,
                cur_base: state.base,
                cur_upper_bound: state.upper_bound,
                multi: Some(multi),
                partition_enum,
            }
        }
    }

    fn load_partition(
        bits: BitsRef<'a>,
        params: &GlobalParameters,
        multi: &mut Multi<'a>,
        partition: u64,
        size: u64,
    ) -> (PartitionState, B::Enumerator<'a>) {
        let endpoint = if partition != 0 {
            bits.get_bits(
                multi.endpoints_offset + (partition - 1) * multi.endpoint_bits,
                multi.endpoint_bits,
            )
        } else {
            0
        };

        let begin = partition << params.log_partition_size;
        let end = size.min((partition + 1) << params.log_partition_size);

        let upper_bound = multi.upper_bounds.move_to(partition + 1).1;
        let base = multi.upper_bounds.prev_value() + (partition != 0) as u64;

        let partition_enum = B::enumerator(
            bits,
            multi.sequences_offset + endpoint,
            upper_bound - base + 1,
            end - begin,
            params,
        );
        (
            PartitionState {
                partition,
                begin,
                end,
                base,
                upper_bound,
            },
            partition_enum,
        )
    }

    fn switch_partition(&mut self, partition: u64) {
        debug_assert!(self.partitions > 1);
        let multi = self.multi.as_mut().unwrap();
        let (state, partition_enum) =
            Self::load_partition(self.bits, &self.params, multi, partition, self.size);
        self.cur_partition = state.partition;
        self.cur_begin = state.begin;
        self.cur_end = state.end;
        self.cur_base = state.base;
        self.cur_upper_bound = state.upper_bound;
        self.partition_enum = partition_enum;
    }

    #[cold]
    fn slow_next(&mut self) -> PosValue {
        if self.position == self.size {
            debug_assert_eq!(self.cur_partition, self.partitions - 1);
            let sz = self.partition_enum.size();
            self.partition_enum.move_to(sz);
            return (self.position, self.universe);
        }

        self.switch_partition(self.cur_partition + 1);
        let val = self.cur_base + self.partition_enum.move_to(0).1;
        (self.position, val)
    }

    #[cold]
    fn slow_move(&mut self) -> PosValue {
        if self.position == self.size {
            if self.partitions > 1 {
                self.switch_partition(self.partitions - 1);
            }
            let sz = self.partition_enum.size();
            self.partition_enum.move_to(sz);
            return (self.position, self.universe);
        }
        let partition = self.position >> self.params.log_partition_size;
        self.switch_partition(partition);
        let val = self.cur_base
            + self
                .partition_enum
                .move_to(self.position - self.cur_begin)
                .1;
        (self.position, val)
    }
}

struct PartitionState {
    partition: u64,
    begin: u64,
    end: u64,
    base: u64,
    upper_bound: u64,
}

impl<B: Sequence> SequenceEnumerator for UniformPartitionedEnumerator<'_, B> {
    #[inline]
    fn move_to(&mut self, position: u64) -> PosValue {
        debug_assert!(position <= self.size);
        self.position = position;

        if self.position >= self.cur_begin && self.position < self.cur_end {
            let val = self.cur_base
                + self
                    .partition_enum
                    .move_to(self.position - self.cur_begin)
                    .1;
            return (self.position, val);
        }

        self.slow_move()
    }

    #[inline]
    fn next(&mut self) -> PosValue {
        self.position += 1;

        if self.position < self.cur_end {
            let val = self.cur_base + self.partition_enum.next().1;
            return (self.position, val);
        }
        self.slow_next()
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.size
    }

    fn prev_value(&self) -> u64 {
        if self.position == self.cur_begin {
            if self.cur_partition != 0 {
                self.cur_base - 1
            } else {
                0
            }
        } else {
            self.cur_base + self.partition_enum.prev_value()
        }
    }
}

impl<'a, B: Sequence> UniformPartitionedEnumerator<'a, B>
where
    B::Enumerator<'a>: NextGeqEnumerator,
{
    #[cold]
    fn slow_next_geq(&mut self, lower_bound: u64) -> PosValue {
        if self.partitions == 1 {
            return if lower_bound < self.cur_base {
                self.move_to(0)
            } else {
                self.move_to(self.size)
            };
        }

        let ub_it = self.multi.as_mut().unwrap().upper_bounds.next_geq(lower_bound);
        if ub_it.0 == 0 {
            return self.move_to(0);
        }
        if ub_it.0 == self.partitions + 1 {
            return self.move_to(self.size);
        }

        self.switch_partition(ub_it.0 - 1);
        self.next_geq(lower_bound)
    }
}

impl<'a, B: Sequence> NextGeqEnumerator for UniformPartitionedEnumerator<'a, B>
where
    B::Enumerator<'a>: NextGeqEnumerator,
{
    #[inline]
    fn next_geq(&mut self, lower_bound: u64) -> PosValue {
        if lower_bound >= self.cur_base && lower_bound <= self.cur_upper_bound {
            let val = self.partition_enum.next_geq(lower_bound - self.cur_base);
            self.position = self.cur_begin + val.0;
            return (self.position, self.cur_base + val.1);
        }
        self.slow_next_geq(lower_bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::tests::{check_enumerator, check_next_geq, clustered_sequence};

    #[test]
    fn test_uniform_roundtrip() {
        let params = GlobalParameters::default();
        let (values, universe) = clustered_sequence(5000, 7);

        let mut bvb = BitVectorBuilder::new();
        UniformPartitionedSequence::<IndexedSequence>::write(
            &mut bvb, &values, universe, &params,
        )
        .unwrap();
        let bv = bvb.build();

        let mut en = UniformPartitionedSequence::<IndexedSequence>::enumerator(
            bv.as_bits(),
            0,
            universe,
            values.len() as u64,
            &params,
        );
        check_enumerator(&mut en, &values, universe);
        check_next_geq(
            || {
                let mut en = UniformPartitionedSequence::<IndexedSequence>::enumerator(
                    bv.as_bits(),
                    0,
                    universe,
                    values.len() as u64,
                    &params,
                );
                en.move_to(0);
                en
            },
            &values,
            universe,
        );
    }
}
