/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{
    AllOnesEnumerator, AllOnesSequence, CompactRankedBitVector, PosValue,
    RankedBitVectorEnumerator, Sequence, SequenceEnumerator, StrictEliasFano,
    StrictEliasFanoEnumerator,
};
use crate::bits::{BitVectorBuilder, BitsRef};
use crate::config::GlobalParameters;
use anyhow::Result;

const TYPE_BITS: u64 = 1; // all_ones is implicit

/// Variant picker for strictly increasing sequences accessed only by
/// position (frequency prefix sums): [`StrictEliasFano`], the ranked
/// bitmap, or all-ones. Since `next_geq` is never needed, the zero
/// pointers and rank samples are disabled by maxing out their sampling
/// strides.
pub struct StrictSequence;

fn strict_params(params: &GlobalParameters) -> GlobalParameters {
    // we do not need to index the zeros
    let mut params = *params;
    params.ef_log_sampling0 = 63;
    params.rb_log_rank1_sampling = 63;
    params
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexType {
    EliasFano = 0,
    RankedBitVector = 1,
    AllOnes = 2,
}

impl Sequence for StrictSequence {
    type Enumerator<'a> = StrictSequenceEnumerator<'a>;

    fn bitsize(params: &GlobalParameters, universe: u64, n: u64) -> u64 {
        let sparams = strict_params(params);
        let mut best_cost = AllOnesSequence::bitsize(params, universe, n);

        let ef_cost = StrictEliasFano::bitsize(&sparams, universe, n) + TYPE_BITS;
        if ef_cost < best_cost {
            best_cost = ef_cost;
        }

        let rb_cost = CompactRankedBitVector::bitsize(&sparams, universe, n) + TYPE_BITS;
        if rb_cost < best_cost {
            best_cost = rb_cost;
        }

        best_cost
    }

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
    ) -> Result<()> {
        let n = values.len() as u64;
        let sparams = strict_params(params);
        let mut best_cost = AllOnesSequence::bitsize(params, universe, n);
        let mut best_type = IndexType::AllOnes;

        if best_cost != 0 {
            let ef_cost = StrictEliasFano::bitsize(&sparams, universe, n) + TYPE_BITS;
            if ef_cost < best_cost {
                best_cost = ef_cost;
                best_type = IndexType::EliasFano;
            }

            let rb_cost = CompactRankedBitVector::bitsize(&sparams, universe, n) + TYPE_BITS;
            if rb_cost < best_cost {
                best_type = IndexType::RankedBitVector;
            }

            bvb.append_bits(best_type as u64, TYPE_BITS);
        }

        match best_type {
            IndexType::EliasFano => StrictEliasFano::write(bvb, values, universe, &sparams),
            IndexType::RankedBitVector => {
                CompactRankedBitVector::write(bvb, values, universe, &sparams)
            }
            IndexType::AllOnes => AllOnesSequence::write(bvb, values, universe, &sparams),
        }
    }

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        let sparams = strict_params(params);
        if AllOnesSequence::bitsize(params, universe, n) == 0 {
            return StrictSequenceEnumerator::AllOnes(AllOnesSequence::enumerator(
                bits, offset, universe, n, &sparams,
            ));
        }
        let type_tag = bits.get_bits(offset, TYPE_BITS);
        match type_tag {
            0 => StrictSequenceEnumerator::EliasFano(StrictEliasFano::enumerator(
                bits,
                offset + TYPE_BITS,
                universe,
                n,
                &sparams,
            )),
            _ => StrictSequenceEnumerator::RankedBitVector(CompactRankedBitVector::enumerator(
                bits,
                offset + TYPE_BITS,
                universe,
                n,
                &sparams,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StrictSequenceEnumerator<'a> {
    EliasFano(StrictEliasFanoEnumerator<'a>),
    RankedBitVector(RankedBitVectorEnumerator<'a>),
    AllOnes(AllOnesEnumerator),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            StrictSequenceEnumerator::EliasFano($inner) => $body,
            StrictSequenceEnumerator::RankedBitVector($inner) => $body,
            StrictSequenceEnumerator::AllOnes($inner) => $body,
        }
    };
}

impl SequenceEnumerator for StrictSequenceEnumerator<'_> {
    #[inline(always)]
    fn move_to(&mut self, position: u64) -> PosValue {
        dispatch!(self, e => e.move_to(position))
    }

    #[inline(always)]
    fn next(&mut self) -> PosValue {
        dispatch!(self, e => e.next())
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        dispatch!(self, e => e.size())
    }

    #[inline(always)]
    fn prev_value(&self) -> u64 {
        dispatch!(self, e => e.prev_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_roundtrip() {
        let params = GlobalParameters::default();
        for (values, universe) in [
            (vec![2u64, 3, 5, 7, 11, 13], 20u64),
            ((0..500).map(|i| i * 2).collect(), 1000),
            (vec![9], 10),
        ] {
            let mut bvb = BitVectorBuilder::new();
            StrictSequence::write(&mut bvb, &values, universe, &params).unwrap();
            let bv = bvb.build();
            let mut en = StrictSequence::enumerator(
                bv.as_bits(),
                0,
                universe,
                values.len() as u64,
                &params,
            );
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(en.move_to(i as u64), (i as u64, v), "universe {universe}");
            }
        }
    }
}
