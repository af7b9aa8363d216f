/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{
    AllOnesEnumerator, AllOnesSequence, CompactEliasFano, CompactRankedBitVector,
    EliasFanoEnumerator, NextGeqEnumerator, PosValue, RankedBitVectorEnumerator, Sequence,
    SequenceEnumerator,
};
use crate::bits::{BitVectorBuilder, BitsRef};
use crate::config::GlobalParameters;
use anyhow::Result;

const TYPE_BITS: u64 = 1; // all_ones is implicit

/// Variant picker among [`AllOnesSequence`], [`CompactEliasFano`] and
/// [`CompactRankedBitVector`]: the all-ones case is recognizable from
/// `(universe, n)` alone and stores nothing, the other two are told apart
/// by a one-bit type tag. The smallest encoding wins.
pub struct IndexedSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexType {
    EliasFano = 0,
    RankedBitVector = 1,
    AllOnes = 2,
}

impl Sequence for IndexedSequence {
    type Enumerator<'a> = IndexedSequenceEnumerator<'a>;

    fn bitsize(params: &GlobalParameters, universe: u64, n: u64) -> u64 {
        let mut best_cost = AllOnesSequence::bitsize(params, universe, n);

        let ef_cost = CompactEliasFano::bitsize(params, universe, n) + TYPE_BITS;
        if ef_cost < best_cost {
            best_cost = ef_cost;
        }

        let rb_cost = CompactRankedBitVector::bitsize(params, universe, n) + TYPE_BITS;
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
        let mut best_cost = AllOnesSequence::bitsize(params, universe, n);
        let mut best_type = IndexType::AllOnes;

        if best_cost != 0 {
            let ef_cost = CompactEliasFano::bitsize(params, universe, n) + TYPE_BITS;
            if ef_cost < best_cost {
                best_cost = ef_cost;
                best_type = IndexType::EliasFano;
            }

            let rb_cost = CompactRankedBitVector::bitsize(params, universe, n) + TYPE_BITS;
            if rb_cost < best_cost {
                best_type = IndexType::RankedBitVector;
            }

            bvb.append_bits(best_type as u64, TYPE_BITS);
        }

        match best_type {
            IndexType::EliasFano => CompactEliasFano::write(bvb, values, universe, params),
            IndexType::RankedBitVector => {
                CompactRankedBitVector::write(bvb, values, universe, params)
            }
            IndexType::AllOnes => AllOnesSequence::write(bvb, values, universe, params),
        }
    }

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        if AllOnesSequence::bitsize(params, universe, n) == 0 {
            return IndexedSequenceEnumerator::AllOnes(AllOnesSequence::enumerator(
                bits, offset, universe, n, params,
            ));
        }
        let type_tag = bits.get_bits(offset, TYPE_BITS);
        match type_tag {
            0 => IndexedSequenceEnumerator::EliasFano(CompactEliasFano::enumerator(
                bits,
                offset + TYPE_BITS,
                universe,
                n,
                params,
            )),
            _ => IndexedSequenceEnumerator::RankedBitVector(CompactRankedBitVector::enumerator(
                bits,
                offset + TYPE_BITS,
                universe,
                n,
                params,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum IndexedSequenceEnumerator<'a> {
    EliasFano(EliasFanoEnumerator<'a>),
    RankedBitVector(RankedBitVectorEnumerator<'a>),
    AllOnes(AllOnesEnumerator),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            IndexedSequenceEnumerator::EliasFano($inner) => $body,
            IndexedSequenceEnumerator::RankedBitVector($inner) => $body,
            IndexedSequenceEnumerator::AllOnes($inner) => $body,
        }
    };
}

impl SequenceEnumerator for IndexedSequenceEnumerator<'_> {
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

impl NextGeqEnumerator for IndexedSequenceEnumerator<'_> {
    #[inline(always)]
    fn next_geq(&mut self, lower_bound: u64) -> PosValue {
        dispatch!(self, e => e.next_geq(lower_bound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_choice() {
        let params = GlobalParameters::default();
        // identity range collapses to all-ones: zero bits
        assert_eq!(IndexedSequence::bitsize(&params, 5, 5), 0);
        // sparse sequences pick Elias-Fano, dense ones the bitmap
        assert!(
            CompactEliasFano::bitsize(&params, 1 << 20, 10)
                < CompactRankedBitVector::bitsize(&params, 1 << 20, 10)
        );
        assert!(
            CompactRankedBitVector::bitsize(&params, 1000, 990)
                < CompactEliasFano::bitsize(&params, 1000, 990)
        );
    }

    #[test]
    fn test_all_ones_scenario() {
        // posting list [0,1,2,3,4] with N = 5 stores nothing
        let params = GlobalParameters::default();
        let values = [0u64, 1, 2, 3, 4];
        let mut bvb = BitVectorBuilder::new();
        IndexedSequence::write(&mut bvb, &values, 5, &params).unwrap();
        assert_eq!(bvb.len(), 0);
        let bv = bvb.build();
        let mut en = IndexedSequence::enumerator(bv.as_bits(), 0, 5, 5, &params);
        for i in 0..=5u64 {
            assert_eq!(en.move_to(i), (i, i));
        }
    }

    #[test]
    fn test_tagged_roundtrip() {
        let params = GlobalParameters::default();
        for (values, universe) in [
            (vec![3u64, 7, 13, 14, 22], 32u64),
            ((0..900).map(|i| i + (i > 500) as u64).collect(), 1000),
        ] {
            let mut bvb = BitVectorBuilder::new();
            bvb.append_bits(0b1010101, 7); // arbitrary preceding content
            let offset = bvb.len();
            IndexedSequence::write(&mut bvb, &values, universe, &params).unwrap();
            let bv = bvb.build();
            let mut en = IndexedSequence::enumerator(
                bv.as_bits(),
                offset,
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
