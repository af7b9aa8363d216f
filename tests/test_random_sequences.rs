/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Randomized round trips over the sequence representations and block
//! codecs, with uniform and clustered shapes.

use efsearch::bits::BitVectorBuilder;
use efsearch::config::GlobalParameters;
use efsearch::index::block::{
    BinaryPackingBlock, BlockCodec, InterpolativeBlock, MaskedVByteBlock, OptPForBlock,
    Simple16Block, Simple8bBlock, StreamVByteBlock, VarintG8IuBlock, VarintGbBlock, BLOCK_SIZE,
};
use efsearch::sequence::{
    CompactEliasFano, IndexedSequence, NextGeqEnumerator, PartitionedSequence, Sequence,
    SequenceEnumerator, UniformPartitionedSequence,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_monotone(rng: &mut SmallRng, n: usize, clustered: bool) -> (Vec<u64>, u64) {
    let mut values = Vec::with_capacity(n);
    let mut v = 0u64;
    while values.len() < n {
        if clustered && rng.random_ratio(1, 50) {
            v += rng.random_range(1..100_000);
        }
        v += rng.random_range(1..16);
        values.push(v);
    }
    let universe = v + 1 + rng.random_range(0..100);
    (values, universe)
}

fn check_sequence<S: Sequence>(values: &[u64], universe: u64, params: &GlobalParameters)
where
    for<'any> S::Enumerator<'any>: NextGeqEnumerator,
{
    let mut bvb = BitVectorBuilder::new();
    S::write(&mut bvb, values, universe, params).unwrap();
    let bv = bvb.build();

    let mut en = S::enumerator(bv.as_bits(), 0, universe, values.len() as u64, params);
    en.move_to(0);
    assert_eq!(en.move_to(0).1, values[0]);
    for (i, &v) in values.iter().enumerate().skip(1) {
        assert_eq!(en.next(), (i as u64, v));
    }
    assert_eq!(en.next().1, universe);

    // monotone skipping against a linear reference
    let mut en = S::enumerator(bv.as_bits(), 0, universe, values.len() as u64, params);
    en.move_to(0);
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut lb = 0u64;
    while lb < universe {
        let expected = match values.iter().position(|&v| v >= lb) {
            Some(i) => (i as u64, values[i]),
            None => (values.len() as u64, universe),
        };
        assert_eq!(en.next_geq(lb), expected, "next_geq({})", lb);
        lb += rng.random_range(1..(universe / 50).max(2));
    }
}

#[test]
fn test_random_sequence_roundtrips() {
    let params = GlobalParameters::default();
    let mut rng = SmallRng::seed_from_u64(42);
    for &clustered in &[false, true] {
        for &n in &[1usize, 2, 100, 1000, 20_000] {
            let (values, universe) = random_monotone(&mut rng, n, clustered);
            check_sequence::<CompactEliasFano>(&values, universe, &params);
            check_sequence::<PartitionedSequence<IndexedSequence>>(&values, universe, &params);
            check_sequence::<UniformPartitionedSequence<IndexedSequence>>(
                &values, universe, &params,
            );
        }
    }
}

#[test]
#[cfg(feature = "slow_tests")]
fn test_large_random_sequences() {
    let params = GlobalParameters::default();
    let mut rng = SmallRng::seed_from_u64(0xbeefcafe);
    for &clustered in &[false, true] {
        let (values, universe) = random_monotone(&mut rng, 2_000_000, clustered);
        check_sequence::<CompactEliasFano>(&values, universe, &params);
        check_sequence::<PartitionedSequence<IndexedSequence>>(&values, universe, &params);
    }
}

#[test]
fn test_random_block_codec_roundtrips() {
    fn check<C: BlockCodec>(rng: &mut SmallRng) {
        for n in [1usize, 5, 127, BLOCK_SIZE] {
            let block: Vec<u32> = (0..n)
                .map(|_| {
                    if rng.random_ratio(1, 10) {
                        rng.random_range(0..1 << 24)
                    } else {
                        rng.random_range(0..64)
                    }
                })
                .collect();
            let sum: u64 = block.iter().map(|&v| v as u64).sum();
            for sum_of_values in [Some(sum as u32), None] {
                let mut out = Vec::new();
                C::encode(&block, sum_of_values, &mut out);
                let mut decoded = vec![0u32; n];
                let rest = C::decode(&out, &mut decoded, sum_of_values);
                assert_eq!(decoded, block);
                assert!(rest.is_empty());
            }
        }
    }

    let mut rng = SmallRng::seed_from_u64(7);
    check::<OptPForBlock>(&mut rng);
    check::<BinaryPackingBlock>(&mut rng);
    check::<StreamVByteBlock>(&mut rng);
    check::<MaskedVByteBlock>(&mut rng);
    check::<VarintGbBlock>(&mut rng);
    check::<VarintG8IuBlock>(&mut rng);
    check::<Simple8bBlock>(&mut rng);
    check::<Simple16Block>(&mut rng);
    check::<InterpolativeBlock>(&mut rng);
}
