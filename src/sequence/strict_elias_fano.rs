/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{CompactEliasFano, EliasFanoEnumerator, PosValue, Sequence, SequenceEnumerator};
use crate::bits::{BitVectorBuilder, BitsRef};
use crate::config::GlobalParameters;
use anyhow::Result;

/// A strictly increasing sequence stored as the Elias–Fano encoding of
/// `v_i − i` over the reduced universe `U − n + 1`.
pub struct StrictEliasFano;

impl Sequence for StrictEliasFano {
    type Enumerator<'a> = StrictEliasFanoEnumerator<'a>;

    fn bitsize(params: &GlobalParameters, universe: u64, n: u64) -> u64 {
        debug_assert!(universe >= n);
        CompactEliasFano::bitsize(params, universe - n + 1, n)
    }

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
    ) -> Result<()> {
        let n = values.len() as u64;
        let new_universe = universe - n + 1;
        let shifted: Vec<u64> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| v - i as u64)
            .collect();
        CompactEliasFano::write(bvb, &shifted, new_universe, params)
    }

    fn enumerator<'a>(
        bits: BitsRef<'a>,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        StrictEliasFanoEnumerator {
            ef_enum: CompactEliasFano::enumerator(bits, offset, universe - n + 1, n, params),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StrictEliasFanoEnumerator<'a> {
    ef_enum: EliasFanoEnumerator<'a>,
}

impl SequenceEnumerator for StrictEliasFanoEnumerator<'_> {
    #[inline]
    fn move_to(&mut self, position: u64) -> PosValue {
        let (pos, val) = self.ef_enum.move_to(position);
        (pos, val + pos)
    }

    #[inline]
    fn next(&mut self) -> PosValue {
        let (pos, val) = self.ef_enum.next();
        (pos, val + pos)
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.ef_enum.size()
    }

    fn prev_value(&self) -> u64 {
        if self.ef_enum.position() != 0 {
            self.ef_enum.prev_value() + self.ef_enum.position() - 1
        } else {
            0
        }
    }
}
