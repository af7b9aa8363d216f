/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{NextGeqEnumerator, PosValue, Sequence, SequenceEnumerator};
use crate::bits::{BitVectorBuilder, BitsRef};
use crate::config::GlobalParameters;
use anyhow::Result;

/// The zero-bit representation of the two trivial cases: the identity
/// sequence `0, 1, …, U − 1` (`n == U`) and the singleton whose only
/// value is `U − 1`.
///
/// Callers guarantee the tight-universe invariant for singletons; the
/// partitioned writers always do, since per-partition universes are
/// derived from the partition's last value.
pub struct AllOnesSequence;

impl Sequence for AllOnesSequence {
    type Enumerator<'a> = AllOnesEnumerator;

    fn bitsize(_params: &GlobalParameters, universe: u64, n: u64) -> u64 {
        if universe == n || n == 1 {
            0
        } else {
            u64::MAX
        }
    }

    fn write(
        _bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        _params: &GlobalParameters,
    ) -> Result<()> {
        let n = values.len() as u64;
        debug_assert!(universe == n || n == 1);
        debug_assert_eq!(values[values.len() - 1], universe - 1);
        Ok(())
    }

    fn enumerator<'a>(
        _bits: BitsRef<'a>,
        _offset: u64,
        universe: u64,
        n: u64,
        _params: &GlobalParameters,
    ) -> Self::Enumerator<'a> {
        debug_assert!(universe == n || n == 1);
        AllOnesEnumerator {
            n,
            universe,
            position: n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AllOnesEnumerator {
    n: u64,
    universe: u64,
    position: u64,
}

impl AllOnesEnumerator {
    #[inline(always)]
    fn value(&self) -> PosValue {
        if self.n == 1 {
            (self.position, self.universe - 1)
        } else {
            (self.position, self.position)
        }
    }
}

impl SequenceEnumerator for AllOnesEnumerator {
    #[inline]
    fn move_to(&mut self, position: u64) -> PosValue {
        debug_assert!(position <= self.n);
        self.position = position;
        self.value()
    }

    #[inline]
    fn next(&mut self) -> PosValue {
        self.position += 1;
        self.value()
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.n
    }

    fn prev_value(&self) -> u64 {
        if self.position == 0 {
            return 0;
        }
        if self.n == 1 {
            return self.universe - 1;
        }
        self.position - 1
    }
}

impl NextGeqEnumerator for AllOnesEnumerator {
    #[inline]
    fn next_geq(&mut self, lower_bound: u64) -> PosValue {
        debug_assert!(lower_bound <= self.universe);
        if self.n == 1 {
            self.position = 0;
        } else {
            self.position = lower_bound;
        }
        self.value()
    }
}
