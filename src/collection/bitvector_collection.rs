/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::bits::{BitEnumerator, BitVectorBuilder, BitsRef};
use crate::config::GlobalParameters;
use crate::mapper::{MapSink, MapSource};
use crate::sequence::{CompactEliasFano, Sequence, SequenceEnumerator};
use anyhow::{ensure, Result};

/// A concatenation of bit-encoded sequences with an Elias–Fano index
/// over their starting offsets: `endpoints[i]` is the bit offset of
/// sequence `i` inside `bits`.
pub struct BitVectorCollectionBuilder {
    params: GlobalParameters,
    endpoints: Vec<u64>,
    bitvectors: BitVectorBuilder,
}

impl BitVectorCollectionBuilder {
    pub fn new(params: &GlobalParameters) -> Self {
        Self {
            params: *params,
            endpoints: vec![0],
            bitvectors: BitVectorBuilder::new(),
        }
    }

    /// Appends an encoded sequence.
    pub fn append(&mut self, bvb: &BitVectorBuilder) {
        self.bitvectors.append(bvb);
        self.endpoints.push(self.bitvectors.len());
    }

    /// The number of sequences appended so far.
    pub fn len(&self) -> usize {
        self.endpoints.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes as `(size, endpoints, bits)`.
    pub fn freeze(self, sink: &mut MapSink) -> Result<()> {
        let size = (self.endpoints.len() - 1) as u64;
        sink.push_u64(size);

        let mut endpoints_bits = BitVectorBuilder::new();
        if size > 0 {
            CompactEliasFano::write(
                &mut endpoints_bits,
                &self.endpoints[..size as usize],
                self.bitvectors.len() + 1,
                &self.params,
            )?;
        }
        sink.push_bits(&endpoints_bits.build());
        sink.push_bits(&self.bitvectors.build());
        Ok(())
    }
}

/// Read-only view of a frozen collection of bit-encoded sequences.
#[derive(Debug, Clone, Copy)]
pub struct BitVectorCollection<'a> {
    size: u64,
    endpoints: BitsRef<'a>,
    bits: BitsRef<'a>,
}

impl<'a> BitVectorCollection<'a> {
    pub fn parse(source: &mut MapSource<'a>) -> Result<Self> {
        let size = source.read_u64()?;
        let endpoints = source.read_bits()?;
        let bits = source.read_bits()?;
        ensure!(
            size == 0 || !endpoints.is_empty(),
            "missing endpoints for nonempty collection"
        );
        Ok(Self {
            size,
            endpoints,
            bits,
        })
    }

    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline(always)]
    pub fn bits(&self) -> BitsRef<'a> {
        self.bits
    }

    /// A header reader positioned at the start of sequence `i`.
    pub fn get(&self, params: &GlobalParameters, i: u64) -> BitEnumerator<'a> {
        assert!(i < self.size, "sequence {} out of bounds ({})", i, self.size);
        let mut endpoints = CompactEliasFano::enumerator(
            self.endpoints,
            0,
            self.bits.len() + 1,
            self.size,
            params,
        );
        let endpoint = endpoints.move_to(i).1;
        BitEnumerator::new(self.bits, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::write_gamma;

    #[test]
    fn test_collection_roundtrip() {
        let params = GlobalParameters::default();
        let mut builder = BitVectorCollectionBuilder::new(&params);
        for i in 0..100u64 {
            let mut bvb = BitVectorBuilder::new();
            write_gamma(&mut bvb, i * 7);
            bvb.append_bits(i, 13);
            builder.append(&bvb);
        }
        assert_eq!(builder.len(), 100);

        let mut sink = MapSink::new();
        builder.freeze(&mut sink).unwrap();
        let words = sink.into_words();

        let mut source = MapSource::new(&words).unwrap();
        let collection = BitVectorCollection::parse(&mut source).unwrap();
        assert!(source.is_exhausted());
        assert_eq!(collection.len(), 100);

        for i in 0..100u64 {
            let mut it = collection.get(&params, i);
            assert_eq!(crate::bits::read_gamma(&mut it), i * 7);
            assert_eq!(it.take(13), i);
        }
    }
}
