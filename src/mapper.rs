/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Explicit little-endian serialization of the frozen structures.
//!
//! A frozen blob is a sequence of 64-bit little-endian words: a flags
//! header followed by a depth-first serialization of the field tree of
//! the structure. Scalars occupy one word; variable-length vectors are
//! written as a count word followed by their raw bytes, zero-padded to
//! the next word boundary. Field names are not stored: the reader walks
//! the same tree shape, which is fixed by code.
//!
//! Deserialization is zero-copy: vector fields are returned as slices
//! borrowing from the source words, which is how a memory-mapped index
//! is shared read-only among query threads. The format is
//! little-endian on disk and in memory, like the 32-bit collection
//! format it accompanies.

use crate::bits::{BitVector, BitVectorBuilder, BitsRef};
use anyhow::{ensure, Context, Result};
use std::io::Write;
use std::path::Path;

/// Version-and-layout flags stored in the first word of every blob.
pub const MAPPER_FLAGS: u64 = 1;

/// Accumulates the words of a frozen blob.
#[derive(Debug, Default)]
pub struct MapSink {
    words: Vec<u64>,
}

impl MapSink {
    pub fn new() -> Self {
        let mut sink = Self { words: Vec::new() };
        sink.push_u64(MAPPER_FLAGS);
        sink
    }

    #[inline]
    pub fn push_u64(&mut self, value: u64) {
        self.words.push(value);
    }

    /// Packs raw little-endian bytes, zero-padding to a word boundary.
    fn push_raw(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            self.words
                .push(u64::from_le_bytes(chunk.try_into().unwrap()));
        }
        let rem = chunks.remainder();
        if !rem.is_empty() {
            let mut last = [0u8; 8];
            last[..rem.len()].copy_from_slice(rem);
            self.words.push(u64::from_le_bytes(last));
        }
    }

    pub fn push_u64_slice(&mut self, values: &[u64]) {
        self.push_u64(values.len() as u64);
        self.words.extend_from_slice(values);
    }

    pub fn push_u32_slice(&mut self, values: &[u32]) {
        self.push_u64(values.len() as u64);
        let mut word = 0u64;
        for (i, &v) in values.iter().enumerate() {
            if i % 2 == 0 {
                word = v as u64;
            } else {
                self.words.push(word | (v as u64) << 32);
            }
        }
        if values.len() % 2 != 0 {
            self.words.push(word);
        }
    }

    pub fn push_f32_slice(&mut self, values: &[f32]) {
        self.push_u64(values.len() as u64);
        let mut word = 0u64;
        for (i, &v) in values.iter().enumerate() {
            if i % 2 == 0 {
                word = v.to_bits() as u64;
            } else {
                self.words.push(word | (v.to_bits() as u64) << 32);
            }
        }
        if values.len() % 2 != 0 {
            self.words.push(word);
        }
    }

    pub fn push_u8_slice(&mut self, bytes: &[u8]) {
        self.push_u64(bytes.len() as u64);
        self.push_raw(bytes);
    }

    /// A bit vector is its bit length followed by its words.
    pub fn push_bits(&mut self, bv: &BitVector) {
        self.push_u64(bv.len());
        self.words.extend_from_slice(bv.words());
    }

    pub fn push_bits_builder(&mut self, bvb: &BitVectorBuilder) {
        // freeze a clone; builders are cheap copies of their words
        self.push_bits(&bvb.clone().build());
    }

    pub fn into_words(self) -> Vec<u64> {
        self.words
    }

    /// Writes the blob to a file, little-endian.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())
            .with_context(|| format!("Cannot create {}", path.as_ref().display()))?;
        let mut writer = std::io::BufWriter::new(file);
        for &word in &self.words {
            writer.write_all(&word.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Walks a frozen blob, handing out zero-copy views of its fields.
#[derive(Debug, Clone, Copy)]
pub struct MapSource<'a> {
    words: &'a [u64],
    pos: usize,
}

impl<'a> MapSource<'a> {
    /// Checks the flags header and positions the source on the first
    /// field.
    pub fn new(words: &'a [u64]) -> Result<Self> {
        let mut source = Self { words, pos: 0 };
        let flags = source.read_u64()?;
        ensure!(
            flags == MAPPER_FLAGS,
            "unsupported blob flags {:#x} (expected {:#x})",
            flags,
            MAPPER_FLAGS
        );
        Ok(source)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u64]> {
        ensure!(
            self.pos + n <= self.words.len(),
            "truncated blob: need {} words at {}, have {}",
            n,
            self.pos,
            self.words.len()
        );
        let slice = &self.words[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u64_slice(&mut self) -> Result<&'a [u64]> {
        let count = self.read_u64()? as usize;
        self.take(count)
    }

    pub fn read_u32_slice(&mut self) -> Result<&'a [u32]> {
        let count = self.read_u64()? as usize;
        let words = self.take(count.div_ceil(2))?;
        // Safety: u32 alignment is weaker than u64 and the format is
        // little-endian, matching the in-memory layout on the platforms
        // the word cast targets.
        Ok(unsafe { std::slice::from_raw_parts(words.as_ptr() as *const u32, count) })
    }

    pub fn read_f32_slice(&mut self) -> Result<&'a [f32]> {
        let count = self.read_u64()? as usize;
        let words = self.take(count.div_ceil(2))?;
        // Safety: as in `read_u32_slice`; every bit pattern is a valid f32.
        Ok(unsafe { std::slice::from_raw_parts(words.as_ptr() as *const f32, count) })
    }

    pub fn read_u8_slice(&mut self) -> Result<&'a [u8]> {
        let count = self.read_u64()? as usize;
        let words = self.take(count.div_ceil(8))?;
        // Safety: byte access to little-endian words.
        Ok(unsafe { std::slice::from_raw_parts(words.as_ptr() as *const u8, count) })
    }

    pub fn read_bits(&mut self) -> Result<BitsRef<'a>> {
        let len = self.read_u64()?;
        let words = self.take(len.div_ceil(64) as usize)?;
        Ok(BitsRef::new(words, len))
    }

    /// True when every word has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.words.len()
    }
}

/// Reads a whole little-endian blob file into words; prefer
/// [`MmapHelper`](crate::utils::MmapHelper) for large indexes.
pub fn load_words(path: impl AsRef<Path>) -> Result<Vec<u64>> {
    let bytes = std::fs::read(path.as_ref())
        .with_context(|| format!("Cannot read {}", path.as_ref().display()))?;
    ensure!(
        bytes.len() % 8 == 0,
        "{} is not a sequence of 64-bit words",
        path.as_ref().display()
    );
    Ok(bytes
        .chunks_exact(8)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut sink = MapSink::new();
        sink.push_u64(42);
        sink.push_u32_slice(&[1, 2, 3]);
        sink.push_f32_slice(&[0.5, -1.25]);
        sink.push_u8_slice(b"hello");
        sink.push_u64_slice(&[7, 8]);
        let mut bvb = BitVectorBuilder::new();
        bvb.append_bits(0b1011, 4);
        sink.push_bits_builder(&bvb);

        let words = sink.into_words();
        let mut source = MapSource::new(&words).unwrap();
        assert_eq!(source.read_u64().unwrap(), 42);
        assert_eq!(source.read_u32_slice().unwrap(), &[1, 2, 3]);
        assert_eq!(source.read_f32_slice().unwrap(), &[0.5, -1.25]);
        assert_eq!(source.read_u8_slice().unwrap(), b"hello");
        assert_eq!(source.read_u64_slice().unwrap(), &[7, 8]);
        let bits = source.read_bits().unwrap();
        assert_eq!(bits.len(), 4);
        assert_eq!(bits.get_bits(0, 4), 0b1011);
        assert!(source.is_exhausted());
    }
}
