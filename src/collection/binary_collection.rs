/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::utils::MmapHelper;
use anyhow::{ensure, Context, Result};
use mmap_rs::MmapFlags;
use std::path::Path;

/// A memory-mapped stream of length-prefixed sequences of little-endian
/// 32-bit integers: `(len, v_0, …, v_{len−1})` concatenated.
#[derive(Debug, Clone)]
pub struct BinaryCollection {
    data: MmapHelper<u32>,
}

impl BinaryCollection {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = MmapHelper::mmap(path.as_ref(), MmapFlags::SEQUENTIAL)
            .with_context(|| format!("Cannot map collection {}", path.as_ref().display()))?;
        Ok(Self { data })
    }

    pub fn iter(&self) -> BinaryCollectionIter<'_> {
        BinaryCollectionIter {
            data: self.data.as_ref(),
            pos: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryCollectionIter<'a> {
    data: &'a [u32],
    pos: usize,
}

impl<'a> Iterator for BinaryCollectionIter<'a> {
    type Item = &'a [u32];

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let len = self.data[self.pos] as usize;
        let begin = self.pos + 1;
        let end = begin + len;
        assert!(end <= self.data.len(), "truncated sequence in collection");
        self.pos = end;
        Some(&self.data[begin..end])
    }
}

/// One posting list of a [`BinaryFreqCollection`].
#[derive(Debug, Clone, Copy)]
pub struct PostingsSequence<'a> {
    pub docs: &'a [u32],
    pub freqs: &'a [u32],
}

/// The `.docs`/`.freqs` pair of a binary frequency collection: aligned
/// per-term sorted document lists and positive frequencies, preceded in
/// the `.docs` file by a one-element pseudo-sequence holding the number
/// of documents.
pub struct BinaryFreqCollection {
    docs: BinaryCollection,
    freqs: BinaryCollection,
    num_docs: u64,
}

impl BinaryFreqCollection {
    /// Opens `basename.docs` and `basename.freqs`.
    pub fn open(basename: impl AsRef<Path>) -> Result<Self> {
        let basename = basename.as_ref();
        let docs = BinaryCollection::open(with_extension(basename, "docs"))?;
        let freqs = BinaryCollection::open(with_extension(basename, "freqs"))?;

        let first = docs
            .iter()
            .next()
            .context("empty .docs file")?;
        ensure!(
            first.len() == 1,
            "first sequence should only contain the number of documents"
        );
        let num_docs = first[0] as u64;

        Ok(Self {
            docs,
            freqs,
            num_docs,
        })
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn iter(&self) -> impl Iterator<Item = PostingsSequence<'_>> {
        self.docs
            .iter()
            .skip(1)
            .zip(self.freqs.iter())
            .map(|(docs, freqs)| PostingsSequence { docs, freqs })
    }
}

/// Reads a `.sizes` file: a single sequence with one length per document.
pub fn read_sizes(basename: impl AsRef<Path>, num_docs: u64) -> Result<Vec<u32>> {
    let collection = BinaryCollection::open(with_extension(basename.as_ref(), "sizes"))?;
    let sizes = collection.iter().next().context("empty .sizes file")?;
    ensure!(
        sizes.len() as u64 == num_docs,
        ".sizes length {} does not match num_docs {}",
        sizes.len(),
        num_docs
    );
    Ok(sizes.to_vec())
}

fn with_extension(basename: &Path, extension: &str) -> std::path::PathBuf {
    let mut name = basename.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    name.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_u32s(path: &Path, values: &[u32]) {
        let mut file = std::fs::File::create(path).unwrap();
        for v in values {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
    }

    #[test]
    fn test_binary_freq_collection() {
        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("coll");
        // header (1, 10), then two lists
        write_u32s(
            &dir.path().join("coll.docs"),
            &[1, 10, 3, 0, 4, 9, 2, 1, 7],
        );
        write_u32s(&dir.path().join("coll.freqs"), &[3, 1, 2, 1, 2, 5, 1]);

        let coll = BinaryFreqCollection::open(&basename).unwrap();
        assert_eq!(coll.num_docs(), 10);
        let lists: Vec<_> = coll.iter().collect();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].docs, &[0, 4, 9]);
        assert_eq!(lists[0].freqs, &[1, 2, 1]);
        assert_eq!(lists[1].docs, &[1, 7]);
        assert_eq!(lists[1].freqs, &[5, 1]);
    }
}
