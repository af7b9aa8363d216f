/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Shared fixtures: a deterministic synthetic collection written in the
//! binary exchange format, plus top-k comparison helpers.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

pub struct SyntheticCollection {
    pub num_docs: u64,
    pub lists: Vec<(Vec<u32>, Vec<u32>)>,
    pub sizes: Vec<u32>,
}

fn xorshift(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

/// A small collection with skewed list lengths: a couple of stopword-like
/// lists, several medium lists, and a tail of short ones.
pub fn synthetic_collection(num_docs: u64, num_terms: usize, seed: u64) -> SyntheticCollection {
    let mut state = seed.wrapping_mul(0x9e3779b97f4a7c15) | 1;
    let mut lists = Vec::with_capacity(num_terms);
    for term in 0..num_terms {
        // denser lists for small term ids
        let step = 1 + term as u64 * 7 / 2;
        let mut docs = Vec::new();
        let mut freqs = Vec::new();
        let mut doc = xorshift(&mut state) % (step + 1);
        while doc < num_docs {
            docs.push(doc as u32);
            freqs.push((xorshift(&mut state) % 9 + 1) as u32);
            doc += 1 + xorshift(&mut state) % (2 * step + 1);
        }
        if docs.is_empty() {
            docs.push((xorshift(&mut state) % num_docs) as u32);
            freqs.push(1);
        }
        lists.push((docs, freqs));
    }
    let sizes = (0..num_docs)
        .map(|_| (xorshift(&mut state) % 100 + 5) as u32)
        .collect();
    SyntheticCollection {
        num_docs,
        lists,
        sizes,
    }
}

fn write_u32s(path: &Path, values: impl IntoIterator<Item = u32>) {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path).unwrap());
    for value in values {
        file.write_all(&value.to_le_bytes()).unwrap();
    }
    file.flush().unwrap();
}

/// Writes `.docs`, `.freqs` and `.sizes` files and returns the basename.
pub fn write_collection(dir: &Path, collection: &SyntheticCollection) -> PathBuf {
    let basename = dir.join("collection");

    let mut docs: Vec<u32> = vec![1, collection.num_docs as u32];
    let mut freqs: Vec<u32> = Vec::new();
    for (list_docs, list_freqs) in &collection.lists {
        docs.push(list_docs.len() as u32);
        docs.extend_from_slice(list_docs);
        freqs.push(list_freqs.len() as u32);
        freqs.extend_from_slice(list_freqs);
    }
    write_u32s(&dir.join("collection.docs"), docs);
    write_u32s(&dir.join("collection.freqs"), freqs);

    let mut sizes: Vec<u32> = vec![collection.sizes.len() as u32];
    sizes.extend_from_slice(&collection.sizes);
    write_u32s(&dir.join("collection.sizes"), sizes);

    basename
}

/// Elementwise top-k equality within the floating-point tolerance.
pub fn assert_topk_eq(label: &str, actual: &[(f32, u64)], expected: &[(f32, u64)]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{}: lengths differ\n  actual: {:?}\n  expected: {:?}",
        label,
        actual,
        expected
    );
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_eq!(
            a.1, e.1,
            "{}: docids differ\n  actual: {:?}\n  expected: {:?}",
            label, actual, expected
        );
        assert!(
            (a.0 - e.0).abs() <= 1e-5 * e.0.abs().max(1.0),
            "{}: scores differ\n  actual: {:?}\n  expected: {:?}",
            label,
            actual,
            expected
        );
    }
}
