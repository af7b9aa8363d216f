/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Literal-data scenarios over a ten-document collection.

mod common;

use common::assert_topk_eq;
use efsearch::collection::{read_sizes, BinaryFreqCollection};
use efsearch::config::{GlobalParameters, IndexConfig};
use efsearch::cursor::{make_max_scored_cursors, make_scored_cursors};
use efsearch::index::{EfIndex, EfIndexBuilder};
use efsearch::query::{query_freqs, ranked_or_query, wand_query, TopKQueue};
use efsearch::scorer::Bm25;
use efsearch::wand::{build_wand_data_raw, BlockPartition, WandData, WandDataRaw};
use std::io::Write;

/// Ten documents, two terms with disjoint strongholds: document 3
/// scores through term 0 alone, document 8 through term 1 alone, so the
/// top three is only reachable through the full union view.
fn write_tiny_collection(dir: &std::path::Path) -> std::path::PathBuf {
    let write = |name: &str, values: &[u32]| {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        for v in values {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
    };
    // .docs: header (1, 10), term 0 in four documents, term 1 in three
    write("tiny.docs", &[1, 10, 4, 0, 3, 5, 9, 3, 2, 7, 8]);
    // .freqs: aligned with the lists above
    write("tiny.freqs", &[4, 1, 6, 2, 1, 3, 2, 1, 4]);
    // .sizes: one sequence of ten lengths
    write("tiny.sizes", &[10, 12, 9, 25, 8, 40, 11, 15, 6, 7, 13]);
    dir.join("tiny")
}

#[test]
fn test_wand_equals_ranked_or_on_tiny_collection() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let basename = write_tiny_collection(dir.path());
    let collection = BinaryFreqCollection::open(&basename)?;
    assert_eq!(collection.num_docs(), 10);
    let sizes = read_sizes(&basename, 10)?;

    let params = GlobalParameters::default();
    let mut builder = EfIndexBuilder::new(10, &params);
    for sequence in collection.iter() {
        builder.add_posting_list(sequence.docs, sequence.freqs)?;
    }
    let words = builder.build()?.into_words();
    let index = EfIndex::parse(&words)?;

    let scorer = Bm25::default();
    let wand_words = build_wand_data_raw(
        &collection,
        &sizes,
        &scorer,
        BlockPartition::Fixed,
        &IndexConfig::default(),
        &params,
    )?
    .into_words();
    let wand = WandData::<WandDataRaw>::parse(&wand_words)?;

    let terms = query_freqs(&[0, 1]);

    let mut cursors = make_scored_cursors(&index, &wand, &scorer, &terms)?;
    let mut reference = TopKQueue::new(3);
    ranked_or_query(&mut cursors, index.num_docs(), &mut reference);

    let mut cursors = make_max_scored_cursors(&index, &wand, &scorer, &terms)?;
    let mut pruned = TopKQueue::new(3);
    wand_query(&mut cursors, index.num_docs(), &mut pruned);

    assert_eq!(reference.topk().len(), 3);
    assert_topk_eq("tiny wand vs ranked-or", pruned.topk(), reference.topk());

    // the union view is genuinely needed: the top three must include a
    // document seen by only one of the two lists
    let single_list_docs = [0u64, 3, 5, 9, 7, 8];
    assert!(reference
        .topk()
        .iter()
        .any(|&(_, d)| single_list_docs.contains(&d)));
    Ok(())
}
