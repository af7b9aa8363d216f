/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The central regression oracle: WAND, BlockMaxWAND and MaxScore must
//! return the same top-k as exhaustive ranked OR, across index
//! families, WAND-data variants and block partitionings.

mod common;

use common::{assert_topk_eq, synthetic_collection, write_collection};
use efsearch::collection::{read_sizes, BinaryFreqCollection};
use efsearch::config::{GlobalParameters, IndexConfig};
use efsearch::cursor::{
    make_block_max_scored_cursors, make_max_scored_cursors, make_scored_cursors,
};
use efsearch::index::{EfIndex, EfIndexBuilder, PostingCursor, PostingIndex};
use efsearch::intersection::{BigramIndex, Intersection};
use efsearch::query::{
    block_max_wand_query, maxscore_inter_query, maxscore_query, query_freqs, range_taat_query,
    ranked_or_query, wand_query, Selection, TopKQueue,
};
use efsearch::scorer::Bm25;
use efsearch::wand::{
    build_wand_data_compressed, build_wand_data_raw, BlockPartition, WandData,
    WandDataCompressed, WandDataRaw, WandDataVariant,
};
use efsearch::with_index_type;

struct Fixture {
    _dir: tempfile::TempDir,
    index_words: std::collections::HashMap<&'static str, Vec<u64>>,
    wand_raw_fixed: Vec<u64>,
    wand_raw_variable: Vec<u64>,
    wand_compressed: Vec<u64>,
}

const TYPES: [&str; 4] = ["ef", "opt", "block_optpfor", "block_streamvbyte"];

fn build_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let collection_data = synthetic_collection(2000, 12, 0xbeef);
    let basename = write_collection(dir.path(), &collection_data);
    let collection = BinaryFreqCollection::open(&basename).unwrap();
    let sizes = read_sizes(&basename, collection.num_docs()).unwrap();

    let params = GlobalParameters::default();
    let config = IndexConfig::default();
    let scorer = Bm25::default();

    let mut index_words = std::collections::HashMap::new();
    for type_name in TYPES {
        let words = (|| -> anyhow::Result<Vec<u64>> {
            Ok(efsearch::with_index_builder!(
                type_name,
                collection.num_docs(),
                &params,
                |builder| {
                    for sequence in collection.iter() {
                        builder.add_posting_list(sequence.docs, sequence.freqs).unwrap();
                    }
                    builder.build().unwrap().into_words()
                }
            ))
        })()
        .unwrap();
        index_words.insert(type_name, words);
    }

    let wand_raw_fixed =
        build_wand_data_raw(&collection, &sizes, &scorer, BlockPartition::Fixed, &config, &params)
            .unwrap()
            .into_words();
    let wand_raw_variable = build_wand_data_raw(
        &collection,
        &sizes,
        &scorer,
        BlockPartition::Variable,
        &config,
        &params,
    )
    .unwrap()
    .into_words();
    let wand_compressed = build_wand_data_compressed(
        &collection,
        &sizes,
        &scorer,
        BlockPartition::Fixed,
        &config,
        &params,
    )
    .unwrap()
    .into_words();

    Fixture {
        _dir: dir,
        index_words,
        wand_raw_fixed,
        wand_raw_variable,
        wand_compressed,
    }
}

fn queries() -> Vec<Vec<u64>> {
    vec![
        vec![0, 1],
        vec![0, 5, 9],
        vec![2, 3, 4, 8],
        vec![1, 1, 6],
        vec![11],
        vec![7, 10, 11],
        vec![0, 1, 2, 3, 4, 5],
        vec![9, 500], // unknown term contributes nothing
    ]
}

fn reference_topk<'a, I, V>(
    index: &I,
    wand: &WandData<'a, V>,
    terms: &[(u64, u64)],
    k: usize,
) -> Vec<(f32, u64)>
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
{
    let mut cursors = make_scored_cursors(index, wand, &Bm25::default(), terms).unwrap();
    let mut topk = TopKQueue::new(k);
    ranked_or_query(&mut cursors, index.num_docs(), &mut topk);
    topk.topk().to_vec()
}

fn check_pruned_operators<'a, I, V>(label: &str, index: &I, wand: &WandData<'a, V>)
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
{
    let scorer = Bm25::default();
    let max_docid = index.num_docs();
    for (qi, query) in queries().iter().enumerate() {
        let terms = query_freqs(query);
        for k in [1usize, 3, 10] {
            let expected = reference_topk(index, wand, &terms, k);

            let mut cursors = make_max_scored_cursors(index, wand, &scorer, &terms).unwrap();
            let mut topk = TopKQueue::new(k);
            wand_query(&mut cursors, max_docid, &mut topk);
            assert_topk_eq(&format!("{label} wand q{qi} k{k}"), topk.topk(), &expected);

            let mut cursors = make_max_scored_cursors(index, wand, &scorer, &terms).unwrap();
            let mut topk = TopKQueue::new(k);
            maxscore_query(&mut cursors, max_docid, &mut topk);
            assert_topk_eq(&format!("{label} maxscore q{qi} k{k}"), topk.topk(), &expected);

            let mut cursors =
                make_block_max_scored_cursors(index, wand, &scorer, &terms).unwrap();
            let mut topk = TopKQueue::new(k);
            block_max_wand_query(&mut cursors, max_docid, &mut topk);
            assert_topk_eq(&format!("{label} bmw q{qi} k{k}"), topk.topk(), &expected);

            let mut cursors = make_scored_cursors(index, wand, &scorer, &terms).unwrap();
            let mut topk = TopKQueue::new(k);
            range_taat_query(&mut cursors, max_docid, 256, &mut topk);
            assert_topk_eq(&format!("{label} taat q{qi} k{k}"), topk.topk(), &expected);
        }
    }
}

#[test]
fn test_pruned_operators_match_ranked_or() -> anyhow::Result<()> {
    let fixture = build_fixture();
    for type_name in TYPES {
        let words = &fixture.index_words[type_name];
        with_index_type!(type_name, words, |index| {
            let wand = WandData::<WandDataRaw>::parse(&fixture.wand_raw_fixed)?;
            check_pruned_operators(&format!("{type_name}/raw-fixed"), &index, &wand);
        });
    }

    // the remaining WAND variants, on one index type
    let words = &fixture.index_words["ef"];
    let index = EfIndex::parse(words)?;

    let wand = WandData::<WandDataRaw>::parse(&fixture.wand_raw_variable)?;
    check_pruned_operators("ef/raw-variable", &index, &wand);

    let wand = WandData::<WandDataCompressed>::parse(&fixture.wand_compressed)?;
    check_pruned_operators("ef/compressed", &index, &wand);
    Ok(())
}

#[test]
fn test_selection_aware_maxscore_matches_maxscore() {
    let fixture = build_fixture();
    let words = &fixture.index_words["ef"];
    let index = EfIndex::parse(words).unwrap();
    let wand = WandData::<WandDataRaw>::parse(&fixture.wand_raw_fixed).unwrap();
    let scorer = Bm25::default();

    // query {a, b, c} where the pair (b, c) is materialized; term a has
    // the densest list, so every candidate is reachable through the
    // selection as long as b and c always co-occur... which we force by
    // picking b == 1 and c == 2 and intersecting through the bigram
    // index built on the real lists.
    let query = vec![0u64, 1, 2];
    let selection = Selection {
        selected_terms: vec![0],
        selected_pairs: vec![(1, 2)],
    };
    let bigrams = BigramIndex::build(&index, &wand, &scorer, &[(1, 2)]).unwrap();

    // reference: full union
    let terms = query_freqs(&query);
    let expected = reference_topk(&index, &wand, &terms, 10);

    let mut topk = TopKQueue::new(10);
    maxscore_inter_query(
        &index,
        &wand,
        &scorer,
        &query,
        &selection,
        &bigrams,
        &mut topk,
    )
    .unwrap();

    // the selection covers a ∪ (b ∩ c): documents of b or c alone may
    // be missed by design, so compare against the same candidate set
    let mut candidate_topk = TopKQueue::new(10);
    {
        let mut all = make_scored_cursors(&index, &wand, &scorer, &terms).unwrap();
        let mut a_cursor =
            make_scored_cursors(&index, &wand, &scorer, &[(0, 1)]).unwrap();
        let mut bc = efsearch::cursor::CursorIntersection::new(
            make_scored_cursors(&index, &wand, &scorer, &[(1, 1), (2, 1)]).unwrap(),
            index.num_docs(),
            0.0f32,
            |acc, c| {
                use efsearch::cursor::ScoredPostingCursor;
                acc + c.score()
            },
        );
        use efsearch::index::PostingCursor;
        // walk the candidate union of a and b-and-c, scoring with all lists
        let mut candidates = std::collections::BTreeSet::new();
        while a_cursor[0].docid() < index.num_docs() {
            candidates.insert(a_cursor[0].docid());
            a_cursor[0].next();
        }
        while !bc.is_exhausted() {
            candidates.insert(bc.docid());
            bc.next();
        }
        for docid in candidates {
            let mut score = 0.0;
            for cursor in all.iter_mut() {
                use efsearch::cursor::ScoredPostingCursor;
                cursor.next_geq(docid);
                if cursor.docid() == docid {
                    score += cursor.score();
                }
            }
            candidate_topk.insert(score, docid);
        }
        candidate_topk.finalize();
    }
    assert_topk_eq("selection-aware", topk.topk(), candidate_topk.topk());

    // when the pair intersection equals the full b/c candidate space,
    // the operator must agree with exhaustive evaluation restricted to
    // the covered candidates; additionally, with every term essential
    // it must agree with plain ranked OR
    let all_essential = Selection {
        selected_terms: vec![0, 1, 2],
        selected_pairs: vec![],
    };
    let mut topk = TopKQueue::new(10);
    maxscore_inter_query(
        &index,
        &wand,
        &scorer,
        &query,
        &all_essential,
        &bigrams,
        &mut topk,
    )
    .unwrap();
    assert_topk_eq("all-essential", topk.topk(), &expected);

    // a selected pair that was never materialized fails the query
    let bad_selection = Selection {
        selected_terms: vec![0],
        selected_pairs: vec![(1, 5)],
    };
    let mut topk = TopKQueue::new(10);
    assert!(maxscore_inter_query(
        &index,
        &wand,
        &scorer,
        &query,
        &bad_selection,
        &bigrams,
        &mut topk,
    )
    .is_err());
}

#[test]
fn test_intersection_statistics() {
    let fixture = build_fixture();
    let words = &fixture.index_words["ef"];
    let index = EfIndex::parse(words).unwrap();
    let wand = WandData::<WandDataRaw>::parse(&fixture.wand_raw_fixed).unwrap();
    let scorer = Bm25::default();

    let terms = vec![0u64, 1, 2];
    // single-term subsets report the list lengths
    for (position, &term) in terms.iter().enumerate() {
        let stats =
            Intersection::compute(&index, &wand, &scorer, &terms, Some(1 << position)).unwrap();
        assert_eq!(stats.length, index.postings(term).unwrap().size());
        assert!(stats.max_score > 0.0);
    }

    // the pair intersection is no longer than either list
    let pair = Intersection::compute(&index, &wand, &scorer, &terms, Some(0b011)).unwrap();
    assert!(pair.length <= index.postings(0).unwrap().size());
    assert!(pair.length <= index.postings(1).unwrap().size());

    // an unknown term empties the intersection
    let unknown =
        Intersection::compute(&index, &wand, &scorer, &[0, 999], Some(0b11)).unwrap();
    assert_eq!(unknown.length, 0);
}

/// Rebuilding after a docid permutation yields the permuted postings.
#[test]
fn test_index_equality_under_reordering() {
    let collection_data = synthetic_collection(300, 8, 0xfeed);
    let num_docs = collection_data.num_docs;

    // π(d) = reversal, a permutation that reorders every list
    let pi = |d: u32| (num_docs as u32 - 1) - d;

    let params = GlobalParameters::default();
    let build = |lists: &[(Vec<u32>, Vec<u32>)]| -> Vec<u64> {
        let mut builder = EfIndexBuilder::new(num_docs, &params);
        for (docs, freqs) in lists {
            builder.add_posting_list(docs, freqs).unwrap();
        }
        builder.build().unwrap().into_words()
    };

    let original_words = build(&collection_data.lists);
    let permuted_lists: Vec<(Vec<u32>, Vec<u32>)> = collection_data
        .lists
        .iter()
        .map(|(docs, freqs)| {
            let mut pairs: Vec<(u32, u32)> = docs
                .iter()
                .zip(freqs.iter())
                .map(|(&d, &f)| (pi(d), f))
                .collect();
            pairs.sort_unstable();
            (
                pairs.iter().map(|&(d, _)| d).collect(),
                pairs.iter().map(|&(_, f)| f).collect(),
            )
        })
        .collect();
    let permuted_words = build(&permuted_lists);

    let original = EfIndex::parse(&original_words).unwrap();
    let permuted = EfIndex::parse(&permuted_words).unwrap();

    use efsearch::index::PostingCursor;
    for term in 0..original.num_terms() {
        let mut cursor = original.postings(term).unwrap();
        let mut expected: Vec<(u32, u64)> = Vec::new();
        while cursor.docid() < num_docs {
            expected.push((pi(cursor.docid() as u32), cursor.freq()));
            cursor.next();
        }
        expected.sort_unstable();

        let mut cursor = permuted.postings(term).unwrap();
        let mut actual: Vec<(u32, u64)> = Vec::new();
        while cursor.docid() < num_docs {
            actual.push((cursor.docid() as u32, cursor.freq()));
            cursor.next();
        }
        assert_eq!(actual, expected, "term {}", term);
    }
}
