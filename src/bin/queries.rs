/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::Parser;
use efsearch::cursor::{
    make_block_max_scored_cursors, make_max_scored_cursors, make_scored_cursors,
};
use efsearch::index::{PostingIndex, INDEX_TYPES};
use efsearch::intersection::BigramIndex;
use efsearch::mapper::load_words;
use efsearch::query::{
    and_query, block_max_wand_query, maxscore_inter_query, maxscore_query, or_query,
    parse_queries, parse_selection, query_freqs, range_taat_query, ranked_and_query,
    ranked_or_query, wand_query, write_trec_run, Query, Selection, TopKQueue,
};
use efsearch::scorer::ScorerKind;
use efsearch::wand::{WandData, WandDataCompressed, WandDataRaw, WandDataVariant};
use efsearch::with_index_type;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

const ALGORITHMS: [&str; 9] = [
    "and",
    "or",
    "ranked_and",
    "ranked_or",
    "wand",
    "block_max_wand",
    "maxscore",
    "range_taat",
    "maxscore_inter",
];

#[derive(Parser, Debug)]
#[command(about = "Runs top-k queries over a frozen index, in TREC run format", long_about = None)]
struct Args {
    /// Index type
    #[arg(short = 't', long = "type", value_parser = clap::builder::PossibleValuesParser::new(INDEX_TYPES))]
    type_name: String,

    /// Index filename
    #[arg(short, long)]
    index: PathBuf,

    /// WAND data filename
    #[arg(short, long)]
    wand: PathBuf,

    /// The WAND data was built with --compress
    #[arg(long)]
    compressed_wand: bool,

    /// Query algorithm
    #[arg(short, long, value_parser = clap::builder::PossibleValuesParser::new(ALGORITHMS))]
    algorithm: String,

    /// Number of results per query
    #[arg(short, default_value_t = 10)]
    k: usize,

    /// Scoring model
    #[arg(short, long, default_value = "bm25")]
    scorer: String,

    /// Queries filename (default: standard input)
    #[arg(short, long)]
    queries: Option<PathBuf>,

    /// Per-query posting-list selections (one line of intersection masks
    /// per query), required by maxscore_inter
    #[arg(long)]
    selections: Option<PathBuf>,

    /// Accumulator range size for range_taat
    #[arg(long, default_value_t = 1 << 14)]
    range_size: u64,

    /// Run identifier for the TREC output
    #[arg(long, default_value = "efsearch")]
    run_id: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let input = match &args.queries {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    let queries = parse_queries(&input)?;
    let scorer = ScorerKind::from_name(&args.scorer)
        .with_context(|| format!("unknown scorer {}", args.scorer))?;

    let index_words = load_words(&args.index)?;
    let wand_words = load_words(&args.wand)?;

    with_index_type!(args.type_name.as_str(), &index_words, |index| {
        if args.compressed_wand {
            let wand = WandData::<WandDataCompressed>::parse(&wand_words)?;
            run_queries(&args, &index, &wand, &scorer, &queries)?;
        } else {
            let wand = WandData::<WandDataRaw>::parse(&wand_words)?;
            run_queries(&args, &index, &wand, &scorer, &queries)?;
        }
    });

    Ok(())
}

fn run_queries<'a, I, V>(
    args: &Args,
    index: &I,
    wand: &WandData<'a, V>,
    scorer: &ScorerKind,
    queries: &[Query],
) -> Result<()>
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
{
    // the selection-aware operator needs per-query selections and the
    // bigram lists they mention, materialized up front
    let selections: Option<Vec<Selection>> = match (&args.selections, args.algorithm.as_str()) {
        (Some(path), _) => {
            let input = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let lines: Vec<&str> = input.lines().collect();
            anyhow::ensure!(
                lines.len() == queries.len(),
                "{} selections for {} queries",
                lines.len(),
                queries.len()
            );
            Some(
                lines
                    .iter()
                    .zip(queries.iter())
                    .map(|(line, query)| parse_selection(line, &query.terms))
                    .collect::<Result<Vec<_>>>()?,
            )
        }
        (None, "maxscore_inter") => {
            anyhow::bail!("maxscore_inter requires --selections")
        }
        (None, _) => None,
    };
    let bigrams = match &selections {
        Some(selections) => {
            let mut pairs: Vec<(u64, u64)> = selections
                .iter()
                .flat_map(|s| s.selected_pairs.iter().copied())
                .collect();
            pairs.sort_unstable();
            pairs.dedup();
            Some(BigramIndex::build(index, wand, scorer, &pairs)?)
        }
        None => None,
    };

    let mut out = std::io::BufWriter::new(std::io::stdout());
    let max_docid = index.num_docs();
    let mut total_usecs = 0u128;

    for (position, query) in queries.iter().enumerate() {
        let qid = query
            .id
            .clone()
            .unwrap_or_else(|| position.to_string());
        let terms = query_freqs(&query.terms);
        let start = Instant::now();

        let result = run_one(
            args,
            index,
            wand,
            scorer,
            query,
            &terms,
            max_docid,
            selections.as_ref().map(|s| &s[position]),
            bigrams.as_ref(),
        );
        let elapsed = start.elapsed().as_micros();
        total_usecs += elapsed;

        match result {
            Ok(Outcome::Ranked(results)) => {
                write_trec_run(&mut out, &qid, &results, &args.run_id)?;
            }
            Ok(Outcome::Matches(count)) => {
                writeln!(out, "{}\t{}", qid, count)?;
            }
            // a failing query does not abort the batch
            Err(error) => log::error!("query {}: {:#}", qid, error),
        }
    }
    out.flush()?;

    log::info!(
        "{{\"queries\": {}, \"avg_usecs\": {:.1}}}",
        queries.len(),
        total_usecs as f64 / queries.len().max(1) as f64
    );
    Ok(())
}

enum Outcome {
    Ranked(Vec<(f32, u64)>),
    Matches(usize),
}

#[allow(clippy::too_many_arguments)]
fn run_one<'a, I, V>(
    args: &Args,
    index: &I,
    wand: &WandData<'a, V>,
    scorer: &ScorerKind,
    query: &Query,
    terms: &[(u64, u64)],
    max_docid: u64,
    selection: Option<&Selection>,
    bigrams: Option<&BigramIndex>,
) -> Result<Outcome>
where
    I: PostingIndex<'a>,
    V: WandDataVariant<'a>,
{
    let mut topk = TopKQueue::new(args.k);
    match args.algorithm.as_str() {
        "and" => {
            let mut cursors = make_scored_cursors(index, wand, scorer, terms)?;
            return Ok(Outcome::Matches(
                and_query(&mut cursors, max_docid, false).len(),
            ));
        }
        "or" => {
            let mut cursors = make_scored_cursors(index, wand, scorer, terms)?;
            return Ok(Outcome::Matches(
                or_query(&mut cursors, max_docid, false).len(),
            ));
        }
        "ranked_and" => {
            let mut cursors = make_scored_cursors(index, wand, scorer, terms)?;
            ranked_and_query(&mut cursors, max_docid, &mut topk);
        }
        "ranked_or" => {
            let mut cursors = make_scored_cursors(index, wand, scorer, terms)?;
            ranked_or_query(&mut cursors, max_docid, &mut topk);
        }
        "wand" => {
            let mut cursors = make_max_scored_cursors(index, wand, scorer, terms)?;
            wand_query(&mut cursors, max_docid, &mut topk);
        }
        "block_max_wand" => {
            let mut cursors = make_block_max_scored_cursors(index, wand, scorer, terms)?;
            block_max_wand_query(&mut cursors, max_docid, &mut topk);
        }
        "maxscore" => {
            let mut cursors = make_max_scored_cursors(index, wand, scorer, terms)?;
            maxscore_query(&mut cursors, max_docid, &mut topk);
        }
        "range_taat" => {
            let mut cursors = make_scored_cursors(index, wand, scorer, terms)?;
            range_taat_query(&mut cursors, max_docid, args.range_size, &mut topk);
        }
        "maxscore_inter" => {
            let selection = selection.context("missing selection")?;
            let bigrams = bigrams.context("missing bigram index")?;
            maxscore_inter_query(
                index,
                wand,
                scorer,
                &query.terms,
                selection,
                bigrams,
                &mut topk,
            )?;
        }
        other => anyhow::bail!("unknown algorithm {}", other),
    }
    Ok(Outcome::Ranked(topk.topk().to_vec()))
}
