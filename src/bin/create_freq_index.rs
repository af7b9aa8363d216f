/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::Parser;
use efsearch::collection::BinaryFreqCollection;
use efsearch::config::GlobalParameters;
use efsearch::index::{verify_against_collection, PostingIndex, INDEX_TYPES};
use efsearch::{with_index_builder, with_index_type};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Builds a compressed posting index from a binary collection", long_about = None)]
struct Args {
    /// Index type
    #[arg(short = 't', long = "type", value_parser = clap::builder::PossibleValuesParser::new(INDEX_TYPES))]
    type_name: String,

    /// Collection basename (expects .docs and .freqs)
    #[arg(short, long)]
    collection: PathBuf,

    /// Output index filename
    #[arg(short, long)]
    output: PathBuf,

    /// Replay the collection against the built index
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let collection = BinaryFreqCollection::open(&args.collection)
        .with_context(|| format!("cannot open collection {}", args.collection.display()))?;
    let params = GlobalParameters::default();

    log::info!(
        "building {} index over {} documents",
        args.type_name,
        collection.num_docs()
    );

    let words = with_index_builder!(args.type_name.as_str(), collection.num_docs(), &params, |builder| {
        for sequence in collection.iter() {
            builder.add_posting_list(sequence.docs, sequence.freqs)?;
        }
        let sink = builder.build()?;
        sink.store(&args.output)
            .with_context(|| format!("cannot write {}", args.output.display()))?;
        sink.into_words()
    });

    if args.check {
        with_index_type!(args.type_name.as_str(), &words, |index| {
            verify_against_collection(&collection, index.num_terms(), |term| {
                index.postings(term)
            })?;
        });
        log::info!("index verified against the collection");
    }

    Ok(())
}
