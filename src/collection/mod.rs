/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Input collections and the concatenated bit-vector store.

mod binary_collection;
mod bitvector_collection;

pub use binary_collection::{read_sizes, BinaryCollection, BinaryFreqCollection, PostingsSequence};
pub use bitvector_collection::{BitVectorCollection, BitVectorCollectionBuilder};
