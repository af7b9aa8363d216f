/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]
#![allow(clippy::type_complexity)]

pub mod bits;
pub mod collection;
pub mod config;
pub mod cursor;
pub mod index;
pub mod intersection;
pub mod mapper;
pub mod query;
pub mod scorer;
pub mod sequence;
pub mod setcover;
pub mod utils;
pub mod wand;

/// A document identifier, in `[0, num_docs)`.
pub type DocId = u64;
/// A term identifier, in `[0, num_terms)`.
pub type TermId = u64;

/// Prelude module to import everything from this crate
pub mod prelude {
    pub use crate::bits::*;
    pub use crate::collection::*;
    pub use crate::config::*;
    pub use crate::cursor::*;
    pub use crate::index::*;
    pub use crate::intersection::*;
    pub use crate::mapper::*;
    pub use crate::query::*;
    pub use crate::scorer::*;
    pub use crate::sequence::*;
    pub use crate::setcover::*;
    pub use crate::utils::*;
    pub use crate::wand::*;
    pub use crate::{DocId, TermId};
}
