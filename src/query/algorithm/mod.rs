/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The query operators. Each one consumes a vector of per-term cursors
//! and drives them in document-at-a-time order; the ranked operators
//! push into a [`TopKQueue`](super::TopKQueue) whose threshold feeds
//! back into their pruning decisions.

mod boolean;
mod block_max_wand_query;
mod maxscore_inter_query;
mod maxscore_query;
mod range_taat_query;
mod ranked_query;
mod wand_query;

pub use block_max_wand_query::block_max_wand_query;
pub use boolean::{and_query, or_query};
pub use maxscore_inter_query::{maxscore_inter_query, Selection};
pub use maxscore_query::maxscore_query;
pub use range_taat_query::range_taat_query;
pub use ranked_query::{ranked_and_query, ranked_or_query};
pub use wand_query::wand_query;
