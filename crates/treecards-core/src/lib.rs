// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! treecards-core: hierarchical decks with spaced repetition.
//!
//! This library provides storage-agnostic types and algorithms for:
//! - Topic trees: building, breadcrumbs, re-parenting, cascade deletes
//! - SM-2 scheduling and review queues
//! - Generated cards that summarize a node's children
//! - JSON deck snapshots for import and export

pub mod clock;
pub mod error;
pub mod generator;
pub mod mutator;
pub mod public_id;
pub mod queue;
pub mod rng;
pub mod service;
pub mod snapshot;
pub mod srs;
pub mod store;
pub mod tree;
pub mod types;

// Re-exports for convenience
pub use clock::{Clock, FixedClock};
#[cfg(feature = "clock")]
pub use clock::SystemClock;
pub use error::{CoreError, CoreResult, ErrorReport, Fallible, fail};
pub use service::{Service, ServiceConfig};
pub use srs::{Quality, SrsState};
pub use store::{CardScope, MemoryStore, Store};
pub use tree::{TreeIndex, TreeNode};
pub use types::card::{Card, NewCard};
pub use types::deck::{Deck, NewDeck};
pub use types::ids::{CardId, DeckId, ItemId, OwnerId};
pub use types::item::{Item, NewItem};
pub use types::timestamp::Timestamp;
