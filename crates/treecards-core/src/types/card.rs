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

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::srs::SrsState;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::ItemId;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// A media attachment shown on one side of a card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    /// Where the media lives. Opaque to the core.
    pub locator: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub item_id: ItemId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub tags: BTreeSet<String>,
    pub front_media: Vec<MediaRef>,
    pub back_media: Vec<MediaRef>,
    /// Whether the card summarizes its item's children.
    pub is_tree_generated: bool,
    pub created_at: Timestamp,
    pub srs: SrsState,
}

/// A card that has not been assigned an id by the store yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCard {
    pub item_id: ItemId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub tags: BTreeSet<String>,
    pub front_media: Vec<MediaRef>,
    pub back_media: Vec<MediaRef>,
    pub is_tree_generated: bool,
    pub created_at: Timestamp,
}

impl NewCard {
    /// A card with no tags or media. New cards are due at creation.
    pub fn plain(
        item_id: ItemId,
        deck_id: DeckId,
        front: impl Into<String>,
        back: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            item_id,
            deck_id,
            front: front.into(),
            back: back.into(),
            tags: BTreeSet::new(),
            front_media: Vec::new(),
            back_media: Vec::new(),
            is_tree_generated: false,
            created_at,
        }
    }

    pub fn with_id(self, id: CardId) -> Card {
        Card {
            id,
            item_id: self.item_id,
            deck_id: self.deck_id,
            front: self.front,
            back: self.back,
            tags: self.tags,
            front_media: self.front_media,
            back_media: self.back_media,
            is_tree_generated: self.is_tree_generated,
            created_at: self.created_at,
            srs: SrsState::new(self.created_at),
        }
    }
}
