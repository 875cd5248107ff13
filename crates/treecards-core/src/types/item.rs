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

use serde::Deserialize;
use serde::Serialize;

use crate::types::ids::DeckId;
use crate::types::ids::ItemId;
use crate::types::ids::OwnerId;

/// A node in a deck's topic tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub deck_id: DeckId,
    /// `None` for roots.
    pub parent_id: Option<ItemId>,
    pub title: String,
    /// Sibling sort key.
    pub order: i64,
    /// Distance from the root; roots are at level 0.
    pub level: u32,
    pub owner_id: OwnerId,
}

impl Item {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// An item that has not been assigned an id by the store yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewItem {
    pub deck_id: DeckId,
    pub parent_id: Option<ItemId>,
    pub title: String,
    pub order: i64,
    pub level: u32,
    pub owner_id: OwnerId,
}

impl NewItem {
    pub fn with_id(self, id: ItemId) -> Item {
        Item {
            id,
            deck_id: self.deck_id,
            parent_id: self.parent_id,
            title: self.title,
            order: self.order,
            level: self.level,
            owner_id: self.owner_id,
        }
    }
}
