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

use crate::public_id::PublicId;
use crate::types::ids::DeckId;
use crate::types::ids::OwnerId;
use crate::types::timestamp::Timestamp;

/// An audio file attached to a deck. Storage of the file itself is handled
/// elsewhere; the deck only keeps the reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub stored_file: String,
    pub display_name: String,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub title: String,
    pub owner_id: OwnerId,
    pub is_public: bool,
    /// Present only while the deck is public.
    pub public_id: Option<PublicId>,
    pub audios: Vec<AudioTrack>,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewDeck {
    pub title: String,
    pub owner_id: OwnerId,
    pub created_at: Timestamp,
}

impl NewDeck {
    pub fn with_id(self, id: DeckId) -> Deck {
        Deck {
            id,
            title: self.title,
            owner_id: self.owner_id,
            is_public: false,
            public_id: None,
            audios: Vec::new(),
            created_at: self.created_at,
        }
    }
}
