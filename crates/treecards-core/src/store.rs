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

//! The storage collaborator.
//!
//! The core computes; a `Store` persists. Ids are allocated by the store on
//! insertion.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::error::CoreResult;
use crate::mutator::CascadeDelete;
use crate::public_id::PublicId;
use crate::types::card::Card;
use crate::types::card::NewCard;
use crate::types::deck::Deck;
use crate::types::deck::NewDeck;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::ItemId;
use crate::types::ids::OwnerId;
use crate::types::item::Item;
use crate::types::item::NewItem;

/// Which cards to load.
#[derive(Clone, Debug, PartialEq)]
pub enum CardScope {
    Item(ItemId),
    Items(BTreeSet<ItemId>),
    Deck(DeckId),
}

impl CardScope {
    pub fn contains(&self, card: &Card) -> bool {
        match self {
            CardScope::Item(id) => card.item_id == *id,
            CardScope::Items(ids) => ids.contains(&card.item_id),
            CardScope::Deck(id) => card.deck_id == *id,
        }
    }
}

/// Outcome of a batch insert. Failures are reported by position in the
/// input batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchInsertReport {
    pub inserted: Vec<Card>,
    pub failed: Vec<FailedInsert>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedInsert {
    pub index: usize,
    pub reason: String,
}

pub trait Store {
    fn load_deck(&self, id: DeckId) -> CoreResult<Option<Deck>>;

    fn load_decks(&self, owner: &OwnerId) -> CoreResult<Vec<Deck>>;

    fn find_deck_by_public_id(&self, public_id: &PublicId) -> CoreResult<Option<Deck>>;

    fn insert_deck(&mut self, deck: NewDeck) -> CoreResult<Deck>;

    fn save_deck(&mut self, deck: &Deck) -> CoreResult<()>;

    /// Remove a deck together with all of its items and cards.
    fn delete_deck(&mut self, id: DeckId) -> CoreResult<()>;

    /// Every item of the deck, in one call.
    fn load_items(&self, deck: DeckId) -> CoreResult<Vec<Item>>;

    fn load_item(&self, id: ItemId) -> CoreResult<Option<Item>>;

    fn insert_item(&mut self, item: NewItem) -> CoreResult<Item>;

    /// Save several items as one unit.
    fn save_items(&mut self, items: &[Item]) -> CoreResult<()>;

    fn delete_items(&mut self, ids: &BTreeSet<ItemId>) -> CoreResult<()>;

    fn load_cards(&self, scope: &CardScope) -> CoreResult<Vec<Card>>;

    fn load_card(&self, id: CardId) -> CoreResult<Option<Card>>;

    fn insert_card(&mut self, card: NewCard) -> CoreResult<Card>;

    fn save_card(&mut self, card: &Card) -> CoreResult<()>;

    fn delete_cards(&mut self, ids: &BTreeSet<CardId>) -> CoreResult<()>;

    fn public_id_exists(&self, public_id: &PublicId) -> CoreResult<bool> {
        Ok(self.find_deck_by_public_id(public_id)?.is_some())
    }

    /// Insert a batch of cards. A failing card must not take the others
    /// down with it.
    fn insert_cards(&mut self, cards: Vec<NewCard>) -> CoreResult<BatchInsertReport> {
        let mut report = BatchInsertReport::default();
        for (index, card) in cards.into_iter().enumerate() {
            match self.insert_card(card) {
                Ok(card) => report.inserted.push(card),
                Err(e) => {
                    log::warn!("Failed to insert card #{index}: {e}");
                    report.failed.push(FailedInsert {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Apply a cascade delete. Implementations with transactions should
    /// override this so both removals commit together.
    fn delete_subtree(&mut self, plan: &CascadeDelete) -> CoreResult<()> {
        let mut card_ids = plan.card_ids.clone();
        for card in self.load_cards(&CardScope::Items(plan.item_ids.clone()))? {
            card_ids.insert(card.id);
        }
        self.delete_cards(&card_ids)?;
        self.delete_items(&plan.item_ids)
    }
}

/// A store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    decks: BTreeMap<DeckId, Deck>,
    items: BTreeMap<ItemId, Item>,
    cards: BTreeMap<CardId, Card>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }
}

impl Store for MemoryStore {
    fn load_deck(&self, id: DeckId) -> CoreResult<Option<Deck>> {
        Ok(self.decks.get(&id).cloned())
    }

    fn load_decks(&self, owner: &OwnerId) -> CoreResult<Vec<Deck>> {
        Ok(self
            .decks
            .values()
            .filter(|deck| &deck.owner_id == owner)
            .cloned()
            .collect())
    }

    fn find_deck_by_public_id(&self, public_id: &PublicId) -> CoreResult<Option<Deck>> {
        Ok(self
            .decks
            .values()
            .find(|deck| deck.public_id.as_ref() == Some(public_id))
            .cloned())
    }

    fn insert_deck(&mut self, deck: NewDeck) -> CoreResult<Deck> {
        let deck = deck.with_id(DeckId::new(self.allocate()));
        self.decks.insert(deck.id, deck.clone());
        Ok(deck)
    }

    fn save_deck(&mut self, deck: &Deck) -> CoreResult<()> {
        if let Some(public_id) = &deck.public_id {
            if let Some(other) = self.find_deck_by_public_id(public_id)? {
                if other.id != deck.id {
                    return Err(CoreError::storage(format!("public id {public_id} is taken")));
                }
            }
        }
        match self.decks.get_mut(&deck.id) {
            Some(slot) => {
                *slot = deck.clone();
                Ok(())
            }
            None => Err(CoreError::not_found(format!("deck {}", deck.id))),
        }
    }

    fn delete_deck(&mut self, id: DeckId) -> CoreResult<()> {
        self.cards.retain(|_, card| card.deck_id != id);
        self.items.retain(|_, item| item.deck_id != id);
        self.decks.remove(&id);
        Ok(())
    }

    fn load_items(&self, deck: DeckId) -> CoreResult<Vec<Item>> {
        Ok(self
            .items
            .values()
            .filter(|item| item.deck_id == deck)
            .cloned()
            .collect())
    }

    fn load_item(&self, id: ItemId) -> CoreResult<Option<Item>> {
        Ok(self.items.get(&id).cloned())
    }

    fn insert_item(&mut self, item: NewItem) -> CoreResult<Item> {
        if !self.decks.contains_key(&item.deck_id) {
            return Err(CoreError::not_found(format!("deck {}", item.deck_id)));
        }
        let item = item.with_id(ItemId::new(self.allocate()));
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn save_items(&mut self, items: &[Item]) -> CoreResult<()> {
        if let Some(missing) = items.iter().find(|i| !self.items.contains_key(&i.id)) {
            return Err(CoreError::not_found(format!("item {}", missing.id)));
        }
        for item in items {
            self.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    fn delete_items(&mut self, ids: &BTreeSet<ItemId>) -> CoreResult<()> {
        self.items.retain(|id, _| !ids.contains(id));
        Ok(())
    }

    fn load_cards(&self, scope: &CardScope) -> CoreResult<Vec<Card>> {
        Ok(self
            .cards
            .values()
            .filter(|card| scope.contains(card))
            .cloned()
            .collect())
    }

    fn load_card(&self, id: CardId) -> CoreResult<Option<Card>> {
        Ok(self.cards.get(&id).cloned())
    }

    fn insert_card(&mut self, card: NewCard) -> CoreResult<Card> {
        if !self.items.contains_key(&card.item_id) {
            return Err(CoreError::not_found(format!("item {}", card.item_id)));
        }
        let card = card.with_id(CardId::new(self.allocate()));
        self.cards.insert(card.id, card.clone());
        Ok(card)
    }

    fn save_card(&mut self, card: &Card) -> CoreResult<()> {
        match self.cards.get_mut(&card.id) {
            Some(slot) => {
                *slot = card.clone();
                Ok(())
            }
            None => Err(CoreError::not_found(format!("card {}", card.id))),
        }
    }

    fn delete_cards(&mut self, ids: &BTreeSet<CardId>) -> CoreResult<()> {
        self.cards.retain(|id, _| !ids.contains(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::timestamp::ts;

    fn seeded() -> (MemoryStore, Deck, Item) {
        let mut store = MemoryStore::new();
        let deck = store
            .insert_deck(NewDeck {
                title: "Deck".to_string(),
                owner_id: OwnerId::new("alice"),
                created_at: ts("2024-01-01T00:00:00.000"),
            })
            .unwrap();
        let item = store
            .insert_item(NewItem {
                deck_id: deck.id,
                parent_id: None,
                title: "Root".to_string(),
                order: 0,
                level: 0,
                owner_id: OwnerId::new("alice"),
            })
            .unwrap();
        (store, deck, item)
    }

    #[test]
    fn test_batch_insert_reports_failures() {
        let (mut store, deck, item) = seeded();
        let now = ts("2024-01-01T00:00:00.000");
        let batch = vec![
            NewCard::plain(item.id, deck.id, "1", "one", now),
            NewCard::plain(ItemId::new(999), deck.id, "2", "two", now),
            NewCard::plain(item.id, deck.id, "3", "three", now),
        ];
        let report = store.insert_cards(batch).unwrap();
        assert_eq!(report.inserted.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert_eq!(store.card_count(), 2);
    }

    #[test]
    fn test_delete_subtree_removes_unlisted_cards() {
        let (mut store, deck, item) = seeded();
        let now = ts("2024-01-01T00:00:00.000");
        store
            .insert_card(NewCard::plain(item.id, deck.id, "Q", "A", now))
            .unwrap();
        let plan = CascadeDelete {
            item_ids: BTreeSet::from([item.id]),
            card_ids: BTreeSet::new(),
        };
        store.delete_subtree(&plan).unwrap();
        assert_eq!(store.item_count(), 0);
        assert_eq!(store.card_count(), 0);
    }

    #[test]
    fn test_public_id_must_be_unique() {
        let (mut store, deck, _) = seeded();
        let mut second = store
            .insert_deck(NewDeck {
                title: "Other".to_string(),
                owner_id: OwnerId::new("bob"),
                created_at: ts("2024-01-01T00:00:00.000"),
            })
            .unwrap();
        let public_id = PublicId::try_from("ABC123".to_string()).unwrap();
        let mut first = deck;
        first.public_id = Some(public_id.clone());
        store.save_deck(&first).unwrap();
        assert!(store.public_id_exists(&public_id).unwrap());
        second.public_id = Some(public_id);
        assert!(matches!(store.save_deck(&second), Err(CoreError::Storage(_))));
    }
}
