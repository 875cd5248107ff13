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

//! Operations as the API boundary sees them: load a snapshot from the store,
//! run the core logic on it, persist the outcome.
//!
//! Every call takes the caller's identity. Anything the caller does not own
//! is reported as `NotFound`.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::clock::Clock;
use crate::clock::review_cutoff;
use crate::error::CoreError;
use crate::error::CoreResult;
use crate::generator::Generated;
use crate::generator::SkippedNode;
use crate::generator::generate_bulk;
use crate::generator::generate_for_item;
use crate::mutator::CascadeDelete;
use crate::mutator::check_manual_card_target;
use crate::mutator::level_under;
use crate::mutator::plan_delete;
use crate::mutator::reparent;
use crate::public_id::DEFAULT_MAX_ATTEMPTS;
use crate::public_id::PublicId;
use crate::public_id::generate_unique_public_id;
use crate::queue::DueFilter;
use crate::queue::ReviewScope;
use crate::queue::SubtreeReview;
use crate::queue::select_due;
use crate::queue::subtree_review;
use crate::rng::TinyRng;
use crate::snapshot::DeckSnapshot;
use crate::snapshot::SkippedCard;
use crate::snapshot::export_snapshot;
use crate::snapshot::plan_import;
use crate::srs::Quality;
use crate::srs::next_state;
use crate::store::CardScope;
use crate::store::FailedInsert;
use crate::store::Store;
use crate::tree::TreeIndex;
use crate::tree::TreeNode;
use crate::types::card::Card;
use crate::types::card::MediaRef;
use crate::types::card::NewCard;
use crate::types::deck::Deck;
use crate::types::deck::NewDeck;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::ItemId;
use crate::types::ids::OwnerId;
use crate::types::item::Item;
use crate::types::item::NewItem;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServiceConfig {
    /// Hours added to "now" when deciding what is due today.
    pub business_day_offset_hours: i64,
    pub public_id_attempts: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            business_day_offset_hours: 7,
            public_id_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemDraft {
    pub title: String,
    pub parent: Option<ItemId>,
    /// `None` appends after the last sibling.
    pub order: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub order: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
    pub tags: BTreeSet<String>,
    pub front_media: Vec<MediaRef>,
    pub back_media: Vec<MediaRef>,
}

/// Fields left as `None` (or blank text) are not changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CardUpdate {
    pub front: Option<String>,
    pub back: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub front_media: Option<Vec<MediaRef>>,
    pub back_media: Option<Vec<MediaRef>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DueRequest {
    pub deck: Option<DeckId>,
    /// Restrict to this item's subtree.
    pub item: Option<ItemId>,
    pub include_all: bool,
    pub include_tree_cards: bool,
}

impl Default for DueRequest {
    fn default() -> Self {
        Self {
            deck: None,
            item: None,
            include_all: false,
            include_tree_cards: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TreeCardReport {
    pub created: Vec<Card>,
    pub skipped: Vec<SkippedNode>,
    pub failed: Vec<FailedInsert>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemCardOutcome {
    pub card: Card,
    pub overwritten: bool,
    pub children: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeckCheck {
    pub orphans: Vec<Item>,
    pub misleveled: Vec<Item>,
}

impl DeckCheck {
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.misleveled.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportReport {
    pub deck: Deck,
    pub items: usize,
    pub imported: usize,
    pub skipped: Vec<SkippedCard>,
    pub failed: Vec<FailedInsert>,
    pub tree: Vec<TreeNode>,
}

pub struct Service<S, C> {
    store: S,
    clock: C,
    config: ServiceConfig,
    rng: TinyRng,
}

impl<S: Store, C: Clock> Service<S, C> {
    pub fn new(store: S, clock: C, config: ServiceConfig) -> Self {
        let seed = clock.now().millis() as u64;
        Self {
            store,
            clock,
            config,
            rng: TinyRng::from_seed(seed),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Cards due at or before this instant count as due today.
    pub fn review_cutoff(&self) -> Timestamp {
        review_cutoff(&self.clock, self.config.business_day_offset_hours)
    }

    // Decks.

    fn owned_deck(&self, owner: &OwnerId, id: DeckId) -> CoreResult<Deck> {
        match self.store.load_deck(id)? {
            Some(deck) if &deck.owner_id == owner => Ok(deck),
            _ => Err(CoreError::not_found(format!("deck {id}"))),
        }
    }

    pub fn create_deck(&mut self, owner: &OwnerId, title: &str) -> CoreResult<Deck> {
        let title = required("title", title)?;
        let deck = self.store.insert_deck(NewDeck {
            title,
            owner_id: owner.clone(),
            created_at: self.clock.now(),
        })?;
        log::info!("Created deck {} for {owner}", deck.id);
        Ok(deck)
    }

    pub fn list_decks(&self, owner: &OwnerId) -> CoreResult<Vec<Deck>> {
        self.store.load_decks(owner)
    }

    pub fn deck(&self, owner: &OwnerId, id: DeckId) -> CoreResult<Deck> {
        self.owned_deck(owner, id)
    }

    pub fn rename_deck(&mut self, owner: &OwnerId, id: DeckId, title: &str) -> CoreResult<Deck> {
        let mut deck = self.owned_deck(owner, id)?;
        deck.title = required("title", title)?;
        self.store.save_deck(&deck)?;
        Ok(deck)
    }

    /// Publishing allocates a public id the first time; unpublishing drops it.
    pub fn set_deck_public(&mut self, owner: &OwnerId, id: DeckId, public: bool) -> CoreResult<Deck> {
        let mut deck = self.owned_deck(owner, id)?;
        deck.is_public = public;
        if !public {
            deck.public_id = None;
        } else if deck.public_id.is_none() {
            let store = &self.store;
            let public_id: PublicId = generate_unique_public_id(
                &mut self.rng,
                |candidate| store.public_id_exists(candidate),
                self.config.public_id_attempts,
            )?;
            log::info!("Deck {id} is now public as {public_id}");
            deck.public_id = Some(public_id);
        }
        self.store.save_deck(&deck)?;
        Ok(deck)
    }

    pub fn toggle_deck_public(&mut self, owner: &OwnerId, id: DeckId) -> CoreResult<Deck> {
        let deck = self.owned_deck(owner, id)?;
        self.set_deck_public(owner, id, !deck.is_public)
    }

    /// A public deck and its tree, for anyone who knows the public id.
    pub fn public_deck(&self, public_id: &PublicId) -> CoreResult<(Deck, Vec<TreeNode>)> {
        let deck = match self.store.find_deck_by_public_id(public_id)? {
            Some(deck) if deck.is_public => deck,
            _ => return Err(CoreError::not_found(format!("public deck {public_id}"))),
        };
        let items = self.store.load_items(deck.id)?;
        let tree = TreeIndex::new(&items).build_tree(None);
        Ok((deck, tree))
    }

    pub fn delete_deck(&mut self, owner: &OwnerId, id: DeckId) -> CoreResult<()> {
        self.owned_deck(owner, id)?;
        self.store.delete_deck(id)?;
        log::info!("Deleted deck {id}");
        Ok(())
    }

    // Items.

    fn owned_item(&self, owner: &OwnerId, id: ItemId) -> CoreResult<Item> {
        match self.store.load_item(id)? {
            Some(item) if &item.owner_id == owner => Ok(item),
            _ => Err(CoreError::not_found(format!("item {id}"))),
        }
    }

    pub fn create_item(&mut self, owner: &OwnerId, deck: DeckId, draft: ItemDraft) -> CoreResult<Item> {
        let title = required("title", &draft.title)?;
        self.owned_deck(owner, deck)?;
        let items = self.store.load_items(deck)?;
        let tree = TreeIndex::new(&items);
        let level = level_under(&tree, draft.parent)?;
        let order = match draft.order {
            Some(order) => order,
            None => tree
                .children(draft.parent)
                .iter()
                .map(|sibling| sibling.order + 1)
                .max()
                .unwrap_or(0),
        };
        let item = self.store.insert_item(NewItem {
            deck_id: deck,
            parent_id: draft.parent,
            title,
            order,
            level,
            owner_id: owner.clone(),
        })?;
        log::debug!("Created item {} in deck {deck}", item.id);
        Ok(item)
    }

    /// An item and its direct children.
    pub fn item(&self, owner: &OwnerId, id: ItemId) -> CoreResult<(Item, Vec<Item>)> {
        let item = self.owned_item(owner, id)?;
        let items = self.store.load_items(item.deck_id)?;
        let tree = TreeIndex::new(&items);
        let children = tree
            .children(Some(id))
            .iter()
            .map(|child| (*child).clone())
            .collect();
        Ok((item, children))
    }

    pub fn update_item(&mut self, owner: &OwnerId, id: ItemId, update: ItemUpdate) -> CoreResult<Item> {
        let mut item = self.owned_item(owner, id)?;
        if let Some(title) = update.title.as_deref().filter(|t| !t.trim().is_empty()) {
            item.title = title.trim().to_string();
        }
        if let Some(order) = update.order {
            item.order = order;
        }
        self.store.save_items(std::slice::from_ref(&item))?;
        Ok(item)
    }

    /// Re-parent an item. Fails with `CyclicMove` if the new parent is the
    /// item itself or lies below it; nothing is saved in that case.
    pub fn move_item(&mut self, owner: &OwnerId, id: ItemId, new_parent: Option<ItemId>) -> CoreResult<Item> {
        let item = self.owned_item(owner, id)?;
        let items = self.store.load_items(item.deck_id)?;
        let tree = TreeIndex::new(&items);
        let plan = reparent(&tree, id, new_parent)?;
        self.store.save_items(&plan.changed_items())?;
        log::debug!(
            "Moved item {id} under {:?}; {} descendants relevelled",
            new_parent,
            plan.relevelled.len()
        );
        Ok(plan.moved)
    }

    /// Delete an item, its descendants, and their cards.
    pub fn delete_item(&mut self, owner: &OwnerId, id: ItemId) -> CoreResult<CascadeDelete> {
        let item = self.owned_item(owner, id)?;
        let items = self.store.load_items(item.deck_id)?;
        let tree = TreeIndex::new(&items);
        let cards = self
            .store
            .load_cards(&CardScope::Items(tree.subtree_ids(id)))?;
        let plan = plan_delete(&tree, id, &cards)?;
        self.store.delete_subtree(&plan)?;
        log::info!(
            "Deleted {} items and {} cards under item {id}",
            plan.item_ids.len(),
            plan.card_ids.len()
        );
        Ok(plan)
    }

    pub fn deck_tree(&self, owner: &OwnerId, deck: DeckId) -> CoreResult<Vec<TreeNode>> {
        self.owned_deck(owner, deck)?;
        let items = self.store.load_items(deck)?;
        Ok(TreeIndex::new(&items).build_tree(None))
    }

    /// The children of `parent` (or the roots), in sibling order.
    pub fn children(&self, owner: &OwnerId, deck: DeckId, parent: Option<ItemId>) -> CoreResult<Vec<Item>> {
        self.owned_deck(owner, deck)?;
        let items = self.store.load_items(deck)?;
        let tree = TreeIndex::new(&items);
        Ok(tree.children(parent).iter().map(|i| (*i).clone()).collect())
    }

    pub fn item_path(&self, owner: &OwnerId, id: ItemId) -> CoreResult<Vec<Item>> {
        let item = self.owned_item(owner, id)?;
        let items = self.store.load_items(item.deck_id)?;
        let tree = TreeIndex::new(&items);
        let path = match tree.get(id) {
            Some(indexed) => tree.path(indexed).into_iter().cloned().collect(),
            None => vec![item],
        };
        Ok(path)
    }

    pub fn check_deck(&self, owner: &OwnerId, deck: DeckId) -> CoreResult<DeckCheck> {
        self.owned_deck(owner, deck)?;
        let items = self.store.load_items(deck)?;
        let tree = TreeIndex::new(&items);
        Ok(DeckCheck {
            orphans: tree.orphans().into_iter().cloned().collect(),
            misleveled: tree.misleveled().into_iter().cloned().collect(),
        })
    }

    // Cards.

    fn owned_card(&self, owner: &OwnerId, id: CardId) -> CoreResult<Card> {
        let card = self
            .store
            .load_card(id)?
            .ok_or_else(|| CoreError::not_found(format!("card {id}")))?;
        match self.store.load_item(card.item_id)? {
            Some(item) if &item.owner_id == owner => Ok(card),
            _ => Err(CoreError::not_found(format!("card {id}"))),
        }
    }

    /// Create a manual card. Only leaves accept manual cards.
    pub fn create_card(&mut self, owner: &OwnerId, item_id: ItemId, draft: CardDraft) -> CoreResult<Card> {
        let front = required("front", &draft.front)?;
        let back = required("back", &draft.back)?;
        let item = self.owned_item(owner, item_id)?;
        self.owned_deck(owner, item.deck_id)?;
        let items = self.store.load_items(item.deck_id)?;
        check_manual_card_target(&TreeIndex::new(&items), item_id)?;
        let card = self.store.insert_card(NewCard {
            tags: draft.tags,
            front_media: draft.front_media,
            back_media: draft.back_media,
            ..NewCard::plain(item_id, item.deck_id, front, back, self.clock.now())
        })?;
        Ok(card)
    }

    pub fn card(&self, owner: &OwnerId, id: CardId) -> CoreResult<Card> {
        self.owned_card(owner, id)
    }

    pub fn update_card(&mut self, owner: &OwnerId, id: CardId, update: CardUpdate) -> CoreResult<Card> {
        let mut card = self.owned_card(owner, id)?;
        if let Some(front) = update.front.filter(|f| !f.trim().is_empty()) {
            card.front = front;
        }
        if let Some(back) = update.back.filter(|b| !b.trim().is_empty()) {
            card.back = back;
        }
        if let Some(tags) = update.tags {
            card.tags = tags;
        }
        if let Some(media) = update.front_media {
            card.front_media = media;
        }
        if let Some(media) = update.back_media {
            card.back_media = media;
        }
        self.store.save_card(&card)?;
        Ok(card)
    }

    pub fn delete_card(&mut self, owner: &OwnerId, id: CardId) -> CoreResult<()> {
        self.owned_card(owner, id)?;
        self.store.delete_cards(&BTreeSet::from([id]))
    }

    pub fn item_cards(&self, owner: &OwnerId, item: ItemId) -> CoreResult<Vec<Card>> {
        self.owned_item(owner, item)?;
        self.store.load_cards(&CardScope::Item(item))
    }

    pub fn deck_cards(&self, owner: &OwnerId, deck: DeckId) -> CoreResult<Vec<Card>> {
        self.owned_deck(owner, deck)?;
        self.store.load_cards(&CardScope::Deck(deck))
    }

    // Tree cards.

    /// Generate summary cards for every inner node of a deck, or of the
    /// subtree under `root`.
    pub fn generate_tree_cards(
        &mut self,
        owner: &OwnerId,
        deck: DeckId,
        root: Option<ItemId>,
    ) -> CoreResult<TreeCardReport> {
        self.owned_deck(owner, deck)?;
        if let Some(root) = root {
            let item = self.owned_item(owner, root)?;
            if item.deck_id != deck {
                return Err(CoreError::not_found(format!("item {root}")));
            }
        }
        let items = self.store.load_items(deck)?;
        let cards = self.store.load_cards(&CardScope::Deck(deck))?;
        let tree = TreeIndex::new(&items);
        let bulk = generate_bulk(&tree, root, &cards, self.clock.now())?;
        let batch = self.store.insert_cards(bulk.created)?;
        log::info!(
            "Generated {} tree cards in deck {deck} ({} skipped, {} failed)",
            batch.inserted.len(),
            bulk.skipped.len(),
            batch.failed.len()
        );
        Ok(TreeCardReport {
            created: batch.inserted,
            skipped: bulk.skipped,
            failed: batch.failed,
        })
    }

    /// Generate the summary card of one item. An existing one is only
    /// replaced with `overwrite`, and keeps its id and schedule.
    pub fn generate_item_card(&mut self, owner: &OwnerId, item_id: ItemId, overwrite: bool) -> CoreResult<ItemCardOutcome> {
        let item = self.owned_item(owner, item_id)?;
        let items = self.store.load_items(item.deck_id)?;
        let cards = self.store.load_cards(&CardScope::Item(item_id))?;
        let tree = TreeIndex::new(&items);
        let children = tree
            .children(Some(item_id))
            .iter()
            .map(|c| c.title.clone())
            .collect();
        let outcome = match generate_for_item(&tree, item_id, &cards, overwrite, self.clock.now())? {
            Generated::Created(card) => ItemCardOutcome {
                card: self.store.insert_card(card)?,
                overwritten: false,
                children,
            },
            Generated::Overwritten(card) => {
                self.store.save_card(&card)?;
                ItemCardOutcome {
                    card,
                    overwritten: true,
                    children,
                }
            }
        };
        Ok(outcome)
    }

    // Review.

    fn due_filter(&self, include_all: bool, include_tree_cards: bool) -> DueFilter {
        DueFilter {
            cutoff: self.review_cutoff(),
            include_all,
            include_tree_cards,
        }
    }

    /// The cards to review today, most overdue first.
    pub fn due_cards(&self, owner: &OwnerId, request: &DueRequest) -> CoreResult<Vec<Card>> {
        if let Some(deck) = request.deck {
            self.owned_deck(owner, deck)?;
        }
        let cards = match request.item {
            Some(item_id) => {
                let item = self.owned_item(owner, item_id)?;
                let items = self.store.load_items(item.deck_id)?;
                let tree = TreeIndex::new(&items);
                self.store
                    .load_cards(&CardScope::Items(tree.subtree_ids(item_id)))?
            }
            None => match request.deck {
                Some(deck) => self.store.load_cards(&CardScope::Deck(deck))?,
                None => {
                    let mut cards = Vec::new();
                    for deck in self.store.load_decks(owner)? {
                        cards.extend(self.store.load_cards(&CardScope::Deck(deck.id))?);
                    }
                    cards
                }
            },
        };
        let scope = match request.deck {
            Some(deck) => ReviewScope::Deck(deck),
            None => ReviewScope::Everything,
        };
        let filter = self.due_filter(request.include_all, request.include_tree_cards);
        Ok(select_due(cards, &scope, &filter))
    }

    /// Due cards of an item's subtree, with the breadcrumb path of each.
    pub fn subtree_review(
        &self,
        owner: &OwnerId,
        item_id: ItemId,
        include_all: bool,
        include_tree_cards: bool,
    ) -> CoreResult<SubtreeReview> {
        let item = self.owned_item(owner, item_id)?;
        let items = self.store.load_items(item.deck_id)?;
        let tree = TreeIndex::new(&items);
        let cards = self
            .store
            .load_cards(&CardScope::Items(tree.subtree_ids(item_id)))?;
        subtree_review(&tree, item_id, cards, &self.due_filter(include_all, include_tree_cards))
    }

    /// Record an answer and persist the card's new schedule.
    pub fn submit_review(&mut self, owner: &OwnerId, card_id: CardId, quality: Quality) -> CoreResult<Card> {
        let mut card = self.owned_card(owner, card_id)?;
        card.srs = next_state(&card.srs, quality, self.clock.now());
        self.store.save_card(&card)?;
        log::debug!(
            "Card {card_id} answered {}: interval {} days, due {}",
            quality.as_str(),
            card.srs.interval,
            card.srs.due_date
        );
        Ok(card)
    }

    // Import and export.

    pub fn export_deck(&self, owner: &OwnerId, deck: DeckId) -> CoreResult<DeckSnapshot> {
        let deck = self.owned_deck(owner, deck)?;
        let items = self.store.load_items(deck.id)?;
        let cards = self.store.load_cards(&CardScope::Deck(deck.id))?;
        Ok(export_snapshot(&deck, &items, &cards, self.clock.now()))
    }

    /// Create a new deck from a snapshot. Cards whose item cannot be
    /// resolved are skipped and reported.
    pub fn import_deck(&mut self, owner: &OwnerId, snapshot: &DeckSnapshot) -> CoreResult<ImportReport> {
        let plan = plan_import(snapshot)?;
        let now = self.clock.now();
        let deck = self.store.insert_deck(NewDeck {
            title: plan.title.clone(),
            owner_id: owner.clone(),
            created_at: now,
        })?;
        let mut ids: Vec<ItemId> = Vec::with_capacity(plan.items.len());
        for planned in &plan.items {
            let item = self.store.insert_item(NewItem {
                deck_id: deck.id,
                parent_id: planned.parent.map(|p| ids[p]),
                title: planned.title.clone(),
                order: planned.order,
                level: planned.level,
                owner_id: owner.clone(),
            })?;
            ids.push(item.id);
        }
        let cards = plan
            .cards
            .iter()
            .map(|planned| NewCard {
                tags: planned.tags.iter().cloned().collect(),
                ..NewCard::plain(ids[planned.item], deck.id, planned.front.clone(), planned.back.clone(), now)
            })
            .collect();
        let batch = self.store.insert_cards(cards)?;
        for skipped in &plan.skipped {
            log::warn!(
                "Skipped imported card '{}': {}",
                skipped.front,
                skipped.reason
            );
        }
        log::info!(
            "Imported deck {}: {} items, {} cards, {} skipped",
            deck.id,
            ids.len(),
            batch.inserted.len(),
            plan.skipped.len()
        );
        let items = self.store.load_items(deck.id)?;
        let tree = TreeIndex::new(&items).build_tree(None);
        Ok(ImportReport {
            deck,
            items: ids.len(),
            imported: batch.inserted.len(),
            skipped: plan.skipped,
            failed: batch.failed,
            tree,
        })
    }
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(CoreError::invalid(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use crate::types::timestamp::ts;

    type TestService = Service<MemoryStore, FixedClock>;

    fn service() -> TestService {
        Service::new(
            MemoryStore::new(),
            FixedClock(ts("2024-03-10T20:00:00.000")),
            ServiceConfig::default(),
        )
    }

    fn alice() -> OwnerId {
        OwnerId::new("alice")
    }

    fn add(svc: &mut TestService, deck: DeckId, parent: Option<ItemId>, title: &str) -> ItemId {
        svc.create_item(
            &alice(),
            deck,
            ItemDraft {
                title: title.to_string(),
                parent,
                order: None,
            },
        )
        .unwrap()
        .id
    }

    fn draft(front: &str, back: &str) -> CardDraft {
        CardDraft {
            front: front.to_string(),
            back: back.to_string(),
            ..CardDraft::default()
        }
    }

    struct Scenario {
        deck: DeckId,
        root: ItemId,
        a: ItemId,
        b: ItemId,
        a1: ItemId,
        a2: ItemId,
    }

    fn scenario(svc: &mut TestService) -> Scenario {
        let deck = svc.create_deck(&alice(), "Deck").unwrap().id;
        let root = add(svc, deck, None, "Root");
        let a = add(svc, deck, Some(root), "A");
        let b = add(svc, deck, Some(root), "B");
        let a1 = add(svc, deck, Some(a), "A1");
        let a2 = add(svc, deck, Some(a), "A2");
        Scenario {
            deck,
            root,
            a,
            b,
            a1,
            a2,
        }
    }

    #[test]
    fn test_item_levels_and_order() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let (a, children) = svc.item(&alice(), s.a).unwrap();
        assert_eq!(a.level, 1);
        let names: Vec<&str> = children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(names, vec!["A1", "A2"]);
        assert_eq!(children[1].order, 1);
        assert_eq!(children[1].level, 2);
        let path: Vec<String> = svc
            .item_path(&alice(), s.a2)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(path, vec!["Root", "A", "A2"]);
        let roots = svc.children(&alice(), s.deck, None).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, s.root);
    }

    #[test]
    fn test_create_item_validation() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let blank = svc.create_item(
            &alice(),
            s.deck,
            ItemDraft {
                title: "   ".to_string(),
                parent: None,
                order: None,
            },
        );
        assert!(matches!(blank, Err(CoreError::InvalidInput(_))));
        let other_deck = svc.create_deck(&alice(), "Other").unwrap().id;
        let foreign_parent = svc.create_item(
            &alice(),
            other_deck,
            ItemDraft {
                title: "x".to_string(),
                parent: Some(s.a),
                order: None,
            },
        );
        assert!(matches!(foreign_parent, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_other_owner_sees_nothing() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let mallory = OwnerId::new("mallory");
        assert!(matches!(svc.deck(&mallory, s.deck), Err(CoreError::NotFound(_))));
        assert!(matches!(svc.delete_item(&mallory, s.a), Err(CoreError::NotFound(_))));
        let card = svc.create_card(&alice(), s.b, draft("Q", "A")).unwrap();
        assert!(matches!(
            svc.submit_review(&mallory, card.id, Quality::Good),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_manual_cards_only_on_leaves() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let inner = svc.create_card(&alice(), s.a, draft("Q", "A"));
        assert!(matches!(inner, Err(CoreError::InvalidInput(_))));
        let blank = svc.create_card(&alice(), s.a1, draft("Q", " "));
        assert!(matches!(blank, Err(CoreError::InvalidInput(_))));
        let card = svc.create_card(&alice(), s.a1, draft("Q", "A")).unwrap();
        assert!(!card.is_tree_generated);
        assert_eq!(card.deck_id, s.deck);
    }

    #[test]
    fn test_update_card_keeps_blank_fields() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let card = svc.create_card(&alice(), s.b, draft("Q", "A")).unwrap();
        let updated = svc
            .update_card(
                &alice(),
                card.id,
                CardUpdate {
                    front: Some(String::new()),
                    back: Some("New".to_string()),
                    tags: Some(BTreeSet::from(["t".to_string()])),
                    ..CardUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.front, "Q");
        assert_eq!(updated.back, "New");
        assert!(updated.tags.contains("t"));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let first = svc.generate_item_card(&alice(), s.a, false).unwrap();
        assert!(!first.overwritten);
        assert_eq!(first.card.back, "• A1\r\n• A2");
        let second = svc.generate_item_card(&alice(), s.a, false);
        assert_eq!(
            second,
            Err(CoreError::AlreadyExists {
                card_id: first.card.id
            })
        );
        assert_eq!(svc.item_cards(&alice(), s.a).unwrap().len(), 1);
        let leaf = svc.generate_item_card(&alice(), s.b, false);
        assert_eq!(leaf, Err(CoreError::NoChildren));
    }

    #[test]
    fn test_overwrite_preserves_schedule() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let first = svc.generate_item_card(&alice(), s.a, false).unwrap();
        let reviewed = svc.submit_review(&alice(), first.card.id, Quality::Good).unwrap();
        add(&mut svc, s.deck, Some(s.a), "A3");
        let again = svc.generate_item_card(&alice(), s.a, true).unwrap();
        assert!(again.overwritten);
        assert_eq!(again.card.id, first.card.id);
        assert_eq!(again.card.srs, reviewed.srs);
        assert_eq!(again.card.back, "• A1\r\n• A2\r\n• A3");
        assert_eq!(again.children, vec!["A1", "A2", "A3"]);
    }

    #[test]
    fn test_bulk_generation() {
        let mut svc = service();
        let s = scenario(&mut svc);
        svc.generate_item_card(&alice(), s.a, false).unwrap();
        let report = svc.generate_tree_cards(&alice(), s.deck, None).unwrap();
        let fronts: Vec<&str> = report.created.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["Root"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].title, "A");
        let again = svc.generate_tree_cards(&alice(), s.deck, Some(s.root)).unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.skipped.len(), 2);
    }

    #[test]
    fn test_cascade_delete() {
        let mut svc = service();
        let s = scenario(&mut svc);
        svc.create_card(&alice(), s.a1, draft("1", "one")).unwrap();
        svc.create_card(&alice(), s.a2, draft("2", "two")).unwrap();
        let kept = svc.create_card(&alice(), s.b, draft("3", "three")).unwrap();
        svc.generate_item_card(&alice(), s.a, false).unwrap();
        let plan = svc.delete_item(&alice(), s.a).unwrap();
        assert_eq!(plan.item_ids, BTreeSet::from([s.a, s.a1, s.a2]));
        assert_eq!(plan.card_ids.len(), 3);
        let cards = svc.deck_cards(&alice(), s.deck).unwrap();
        assert_eq!(cards, vec![kept]);
        assert_eq!(svc.store().item_count(), 2);
    }

    #[test]
    fn test_move_rejects_cycles() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let result = svc.move_item(&alice(), s.a, Some(s.a2));
        assert_eq!(result, Err(CoreError::CyclicMove));
        let (a, _) = svc.item(&alice(), s.a).unwrap();
        assert_eq!(a.parent_id, Some(s.root));
    }

    #[test]
    fn test_move_relevels_subtree() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let moved = svc.move_item(&alice(), s.a, Some(s.b)).unwrap();
        assert_eq!(moved.level, 2);
        let (a1, _) = svc.item(&alice(), s.a1).unwrap();
        assert_eq!(a1.level, 3);
        assert!(svc.check_deck(&alice(), s.deck).unwrap().is_clean());
    }

    #[test]
    fn test_due_cards_use_business_offset() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let card = svc.create_card(&alice(), s.b, draft("Q", "A")).unwrap();
        let mut later = card.clone();
        // Due three hours from now: inside the seven hour window.
        later.srs.due_date = ts("2024-03-10T23:00:00.000");
        svc.store.save_card(&later).unwrap();
        let mut tomorrow = svc.create_card(&alice(), s.a1, draft("Q2", "A2")).unwrap();
        tomorrow.srs.due_date = ts("2024-03-11T04:00:00.000");
        svc.store.save_card(&tomorrow).unwrap();

        let due = svc.due_cards(&alice(), &DueRequest::default()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, card.id);

        let all = svc
            .due_cards(
                &alice(),
                &DueRequest {
                    include_all: true,
                    ..DueRequest::default()
                },
            )
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_due_cards_scoped_to_subtree() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let in_a = svc.create_card(&alice(), s.a2, draft("Q", "A")).unwrap();
        svc.create_card(&alice(), s.b, draft("Q", "A")).unwrap();
        let due = svc
            .due_cards(
                &alice(),
                &DueRequest {
                    deck: Some(s.deck),
                    item: Some(s.a),
                    ..DueRequest::default()
                },
            )
            .unwrap();
        assert_eq!(due, vec![in_a]);
        let review = svc.subtree_review(&alice(), s.a, false, true).unwrap();
        assert_eq!(review.cards.len(), 1);
        let crumbs: Vec<&str> = review.cards[0]
            .item_path
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(crumbs, vec!["Root", "A", "A2"]);
    }

    #[test]
    fn test_submit_review_persists() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let card = svc.create_card(&alice(), s.b, draft("Q", "A")).unwrap();
        let after = svc.submit_review(&alice(), card.id, Quality::Good).unwrap();
        assert_eq!(after.srs.repetitions, 1);
        assert_eq!(after.srs.interval, 1.0);
        assert_eq!(after.srs.due_date, ts("2024-03-11T20:00:00.000"));
        assert_eq!(svc.card(&alice(), card.id).unwrap(), after);
        let failed = svc.submit_review(&alice(), card.id, Quality::Again).unwrap();
        assert_eq!(failed.srs.repetitions, 0);
        assert_eq!(failed.srs.interval, 0.0);
    }

    #[test]
    fn test_publish_and_unpublish() {
        let mut svc = service();
        let s = scenario(&mut svc);
        let public = svc.set_deck_public(&alice(), s.deck, true).unwrap();
        let public_id = public.public_id.clone().unwrap();
        let (found, tree) = svc.public_deck(&public_id).unwrap();
        assert_eq!(found.id, s.deck);
        assert_eq!(tree.len(), 1);
        // Publishing again keeps the same id.
        let again = svc.set_deck_public(&alice(), s.deck, true).unwrap();
        assert_eq!(again.public_id, Some(public_id.clone()));
        let private = svc.toggle_deck_public(&alice(), s.deck).unwrap();
        assert!(!private.is_public);
        assert_eq!(private.public_id, None);
        assert!(matches!(svc.public_deck(&public_id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_delete_deck_cascades() {
        let mut svc = service();
        let s = scenario(&mut svc);
        svc.create_card(&alice(), s.b, draft("Q", "A")).unwrap();
        svc.delete_deck(&alice(), s.deck).unwrap();
        assert_eq!(svc.store().item_count(), 0);
        assert_eq!(svc.store().card_count(), 0);
        assert!(svc.list_decks(&alice()).unwrap().is_empty());
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut svc = service();
        let s = scenario(&mut svc);
        svc.create_card(&alice(), s.a2, draft("Q", "A")).unwrap();
        let reviewed = svc.create_card(&alice(), s.b, draft("Q2", "A2")).unwrap();
        svc.submit_review(&alice(), reviewed.id, Quality::Easy).unwrap();
        let snapshot = svc.export_deck(&alice(), s.deck).unwrap();

        let report = svc.import_deck(&OwnerId::new("bob"), &snapshot).unwrap();
        assert_eq!(report.items, 5);
        assert_eq!(report.imported, 2);
        assert!(report.skipped.is_empty());
        assert_ne!(report.deck.id, s.deck);
        assert_eq!(report.tree.len(), 1);
        assert_eq!(report.tree[0].size(), 5);

        let bob = OwnerId::new("bob");
        let cards = svc.deck_cards(&bob, report.deck.id).unwrap();
        // Scheduling state is not carried over.
        assert!(cards.iter().all(|c| c.srs.repetitions == 0));
        let a2_card = cards.iter().find(|c| c.front == "Q").unwrap();
        let path: Vec<String> = svc
            .item_path(&bob, a2_card.item_id)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(path, vec!["Root", "A", "A2"]);
    }
}
