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

//! Choosing which cards to review, and pacing them within a session.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::error::CoreResult;
use crate::rng::TinyRng;
use crate::rng::shuffle;
use crate::srs::Quality;
use crate::tree::TreeIndex;
use crate::types::card::Card;
use crate::types::ids::DeckId;
use crate::types::ids::ItemId;
use crate::types::item::Item;
use crate::types::timestamp::Timestamp;

/// Which cards a review draws from.
#[derive(Clone, Debug, PartialEq)]
pub enum ReviewScope {
    Everything,
    Deck(DeckId),
    /// Cards attached to any of these items.
    Items(BTreeSet<ItemId>),
}

impl ReviewScope {
    /// An item and everything below it.
    pub fn subtree(tree: &TreeIndex, id: ItemId) -> Self {
        ReviewScope::Items(tree.subtree_ids(id))
    }

    pub fn contains(&self, card: &Card) -> bool {
        match self {
            ReviewScope::Everything => true,
            ReviewScope::Deck(deck_id) => card.deck_id == *deck_id,
            ReviewScope::Items(ids) => ids.contains(&card.item_id),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DueFilter {
    /// Cards due at or before this instant are eligible.
    pub cutoff: Timestamp,
    /// Ignore due dates entirely.
    pub include_all: bool,
    pub include_tree_cards: bool,
}

impl DueFilter {
    pub fn new(cutoff: Timestamp) -> Self {
        Self {
            cutoff,
            include_all: false,
            include_tree_cards: true,
        }
    }

    pub fn accepts(&self, card: &Card) -> bool {
        if !self.include_tree_cards && card.is_tree_generated {
            return false;
        }
        self.include_all || card.srs.due_date <= self.cutoff
    }
}

/// The cards in `scope` that pass `filter`, most overdue first. Ties keep
/// card id order.
pub fn select_due(cards: Vec<Card>, scope: &ReviewScope, filter: &DueFilter) -> Vec<Card> {
    let mut due: Vec<Card> = cards
        .into_iter()
        .filter(|card| scope.contains(card) && filter.accepts(card))
        .collect();
    due.sort_by(|a, b| a.srs.due_date.cmp(&b.srs.due_date).then(a.id.cmp(&b.id)));
    due
}

/// Session-level shaping of a due list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionLimits {
    pub card_limit: Option<usize>,
    /// Shuffle with this seed before applying the limit.
    pub shuffle_seed: Option<u64>,
}

pub fn limit_session(cards: Vec<Card>, limits: &SessionLimits) -> Vec<Card> {
    let cards = match limits.shuffle_seed {
        Some(seed) => shuffle(cards, &mut TinyRng::from_seed(seed)),
        None => cards,
    };
    match limits.card_limit {
        Some(limit) => cards.into_iter().take(limit).collect(),
        None => cards,
    }
}

/// One breadcrumb entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathEntry {
    pub id: ItemId,
    pub title: String,
    pub level: u32,
}

impl From<&Item> for PathEntry {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            level: item.level,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewCard {
    pub card: Card,
    pub item_path: Vec<PathEntry>,
}

/// The due cards of one item's subtree, with breadcrumbs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubtreeReview {
    pub item: Item,
    pub path: Vec<PathEntry>,
    pub cards: Vec<ReviewCard>,
}

fn breadcrumbs(tree: &TreeIndex, item: &Item) -> Vec<PathEntry> {
    tree.path(item).into_iter().map(PathEntry::from).collect()
}

pub fn subtree_review(
    tree: &TreeIndex,
    item_id: ItemId,
    cards: Vec<Card>,
    filter: &DueFilter,
) -> CoreResult<SubtreeReview> {
    let item = tree
        .get(item_id)
        .ok_or_else(|| CoreError::not_found(format!("item {item_id}")))?;
    let scope = ReviewScope::subtree(tree, item_id);
    let cards = select_due(cards, &scope, filter)
        .into_iter()
        .map(|card| {
            let item_path = match tree.get(card.item_id) {
                Some(owner) => breadcrumbs(tree, owner),
                None => Vec::new(),
            };
            ReviewCard { card, item_path }
        })
        .collect();
    Ok(SubtreeReview {
        item: item.clone(),
        path: breadcrumbs(tree, item),
        cards,
    })
}

/// Where graded cards go back into the session queue. Independent of the
/// persisted schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequeuePolicy {
    pub again_position: usize,
    pub hard_position: usize,
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self {
            again_position: 10,
            hard_position: 20,
        }
    }
}

impl RequeuePolicy {
    /// Given the queue without the card just graded, return the queue the
    /// session continues with.
    pub fn requeue<T>(&self, remaining: Vec<T>, graded: T, quality: Quality) -> Vec<T> {
        let position = match quality {
            Quality::Again => self.again_position,
            Quality::Hard => self.hard_position,
            Quality::Good | Quality::Easy => return remaining,
        };
        let mut queue = remaining;
        let at = position.min(queue.len());
        queue.insert(at, graded);
        queue
    }
}

/// An in-memory review session. The card at the front of the queue is the
/// current one.
#[derive(Debug)]
pub struct ReviewSession {
    queue: Vec<Card>,
    policy: RequeuePolicy,
    total_cards: usize,
    reviews: usize,
}

impl ReviewSession {
    pub fn new(cards: Vec<Card>, policy: RequeuePolicy) -> Self {
        Self {
            total_cards: cards.len(),
            queue: cards,
            policy,
            reviews: 0,
        }
    }

    pub fn current(&self) -> Option<&Card> {
        self.queue.first()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn total_cards(&self) -> usize {
        self.total_cards
    }

    pub fn reviews(&self) -> usize {
        self.reviews
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Replace the current card with its graded version and requeue it.
    pub fn answer(&mut self, graded: Card, quality: Quality) {
        if self.queue.is_empty() {
            return;
        }
        let mut remaining = std::mem::take(&mut self.queue);
        remaining.remove(0);
        self.queue = self.policy.requeue(remaining, graded, quality);
        self.reviews += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::scenario;
    use crate::types::card::NewCard;
    use crate::types::ids::CardId;
    use crate::types::timestamp::ts;

    fn card(id: i64, item: i64, due: &str) -> Card {
        let mut card = NewCard::plain(ItemId::new(item), DeckId::new(1), "Q", "A", ts(due))
            .with_id(CardId::new(id));
        card.srs.due_date = ts(due);
        card
    }

    fn card_ids(cards: &[Card]) -> Vec<i64> {
        cards.iter().map(|c| c.id.get()).collect()
    }

    fn cutoff() -> Timestamp {
        ts("2024-01-10T07:00:00.000")
    }

    #[test]
    fn test_select_due_filters_and_orders() {
        let cards = vec![
            card(1, 4, "2024-01-09T00:00:00.000"),
            card(2, 4, "2024-01-11T00:00:00.000"),
            card(3, 5, "2024-01-01T00:00:00.000"),
            card(4, 3, "2024-01-10T07:00:00.000"),
        ];
        let due = select_due(cards, &ReviewScope::Everything, &DueFilter::new(cutoff()));
        assert_eq!(card_ids(&due), vec![3, 1, 4]);
    }

    #[test]
    fn test_include_all_ignores_dates() {
        let cards = vec![
            card(1, 4, "2030-01-01T00:00:00.000"),
            card(2, 4, "2024-01-01T00:00:00.000"),
        ];
        let filter = DueFilter {
            include_all: true,
            ..DueFilter::new(cutoff())
        };
        let due = select_due(cards, &ReviewScope::Everything, &filter);
        assert_eq!(card_ids(&due), vec![2, 1]);
    }

    #[test]
    fn test_exclude_tree_cards() {
        let mut generated = card(1, 2, "2024-01-01T00:00:00.000");
        generated.is_tree_generated = true;
        let cards = vec![generated, card(2, 4, "2024-01-01T00:00:00.000")];
        let filter = DueFilter {
            include_tree_cards: false,
            ..DueFilter::new(cutoff())
        };
        let due = select_due(cards, &ReviewScope::Everything, &filter);
        assert_eq!(card_ids(&due), vec![2]);
    }

    #[test]
    fn test_deck_scope() {
        let mut other = card(2, 4, "2024-01-01T00:00:00.000");
        other.deck_id = DeckId::new(2);
        let cards = vec![card(1, 4, "2024-01-01T00:00:00.000"), other];
        let due = select_due(
            cards,
            &ReviewScope::Deck(DeckId::new(2)),
            &DueFilter::new(cutoff()),
        );
        assert_eq!(card_ids(&due), vec![2]);
    }

    #[test]
    fn test_subtree_scope() {
        let items = scenario();
        let tree = TreeIndex::new(&items);
        let cards = vec![
            card(1, 4, "2024-01-01T00:00:00.000"),
            card(2, 3, "2024-01-01T00:00:00.000"),
            card(3, 2, "2024-01-02T00:00:00.000"),
        ];
        let scope = ReviewScope::subtree(&tree, ItemId::new(2));
        let due = select_due(cards, &scope, &DueFilter::new(cutoff()));
        assert_eq!(card_ids(&due), vec![1, 3]);
    }

    #[test]
    fn test_subtree_review_paths() {
        let items = scenario();
        let tree = TreeIndex::new(&items);
        let cards = vec![
            card(1, 5, "2024-01-01T00:00:00.000"),
            card(2, 3, "2024-01-01T00:00:00.000"),
        ];
        let review = subtree_review(&tree, ItemId::new(2), cards, &DueFilter::new(cutoff())).unwrap();
        let path: Vec<&str> = review.path.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(path, vec!["Root", "A"]);
        assert_eq!(review.cards.len(), 1);
        let crumbs: Vec<&str> = review.cards[0]
            .item_path
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(crumbs, vec!["Root", "A", "A2"]);
    }

    #[test]
    fn test_subtree_review_missing_item() {
        let items = scenario();
        let tree = TreeIndex::new(&items);
        let result = subtree_review(&tree, ItemId::new(77), vec![], &DueFilter::new(cutoff()));
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_requeue_positions() {
        let policy = RequeuePolicy::default();
        let remaining: Vec<u32> = (1..=30).collect();
        let again = policy.requeue(remaining.clone(), 0, Quality::Again);
        assert_eq!(again.iter().position(|&c| c == 0), Some(10));
        let hard = policy.requeue(remaining.clone(), 0, Quality::Hard);
        assert_eq!(hard.iter().position(|&c| c == 0), Some(20));
        let good = policy.requeue(remaining.clone(), 0, Quality::Good);
        assert_eq!(good, remaining);
        let easy = policy.requeue(remaining.clone(), 0, Quality::Easy);
        assert_eq!(easy.len(), 30);
    }

    #[test]
    fn test_requeue_short_queue_goes_to_end() {
        let policy = RequeuePolicy::default();
        let again = policy.requeue(vec![1, 2, 3], 0, Quality::Again);
        assert_eq!(again, vec![1, 2, 3, 0]);
        let alone = policy.requeue(Vec::new(), 0, Quality::Hard);
        assert_eq!(alone, vec![0]);
    }

    #[test]
    fn test_session_flow() {
        let cards = vec![
            card(1, 4, "2024-01-01T00:00:00.000"),
            card(2, 5, "2024-01-01T00:00:00.000"),
        ];
        let mut session = ReviewSession::new(cards, RequeuePolicy::default());
        assert_eq!(session.total_cards(), 2);
        let first = session.current().unwrap().clone();
        session.answer(first, Quality::Again);
        assert_eq!(card_ids(&session.queue), vec![2, 1]);
        let second = session.current().unwrap().clone();
        session.answer(second, Quality::Good);
        let third = session.current().unwrap().clone();
        session.answer(third, Quality::Easy);
        assert!(session.is_finished());
        assert_eq!(session.reviews(), 3);
    }

    #[test]
    fn test_limit_session() {
        let cards: Vec<Card> = (1..=5)
            .map(|i| card(i, 4, "2024-01-01T00:00:00.000"))
            .collect();
        let limited = limit_session(
            cards.clone(),
            &SessionLimits {
                card_limit: Some(2),
                shuffle_seed: None,
            },
        );
        assert_eq!(card_ids(&limited), vec![1, 2]);
        let shuffled = limit_session(
            cards,
            &SessionLimits {
                card_limit: None,
                shuffle_seed: Some(7),
            },
        );
        let mut sorted = card_ids(&shuffled);
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }
}
