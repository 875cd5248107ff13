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

//! Cards that summarize a node's direct children.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::error::CoreResult;
use crate::tree::TreeIndex;
use crate::types::card::Card;
use crate::types::card::NewCard;
use crate::types::ids::CardId;
use crate::types::ids::ItemId;
use crate::types::item::Item;
use crate::types::timestamp::Timestamp;

const BULLET: &str = "• ";

const LINE_BREAK: &str = "\r\n";

/// The back of a generated card: one bullet line per child.
pub fn summarize_children(children: &[&Item]) -> String {
    children
        .iter()
        .map(|child| format!("{BULLET}{}", child.title))
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

/// The existing generated card for `item`, if any: a card on the item whose
/// front is the item's title.
pub fn find_generated<'c>(item: &Item, cards: &'c [Card]) -> Option<&'c Card> {
    cards
        .iter()
        .find(|card| card.item_id == item.id && card.front == item.title)
}

fn new_generated_card(item: &Item, back: String, now: Timestamp) -> NewCard {
    NewCard {
        is_tree_generated: true,
        ..NewCard::plain(item.id, item.deck_id, item.title.clone(), back, now)
    }
}

/// Result of generating the card for a single node.
#[derive(Clone, Debug, PartialEq)]
pub enum Generated {
    /// No generated card existed; this one should be inserted.
    Created(NewCard),
    /// The existing card, with its back rewritten. Identity and scheduling
    /// are kept.
    Overwritten(Card),
}

/// Generate the card for one node. `cards` must contain the cards already
/// attached to the node.
pub fn generate_for_item(
    tree: &TreeIndex,
    item_id: ItemId,
    cards: &[Card],
    overwrite: bool,
    now: Timestamp,
) -> CoreResult<Generated> {
    let item = tree
        .get(item_id)
        .ok_or_else(|| CoreError::not_found(format!("item {item_id}")))?;
    let children = tree.children(Some(item_id));
    if children.is_empty() {
        return Err(CoreError::NoChildren);
    }
    let back = summarize_children(children);
    match find_generated(item, cards) {
        Some(existing) if !overwrite => Err(CoreError::AlreadyExists {
            card_id: existing.id,
        }),
        Some(existing) => {
            let mut card = existing.clone();
            card.back = back;
            card.is_tree_generated = true;
            Ok(Generated::Overwritten(card))
        }
        None => Ok(Generated::Created(new_generated_card(item, back, now))),
    }
}

/// A node the bulk generator left alone because it already has a card.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedNode {
    pub item_id: ItemId,
    pub title: String,
    pub existing_card: CardId,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BulkGeneration {
    pub created: Vec<NewCard>,
    pub skipped: Vec<SkippedNode>,
}

/// Generate cards for every node with children, either in the whole deck
/// (`root == None`) or in the subtree rooted at `root`. Leaves and nodes
/// that already have a generated card are skipped. Nodes are visited by
/// level, then sibling order.
pub fn generate_bulk(
    tree: &TreeIndex,
    root: Option<ItemId>,
    cards: &[Card],
    now: Timestamp,
) -> CoreResult<BulkGeneration> {
    let scope: Option<BTreeSet<ItemId>> = match root {
        Some(id) => {
            if !tree.contains(id) {
                return Err(CoreError::not_found(format!("item {id}")));
            }
            Some(tree.subtree_ids(id))
        }
        None => None,
    };
    let mut nodes: Vec<&Item> = tree
        .items()
        .iter()
        .filter(|item| scope.as_ref().is_none_or(|ids| ids.contains(&item.id)))
        .copied()
        .collect();
    nodes.sort_by_key(|item| (item.level, item.order));

    let mut result = BulkGeneration::default();
    for item in nodes {
        let children = tree.children(Some(item.id));
        if children.is_empty() {
            continue;
        }
        if let Some(existing) = find_generated(item, cards) {
            result.skipped.push(SkippedNode {
                item_id: item.id,
                title: item.title.clone(),
                existing_card: existing.id,
            });
            continue;
        }
        let back = summarize_children(children);
        result.created.push(new_generated_card(item, back, now));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::item;
    use crate::tree::fixtures::scenario;
    use crate::types::timestamp::ts;

    fn now() -> Timestamp {
        ts("2024-02-01T09:00:00.000")
    }

    fn topic() -> Vec<Item> {
        vec![
            item(1, None, "Topic", 0, 0),
            item(2, Some(1), "X", 0, 1),
            item(3, Some(1), "Y", 1, 1),
            item(4, Some(1), "Z", 2, 1),
        ]
    }

    #[test]
    fn test_topic_card() {
        let items = topic();
        let tree = TreeIndex::new(&items);
        let generated = generate_for_item(&tree, ItemId::new(1), &[], false, now()).unwrap();
        let Generated::Created(card) = generated else {
            panic!("expected a new card");
        };
        assert_eq!(card.front, "Topic");
        assert_eq!(card.back, "• X\r\n• Y\r\n• Z");
        assert!(card.is_tree_generated);
        assert_eq!(card.item_id, ItemId::new(1));
    }

    #[test]
    fn test_leaf_has_no_children() {
        let items = topic();
        let tree = TreeIndex::new(&items);
        let result = generate_for_item(&tree, ItemId::new(2), &[], false, now());
        assert_eq!(result, Err(CoreError::NoChildren));
    }

    #[test]
    fn test_second_generation_already_exists() {
        let items = topic();
        let tree = TreeIndex::new(&items);
        let Generated::Created(first) =
            generate_for_item(&tree, ItemId::new(1), &[], false, now()).unwrap()
        else {
            panic!("expected a new card");
        };
        let stored = vec![first.with_id(CardId::new(10))];
        let second = generate_for_item(&tree, ItemId::new(1), &stored, false, now());
        assert_eq!(
            second,
            Err(CoreError::AlreadyExists {
                card_id: CardId::new(10)
            })
        );
    }

    #[test]
    fn test_overwrite_keeps_identity_and_schedule() {
        let mut items = topic();
        let tree_before = TreeIndex::new(&items);
        let Generated::Created(first) =
            generate_for_item(&tree_before, ItemId::new(1), &[], false, now()).unwrap()
        else {
            panic!("expected a new card");
        };
        let mut stored = first.with_id(CardId::new(10));
        stored.srs.repetitions = 4;
        stored.srs.interval = 30.0;
        stored.is_tree_generated = false;

        items.push(item(5, Some(1), "W", 3, 1));
        let tree = TreeIndex::new(&items);
        let result = generate_for_item(&tree, ItemId::new(1), &[stored.clone()], true, now());
        let Ok(Generated::Overwritten(card)) = result else {
            panic!("expected an overwrite");
        };
        assert_eq!(card.id, stored.id);
        assert_eq!(card.srs, stored.srs);
        assert!(card.is_tree_generated);
        assert_eq!(card.back, "• X\r\n• Y\r\n• Z\r\n• W");
    }

    #[test]
    fn test_unknown_item() {
        let items = topic();
        let tree = TreeIndex::new(&items);
        let result = generate_for_item(&tree, ItemId::new(99), &[], false, now());
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_bulk_whole_deck() {
        let items = scenario();
        let tree = TreeIndex::new(&items);
        let bulk = generate_bulk(&tree, None, &[], now()).unwrap();
        let fronts: Vec<&str> = bulk.created.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["Root", "A"]);
        assert_eq!(bulk.created[0].back, "• A\r\n• B");
        assert!(bulk.skipped.is_empty());
    }

    #[test]
    fn test_bulk_skips_existing() {
        let items = scenario();
        let tree = TreeIndex::new(&items);
        let existing = NewCard::plain(ItemId::new(2), items[0].deck_id, "A", "old", now())
            .with_id(CardId::new(7));
        let bulk = generate_bulk(&tree, None, &[existing], now()).unwrap();
        let fronts: Vec<&str> = bulk.created.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["Root"]);
        assert_eq!(bulk.skipped.len(), 1);
        assert_eq!(bulk.skipped[0].existing_card, CardId::new(7));
    }

    #[test]
    fn test_bulk_subtree() {
        let items = scenario();
        let tree = TreeIndex::new(&items);
        let bulk = generate_bulk(&tree, Some(ItemId::new(2)), &[], now()).unwrap();
        let fronts: Vec<&str> = bulk.created.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["A"]);
        let leaf_only = generate_bulk(&tree, Some(ItemId::new(3)), &[], now()).unwrap();
        assert_eq!(leaf_only, BulkGeneration::default());
    }
}
