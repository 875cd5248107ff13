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

//! Structural edits to a deck's tree.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use serde::Serialize;

use crate::error::CoreError;
use crate::error::CoreResult;
use crate::tree::TreeIndex;
use crate::types::card::Card;
use crate::types::ids::CardId;
use crate::types::ids::ItemId;
use crate::types::item::Item;

/// The level an item gets under `parent` (roots are level 0).
pub fn level_under(tree: &TreeIndex, parent: Option<ItemId>) -> CoreResult<u32> {
    match parent {
        None => Ok(0),
        Some(id) => tree
            .get(id)
            .map(|p| p.level + 1)
            .ok_or_else(|| CoreError::not_found(format!("parent item {id}"))),
    }
}

/// Manual cards may only be attached to leaves. Checked once, at creation.
pub fn check_manual_card_target(tree: &TreeIndex, item_id: ItemId) -> CoreResult<()> {
    if !tree.contains(item_id) {
        return Err(CoreError::not_found(format!("item {item_id}")));
    }
    if !tree.is_leaf(item_id) {
        return Err(CoreError::invalid(
            "regular cards can only be attached to leaf items",
        ));
    }
    Ok(())
}

/// Items whose parent or level must be saved after a move: the moved item
/// first, then any descendant whose level shifted.
#[derive(Clone, Debug, PartialEq)]
pub struct Reparent {
    pub moved: Item,
    pub relevelled: Vec<Item>,
}

impl Reparent {
    pub fn changed_items(&self) -> Vec<Item> {
        let mut items = vec![self.moved.clone()];
        items.extend(self.relevelled.iter().cloned());
        items
    }
}

/// Move `item_id` under `new_parent` (or to the root when `None`).
pub fn reparent(
    tree: &TreeIndex,
    item_id: ItemId,
    new_parent: Option<ItemId>,
) -> CoreResult<Reparent> {
    let item = tree
        .get(item_id)
        .ok_or_else(|| CoreError::not_found(format!("item {item_id}")))?;
    let descendants = tree.descendant_ids(item_id);
    if let Some(parent_id) = new_parent {
        if parent_id == item_id || descendants.contains(&parent_id) {
            return Err(CoreError::CyclicMove);
        }
    }
    let level = level_under(tree, new_parent)?;

    let mut moved = item.clone();
    moved.parent_id = new_parent;
    moved.level = level;

    // Levels below the moved item follow from depth, so stale stored levels
    // are repaired by the move.
    let mut depths = BTreeMap::new();
    let mut queue = VecDeque::from([(item_id, level)]);
    while let Some((current, current_level)) = queue.pop_front() {
        for child in tree.children(Some(current)) {
            if child.id != item_id && !depths.contains_key(&child.id) {
                depths.insert(child.id, current_level + 1);
                queue.push_back((child.id, current_level + 1));
            }
        }
    }
    let relevelled = depths
        .into_iter()
        .filter_map(|(id, new_level)| tree.get(id).map(|d| (d, new_level)))
        .filter(|(descendant, new_level)| descendant.level != *new_level)
        .map(|(descendant, new_level)| {
            let mut descendant = descendant.clone();
            descendant.level = new_level;
            descendant
        })
        .collect();
    Ok(Reparent { moved, relevelled })
}

/// Everything a cascade delete removes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CascadeDelete {
    pub item_ids: BTreeSet<ItemId>,
    pub card_ids: BTreeSet<CardId>,
}

/// Plan the deletion of `item_id`, its descendants, and every card attached
/// to any of them.
pub fn plan_delete(tree: &TreeIndex, item_id: ItemId, cards: &[Card]) -> CoreResult<CascadeDelete> {
    if !tree.contains(item_id) {
        return Err(CoreError::not_found(format!("item {item_id}")));
    }
    let item_ids = tree.subtree_ids(item_id);
    let card_ids = cards
        .iter()
        .filter(|card| item_ids.contains(&card.item_id))
        .map(|card| card.id)
        .collect();
    Ok(CascadeDelete { item_ids, card_ids })
}
