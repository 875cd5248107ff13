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

//! The portable deck format used by export and import.
//!
//! An export carries titles, tree shape and card text, but no scheduling
//! state and no owner data. Importing rebuilds the tree under fresh ids.

use std::collections::HashMap;
use std::collections::VecDeque;

use serde::Deserialize;
use serde::Serialize;

use crate::error::CoreError;
use crate::error::CoreResult;
use crate::types::card::Card;
use crate::types::deck::Deck;
use crate::types::item::Item;
use crate::types::timestamp::Timestamp;

pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSnapshot {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub exported_at: Option<Timestamp>,
    pub deck: SnapshotDeck,
    #[serde(default)]
    pub items: Vec<SnapshotItem>,
    #[serde(default)]
    pub cards: Vec<SnapshotCard>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDeck {
    #[serde(default)]
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotItem {
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub level: u32,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCard {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_title: Option<String>,
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub fn export_snapshot(deck: &Deck, items: &[Item], cards: &[Card], now: Timestamp) -> DeckSnapshot {
    let titles: HashMap<_, _> = items.iter().map(|i| (i.id, i.title.clone())).collect();
    DeckSnapshot {
        version: Some(SNAPSHOT_VERSION.to_string()),
        exported_at: Some(now),
        deck: SnapshotDeck {
            title: deck.title.clone(),
        },
        items: items
            .iter()
            .map(|item| SnapshotItem {
                title: item.title.clone(),
                parent_id: item.parent_id.map(|p| p.to_string()),
                order: item.order,
                level: item.level,
                id: Some(item.id.to_string()),
            })
            .collect(),
        cards: cards
            .iter()
            .map(|card| SnapshotCard {
                item_id: Some(card.item_id.to_string()),
                item_title: titles.get(&card.item_id).cloned(),
                front: card.front.clone(),
                back: card.back.clone(),
                tags: card.tags.iter().cloned().collect(),
            })
            .collect(),
    }
}

/// A filesystem-friendly name for an exported deck.
pub fn export_file_name(title: &str) -> String {
    let sanitized: String = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if sanitized.is_empty() {
        "deck.json".to_string()
    } else {
        format!("{sanitized}.json")
    }
}

/// An item to create. `parent` indexes into `ImportPlan::items` and always
/// points at an earlier entry.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedItem {
    pub parent: Option<usize>,
    pub title: String,
    pub order: i64,
    pub level: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedCard {
    /// Index into `ImportPlan::items`.
    pub item: usize,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedCard {
    pub item_id: Option<String>,
    pub item_title: Option<String>,
    pub front: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportPlan {
    pub title: String,
    pub items: Vec<PlannedItem>,
    pub cards: Vec<PlannedCard>,
    pub skipped: Vec<SkippedCard>,
}

/// Turn a snapshot into an insertion plan: parents before children, levels
/// recomputed from the rebuilt tree, and every card bound to a planned item
/// or reported as skipped.
pub fn plan_import(snapshot: &DeckSnapshot) -> CoreResult<ImportPlan> {
    let title = snapshot.deck.title.trim();
    if title.is_empty() {
        return Err(CoreError::invalid("deck data is missing a title"));
    }
    let source = &snapshot.items;

    // Old id -> index in the snapshot. First occurrence wins.
    let mut by_old_id: HashMap<&str, usize> = HashMap::new();
    for (idx, item) in source.iter().enumerate() {
        if let Some(id) = item.id.as_deref() {
            by_old_id.entry(id).or_insert(idx);
        }
    }
    let parents: Vec<Option<usize>> = source
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let parent = item.parent_id.as_deref().and_then(|p| by_old_id.get(p).copied());
            if parent.is_none() && item.parent_id.is_some() {
                log::warn!("Imported item '{}' has an unknown parent; making it a root", item.title);
            }
            parent.filter(|p| *p != idx)
        })
        .collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); source.len()];
    for (idx, parent) in parents.iter().enumerate() {
        if let Some(p) = parent {
            children[*p].push(idx);
        }
    }

    // Breadth-first from the roots. Anything left over sits on a parent
    // cycle; the first such item becomes a root and the walk resumes.
    let mut position: Vec<Option<usize>> = vec![None; source.len()];
    let mut items: Vec<PlannedItem> = Vec::with_capacity(source.len());
    for idx in 0..source.len() {
        if parents[idx].is_none() {
            place_subtree(idx, source, &children, &mut items, &mut position);
        }
    }
    for idx in 0..source.len() {
        if position[idx].is_none() {
            log::warn!("Imported item '{}' is part of a parent cycle; making it a root", source[idx].title);
            place_subtree(idx, source, &children, &mut items, &mut position);
        }
    }

    // First item with a given title, in snapshot order.
    let mut by_title: HashMap<&str, usize> = HashMap::new();
    for (idx, item) in source.iter().enumerate() {
        by_title.entry(item.title.as_str()).or_insert(idx);
    }

    let mut cards = Vec::new();
    let mut skipped = Vec::new();
    for card in &snapshot.cards {
        let resolved = card
            .item_id
            .as_deref()
            .and_then(|id| by_old_id.get(id))
            .or_else(|| card.item_title.as_deref().and_then(|t| by_title.get(t)))
            .and_then(|idx| position[*idx]);
        let skip = |reason: &str| SkippedCard {
            item_id: card.item_id.clone(),
            item_title: card.item_title.clone(),
            front: card.front.chars().take(50).collect(),
            reason: reason.to_string(),
        };
        match resolved {
            None => skipped.push(skip("item not found")),
            Some(_) if card.front.trim().is_empty() || card.back.trim().is_empty() => {
                skipped.push(skip("front and back are required"))
            }
            Some(item) => cards.push(PlannedCard {
                item,
                front: card.front.clone(),
                back: card.back.clone(),
                tags: card.tags.clone(),
            }),
        }
    }

    Ok(ImportPlan {
        title: title.to_string(),
        items,
        cards,
        skipped,
    })
}

fn place_subtree(
    start: usize,
    source: &[SnapshotItem],
    children: &[Vec<usize>],
    items: &mut Vec<PlannedItem>,
    position: &mut [Option<usize>],
) {
    let mut queue = VecDeque::from([(start, None)]);
    while let Some((idx, parent)) = queue.pop_front() {
        if position[idx].is_some() {
            continue;
        }
        let level = parent.map(|p: usize| items[p].level + 1).unwrap_or(0);
        position[idx] = Some(items.len());
        items.push(PlannedItem {
            parent,
            title: source[idx].title.clone(),
            order: source[idx].order,
            level,
        });
        for child in &children[idx] {
            queue.push_back((*child, position[idx]));
        }
    }
}
