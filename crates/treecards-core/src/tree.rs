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

//! Tree operations over the flat item list of one deck.
//!
//! Items only know their parent's id. The index groups them by parent once
//! and answers structural questions from that adjacency map, so no node ever
//! holds a reference to another.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;

use serde::Serialize;

use crate::types::ids::ItemId;
use crate::types::item::Item;

/// An item together with its ordered children.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub item: Item,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

pub struct TreeIndex<'a> {
    /// Unique items, in input order.
    items: Vec<&'a Item>,
    by_id: HashMap<ItemId, &'a Item>,
    /// Children of each parent, sorted by `order`. Ties keep input order.
    children: HashMap<Option<ItemId>, Vec<&'a Item>>,
}

impl<'a> TreeIndex<'a> {
    /// Index a flat item list. Later duplicates of an id are ignored.
    pub fn new(items: &'a [Item]) -> Self {
        let mut unique = Vec::with_capacity(items.len());
        let mut by_id = HashMap::with_capacity(items.len());
        let mut children: HashMap<Option<ItemId>, Vec<&'a Item>> = HashMap::new();
        for item in items {
            if by_id.contains_key(&item.id) {
                log::debug!("Ignoring duplicate item {}", item.id);
                continue;
            }
            by_id.insert(item.id, item);
            unique.push(item);
            children.entry(item.parent_id).or_default().push(item);
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|item| item.order);
        }
        Self {
            items: unique,
            by_id,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[&'a Item] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&'a Item> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// The direct children of `parent` (roots for `None`), in sibling order.
    pub fn children(&self, parent: Option<ItemId>) -> &[&'a Item] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: ItemId) -> bool {
        self.children(Some(id)).is_empty()
    }

    /// Build the nested tree below `parent`.
    pub fn build_tree(&self, parent: Option<ItemId>) -> Vec<TreeNode> {
        let mut visited = HashSet::new();
        if let Some(id) = parent {
            visited.insert(id);
        }
        self.build_nodes(parent, &mut visited)
    }

    fn build_nodes(&self, parent: Option<ItemId>, visited: &mut HashSet<ItemId>) -> Vec<TreeNode> {
        let mut nodes = Vec::new();
        for item in self.children(parent) {
            if !visited.insert(item.id) {
                continue;
            }
            nodes.push(TreeNode {
                item: (*item).clone(),
                children: self.build_nodes(Some(item.id), visited),
            });
        }
        nodes
    }

    /// The chain of items from the root down to `item`, inclusive. If an
    /// ancestor is missing from the index the path starts below the gap.
    pub fn path(&self, item: &'a Item) -> Vec<&'a Item> {
        let mut path = vec![item];
        let mut seen = HashSet::from([item.id]);
        let mut current = item;
        while let Some(parent_id) = current.parent_id {
            let Some(parent) = self.get(parent_id) else {
                log::warn!(
                    "Item {} refers to missing parent {parent_id}; truncating path",
                    current.id
                );
                break;
            };
            if !seen.insert(parent.id) {
                log::warn!("Parent chain of item {} loops; truncating path", item.id);
                break;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// The ids of every item below `id`. Does not include `id` itself.
    pub fn descendant_ids(&self, id: ItemId) -> BTreeSet<ItemId> {
        let mut result = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.children(Some(current)) {
                if child.id != id && result.insert(child.id) {
                    stack.push(child.id);
                }
            }
        }
        result
    }

    /// `id` together with all of its descendants.
    pub fn subtree_ids(&self, id: ItemId) -> BTreeSet<ItemId> {
        let mut ids = self.descendant_ids(id);
        ids.insert(id);
        ids
    }

    /// Items whose parent is not part of the index.
    pub fn orphans(&self) -> Vec<&'a Item> {
        self.items
            .iter()
            .filter(|item| matches!(item.parent_id, Some(p) if !self.contains(p)))
            .copied()
            .collect()
    }

    /// Items whose `level` disagrees with their parent's.
    pub fn misleveled(&self) -> Vec<&'a Item> {
        self.items
            .iter()
            .filter(|item| match item.parent_id {
                None => item.level != 0,
                Some(p) => match self.get(p) {
                    Some(parent) => item.level != parent.level + 1,
                    None => false,
                },
            })
            .copied()
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::ids::DeckId;
    use crate::types::ids::ItemId;
    use crate::types::ids::OwnerId;
    use crate::types::item::Item;

    pub fn item(id: i64, parent: Option<i64>, title: &str, order: i64, level: u32) -> Item {
        Item {
            id: ItemId::new(id),
            deck_id: DeckId::new(1),
            parent_id: parent.map(ItemId::new),
            title: title.to_string(),
            order,
            level,
            owner_id: OwnerId::new("alice"),
        }
    }

    /// Root -> [A, B], A -> [A1, A2].
    pub fn scenario() -> Vec<Item> {
        vec![
            item(1, None, "Root", 0, 0),
            item(3, Some(1), "B", 1, 1),
            item(2, Some(1), "A", 0, 1),
            item(5, Some(2), "A2", 1, 2),
            item(4, Some(2), "A1", 0, 2),
        ]
    }
}
