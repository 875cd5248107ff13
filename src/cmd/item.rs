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

use std::io::Write;

use treecards_core::Clock;
use treecards_core::Store;
use treecards_core::error::Fallible;
use treecards_core::service::ItemDraft;
use treecards_core::service::ItemUpdate;
use treecards_core::tree::TreeNode;
use treecards_core::types::ids::DeckId;
use treecards_core::types::ids::ItemId;

use crate::cmd::Context;

/// Print a tree as an indented outline, one item per line.
pub fn write_outline(nodes: &[TreeNode], out: &mut impl Write) -> Fallible<()> {
    let mut stack: Vec<(usize, &TreeNode)> = nodes.iter().rev().map(|node| (0, node)).collect();
    while let Some((depth, node)) = stack.pop() {
        writeln!(out, "{}- {} [{}]", "  ".repeat(depth), node.item.title, node.item.id)?;
        stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
    }
    Ok(())
}

pub fn add<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    deck: DeckId,
    title: String,
    parent: Option<ItemId>,
    order: Option<i64>,
    out: &mut impl Write,
) -> Fallible<()> {
    let item = ctx
        .app
        .create_item(&ctx.owner, deck, ItemDraft { title, parent, order })?;
    writeln!(out, "Created item {} at level {}.", item.id, item.level)?;
    Ok(())
}

pub fn edit<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    item: ItemId,
    title: Option<String>,
    order: Option<i64>,
    out: &mut impl Write,
) -> Fallible<()> {
    let item = ctx
        .app
        .update_item(&ctx.owner, item, ItemUpdate { title, order })?;
    writeln!(out, "{}\t{}\torder {}", item.id, item.title, item.order)?;
    Ok(())
}

pub fn move_to<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    item: ItemId,
    parent: Option<ItemId>,
    out: &mut impl Write,
) -> Fallible<()> {
    let item = ctx.app.move_item(&ctx.owner, item, parent)?;
    match item.parent_id {
        Some(parent) => writeln!(out, "Moved item {} under {parent}.", item.id)?,
        None => writeln!(out, "Moved item {} to the top level.", item.id)?,
    }
    Ok(())
}

pub fn delete<S: Store, C: Clock>(ctx: &mut Context<S, C>, item: ItemId, out: &mut impl Write) -> Fallible<()> {
    let plan = ctx.app.delete_item(&ctx.owner, item)?;
    writeln!(
        out,
        "Deleted {} items and {} cards.",
        plan.item_ids.len(),
        plan.card_ids.len()
    )?;
    Ok(())
}

pub fn tree<S: Store, C: Clock>(ctx: &Context<S, C>, deck: DeckId, json: bool, out: &mut impl Write) -> Fallible<()> {
    let tree = ctx.app.deck_tree(&ctx.owner, deck)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &tree)?;
        writeln!(out)?;
    } else if tree.is_empty() {
        writeln!(out, "The deck is empty.")?;
    } else {
        write_outline(&tree, out)?;
    }
    Ok(())
}

pub fn children<S: Store, C: Clock>(
    ctx: &Context<S, C>,
    deck: DeckId,
    parent: Option<ItemId>,
    out: &mut impl Write,
) -> Fallible<()> {
    for item in ctx.app.children(&ctx.owner, deck, parent)? {
        writeln!(out, "{}\t{}\torder {}", item.id, item.title, item.order)?;
    }
    Ok(())
}

pub fn path<S: Store, C: Clock>(ctx: &Context<S, C>, item: ItemId, out: &mut impl Write) -> Fallible<()> {
    let titles: Vec<String> = ctx
        .app
        .item_path(&ctx.owner, item)?
        .into_iter()
        .map(|item| item.title)
        .collect();
    writeln!(out, "{}", titles.join(" > "))?;
    Ok(())
}
