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
use treecards_core::types::ids::DeckId;
use treecards_core::types::ids::ItemId;

use crate::cmd::Context;

pub fn deck<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    deck: DeckId,
    root: Option<ItemId>,
    out: &mut impl Write,
) -> Fallible<()> {
    let report = ctx.app.generate_tree_cards(&ctx.owner, deck, root)?;
    for card in &report.created {
        writeln!(out, "Created card {} for '{}'.", card.id, card.front)?;
    }
    for node in &report.skipped {
        writeln!(
            out,
            "Skipped '{}': card {} already exists.",
            node.title, node.existing_card
        )?;
    }
    for failure in &report.failed {
        writeln!(out, "Failed: {}", failure.reason)?;
    }
    writeln!(
        out,
        "{} created, {} skipped, {} failed.",
        report.created.len(),
        report.skipped.len(),
        report.failed.len()
    )?;
    Ok(())
}

pub fn item<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    item: ItemId,
    overwrite: bool,
    out: &mut impl Write,
) -> Fallible<()> {
    let outcome = ctx.app.generate_item_card(&ctx.owner, item, overwrite)?;
    let verb = if outcome.overwritten { "Updated" } else { "Created" };
    writeln!(
        out,
        "{verb} card {} listing {} children.",
        outcome.card.id,
        outcome.children.len()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use treecards_core::service::ItemDraft;

    use super::*;
    use crate::cmd::testing::TestContext;
    use crate::cmd::testing::context;
    use crate::cmd::testing::output;

    fn seeded() -> Fallible<(TestContext, DeckId, ItemId)> {
        let mut ctx = context();
        let deck = ctx.app.create_deck(&ctx.owner, "Chemistry")?.id;
        let add = |ctx: &mut TestContext, title: &str, parent| {
            ctx.app.create_item(
                &ctx.owner,
                deck,
                ItemDraft {
                    title: title.to_string(),
                    parent,
                    order: None,
                },
            )
        };
        let metals = add(&mut ctx, "Metals", None)?.id;
        add(&mut ctx, "Iron", Some(metals))?;
        add(&mut ctx, "Copper", Some(metals))?;
        Ok((ctx, deck, metals))
    }

    #[test]
    fn test_generate_twice() -> Fallible<()> {
        let (mut ctx, deck_id, metals) = seeded()?;
        let mut buf = Vec::new();
        item(&mut ctx, metals, false, &mut buf)?;
        deck(&mut ctx, deck_id, None, &mut buf)?;
        let text = output(buf);
        assert!(text.starts_with("Created card 5 listing 2 children.\n"));
        assert!(text.contains("Skipped 'Metals': card 5 already exists.\n"));
        assert!(text.ends_with("0 created, 1 skipped, 0 failed.\n"));
        let again = item(&mut ctx, metals, false, &mut Vec::new());
        assert!(again.is_err());
        Ok(())
    }

    #[test]
    fn test_overwrite() -> Fallible<()> {
        let (mut ctx, _, metals) = seeded()?;
        let mut buf = Vec::new();
        item(&mut ctx, metals, false, &mut buf)?;
        item(&mut ctx, metals, true, &mut buf)?;
        assert!(output(buf).ends_with("Updated card 5 listing 2 children.\n"));
        Ok(())
    }
}
