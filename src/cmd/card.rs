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

use std::collections::BTreeSet;
use std::io::Write;

use treecards_core::Clock;
use treecards_core::Store;
use treecards_core::error::Fallible;
use treecards_core::error::fail;
use treecards_core::service::CardDraft;
use treecards_core::service::CardUpdate;
use treecards_core::types::card::Card;
use treecards_core::types::ids::CardId;
use treecards_core::types::ids::DeckId;
use treecards_core::types::ids::ItemId;

use crate::cmd::Context;

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

pub(crate) fn summary(card: &Card) -> String {
    let kind = if card.is_tree_generated { "tree" } else { "card" };
    format!(
        "{}\t{kind}\t{}\tdue {}",
        card.id,
        first_line(&card.front),
        card.srs.due_date
    )
}

pub fn add<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    item: ItemId,
    front: String,
    back: String,
    tags: Vec<String>,
    out: &mut impl Write,
) -> Fallible<()> {
    let draft = CardDraft {
        front,
        back,
        tags: tags.into_iter().collect(),
        ..CardDraft::default()
    };
    let card = ctx.app.create_card(&ctx.owner, item, draft)?;
    writeln!(out, "Created card {}.", card.id)?;
    Ok(())
}

pub fn list<S: Store, C: Clock>(
    ctx: &Context<S, C>,
    item: Option<ItemId>,
    deck: Option<DeckId>,
    out: &mut impl Write,
) -> Fallible<()> {
    let cards = match (item, deck) {
        (Some(item), _) => ctx.app.item_cards(&ctx.owner, item)?,
        (None, Some(deck)) => ctx.app.deck_cards(&ctx.owner, deck)?,
        (None, None) => return fail("either an item or a deck is required"),
    };
    for card in cards {
        writeln!(out, "{}", summary(&card))?;
    }
    Ok(())
}

pub fn show<S: Store, C: Clock>(ctx: &Context<S, C>, card: CardId, out: &mut impl Write) -> Fallible<()> {
    let card = ctx.app.card(&ctx.owner, card)?;
    writeln!(out, "Front:\n{}\n", card.front)?;
    writeln!(out, "Back:\n{}\n", card.back)?;
    if !card.tags.is_empty() {
        let tags: Vec<&str> = card.tags.iter().map(String::as_str).collect();
        writeln!(out, "Tags: {}", tags.join(", "))?;
    }
    writeln!(
        out,
        "Interval: {} days, ease {:.2}, repetitions {}, due {}",
        card.srs.interval, card.srs.ease_factor, card.srs.repetitions, card.srs.due_date
    )?;
    Ok(())
}

pub fn edit<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    card: CardId,
    front: Option<String>,
    back: Option<String>,
    tags: Option<Vec<String>>,
    out: &mut impl Write,
) -> Fallible<()> {
    let update = CardUpdate {
        front,
        back,
        tags: tags.map(|tags| tags.into_iter().collect::<BTreeSet<String>>()),
        ..CardUpdate::default()
    };
    let card = ctx.app.update_card(&ctx.owner, card, update)?;
    writeln!(out, "{}", summary(&card))?;
    Ok(())
}

pub fn delete<S: Store, C: Clock>(ctx: &mut Context<S, C>, card: CardId, out: &mut impl Write) -> Fallible<()> {
    ctx.app.delete_card(&ctx.owner, card)?;
    writeln!(out, "Deleted card {card}.")?;
    Ok(())
}
