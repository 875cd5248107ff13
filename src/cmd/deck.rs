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
use treecards_core::public_id::PublicId;
use treecards_core::types::deck::Deck;
use treecards_core::types::ids::DeckId;

use crate::cmd::Context;
use crate::cmd::item::write_outline;

fn describe(deck: &Deck) -> String {
    match &deck.public_id {
        Some(public_id) if deck.is_public => {
            format!("{}\t{}\tpublic:{public_id}", deck.id, deck.title)
        }
        _ => format!("{}\t{}", deck.id, deck.title),
    }
}

pub fn create<S: Store, C: Clock>(ctx: &mut Context<S, C>, title: &str, out: &mut impl Write) -> Fallible<()> {
    let deck = ctx.app.create_deck(&ctx.owner, title)?;
    writeln!(out, "Created deck {}.", deck.id)?;
    Ok(())
}

pub fn list<S: Store, C: Clock>(ctx: &Context<S, C>, out: &mut impl Write) -> Fallible<()> {
    let decks = ctx.app.list_decks(&ctx.owner)?;
    if decks.is_empty() {
        writeln!(out, "No decks.")?;
    }
    for deck in decks {
        writeln!(out, "{}", describe(&deck))?;
    }
    Ok(())
}

pub fn rename<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    deck: DeckId,
    title: &str,
    out: &mut impl Write,
) -> Fallible<()> {
    let deck = ctx.app.rename_deck(&ctx.owner, deck, title)?;
    writeln!(out, "{}", describe(&deck))?;
    Ok(())
}

pub fn set_public<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    deck: DeckId,
    public: bool,
    out: &mut impl Write,
) -> Fallible<()> {
    let deck = ctx.app.set_deck_public(&ctx.owner, deck, public)?;
    match &deck.public_id {
        Some(public_id) => writeln!(out, "Deck {} is public as {public_id}.", deck.id)?,
        None => writeln!(out, "Deck {} is private.", deck.id)?,
    }
    Ok(())
}

pub fn show_public<S: Store, C: Clock>(
    ctx: &Context<S, C>,
    public_id: String,
    out: &mut impl Write,
) -> Fallible<()> {
    let public_id = PublicId::try_from(public_id.trim().to_uppercase())?;
    let (deck, tree) = ctx.app.public_deck(&public_id)?;
    writeln!(out, "{}", deck.title)?;
    write_outline(&tree, out)?;
    Ok(())
}

pub fn delete<S: Store, C: Clock>(ctx: &mut Context<S, C>, deck: DeckId, out: &mut impl Write) -> Fallible<()> {
    ctx.app.delete_deck(&ctx.owner, deck)?;
    writeln!(out, "Deleted deck {deck}.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use treecards_core::service::ItemDraft;

    use super::*;
    use crate::cmd::testing::context;
    use crate::cmd::testing::output;

    #[test]
    fn test_create_and_list() -> Fallible<()> {
        let mut ctx = context();
        let mut buf = Vec::new();
        list(&ctx, &mut buf)?;
        create(&mut ctx, "Biology", &mut buf)?;
        create(&mut ctx, "History", &mut buf)?;
        list(&ctx, &mut buf)?;
        let text = output(buf);
        assert!(text.starts_with("No decks.\n"));
        assert!(text.contains("Created deck 1.\n"));
        assert!(text.contains("1\tBiology\n2\tHistory\n"));
        Ok(())
    }

    #[test]
    fn test_publish_then_view() -> Fallible<()> {
        let mut ctx = context();
        let deck = ctx.app.create_deck(&ctx.owner, "Biology")?;
        ctx.app.create_item(
            &ctx.owner,
            deck.id,
            ItemDraft {
                title: "Cell".to_string(),
                parent: None,
                order: None,
            },
        )?;
        let mut buf = Vec::new();
        set_public(&mut ctx, deck.id, true, &mut buf)?;
        let public_id = ctx.app.deck(&ctx.owner, deck.id)?.public_id.unwrap();
        show_public(&ctx, public_id.as_str().to_lowercase(), &mut buf)?;
        let text = output(buf);
        assert!(text.contains(&format!("public as {public_id}")));
        assert!(text.ends_with("Biology\n- Cell\n"));
        Ok(())
    }

    #[test]
    fn test_unknown_deck() {
        let mut ctx = context();
        let mut buf = Vec::new();
        let result = delete(&mut ctx, DeckId::new(9), &mut buf);
        assert_eq!(result.unwrap_err().to_string(), "error: deck 9 not found");
    }
}
