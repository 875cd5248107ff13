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

use std::io::BufRead;
use std::io::Write;

use chrono::TimeDelta;
use treecards_core::Clock;
use treecards_core::Store;
use treecards_core::error::Fallible;
use treecards_core::queue::ReviewSession;
use treecards_core::queue::SessionLimits;
use treecards_core::queue::limit_session;
use treecards_core::service::DueRequest;
use treecards_core::srs::Quality;
use treecards_core::types::card::Card;
use treecards_core::types::ids::DeckId;
use treecards_core::types::ids::ItemId;
use treecards_core::types::timestamp::Timestamp;

use crate::cmd::Context;
use crate::cmd::card::summary;

#[derive(Clone, Debug, PartialEq)]
pub struct DueOptions {
    pub deck: Option<DeckId>,
    pub item: Option<ItemId>,
    pub include_all: bool,
    pub include_tree_cards: bool,
    pub card_limit: Option<usize>,
    pub shuffle: bool,
}

impl DueOptions {
    fn request(&self) -> DueRequest {
        DueRequest {
            deck: self.deck,
            item: self.item,
            include_all: self.include_all,
            include_tree_cards: self.include_tree_cards,
        }
    }
}

/// "overdue 2d", "due in 3h", "due now".
fn relative_due(due: Timestamp, now: Timestamp) -> String {
    let delta: TimeDelta = due.into_inner() - now.into_inner();
    let (prefix, delta) = if delta < TimeDelta::zero() {
        ("overdue", -delta)
    } else {
        ("due in", delta)
    };
    if delta.num_days() > 0 {
        format!("{prefix} {}d", delta.num_days())
    } else if delta.num_hours() > 0 {
        format!("{prefix} {}h", delta.num_hours())
    } else {
        "due now".to_string()
    }
}

pub fn list_due<S: Store, C: Clock>(
    ctx: &Context<S, C>,
    options: &DueOptions,
    json: bool,
    out: &mut impl Write,
) -> Fallible<()> {
    let cards = ctx.app.due_cards(&ctx.owner, &options.request())?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &cards)?;
        writeln!(out)?;
        return Ok(());
    }
    if cards.is_empty() {
        writeln!(out, "No cards due today.")?;
        return Ok(());
    }
    let now = ctx.app.now();
    for card in &cards {
        writeln!(out, "{}\t{}", summary(card), relative_due(card.srs.due_date, now))?;
    }
    writeln!(out, "{} cards due.", cards.len())?;
    Ok(())
}

/// Read one trimmed line. `None` at end of input.
fn prompt(input: &mut impl BufRead, out: &mut impl Write, text: &str) -> Fallible<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn is_quit(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("q")
}

fn ask_quality(input: &mut impl BufRead, out: &mut impl Write) -> Fallible<Option<Quality>> {
    loop {
        let Some(answer) = prompt(input, out, "Grade [0 again, 1 hard, 2 good, 3 easy]: ")? else {
            return Ok(None);
        };
        if is_quit(&answer) {
            return Ok(None);
        }
        match Quality::try_from(answer.as_str()) {
            Ok(quality) => return Ok(Some(quality)),
            Err(e) => writeln!(out, "{e}")?,
        }
    }
}

fn breadcrumbs<S: Store, C: Clock>(ctx: &Context<S, C>, card: &Card) -> Fallible<String> {
    let titles: Vec<String> = ctx
        .app
        .item_path(&ctx.owner, card.item_id)?
        .into_iter()
        .map(|item| item.title)
        .collect();
    Ok(titles.join(" > "))
}

/// Drill the due cards in the terminal. Every answer is persisted before
/// the next card is shown, so quitting early loses nothing.
pub fn run_review<S: Store, C: Clock>(
    ctx: &mut Context<S, C>,
    options: &DueOptions,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Fallible<()> {
    let cards = ctx.app.due_cards(&ctx.owner, &options.request())?;
    let limits = SessionLimits {
        card_limit: options.card_limit,
        shuffle_seed: options.shuffle.then(|| ctx.app.now().millis() as u64),
    };
    let cards = limit_session(cards, &limits);
    if cards.is_empty() {
        writeln!(out, "No cards due today.")?;
        return Ok(());
    }
    log::debug!("Starting a session with {} cards", cards.len());

    let mut session = ReviewSession::new(cards, ctx.config.requeue_policy());
    while let Some(card) = session.current().cloned() {
        writeln!(
            out,
            "\n[{} left] {}",
            session.remaining(),
            breadcrumbs(ctx, &card)?
        )?;
        writeln!(out, "{}", card.front)?;
        let Some(answer) = prompt(input, out, "Press Enter to reveal, q to quit: ")? else {
            break;
        };
        if is_quit(&answer) {
            break;
        }
        writeln!(out, "{}", card.back)?;
        let Some(quality) = ask_quality(input, out)? else {
            break;
        };
        let graded = ctx.app.submit_review(&ctx.owner, card.id, quality)?;
        session.answer(graded, quality);
    }
    writeln!(
        out,
        "\nReviewed {} times; {} of {} cards left.",
        session.reviews(),
        session.remaining(),
        session.total_cards()
    )?;
    Ok(())
}
