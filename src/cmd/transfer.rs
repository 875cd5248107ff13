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

use std::fs::read_to_string;
use std::fs::write;
use std::io::Write;
use std::path::Path;

use treecards_core::Clock;
use treecards_core::Store;
use treecards_core::error::Fallible;
use treecards_core::snapshot::DeckSnapshot;
use treecards_core::snapshot::export_file_name;
use treecards_core::types::ids::DeckId;

use crate::cmd::Context;

/// Export a deck. A directory as `output` receives a file named after the
/// deck.
pub fn export_deck<S: Store, C: Clock>(
    ctx: &Context<S, C>,
    deck: DeckId,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Fallible<()> {
    let snapshot = ctx.app.export_deck(&ctx.owner, deck)?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    match output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(export_file_name(&snapshot.deck.title))
            } else {
                path.to_path_buf()
            };
            write(&path, json)?;
            writeln!(
                out,
                "Exported {} items and {} cards to {}.",
                snapshot.items.len(),
                snapshot.cards.len(),
                path.display()
            )?;
        }
        None => writeln!(out, "{json}")?,
    }
    Ok(())
}

pub fn import_deck<S: Store, C: Clock>(ctx: &mut Context<S, C>, file: &Path, out: &mut impl Write) -> Fallible<()> {
    let snapshot: DeckSnapshot = serde_json::from_str(&read_to_string(file)?)?;
    let report = ctx.app.import_deck(&ctx.owner, &snapshot)?;
    writeln!(
        out,
        "Imported deck {} '{}': {} items, {} cards.",
        report.deck.id, report.deck.title, report.items, report.imported
    )?;
    for skipped in &report.skipped {
        writeln!(out, "Skipped '{}': {}", skipped.front, skipped.reason)?;
    }
    for failure in &report.failed {
        writeln!(out, "Failed: {}", failure.reason)?;
    }
    Ok(())
}
