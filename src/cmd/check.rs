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
use treecards_core::error::fail;
use treecards_core::types::ids::DeckId;

use crate::cmd::Context;

/// Report items whose parent is missing and items whose level disagrees
/// with their depth.
pub fn check_deck<S: Store, C: Clock>(ctx: &Context<S, C>, deck: DeckId, out: &mut impl Write) -> Fallible<()> {
    let check = ctx.app.check_deck(&ctx.owner, deck)?;
    if check.is_clean() {
        writeln!(out, "No problems found.")?;
        return Ok(());
    }
    for item in &check.orphans {
        let parent = item.parent_id.map(|p| p.to_string()).unwrap_or_default();
        writeln!(
            out,
            "Orphan: item {} '{}' points at missing parent {parent}.",
            item.id, item.title
        )?;
    }
    for item in &check.misleveled {
        writeln!(
            out,
            "Level mismatch: item {} '{}' has level {}.",
            item.id, item.title, item.level
        )?;
    }
    fail(format!(
        "{} orphans and {} level mismatches.",
        check.orphans.len(),
        check.misleveled.len()
    ))
}
