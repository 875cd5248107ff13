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

use std::io::stdin;
use std::io::stdout;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use treecards_core::error::Fallible;
use treecards_core::types::ids::CardId;
use treecards_core::types::ids::DeckId;
use treecards_core::types::ids::ItemId;

use crate::cmd::Context;
use crate::cmd::card;
use crate::cmd::check::check_deck;
use crate::cmd::deck;
use crate::cmd::generate;
use crate::cmd::item;
use crate::cmd::review::DueOptions;
use crate::cmd::review::list_due;
use crate::cmd::review::run_review;
use crate::cmd::transfer::export_deck;
use crate::cmd::transfer::import_deck;
use crate::config::Config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file. By default, `treecards.toml` in the current directory is used if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the database. Overrides the configuration file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Whose decks to work with.
    #[arg(long, global = true, default_value = "local")]
    owner: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Commands relating to decks.
    Deck {
        #[command(subcommand)]
        command: DeckCommand,
    },
    /// Commands relating to the topic tree of a deck.
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },
    /// Commands relating to cards.
    Card {
        #[command(subcommand)]
        command: CardCommand,
    },
    /// Generate cards that summarize a node's children.
    Generate {
        #[command(subcommand)]
        command: GenerateCommand,
    },
    /// List the cards due today.
    Due {
        #[command(flatten)]
        options: DueArgs,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Review the cards due today in the terminal.
    Review {
        #[command(flatten)]
        options: DueArgs,
        /// Maximum number of cards to review in a session. By default, all due cards are reviewed.
        #[arg(long)]
        card_limit: Option<usize>,
        /// Shuffle the cards before the session starts.
        #[arg(long)]
        shuffle: Option<bool>,
    },
    /// Export a deck to JSON.
    Export {
        deck: DeckId,
        /// Output file or directory. By default, the output is printed to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import a deck from a JSON export.
    Import {
        /// Path to the JSON file.
        file: PathBuf,
    },
    /// Check the integrity of a deck's tree.
    Check { deck: DeckId },
}

#[derive(clap::Args)]
struct DueArgs {
    /// Only cards from this deck.
    #[arg(long)]
    deck: Option<DeckId>,
    /// Only cards from this item's subtree.
    #[arg(long)]
    item: Option<ItemId>,
    /// Ignore due dates and take every card in scope.
    #[arg(long)]
    all: bool,
    /// Whether generated tree cards are included. Defaults to the configuration.
    #[arg(long)]
    tree_cards: Option<bool>,
}

#[derive(Subcommand)]
enum DeckCommand {
    /// Create a new deck.
    Create { title: String },
    /// List your decks.
    List,
    /// Rename a deck.
    Rename { deck: DeckId, title: String },
    /// Make a deck public and print its public id.
    Publish { deck: DeckId },
    /// Make a deck private again.
    Unpublish { deck: DeckId },
    /// Show a public deck by its public id.
    Public { public_id: String },
    /// Delete a deck with all its items and cards.
    Delete { deck: DeckId },
}

#[derive(Subcommand)]
enum ItemCommand {
    /// Add an item to a deck.
    Add {
        deck: DeckId,
        title: String,
        /// Parent item. By default, the item is added as a root.
        #[arg(long)]
        parent: Option<ItemId>,
        /// Position among siblings. By default, the item goes last.
        #[arg(long)]
        order: Option<i64>,
    },
    /// Change an item's title or sibling order.
    Edit {
        item: ItemId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        order: Option<i64>,
    },
    /// Move an item, with its subtree, under another parent.
    Move {
        item: ItemId,
        /// New parent. Omit to make the item a root.
        #[arg(long)]
        parent: Option<ItemId>,
    },
    /// Delete an item, its descendants, and their cards.
    Delete { item: ItemId },
    /// Print the tree of a deck.
    Tree {
        deck: DeckId,
        /// Print JSON instead of an outline.
        #[arg(long)]
        json: bool,
    },
    /// List the children of an item, or the roots of a deck.
    Children {
        deck: DeckId,
        #[arg(long)]
        parent: Option<ItemId>,
    },
    /// Print the path from the root to an item.
    Path { item: ItemId },
}

#[derive(Subcommand)]
enum CardCommand {
    /// Add a card to a leaf item.
    Add {
        item: ItemId,
        #[arg(long)]
        front: String,
        #[arg(long)]
        back: String,
        /// A tag. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List the cards of an item or of a whole deck.
    List {
        #[arg(long, conflicts_with = "deck", required_unless_present = "deck")]
        item: Option<ItemId>,
        #[arg(long)]
        deck: Option<DeckId>,
    },
    /// Show a card with its schedule.
    Show { card: CardId },
    /// Edit a card. Blank values leave a field unchanged.
    Edit {
        card: CardId,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
        /// Replace the tags. May be repeated.
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },
    /// Delete a card.
    Delete { card: CardId },
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate cards for every node with children in a deck.
    Deck {
        deck: DeckId,
        /// Only generate inside this item's subtree.
        #[arg(long)]
        root: Option<ItemId>,
    },
    /// Generate the card of a single item.
    Item {
        item: ItemId,
        /// Replace an existing generated card.
        #[arg(long)]
        overwrite: bool,
    },
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let mut ctx = Context::open(config, cli.db, cli.owner)?;
    let mut out = stdout().lock();
    match cli.command {
        Command::Deck { command } => match command {
            DeckCommand::Create { title } => deck::create(&mut ctx, &title, &mut out),
            DeckCommand::List => deck::list(&ctx, &mut out),
            DeckCommand::Rename { deck, title } => deck::rename(&mut ctx, deck, &title, &mut out),
            DeckCommand::Publish { deck } => deck::set_public(&mut ctx, deck, true, &mut out),
            DeckCommand::Unpublish { deck } => deck::set_public(&mut ctx, deck, false, &mut out),
            DeckCommand::Public { public_id } => deck::show_public(&ctx, public_id, &mut out),
            DeckCommand::Delete { deck } => deck::delete(&mut ctx, deck, &mut out),
        },
        Command::Item { command } => match command {
            ItemCommand::Add {
                deck,
                title,
                parent,
                order,
            } => item::add(&mut ctx, deck, title, parent, order, &mut out),
            ItemCommand::Edit { item, title, order } => item::edit(&mut ctx, item, title, order, &mut out),
            ItemCommand::Move { item, parent } => item::move_to(&mut ctx, item, parent, &mut out),
            ItemCommand::Delete { item } => item::delete(&mut ctx, item, &mut out),
            ItemCommand::Tree { deck, json } => item::tree(&ctx, deck, json, &mut out),
            ItemCommand::Children { deck, parent } => item::children(&ctx, deck, parent, &mut out),
            ItemCommand::Path { item } => item::path(&ctx, item, &mut out),
        },
        Command::Card { command } => match command {
            CardCommand::Add {
                item,
                front,
                back,
                tags,
            } => card::add(&mut ctx, item, front, back, tags, &mut out),
            CardCommand::List { item, deck } => card::list(&ctx, item, deck, &mut out),
            CardCommand::Show { card } => card::show(&ctx, card, &mut out),
            CardCommand::Edit {
                card,
                front,
                back,
                tags,
            } => card::edit(&mut ctx, card, front, back, tags, &mut out),
            CardCommand::Delete { card } => card::delete(&mut ctx, card, &mut out),
        },
        Command::Generate { command } => match command {
            GenerateCommand::Deck { deck, root } => generate::deck(&mut ctx, deck, root, &mut out),
            GenerateCommand::Item { item, overwrite } => generate::item(&mut ctx, item, overwrite, &mut out),
        },
        Command::Due { options, json } => {
            let options = options.into_options(&ctx);
            list_due(&ctx, &options, json, &mut out)
        }
        Command::Review {
            options,
            card_limit,
            shuffle,
        } => {
            let mut options = options.into_options(&ctx);
            options.card_limit = card_limit.or(ctx.config.session.card_limit);
            options.shuffle = shuffle.unwrap_or(ctx.config.session.shuffle);
            run_review(&mut ctx, &options, &mut stdin().lock(), &mut out)
        }
        Command::Export { deck, output } => export_deck(&ctx, deck, output.as_deref(), &mut out),
        Command::Import { file } => import_deck(&mut ctx, &file, &mut out),
        Command::Check { deck } => check_deck(&ctx, deck, &mut out),
    }
}

impl DueArgs {
    fn into_options<S, C>(self, ctx: &Context<S, C>) -> DueOptions {
        DueOptions {
            deck: self.deck,
            item: self.item,
            include_all: self.all,
            include_tree_cards: self.tree_cards.unwrap_or(ctx.config.session.include_tree_cards),
            card_limit: None,
            shuffle: false,
        }
    }
}
