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

//! A SQLite implementation of the storage collaborator.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Serialize;
use serde::de::DeserializeOwned;
use treecards_core::error::CoreError;
use treecards_core::error::CoreResult;
use treecards_core::mutator::CascadeDelete;
use treecards_core::public_id::PublicId;
use treecards_core::srs::SrsState;
use treecards_core::store::BatchInsertReport;
use treecards_core::store::CardScope;
use treecards_core::store::FailedInsert;
use treecards_core::store::Store;
use treecards_core::types::card::Card;
use treecards_core::types::card::NewCard;
use treecards_core::types::deck::Deck;
use treecards_core::types::deck::NewDeck;
use treecards_core::types::ids::CardId;
use treecards_core::types::ids::DeckId;
use treecards_core::types::ids::ItemId;
use treecards_core::types::ids::OwnerId;
use treecards_core::types::item::Item;
use treecards_core::types::item::NewItem;
use treecards_core::types::timestamp::Timestamp;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS decks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        owner_id TEXT NOT NULL,
        is_public INTEGER NOT NULL DEFAULT 0,
        public_id TEXT UNIQUE,
        audios TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        deck_id INTEGER NOT NULL,
        parent_id INTEGER,
        title TEXT NOT NULL,
        ord INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 0,
        owner_id TEXT NOT NULL,
        FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL,
        deck_id INTEGER NOT NULL,
        front TEXT NOT NULL,
        back TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        front_media TEXT NOT NULL DEFAULT '[]',
        back_media TEXT NOT NULL DEFAULT '[]',
        is_tree_generated INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        interval REAL NOT NULL,
        ease_factor REAL NOT NULL,
        repetitions INTEGER NOT NULL,
        due_date TEXT NOT NULL,
        FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE,
        FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_decks_owner ON decks(owner_id);
    CREATE INDEX IF NOT EXISTS idx_items_deck ON items(deck_id);
    CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_id);
    CREATE INDEX IF NOT EXISTS idx_cards_item ON cards(item_id);
    CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
    CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(due_date);
"#;

const DECK_COLUMNS: &str = "id, title, owner_id, is_public, public_id, audios, created_at";

const ITEM_COLUMNS: &str = "id, deck_id, parent_id, title, ord, level, owner_id";

const CARD_COLUMNS: &str = "id, item_id, deck_id, front, back, tags, front_media, back_media, \
     is_tree_generated, created_at, interval, ease_factor, repetitions, due_date";

trait OrStorage<T> {
    fn or_storage(self) -> CoreResult<T>;
}

impl<T> OrStorage<T> for rusqlite::Result<T> {
    fn or_storage(self) -> CoreResult<T> {
        self.map_err(CoreError::storage)
    }
}

fn to_json<T: Serialize>(value: &T) -> CoreResult<String> {
    serde_json::to_string(value).map_err(CoreError::storage)
}

fn from_json<T: DeserializeOwned>(text: &str) -> CoreResult<T> {
    serde_json::from_str(text).map_err(CoreError::storage)
}

/// Raw column values, converted into domain types outside of rusqlite's
/// row callbacks.
struct DeckRow {
    id: i64,
    title: String,
    owner_id: String,
    is_public: bool,
    public_id: Option<String>,
    audios: String,
    created_at: String,
}

impl DeckRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            owner_id: row.get(2)?,
            is_public: row.get(3)?,
            public_id: row.get(4)?,
            audios: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_deck(self) -> CoreResult<Deck> {
        Ok(Deck {
            id: DeckId::new(self.id),
            title: self.title,
            owner_id: OwnerId::new(self.owner_id),
            is_public: self.is_public,
            public_id: self.public_id.map(PublicId::try_from).transpose()?,
            audios: from_json(&self.audios)?,
            created_at: Timestamp::try_from(self.created_at)?,
        })
    }
}

fn read_item(row: &Row) -> rusqlite::Result<Item> {
    let level: i64 = row.get(5)?;
    Ok(Item {
        id: ItemId::new(row.get(0)?),
        deck_id: DeckId::new(row.get(1)?),
        parent_id: row.get::<_, Option<i64>>(2)?.map(ItemId::new),
        title: row.get(3)?,
        order: row.get(4)?,
        level: level.max(0) as u32,
        owner_id: OwnerId::new(row.get::<_, String>(6)?),
    })
}

struct CardRow {
    id: i64,
    item_id: i64,
    deck_id: i64,
    front: String,
    back: String,
    tags: String,
    front_media: String,
    back_media: String,
    is_tree_generated: bool,
    created_at: String,
    interval: f64,
    ease_factor: f64,
    repetitions: i64,
    due_date: String,
}

impl CardRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            item_id: row.get(1)?,
            deck_id: row.get(2)?,
            front: row.get(3)?,
            back: row.get(4)?,
            tags: row.get(5)?,
            front_media: row.get(6)?,
            back_media: row.get(7)?,
            is_tree_generated: row.get(8)?,
            created_at: row.get(9)?,
            interval: row.get(10)?,
            ease_factor: row.get(11)?,
            repetitions: row.get(12)?,
            due_date: row.get(13)?,
        })
    }

    fn into_card(self) -> CoreResult<Card> {
        Ok(Card {
            id: CardId::new(self.id),
            item_id: ItemId::new(self.item_id),
            deck_id: DeckId::new(self.deck_id),
            front: self.front,
            back: self.back,
            tags: from_json(&self.tags)?,
            front_media: from_json(&self.front_media)?,
            back_media: from_json(&self.back_media)?,
            is_tree_generated: self.is_tree_generated,
            created_at: Timestamp::try_from(self.created_at)?,
            srs: SrsState {
                interval: self.interval,
                ease_factor: self.ease_factor,
                repetitions: self.repetitions.max(0) as u32,
                due_date: Timestamp::try_from(self.due_date)?,
            },
        })
    }
}

fn insert_card_row(conn: &Connection, card: NewCard) -> CoreResult<Card> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM items WHERE id = ?1",
            params![card.item_id.get()],
            |row| row.get(0),
        )
        .optional()
        .or_storage()?;
    if exists.is_none() {
        return Err(CoreError::not_found(format!("item {}", card.item_id)));
    }
    let srs = SrsState::new(card.created_at);
    conn.execute(
        "INSERT INTO cards (item_id, deck_id, front, back, tags, front_media, back_media, \
         is_tree_generated, created_at, interval, ease_factor, repetitions, due_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            card.item_id.get(),
            card.deck_id.get(),
            card.front,
            card.back,
            to_json(&card.tags)?,
            to_json(&card.front_media)?,
            to_json(&card.back_media)?,
            card.is_tree_generated,
            card.created_at.to_string(),
            srs.interval,
            srs.ease_factor,
            srs.repetitions as i64,
            srs.due_date.to_string(),
        ],
    )
    .or_storage()?;
    Ok(card.with_id(CardId::new(conn.last_insert_rowid())))
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> CoreResult<Self> {
        log::debug!("Opening database at {}", path.display());
        Self::init(Connection::open(path).or_storage()?)
    }

    pub fn open_in_memory() -> CoreResult<Self> {
        Self::init(Connection::open_in_memory().or_storage()?)
    }

    fn init(conn: Connection) -> CoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;").or_storage()?;
        conn.execute_batch(SCHEMA).or_storage()?;
        Ok(Self { conn })
    }

    fn query_decks(&self, sql: &str, param: &dyn rusqlite::ToSql) -> CoreResult<Vec<Deck>> {
        let mut stmt = self.conn.prepare(sql).or_storage()?;
        let rows = stmt
            .query_map([param], DeckRow::read)
            .or_storage()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .or_storage()?;
        rows.into_iter().map(DeckRow::into_deck).collect()
    }

    fn query_cards(&self, sql: &str, param: i64) -> CoreResult<Vec<Card>> {
        let mut stmt = self.conn.prepare_cached(sql).or_storage()?;
        let rows = stmt
            .query_map([param], CardRow::read)
            .or_storage()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .or_storage()?;
        rows.into_iter().map(CardRow::into_card).collect()
    }
}

impl Store for Database {
    fn load_deck(&self, id: DeckId) -> CoreResult<Option<Deck>> {
        let sql = format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1");
        Ok(self.query_decks(&sql, &id.get())?.into_iter().next())
    }

    fn load_decks(&self, owner: &OwnerId) -> CoreResult<Vec<Deck>> {
        let sql = format!("SELECT {DECK_COLUMNS} FROM decks WHERE owner_id = ?1 ORDER BY id");
        self.query_decks(&sql, &owner.as_str())
    }

    fn find_deck_by_public_id(&self, public_id: &PublicId) -> CoreResult<Option<Deck>> {
        let sql = format!("SELECT {DECK_COLUMNS} FROM decks WHERE public_id = ?1");
        Ok(self
            .query_decks(&sql, &public_id.as_str())?
            .into_iter()
            .next())
    }

    fn insert_deck(&mut self, deck: NewDeck) -> CoreResult<Deck> {
        self.conn
            .execute(
                "INSERT INTO decks (title, owner_id, created_at) VALUES (?1, ?2, ?3)",
                params![deck.title, deck.owner_id.as_str(), deck.created_at.to_string()],
            )
            .or_storage()?;
        Ok(deck.with_id(DeckId::new(self.conn.last_insert_rowid())))
    }

    fn save_deck(&mut self, deck: &Deck) -> CoreResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE decks SET title = ?2, is_public = ?3, public_id = ?4, audios = ?5 WHERE id = ?1",
                params![
                    deck.id.get(),
                    deck.title,
                    deck.is_public,
                    deck.public_id.as_ref().map(PublicId::as_str),
                    to_json(&deck.audios)?,
                ],
            )
            .or_storage()?;
        if changed == 0 {
            return Err(CoreError::not_found(format!("deck {}", deck.id)));
        }
        Ok(())
    }

    fn delete_deck(&mut self, id: DeckId) -> CoreResult<()> {
        let tx = self.conn.transaction().or_storage()?;
        tx.execute("DELETE FROM cards WHERE deck_id = ?1", params![id.get()])
            .or_storage()?;
        tx.execute("DELETE FROM items WHERE deck_id = ?1", params![id.get()])
            .or_storage()?;
        tx.execute("DELETE FROM decks WHERE id = ?1", params![id.get()])
            .or_storage()?;
        tx.commit().or_storage()
    }

    fn load_items(&self, deck: DeckId) -> CoreResult<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE deck_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql).or_storage()?;
        stmt.query_map(params![deck.get()], read_item)
            .or_storage()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .or_storage()
    }

    fn load_item(&self, id: ItemId) -> CoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id.get()], read_item)
            .optional()
            .or_storage()
    }

    fn insert_item(&mut self, item: NewItem) -> CoreResult<Item> {
        if self.load_deck(item.deck_id)?.is_none() {
            return Err(CoreError::not_found(format!("deck {}", item.deck_id)));
        }
        self.conn
            .execute(
                "INSERT INTO items (deck_id, parent_id, title, ord, level, owner_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    item.deck_id.get(),
                    item.parent_id.map(ItemId::get),
                    item.title,
                    item.order,
                    item.level,
                    item.owner_id.as_str(),
                ],
            )
            .or_storage()?;
        Ok(item.with_id(ItemId::new(self.conn.last_insert_rowid())))
    }

    fn save_items(&mut self, items: &[Item]) -> CoreResult<()> {
        let tx = self.conn.transaction().or_storage()?;
        for item in items {
            let changed = tx
                .execute(
                    "UPDATE items SET parent_id = ?2, title = ?3, ord = ?4, level = ?5 WHERE id = ?1",
                    params![
                        item.id.get(),
                        item.parent_id.map(ItemId::get),
                        item.title,
                        item.order,
                        item.level,
                    ],
                )
                .or_storage()?;
            if changed == 0 {
                return Err(CoreError::not_found(format!("item {}", item.id)));
            }
        }
        tx.commit().or_storage()
    }

    fn delete_items(&mut self, ids: &BTreeSet<ItemId>) -> CoreResult<()> {
        let tx = self.conn.transaction().or_storage()?;
        {
            let mut stmt = tx.prepare("DELETE FROM items WHERE id = ?1").or_storage()?;
            for id in ids {
                stmt.execute(params![id.get()]).or_storage()?;
            }
        }
        tx.commit().or_storage()
    }

    fn load_cards(&self, scope: &CardScope) -> CoreResult<Vec<Card>> {
        let by_item = format!("SELECT {CARD_COLUMNS} FROM cards WHERE item_id = ?1 ORDER BY id");
        let mut cards = match scope {
            CardScope::Item(id) => self.query_cards(&by_item, id.get())?,
            CardScope::Items(ids) => {
                let mut cards = Vec::new();
                for id in ids {
                    cards.extend(self.query_cards(&by_item, id.get())?);
                }
                cards
            }
            CardScope::Deck(id) => {
                let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY id");
                self.query_cards(&sql, id.get())?
            }
        };
        cards.sort_by_key(|card| card.id);
        Ok(cards)
    }

    fn load_card(&self, id: CardId) -> CoreResult<Option<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1");
        Ok(self.query_cards(&sql, id.get())?.into_iter().next())
    }

    fn insert_card(&mut self, card: NewCard) -> CoreResult<Card> {
        insert_card_row(&self.conn, card)
    }

    fn save_card(&mut self, card: &Card) -> CoreResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE cards SET front = ?2, back = ?3, tags = ?4, front_media = ?5, back_media = ?6, \
                 is_tree_generated = ?7, interval = ?8, ease_factor = ?9, repetitions = ?10, \
                 due_date = ?11 WHERE id = ?1",
                params![
                    card.id.get(),
                    card.front,
                    card.back,
                    to_json(&card.tags)?,
                    to_json(&card.front_media)?,
                    to_json(&card.back_media)?,
                    card.is_tree_generated,
                    card.srs.interval,
                    card.srs.ease_factor,
                    card.srs.repetitions as i64,
                    card.srs.due_date.to_string(),
                ],
            )
            .or_storage()?;
        if changed == 0 {
            return Err(CoreError::not_found(format!("card {}", card.id)));
        }
        Ok(())
    }

    fn delete_cards(&mut self, ids: &BTreeSet<CardId>) -> CoreResult<()> {
        let tx = self.conn.transaction().or_storage()?;
        {
            let mut stmt = tx.prepare("DELETE FROM cards WHERE id = ?1").or_storage()?;
            for id in ids {
                stmt.execute(params![id.get()]).or_storage()?;
            }
        }
        tx.commit().or_storage()
    }

    /// Each card gets its own savepoint, so a failing card is rolled back
    /// alone and the rest of the batch commits together.
    fn insert_cards(&mut self, cards: Vec<NewCard>) -> CoreResult<BatchInsertReport> {
        let mut report = BatchInsertReport::default();
        let mut tx = self.conn.transaction().or_storage()?;
        for (index, card) in cards.into_iter().enumerate() {
            let sp = tx.savepoint().or_storage()?;
            match insert_card_row(&sp, card) {
                Ok(card) => {
                    sp.commit().or_storage()?;
                    report.inserted.push(card);
                }
                Err(e) => {
                    drop(sp);
                    log::warn!("Failed to insert card #{index}: {e}");
                    report.failed.push(FailedInsert {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        tx.commit().or_storage()?;
        Ok(report)
    }

    fn delete_subtree(&mut self, plan: &CascadeDelete) -> CoreResult<()> {
        let tx = self.conn.transaction().or_storage()?;
        {
            let mut cards = tx.prepare("DELETE FROM cards WHERE id = ?1").or_storage()?;
            for id in &plan.card_ids {
                cards.execute(params![id.get()]).or_storage()?;
            }
            let mut by_item = tx
                .prepare("DELETE FROM cards WHERE item_id = ?1")
                .or_storage()?;
            let mut items = tx.prepare("DELETE FROM items WHERE id = ?1").or_storage()?;
            for id in &plan.item_ids {
                by_item.execute(params![id.get()]).or_storage()?;
                items.execute(params![id.get()]).or_storage()?;
            }
        }
        tx.commit().or_storage()
    }
}
