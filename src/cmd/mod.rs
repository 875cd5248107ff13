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

pub mod card;
pub mod check;
pub mod deck;
pub mod generate;
pub mod item;
pub mod review;
pub mod transfer;

use std::path::PathBuf;

use treecards_core::Service;
use treecards_core::SystemClock;
use treecards_core::error::Fallible;
use treecards_core::types::ids::OwnerId;

use crate::config::Config;
use crate::db::Database;

/// What every command runs against.
pub struct Context<S, C> {
    pub app: Service<S, C>,
    pub owner: OwnerId,
    pub config: Config,
}

impl Context<Database, SystemClock> {
    pub fn open(config: Config, db: Option<PathBuf>, owner: String) -> Fallible<Self> {
        let path = db.unwrap_or_else(|| config.storage.database.clone());
        let database = Database::open(&path)?;
        let app = Service::new(database, SystemClock, config.service());
        Ok(Context {
            app,
            owner: OwnerId::new(owner),
            config,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use treecards_core::FixedClock;
    use treecards_core::MemoryStore;
    use treecards_core::Timestamp;

    use super::*;

    pub type TestContext = Context<MemoryStore, FixedClock>;

    pub fn now() -> Timestamp {
        Timestamp::try_from("2024-03-10T20:00:00.000".to_string()).unwrap()
    }

    pub fn context() -> TestContext {
        let config = Config::default();
        Context {
            app: Service::new(MemoryStore::new(), FixedClock(now()), config.service()),
            owner: OwnerId::new("alice"),
            config,
        }
    }

    pub fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }
}
