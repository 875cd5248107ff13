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

//! Settings read from `treecards.toml`.

use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use treecards_core::ServiceConfig;
use treecards_core::error::ErrorReport;
use treecards_core::error::Fallible;
use treecards_core::error::fail;
use treecards_core::public_id::DEFAULT_MAX_ATTEMPTS;
use treecards_core::queue::RequeuePolicy;

pub const DEFAULT_CONFIG_FILE: &str = "treecards.toml";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Cards due within this many hours from now count as due today.
    pub business_day_offset_hours: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            business_day_offset_hours: 7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub again_requeue_position: usize,
    pub hard_requeue_position: usize,
    pub include_tree_cards: bool,
    pub card_limit: Option<usize>,
    pub shuffle: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let policy = RequeuePolicy::default();
        Self {
            again_requeue_position: policy.again_position,
            hard_requeue_position: policy.hard_position,
            include_tree_cards: true,
            card_limit: None,
            shuffle: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("treecards.db"),
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(text)
            .map_err(|e| ErrorReport::new(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration. An explicit path must exist; the default file
    /// is optional.
    pub fn load(path: Option<&Path>) -> Fallible<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if explicit {
                return fail(format!("configuration file not found: {}", path.display()));
            }
            log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(Config::default());
        }
        log::debug!("Loading configuration from {}", path.display());
        Config::parse(&read_to_string(path)?)
    }

    fn validate(&self) -> Fallible<()> {
        if self.session.again_requeue_position == 0 || self.session.hard_requeue_position == 0 {
            return fail("requeue positions must be at least 1");
        }
        if self.session.card_limit == Some(0) {
            return fail("card_limit must be at least 1");
        }
        if !(0..=24).contains(&self.schedule.business_day_offset_hours) {
            return fail("business_day_offset_hours must be between 0 and 24");
        }
        Ok(())
    }

    pub fn service(&self) -> ServiceConfig {
        ServiceConfig {
            business_day_offset_hours: self.schedule.business_day_offset_hours,
            public_id_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn requeue_policy(&self) -> RequeuePolicy {
        RequeuePolicy {
            again_position: self.session.again_requeue_position,
            hard_position: self.session.hard_requeue_position,
        }
    }
}
