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

//! SM-2 style scheduling.

use serde::Deserialize;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::timestamp::Timestamp;

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// The ease factor never drops below this.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Hard answers bring the card back within the hour.
const HARD_DUE_OFFSET_DAYS: f64 = 1.0 / 24.0;

/// Intervals stop growing at a hundred years.
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

/// How well the user recalled a card.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Quality {
    Again,
    Hard,
    Good,
    Easy,
}

impl Quality {
    pub fn as_u8(self) -> u8 {
        match self {
            Quality::Again => 0,
            Quality::Hard => 1,
            Quality::Good => 2,
            Quality::Easy => 3,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Quality::Again => "again",
            Quality::Hard => "hard",
            Quality::Good => "good",
            Quality::Easy => "easy",
        }
    }

    pub fn is_success(self) -> bool {
        self != Quality::Again
    }
}

impl TryFrom<u8> for Quality {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quality::Again),
            1 => Ok(Quality::Hard),
            2 => Ok(Quality::Good),
            3 => Ok(Quality::Easy),
            _ => Err(CoreError::invalid("quality must be 0, 1, 2, or 3")),
        }
    }
}

impl TryFrom<&str> for Quality {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "0" | "again" => Ok(Quality::Again),
            "1" | "hard" => Ok(Quality::Hard),
            "2" | "good" => Ok(Quality::Good),
            "3" | "easy" => Ok(Quality::Easy),
            _ => Err(CoreError::invalid(format!("invalid quality: '{value}'"))),
        }
    }
}

/// The scheduling fields of a card.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SrsState {
    /// Days between the last review and the next one.
    pub interval: f64,
    pub ease_factor: f64,
    /// Consecutive successful reviews.
    pub repetitions: u32,
    pub due_date: Timestamp,
}

impl SrsState {
    /// The state of a card that has never been reviewed: due immediately.
    pub fn new(due_date: Timestamp) -> Self {
        Self {
            interval: 0.0,
            ease_factor: DEFAULT_EASE_FACTOR,
            repetitions: 0,
            due_date,
        }
    }
}

/// Compute the state following a review answered with `quality` at
/// `reviewed_at`. All four fields are replaced.
pub fn next_state(state: &SrsState, quality: Quality, reviewed_at: Timestamp) -> SrsState {
    if quality == Quality::Again {
        return SrsState {
            interval: 0.0,
            ease_factor: state.ease_factor,
            repetitions: 0,
            due_date: reviewed_at,
        };
    }
    let repetitions = state.repetitions + 1;
    let interval = match repetitions {
        1 => 1.0,
        2 => 6.0,
        _ => (state.interval * state.ease_factor).round(),
    }
    .min(MAX_INTERVAL_DAYS);
    let ease_factor = next_ease_factor(state.ease_factor, quality);
    // The stored interval keeps growing normally; only the due date of a
    // hard answer is pulled in.
    let due_offset = if quality == Quality::Hard && interval > 0.0 {
        HARD_DUE_OFFSET_DAYS
    } else {
        interval
    };
    SrsState {
        interval,
        ease_factor,
        repetitions,
        due_date: reviewed_at.plus_days(due_offset),
    }
}

fn next_ease_factor(ef: f64, quality: Quality) -> f64 {
    let q = 3.0 - f64::from(quality.as_u8());
    let ef = ef + (0.1 - q * (0.08 + q * 0.02));
    f64::max(ef, MIN_EASE_FACTOR)
}
