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

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

use crate::types::ids::CardId;

/// Typed failures returned by core operations.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A referenced deck, item or card is absent or not owned by the caller.
    NotFound(String),
    /// A required field is missing or a value is out of range.
    InvalidInput(String),
    /// A re-parent would make an item its own ancestor.
    CyclicMove,
    /// Tree-card generation was requested on an item without children.
    NoChildren,
    /// A generated card already exists for the item and `overwrite` was not
    /// set.
    AlreadyExists { card_id: CardId },
    /// Every public id candidate collided with an existing one.
    IdSpaceExhausted { attempts: usize },
    /// A parent reference points outside the loaded item set. Normally
    /// recovered locally and only logged.
    StructuralInconsistency(String),
    /// The storage collaborator failed.
    Storage(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }

    pub fn storage(err: impl Display) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CoreError::NotFound(what) => write!(f, "{what} not found"),
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            CoreError::CyclicMove => write!(f, "cannot move an item into its own subtree"),
            CoreError::NoChildren => write!(f, "item has no children"),
            CoreError::AlreadyExists { card_id } => {
                write!(f, "a generated card already exists for this item (card {card_id})")
            }
            CoreError::IdSpaceExhausted { attempts } => {
                write!(f, "failed to allocate a unique public id after {attempts} attempts")
            }
            CoreError::StructuralInconsistency(msg) => write!(f, "inconsistent tree: {msg}"),
            CoreError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, PartialEq)]
pub struct ErrorReport {
    message: String,
}

impl ErrorReport {
    pub fn new(msg: impl Into<String>) -> Self {
        ErrorReport {
            message: msg.into(),
        }
    }
}

impl From<std::io::Error> for ErrorReport {
    fn from(value: std::io::Error) -> Self {
        ErrorReport {
            message: format!("I/O error: {value:#?}"),
        }
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(value: serde_json::Error) -> Self {
        ErrorReport {
            message: format!("JSON error: {value:#?}"),
        }
    }
}

impl From<CoreError> for ErrorReport {
    fn from(value: CoreError) -> Self {
        ErrorReport {
            message: value.to_string(),
        }
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl Error for ErrorReport {
    fn description(&self) -> &str {
        &self.message
    }
}

pub type Fallible<T> = Result<T, ErrorReport>;

pub fn fail<T>(msg: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport {
        message: msg.into(),
    })
}
