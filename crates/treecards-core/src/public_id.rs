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

//! Shareable deck identifiers.

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::CoreError;
use crate::rng::TinyRng;

pub const PUBLIC_ID_LEN: usize = 6;

pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Six characters from `[A-Z0-9]`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicId(String);

impl PublicId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PublicId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PublicId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let valid = value.len() == PUBLIC_ID_LEN && value.bytes().all(|b| ALPHABET.contains(&b));
        if valid {
            Ok(PublicId(value))
        } else {
            Err(CoreError::invalid(format!("invalid public id: '{value}'")))
        }
    }
}

impl From<PublicId> for String {
    fn from(id: PublicId) -> String {
        id.0
    }
}

pub fn generate_public_id(rng: &mut TinyRng) -> PublicId {
    let id = (0..PUBLIC_ID_LEN)
        .map(|_| ALPHABET[rng.generate(ALPHABET.len() as u32) as usize] as char)
        .collect();
    PublicId(id)
}

/// Draw ids until `exists` reports one as free. Errors from `exists` are
/// passed through; running out of attempts is `IdSpaceExhausted`.
pub fn generate_unique_public_id<E, F>(
    rng: &mut TinyRng,
    mut exists: F,
    max_attempts: usize,
) -> Result<PublicId, E>
where
    E: From<CoreError>,
    F: FnMut(&PublicId) -> Result<bool, E>,
{
    for _ in 0..max_attempts {
        let id = generate_public_id(rng);
        if !exists(&id)? {
            return Ok(id);
        }
        log::debug!("Public id {id} is taken, retrying");
    }
    Err(CoreError::IdSpaceExhausted {
        attempts: max_attempts,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid() {
        let mut rng = TinyRng::from_seed(12345);
        for _ in 0..100 {
            let id = generate_public_id(&mut rng);
            assert_eq!(id.as_str().len(), PUBLIC_ID_LEN);
            assert!(PublicId::try_from(id.to_string()).is_ok());
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(PublicId::try_from("abc123".to_string()).is_err());
        assert!(PublicId::try_from("ABC12".to_string()).is_err());
        assert!(PublicId::try_from("ABC1234".to_string()).is_err());
    }

    #[test]
    fn test_unique_retries_until_free() {
        let mut rng = TinyRng::from_seed(1);
        let mut calls = 0;
        let id: Result<PublicId, CoreError> = generate_unique_public_id(
            &mut rng,
            |_| {
                calls += 1;
                Ok(calls < 3)
            },
            DEFAULT_MAX_ATTEMPTS,
        );
        assert!(id.is_ok());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_unique_exhausted() {
        let mut rng = TinyRng::from_seed(1);
        let id: Result<PublicId, CoreError> =
            generate_unique_public_id(&mut rng, |_| Ok(true), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(id, Err(CoreError::IdSpaceExhausted { attempts: 10 }));
    }

    #[test]
    fn test_exists_error_propagates() {
        let mut rng = TinyRng::from_seed(1);
        let id: Result<PublicId, CoreError> = generate_unique_public_id(
            &mut rng,
            |_| Err(CoreError::storage("down")),
            DEFAULT_MAX_ATTEMPTS,
        );
        assert!(matches!(id, Err(CoreError::Storage(_))));
    }
}
