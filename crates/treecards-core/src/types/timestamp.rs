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

use std::fmt::Display;
use std::fmt::Formatter;

use chrono::Duration;
use chrono::NaiveDateTime;
use chrono::SubsecRound;
use serde::Deserialize;
use serde::Serialize;

use crate::error::CoreError;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A UTC timestamp with millisecond precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn new(ndt: NaiveDateTime) -> Self {
        Self(ndt.trunc_subsecs(3))
    }

    pub fn into_inner(self) -> NaiveDateTime {
        self.0
    }

    /// The current UTC wall-clock time.
    #[cfg(feature = "clock")]
    pub fn now() -> Self {
        Self(chrono::Utc::now().naive_utc().trunc_subsecs(3))
    }

    /// Shift by a possibly fractional number of days, rounded to the
    /// millisecond. Saturates at the end of the representable range.
    pub fn plus_days(self, days: f64) -> Self {
        let millis = (days * MILLIS_PER_DAY).round() as i64;
        self.shifted(Duration::try_milliseconds(millis))
    }

    pub fn plus_hours(self, hours: i64) -> Self {
        self.shifted(Duration::try_hours(hours))
    }

    fn shifted(self, delta: Option<Duration>) -> Self {
        match delta.and_then(|d| self.0.checked_add_signed(d)) {
            Some(ndt) => Self::new(ndt),
            None => {
                log::warn!("Timestamp {self} shifted past the representable range.");
                Self::new(NaiveDateTime::MAX)
            }
        }
    }

    /// Milliseconds since the Unix epoch.
    pub fn millis(self) -> i64 {
        self.0.and_utc().timestamp_millis()
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let ndt = NaiveDateTime::parse_from_str(&value, FORMAT)
            .map_err(|_| CoreError::invalid(format!("failed to parse timestamp: '{value}'")))?;
        Ok(Timestamp(ndt))
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> String {
        ts.to_string()
    }
}

#[cfg(test)]
pub(crate) fn ts(s: &str) -> Timestamp {
    Timestamp::try_from(s.to_string()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_string() {
        let ndt = NaiveDateTime::parse_from_str("2023-10-05T14:30:15.123", FORMAT).unwrap();
        assert_eq!(Timestamp(ndt).to_string(), "2023-10-05T14:30:15.123");
    }

    #[test]
    fn test_serialize() {
        let serialized = serde_json::to_string(&ts("2023-10-05T14:30:15.123")).unwrap();
        assert_eq!(serialized, "\"2023-10-05T14:30:15.123\"");
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        let result: Result<Timestamp, _> = serde_json::from_str("\"yesterday\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_plus_days() {
        let start = ts("2024-01-01T12:00:00.000");
        assert_eq!(start.plus_days(15.0), ts("2024-01-16T12:00:00.000"));
        assert_eq!(start.plus_days(1.0 / 24.0), ts("2024-01-01T13:00:00.000"));
        assert_eq!(start.plus_days(0.0), start);
    }

    #[test]
    fn test_plus_days_saturates() {
        let start = ts("2024-01-01T12:00:00.000");
        assert_eq!(start.plus_days(1e12), Timestamp::new(NaiveDateTime::MAX));
        assert_eq!(start.plus_hours(i64::MAX), Timestamp::new(NaiveDateTime::MAX));
    }

    #[test]
    fn test_plus_hours() {
        let start = ts("2024-01-01T20:00:00.000");
        assert_eq!(start.plus_hours(7), ts("2024-01-02T03:00:00.000"));
    }
}
