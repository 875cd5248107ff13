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

use crate::types::timestamp::Timestamp;

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The system wall clock, in UTC.
#[cfg(feature = "clock")]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

#[cfg(feature = "clock")]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that always reports the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> Timestamp {
        (*self).now()
    }
}

/// The instant up to which cards count as due "today": the current time
/// shifted by a fixed business-day offset.
pub fn review_cutoff(clock: &impl Clock, offset_hours: i64) -> Timestamp {
    clock.now().plus_hours(offset_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::timestamp::ts;

    #[test]
    fn test_review_cutoff_applies_offset() {
        let clock = FixedClock(ts("2024-05-01T18:30:00.000"));
        assert_eq!(review_cutoff(&clock, 7), ts("2024-05-02T01:30:00.000"));
        assert_eq!(review_cutoff(&clock, 0), clock.now());
    }
}
