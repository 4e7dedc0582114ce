//! Retry policy and exponential backoff for failed queries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the executor waits between attempts after a query-level failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Length of one backoff step.
    #[serde(default = "default_unit", with = "millis")]
    pub unit: Duration,

    /// Once the delay reaches this many units it stops doubling.
    #[serde(default = "default_ceiling")]
    pub ceiling: u64,

    /// Give up after this many retries. `None` retries forever.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            unit: default_unit(),
            ceiling: default_ceiling(),
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.unit, self.ceiling)
    }
}

fn default_unit() -> Duration {
    Duration::from_secs(1)
}

fn default_ceiling() -> u64 {
    64
}

/// Sequence of retry delays: 0, 1, 2, 4, ... units, doubling while below
/// the ceiling and then repeating the last delay indefinitely.
#[derive(Debug, Clone)]
pub struct Backoff {
    unit: Duration,
    ceiling: u64,
    current: Option<u64>,
}

impl Backoff {
    pub fn new(unit: Duration, ceiling: u64) -> Self {
        Self {
            unit,
            ceiling,
            current: None,
        }
    }

    /// Advance and return the next delay in units.
    pub fn next_units(&mut self) -> u64 {
        let next = match self.current {
            None => 0,
            Some(0) => 1,
            Some(d) if d < self.ceiling => d.saturating_mul(2),
            Some(d) => d,
        };
        self.current = Some(next);
        next
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let units = self.next_units();
        Some(self.unit.saturating_mul(u32::try_from(units).unwrap_or(u32::MAX)))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
