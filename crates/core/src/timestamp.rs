//! Wire timestamps.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds and nanoseconds since the Unix epoch, as the service reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp {
    /// Whole seconds since the epoch
    pub seconds: i64,
    /// Sub-second part, `0..1_000_000_000`
    pub nanos: i32,
}

impl Timestamp {
    /// Creates a timestamp.
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Converts to a `DateTime<Utc>`, rejecting out-of-range values.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>> {
        if !(0..1_000_000_000).contains(&self.nanos) {
            return Err(Error::Serialization(format!(
                "timestamp nanos out of range: {}",
                self.nanos
            )));
        }
        Utc.timestamp_opt(self.seconds, self.nanos as u32)
            .single()
            .ok_or_else(|| {
                Error::Serialization(format!("timestamp out of range: {}s", self.seconds))
            })
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self {
            seconds: time.timestamp(),
            nanos: time.timestamp_subsec_nanos() as i32,
        }
    }
}
