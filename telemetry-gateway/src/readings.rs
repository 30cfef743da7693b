//! Sensor readings as reported by the sensor cloud, and the sentinel rule
//! applied to them.
//!
//! A reading of exactly zero means the sensor is not plugged in. Sanitizing a
//! [`ReadingSet`] removes those channels and reports which ones were removed.
//! A genuine zero measurement cannot be told apart from an absent sensor and is
//! dropped too.

use crate::metrics_defs::CHANNELS_DROPPED;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use shared::counter;

pub type ChannelId = String;

/// Channel identifier to value, in the order the sensor cloud reported them.
pub type ReadingSet = IndexMap<ChannelId, Reading>;

/// A single channel value.
///
/// Numbers are kept as `serde_json::Number` so integers are relayed as
/// integers. The sensor cloud occasionally reports error text instead of a
/// number; anything that is neither is carried through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(Number),
    Text(String),
    Other(serde_json::Value),
}

impl Reading {
    /// True if this reading is the "sensor not providing data" marker.
    pub fn is_sentinel(&self) -> bool {
        match self {
            Reading::Number(n) => n.as_f64() == Some(0.0),
            _ => false,
        }
    }
}

#[cfg(test)]
impl From<i64> for Reading {
    fn from(value: i64) -> Self {
        Reading::Number(value.into())
    }
}

#[cfg(test)]
impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Reading::Text(value.to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sanitized {
    pub clean: ReadingSet,
    pub dropped: IndexSet<ChannelId>,
}

impl Sanitized {
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Dropped channels as a comma separated list, for log lines.
    pub fn dropped_list(&self) -> String {
        self.dropped
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn record_dropped(&self) {
        for channel in &self.dropped {
            counter!(CHANNELS_DROPPED, "channel" => channel.clone()).increment(1);
        }
    }
}

pub fn sanitize(readings: &ReadingSet) -> Sanitized {
    let mut sanitized = Sanitized::default();

    for (channel, reading) in readings {
        if reading.is_sentinel() {
            sanitized.dropped.insert(channel.clone());
        } else {
            sanitized.clean.insert(channel.clone(), reading.clone());
        }
    }

    sanitized
}
