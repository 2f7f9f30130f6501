//! Canonical in-memory records built from wire types.
//!
//! Conversion is per record: a record that lacks a field or carries a value
//! that can't be interpreted yields a [`Malformed`] reason instead of a
//! record, and the caller decides to skip it.

use serde::Deserialize;
use serde_json::Value;
use soundwatch_types::{WireLog, WireReading, WireSensor};
use thiserror::Error;

use super::time::{TimeError, Timestamp};

/// Why a single record was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Malformed {
    #[error("not a record: {0}")]
    NotARecord(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("sound level is not a number: {0:?}")]
    BadLevel(String),

    #[error("bad time: {0}")]
    BadTime(#[from] TimeError),
}

/// One sound-level sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRecord {
    pub id: i64,
    pub sensor_name: String,
    /// Sound level in decibels.
    pub level: f64,
    pub time: Timestamp,
}

impl ReadingRecord {
    /// Convert a wire reading, requiring every field.
    pub fn from_wire(wire: WireReading) -> Result<Self, Malformed> {
        let id = wire.id.ok_or(Malformed::MissingField("id"))?;
        let sensor_name = wire
            .sensor_name
            .filter(|name| !name.is_empty())
            .ok_or(Malformed::MissingField("sensor_name"))?;
        let sound = wire.sound.ok_or(Malformed::MissingField("sound"))?;
        let level = sound
            .as_f64()
            .ok_or_else(|| Malformed::BadLevel(format!("{:?}", sound)))?;
        let time = wire.time.ok_or(Malformed::MissingField("time"))?;
        let time = Timestamp::from_wire(&time)?;

        Ok(Self {
            id,
            sensor_name,
            level,
            time,
        })
    }

    /// Decode a reading straight from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, Malformed> {
        let wire =
            WireReading::deserialize(value).map_err(|e| Malformed::NotARecord(e.to_string()))?;
        Self::from_wire(wire)
    }

    pub fn sort_key(&self) -> u128 {
        self.time.sort_key()
    }

    pub fn display_time(&self) -> String {
        self.time.display_time()
    }
}

/// A sensor in the service's directory. Read-only mirror of remote state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sensor {
    pub id: String,
    pub location: String,
    pub kind: String,
}

impl Sensor {
    pub fn from_wire(wire: WireSensor) -> Result<Self, Malformed> {
        Ok(Self {
            id: wire.id.ok_or(Malformed::MissingField("id"))?,
            location: wire.location.ok_or(Malformed::MissingField("location"))?,
            kind: wire.kind.ok_or(Malformed::MissingField("type_"))?,
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, Malformed> {
        let wire =
            WireSensor::deserialize(value).map_err(|e| Malformed::NotARecord(e.to_string()))?;
        Self::from_wire(wire)
    }
}

/// One service log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub id: i64,
    pub message: String,
    pub time: Timestamp,
}

impl LogRecord {
    pub fn from_wire(wire: WireLog) -> Result<Self, Malformed> {
        let id = wire.id.ok_or(Malformed::MissingField("id"))?;
        let message = wire.message.ok_or(Malformed::MissingField("message"))?;
        let time = wire.time.ok_or(Malformed::MissingField("time"))?;
        Ok(Self {
            id,
            message,
            time: Timestamp::from_wire(&time)?,
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, Malformed> {
        let wire = WireLog::deserialize(value).map_err(|e| Malformed::NotARecord(e.to_string()))?;
        Self::from_wire(wire)
    }

    pub fn display_time(&self) -> String {
        self.time.display_time()
    }
}
