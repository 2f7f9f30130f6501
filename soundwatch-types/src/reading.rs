//! Sound-level reading records.

use crate::WireTime;

/// A sound level as sent by the service.
///
/// The database stores levels as text, so the service usually emits a
/// numeric string (`"42.5"`), but plain JSON numbers are accepted too.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum SoundLevel {
    Number(f64),
    Text(String),
}

impl SoundLevel {
    /// Interpret the level as a decimal number.
    ///
    /// Returns `None` for text that does not parse or for non-finite values.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            SoundLevel::Number(n) => *n,
            SoundLevel::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// One reading as returned by `/sound` and `/sound/sorted`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireReading {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<i64>,

    /// Name of the sensor that produced the reading.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sensor_name: Option<String>,

    /// Measured level in decibels.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sound: Option<SoundLevel>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Option<WireTime>,
}
