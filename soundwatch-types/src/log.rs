//! Service log entries.

use crate::WireTime;

/// A log line as returned by `/logs/limit`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireLog {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<i64>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub message: Option<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Option<WireTime>,
}
