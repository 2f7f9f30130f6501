//! Timestamp as serialized by the service (a `SystemTime` on the server side).

/// A point in time split into whole seconds and a nanosecond remainder.
///
/// The service serializes Rust `SystemTime` values, which produce exactly
/// this shape: `{"secs_since_epoch": 1700000000, "nanos_since_epoch": 250}`.
/// Seconds are signed here so that a bad value can be observed and rejected
/// by the consumer instead of failing deserialization of the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireTime {
    /// Whole seconds since the Unix epoch.
    pub secs_since_epoch: i64,

    /// Sub-second remainder in nanoseconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub nanos_since_epoch: u64,
}

impl WireTime {
    /// Create a wire timestamp.
    pub const fn new(secs_since_epoch: i64, nanos_since_epoch: u64) -> Self {
        Self {
            secs_since_epoch,
            nanos_since_epoch,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn deserialize_system_time_shape() {
        let t: WireTime =
            serde_json::from_str(r#"{"secs_since_epoch":100,"nanos_since_epoch":5}"#).unwrap();
        assert_eq!(t, WireTime::new(100, 5));
    }

    #[test]
    fn missing_nanos_defaults_to_zero() {
        let t: WireTime = serde_json::from_str(r#"{"secs_since_epoch":100}"#).unwrap();
        assert_eq!(t.nanos_since_epoch, 0);
    }

    #[test]
    fn missing_seconds_is_an_error() {
        assert!(serde_json::from_str::<WireTime>(r#"{"nanos_since_epoch":5}"#).is_err());
    }
}
