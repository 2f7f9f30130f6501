//! Timestamp normalization.
//!
//! The service sends times as `{secs_since_epoch, nanos_since_epoch}`. This
//! module turns them into a sortable key and a local-time display string.

use chrono::{DateTime, Local, Utc};
use soundwatch_types::WireTime;
use thiserror::Error;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Long display form. The trailing zone annotation is stripped by [`decode`].
const LONG_FORMAT: &str = "%a %b %d %Y %H:%M:%S GMT%z (%Z)";

// Keep a day of slack at both ends so the local offset can't leave chrono's range.
const MIN_DISPLAY_SECS: i64 = -62_135_596_800 + 86_400; // 0001-01-02
const MAX_DISPLAY_SECS: i64 = 253_402_300_799 - 86_400; // 9999-12-30

/// Reasons a wire timestamp is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("negative epoch seconds: {0}")]
    NegativeSeconds(i64),

    #[error("nanosecond remainder out of range: {0}")]
    NanosOutOfRange(u64),
}

/// A validated reading or log timestamp.
///
/// Ordering follows wall-clock time: seconds first, then the nanosecond
/// remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: u64,
    nanos: u32,
}

impl Timestamp {
    /// Build a timestamp, rejecting a remainder of a full second or more.
    pub fn new(secs: u64, nanos: u32) -> Result<Self, TimeError> {
        if u64::from(nanos) >= NANOS_PER_SEC {
            return Err(TimeError::NanosOutOfRange(u64::from(nanos)));
        }
        Ok(Self { secs, nanos })
    }

    /// Validate a wire timestamp.
    pub fn from_wire(wire: &WireTime) -> Result<Self, TimeError> {
        let secs = u64::try_from(wire.secs_since_epoch)
            .map_err(|_| TimeError::NegativeSeconds(wire.secs_since_epoch))?;
        if wire.nanos_since_epoch >= NANOS_PER_SEC {
            return Err(TimeError::NanosOutOfRange(wire.nanos_since_epoch));
        }
        Ok(Self {
            secs,
            nanos: wire.nanos_since_epoch as u32,
        })
    }

    pub fn secs(&self) -> u64 {
        self.secs
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Nanoseconds since the epoch.
    pub fn sort_key(&self) -> u128 {
        sort_key(self.secs, self.nanos)
    }

    /// Local display string, see [`decode`].
    pub fn display_time(&self) -> String {
        decode(self.epoch_secs())
    }

    /// Local RFC 2822 string, see [`rfc2822`].
    pub fn rfc2822(&self) -> String {
        rfc2822(self.epoch_secs())
    }

    fn epoch_secs(&self) -> i64 {
        i64::try_from(self.secs).unwrap_or(i64::MAX)
    }
}

/// Combine seconds and the nanosecond remainder into one monotonic key.
pub fn sort_key(epoch_secs: u64, epoch_nanos: u32) -> u128 {
    u128::from(epoch_secs) * u128::from(NANOS_PER_SEC) + u128::from(epoch_nanos)
}

/// Render epoch seconds as a local calendar string without a zone annotation.
///
/// Produces e.g. `Thu Jan 01 1970 00:00:00 GMT+0000`. Never panics: values
/// outside the displayable range are clamped to its ends.
pub fn decode(epoch_secs: i64) -> String {
    let long = local_time(epoch_secs).format(LONG_FORMAT).to_string();
    strip_zone_annotation(&long)
}

/// Render epoch seconds as a local RFC 2822 string.
pub fn rfc2822(epoch_secs: i64) -> String {
    local_time(epoch_secs).to_rfc2822()
}

/// Remove the first parenthesized annotation, such as
/// `(Coordinated Universal Time)`, and trim the result.
///
/// The annotation runs from the first `(` to the next `)`. Without a closing
/// `)` the string is only trimmed.
pub fn strip_zone_annotation(s: &str) -> String {
    let annotation = s
        .find('(')
        .and_then(|open| s[open..].find(')').map(|len| open..open + len + 1));

    match annotation {
        Some(range) => {
            let mut out = String::with_capacity(s.len());
            out.push_str(&s[..range.start]);
            out.push_str(&s[range.end..]);
            out.trim().to_string()
        }
        None => s.trim().to_string(),
    }
}

fn local_time(epoch_secs: i64) -> DateTime<Local> {
    let clamped = epoch_secs.clamp(MIN_DISPLAY_SECS, MAX_DISPLAY_SECS);
    DateTime::<Utc>::from_timestamp(clamped, 0)
        .unwrap_or_default()
        .with_timezone(&Local)
}
