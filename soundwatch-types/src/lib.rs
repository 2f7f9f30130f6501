//! # soundwatch-types
//!
//! Wire types for the IoT sound telemetry service. These mirror the JSON the
//! service emits and are deliberately lenient: every field a record can be
//! missing is an `Option`, so a consumer can decide record by record what to
//! keep instead of failing a whole response on one bad entry.
//!
//! ## Features
//!
//! - `serde`: JSON (de)serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use soundwatch_types::{SoundLevel, WireReading, WireTime};
//!
//! let reading = WireReading {
//!     id: Some(7),
//!     sensor_name: Some("kitchen".to_string()),
//!     sound: Some(SoundLevel::Text("42.5".to_string())),
//!     time: Some(WireTime::new(1_700_000_000, 0)),
//! };
//!
//! assert_eq!(reading.sound.and_then(|s| s.as_f64()), Some(42.5));
//! ```

mod log;
mod reading;
mod sensor;
mod time;

pub use log::*;
pub use reading::*;
pub use sensor::*;
pub use time::*;
