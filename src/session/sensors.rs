//! One-shot listing of the service's sensors.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{decode_list, OneShotSlot, SessionState};
use crate::data::Sensor;
use crate::error::FetchError;
use crate::source::TelemetrySource;

/// Sensor directory, fetched on demand.
#[derive(Debug)]
pub struct SensorDirectory {
    source: Arc<dyn TelemetrySource>,
    slot: OneShotSlot<Vec<Sensor>>,
}

impl SensorDirectory {
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self {
            source,
            slot: OneShotSlot::new(),
        }
    }

    /// Fetch the sensor list.
    pub async fn fetch(&self) -> Result<Vec<Sensor>, FetchError> {
        let fetch = async {
            let body = self.source.fetch_sensors().await?;
            let sensors = decode_list(body, "sensor", Sensor::from_value)?;
            debug!(count = sensors.len(), "fetched sensors");
            Ok(sensors)
        };

        let result = self.slot.run(fetch).await;
        if let Err(err) = &result {
            warn!(error = %err, "sensor fetch failed");
        }
        result
    }

    pub fn state(&self) -> SessionState<Vec<Sensor>> {
        self.slot.state()
    }

    /// Look up a sensor from the last successful fetch.
    pub fn find(&self, id: &str) -> Option<Sensor> {
        self.slot
            .state()
            .data()
            .and_then(|sensors| sensors.iter().find(|s| s.id == id).cloned())
    }
}
