use crate::analytics::{AnalyticsEndpoint, AnalyticsService};
use crate::errors::{GatewayError, Result};
use crate::readings::ReadingSet;
use crate::sensor_cloud::SensorSource;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub fn reading_set(value: Value) -> ReadingSet {
    serde_json::from_value(value).expect("valid reading set")
}

/// Sensor source returning a fixed result, optionally after a delay.
pub struct MockSensor {
    readings: Option<ReadingSet>,
    delay: Option<Duration>,
    calls: Mutex<usize>,
}

impl MockSensor {
    pub fn returning(readings: ReadingSet) -> Self {
        MockSensor {
            readings: Some(readings),
            delay: None,
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        MockSensor {
            readings: None,
            delay: None,
            calls: Mutex::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SensorSource for MockSensor {
    async fn fetch_readings(&self) -> Result<ReadingSet> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.readings
            .clone()
            .ok_or_else(|| GatewayError::UpstreamTimeout("sensor-cloud".into()))
    }
}

/// Analytics service serving canned payloads and recording ingested readings.
#[derive(Default)]
pub struct MockAnalytics {
    payloads: HashMap<AnalyticsEndpoint, Value>,
    reject_ingest: bool,
    ingested: Mutex<Vec<ReadingSet>>,
}

impl MockAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `payload` for `endpoint`. Endpoints without a payload fail.
    pub fn with_payload(mut self, endpoint: AnalyticsEndpoint, payload: Value) -> Self {
        self.payloads.insert(endpoint, payload);
        self
    }

    pub fn rejecting_ingest(mut self) -> Self {
        self.reject_ingest = true;
        self
    }

    pub fn ingested(&self) -> Vec<ReadingSet> {
        self.ingested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsService for MockAnalytics {
    async fn fetch(&self, endpoint: AnalyticsEndpoint) -> Result<Value> {
        self.payloads.get(&endpoint).cloned().ok_or_else(|| {
            GatewayError::UpstreamRequestFailed(endpoint.path().into(), "connection refused".into())
        })
    }

    async fn ingest(&self, readings: &ReadingSet) -> Result<()> {
        if self.reject_ingest {
            return Err(GatewayError::UpstreamStatus(
                "analytics/blynk_data".into(),
                http::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        self.ingested.lock().unwrap().push(readings.clone());
        Ok(())
    }
}
