use crate::analytics::{AnalyticsEndpoint, AnalyticsService};
use crate::errors::{GatewayError, Result};
use crate::metrics_defs::{AGGREGATION_DURATION, SOURCE_FETCH_FAILURES};
use crate::readings::sanitize;
use crate::sensor_cloud::SensorSource;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};
use shared::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Upstream sources merged into one response, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    GraphData,
    RiskAssessment,
    BlynkData,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::GraphData, Source::RiskAssessment, Source::BlynkData];

    /// Key of this source in the merged response.
    pub const fn name(&self) -> &'static str {
        match self {
            Source::GraphData => "graphData",
            Source::RiskAssessment => "riskAssessment",
            Source::BlynkData => "blynkData",
        }
    }

    /// Message placed in this source's slot when it could not be fetched.
    pub const fn error_message(&self) -> &'static str {
        match self {
            Source::GraphData => "Failed to fetch graphData",
            Source::RiskAssessment => "Failed to fetch riskAssessment",
            Source::BlynkData => "Failed to fetch Blynk data",
        }
    }
}

/// Outcome of fetching one source for one request.
pub type SourceResult = Result<Value>;

/// One entry per source, keyed by source name. A failed source holds
/// `{"error": "<message>"}` instead of its payload.
#[derive(Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedResponse(IndexMap<&'static str, Value>);

impl MergedResponse {
    /// Assembles the response from settled per-source results.
    ///
    /// Fails only if a source has no result at all.
    pub fn merge(mut results: HashMap<Source, SourceResult>) -> Result<Self> {
        let mut merged = IndexMap::with_capacity(Source::ALL.len());

        for source in Source::ALL {
            let result = results.remove(&source).ok_or_else(|| {
                GatewayError::AggregationError(format!("no result for {}", source.name()))
            })?;

            let value = match result {
                Ok(payload) => payload,
                Err(e) => {
                    if e.is_upstream() {
                        tracing::warn!(source = source.name(), error = %e, "Failed to fetch source");
                    } else {
                        tracing::error!(source = source.name(), error = %e, "Failed to fetch source");
                    }
                    counter!(SOURCE_FETCH_FAILURES, "source" => source.name()).increment(1);
                    json!({ "error": source.error_message() })
                }
            };
            merged.insert(source.name(), value);
        }

        Ok(MergedResponse(merged))
    }

    #[cfg(test)]
    pub fn get(&self, source: Source) -> Option<&Value> {
        self.0.get(source.name())
    }

    /// True if the slot holds an error marker rather than a payload.
    #[cfg(test)]
    pub fn is_error(&self, source: Source) -> bool {
        self.get(source) == Some(&json!({ "error": source.error_message() }))
    }
}

/// Fans a read out to every [`Source`] concurrently and merges the results.
#[derive(Clone)]
pub struct Aggregator {
    sensor: Arc<dyn SensorSource>,
    analytics: Arc<dyn AnalyticsService>,
}

impl Aggregator {
    pub fn new(sensor: Arc<dyn SensorSource>, analytics: Arc<dyn AnalyticsService>) -> Self {
        Aggregator { sensor, analytics }
    }

    /// Waits for every source to settle, then merges. A failing source only
    /// affects its own slot.
    pub async fn get_merged_data(&self) -> Result<MergedResponse> {
        let start = Instant::now();
        let settled = self.settle_all().await;
        histogram!(AGGREGATION_DURATION).record(start.elapsed().as_secs_f64());

        MergedResponse::merge(settled)
    }

    async fn settle_all(&self) -> HashMap<Source, SourceResult> {
        let mut join_set = JoinSet::new();
        let mut task_sources = HashMap::new();

        for source in Source::ALL {
            let sensor = self.sensor.clone();
            let analytics = self.analytics.clone();
            let handle = join_set.spawn(fetch_source(source, sensor, analytics));
            task_sources.insert(handle.id(), source);
        }

        let mut results = HashMap::with_capacity(task_sources.len());

        while let Some(join_result) = join_set.join_next_with_id().await {
            match join_result {
                Ok((task_id, result)) => {
                    if let Some(source) = task_sources.remove(&task_id) {
                        results.insert(source, result);
                    }
                }
                Err(e) => {
                    if let Some(source) = task_sources.remove(&e.id()) {
                        tracing::error!(source = source.name(), "Source task failed: {e}");
                        results.insert(
                            source,
                            Err(GatewayError::InternalError(format!("task failed: {e}"))),
                        );
                    }
                }
            }
        }

        results
    }
}

async fn fetch_source(
    source: Source,
    sensor: Arc<dyn SensorSource>,
    analytics: Arc<dyn AnalyticsService>,
) -> SourceResult {
    match source {
        Source::GraphData => analytics.fetch(AnalyticsEndpoint::GraphData).await,
        Source::RiskAssessment => analytics.fetch(AnalyticsEndpoint::RiskAssessment).await,
        Source::BlynkData => {
            let readings = sensor.fetch_readings().await?;
            let sanitized = sanitize(&readings);
            if !sanitized.is_complete() {
                sanitized.record_dropped();
                tracing::warn!(
                    dropped = %sanitized.dropped_list(),
                    "Omitting channels that reported no data"
                );
            }
            Ok(serde_json::to_value(&sanitized.clean)?)
        }
    }
}
