use crate::errors::{GatewayError, Result};
use crate::http::{fetch_json, send};
use crate::readings::ReadingSet;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Read endpoints of the analytics service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnalyticsEndpoint {
    GraphData,
    RiskAssessment,
}

impl AnalyticsEndpoint {
    pub const fn path(&self) -> &'static str {
        match self {
            AnalyticsEndpoint::GraphData => "graph_data",
            AnalyticsEndpoint::RiskAssessment => "risk_assessment",
        }
    }
}

const INGEST_PATH: &str = "blynk_data";

/// The downstream analytics and risk scoring service.
#[async_trait]
pub trait AnalyticsService: Send + Sync {
    /// Reads one of the analytics endpoints. The payload is passed on verbatim.
    async fn fetch(&self, endpoint: AnalyticsEndpoint) -> Result<Value>;

    /// Submits a complete set of readings for ingestion.
    async fn ingest(&self, readings: &ReadingSet) -> Result<()>;
}

pub struct AnalyticsClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl AnalyticsClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    pub fn with_client(client: reqwest::Client, base_url: &Url, timeout: Duration) -> Self {
        // Without a trailing slash `join` would replace the last path segment
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        AnalyticsClient {
            client,
            base_url,
            timeout,
        }
    }

    fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            GatewayError::InternalError(format!("Invalid analytics endpoint {path}: {e}"))
        })
    }
}

#[async_trait]
impl AnalyticsService for AnalyticsClient {
    async fn fetch(&self, endpoint: AnalyticsEndpoint) -> Result<Value> {
        let url = self.endpoint_url(endpoint.path())?;
        let request = self.client.get(url);
        fetch_json(request, &format!("analytics/{}", endpoint.path()), self.timeout).await
    }

    async fn ingest(&self, readings: &ReadingSet) -> Result<()> {
        let url = self.endpoint_url(INGEST_PATH)?;
        let request = self.client.post(url).json(readings);
        send(request, &format!("analytics/{INGEST_PATH}"), self.timeout).await
    }
}
