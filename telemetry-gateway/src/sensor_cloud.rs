use crate::config::SensorCloudConfig;
use crate::errors::Result;
use crate::http::fetch_json;
use crate::readings::ReadingSet;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

const UPSTREAM_NAME: &str = "sensor-cloud";

/// Source of raw sensor readings.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Reads the current value of every configured channel.
    ///
    /// Issues exactly one outbound read; retrying is left to the caller's own
    /// schedule.
    async fn fetch_readings(&self) -> Result<ReadingSet>;
}

/// Reads channel values from the sensor cloud's HTTP API.
///
/// The request URL, including the token and the channel list, is built once
/// at construction: `<url>?token=<token>&V0&V1&...`.
pub struct SensorCloudClient {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl SensorCloudClient {
    pub fn new(config: &SensorCloudConfig, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), config, timeout)
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &SensorCloudConfig,
        timeout: Duration,
    ) -> Self {
        let mut url = config.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("token", &config.token);
            for channel in &config.channels {
                query.append_key_only(channel);
            }
        }

        SensorCloudClient {
            client,
            url,
            timeout,
        }
    }
}

#[async_trait]
impl SensorSource for SensorCloudClient {
    async fn fetch_readings(&self) -> Result<ReadingSet> {
        let request = self.client.get(self.url.clone());
        fetch_json(request, UPSTREAM_NAME, self.timeout).await
    }
}
