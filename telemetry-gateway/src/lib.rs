pub mod aggregator;
pub mod analytics;
pub mod api;
pub mod config;
pub mod connection_state;
pub mod errors;
mod http;
pub mod metrics_defs;
pub mod predictions;
pub mod readings;
pub mod relay;
pub mod sensor_cloud;

#[cfg(test)]
mod testutils;

use crate::aggregator::Aggregator;
use crate::analytics::{AnalyticsClient, AnalyticsService};
use crate::api::GatewayService;
use crate::connection_state::ConnectionState;
use crate::errors::GatewayError;
use crate::relay::RelayLoop;
use crate::sensor_cloud::{SensorCloudClient, SensorSource};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::future::Future;
use std::sync::Arc;

/// Runs the gateway until a listener fails or the process receives Ctrl-C.
pub async fn run(config: config::Config) -> Result<(), GatewayError> {
    config.validate()?;

    let timeout = config.timeouts.http_timeout();
    let sensor: Arc<dyn SensorSource> =
        Arc::new(SensorCloudClient::new(&config.sensor_cloud, timeout));
    let analytics: Arc<dyn AnalyticsService> =
        Arc::new(AnalyticsClient::new(&config.analytics.url, timeout));
    let connection = ConnectionState::new();

    let relay = RelayLoop::new(
        sensor.clone(),
        analytics.clone(),
        connection.clone(),
        config.relay.poll_interval(),
    )
    .spawn();
    tracing::info!(
        interval_ms = config.relay.poll_interval_ms,
        channels = ?config.sensor_cloud.channels,
        "Started relay loop"
    );

    let api_service = GatewayService::new(
        Aggregator::new(sensor, analytics),
        connection,
        config.predictions_path.clone(),
    );
    let api_task = run_http_service(&config.listener.host, config.listener.port, api_service);

    let readiness = relay.readiness_probe();
    let admin_task = async {
        match &config.admin_listener {
            Some(admin) => {
                let admin_service = AdminService::<GatewayError>::new(readiness);
                run_http_service(&admin.host, admin.port, admin_service).await
            }
            None => std::future::pending().await,
        }
    };

    let result = tokio::select! {
        result = async { tokio::try_join!(api_task, admin_task).map(|_| ()) } => result,
        _ = shutdown_signal(tokio::signal::ctrl_c()) => Ok(()),
    };

    relay.shutdown();
    if let Err(e) = &result {
        tracing::error!(error = %e, "Gateway stopped with error");
    }
    result
}

/// Resolves once `signal` fires. If the handler could not be installed the
/// gateway keeps serving and this never resolves.
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler, shutdown signal disabled");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_signal_fires() {
        let fired = tokio::time::timeout(
            Duration::from_secs(1),
            shutdown_signal(async { Ok(()) }),
        )
        .await;

        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn test_failed_signal_registration_does_not_shut_down() {
        let failing = async { Err(std::io::Error::other("no signal driver")) };

        let fired = tokio::time::timeout(Duration::from_millis(100), shutdown_signal(failing)).await;

        assert!(fired.is_err());
    }
}
