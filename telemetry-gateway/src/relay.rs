use crate::analytics::AnalyticsService;
use crate::connection_state::ConnectionState;
use crate::metrics_defs::RELAY_TICKS;
use crate::readings::{ChannelId, sanitize};
use crate::sensor_cloud::SensorSource;
use indexmap::IndexSet;
use shared::counter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

/// What a single relay tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Hardware reported as disconnected, nothing was fetched.
    Disconnected,
    /// The sensor cloud read failed.
    FetchFailed,
    /// Some channels reported the sentinel value, nothing was forwarded.
    Incomplete(IndexSet<ChannelId>),
    Forwarded,
    /// The analytics service did not accept the readings.
    ForwardFailed,
}

impl TickOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TickOutcome::Disconnected => "disconnected",
            TickOutcome::FetchFailed => "fetch_failed",
            TickOutcome::Incomplete(_) => "incomplete",
            TickOutcome::Forwarded => "forwarded",
            TickOutcome::ForwardFailed => "forward_failed",
        }
    }
}

/// Periodically relays sensor readings to the analytics service while the
/// hardware is reported as connected.
///
/// Forwarding is all or nothing: a reading set with any channel at the
/// sentinel value is not relayed at all. Failures end the tick and are never
/// retried before the next one.
pub struct RelayLoop {
    sensor: Arc<dyn SensorSource>,
    analytics: Arc<dyn AnalyticsService>,
    connection: ConnectionState,
    interval: Duration,
}

impl RelayLoop {
    pub fn new(
        sensor: Arc<dyn SensorSource>,
        analytics: Arc<dyn AnalyticsService>,
        connection: ConnectionState,
        interval: Duration,
    ) -> Self {
        RelayLoop {
            sensor,
            analytics,
            connection,
            interval,
        }
    }

    /// Runs one tick: check connection, fetch, sanitize, maybe forward.
    pub async fn tick(&self) -> TickOutcome {
        let outcome = self.run_tick().await;
        counter!(RELAY_TICKS, "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    async fn run_tick(&self) -> TickOutcome {
        if !self.connection.is_connected() {
            tracing::debug!("Hardware disconnected, not relaying readings");
            return TickOutcome::Disconnected;
        }

        let readings = match self.sensor.fetch_readings().await {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch sensor readings");
                return TickOutcome::FetchFailed;
            }
        };

        let sanitized = sanitize(&readings);
        if !sanitized.is_complete() {
            sanitized.record_dropped();
            tracing::warn!(
                dropped = %sanitized.dropped_list(),
                "Skipping relay, channels reported no data"
            );
            return TickOutcome::Incomplete(sanitized.dropped);
        }

        match self.analytics.ingest(&sanitized.clean).await {
            Ok(()) => {
                tracing::debug!(
                    channels = sanitized.clean.len(),
                    "Relayed readings to analytics"
                );
                TickOutcome::Forwarded
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to relay readings to analytics");
                TickOutcome::ForwardFailed
            }
        }
    }

    /// Starts ticking on the runtime at the configured interval.
    ///
    /// Every tick runs on its own task, so a slow tick never delays the next
    /// one; how long ticks can overlap is bounded by the outbound timeouts.
    /// Timer ticks missed while the runtime was busy are skipped, not queued.
    pub fn spawn(self) -> RelayHandle {
        let running = Arc::new(AtomicBool::new(true));
        let guard = RunningGuard(running.clone());
        let relay = Arc::new(self);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let mut ticker = tokio::time::interval(relay.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Dropping the set when the loop is aborted aborts in-flight ticks
            let mut ticks = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let relay = relay.clone();
                        ticks.spawn(async move { relay.tick().await });
                    }
                    Some(result) = ticks.join_next(), if !ticks.is_empty() => {
                        if let Err(e) = result {
                            tracing::error!("Relay tick panicked: {e}");
                        }
                    }
                }
            }
        });

        RelayHandle { handle, running }
    }
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Handle to a spawned relay loop.
pub struct RelayHandle {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl RelayHandle {
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Readiness predicate that stays valid after the handle is moved.
    pub fn readiness_probe(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let running = self.running.clone();
        move || running.load(Ordering::Relaxed)
    }

    /// Stops the loop and any tick still in flight.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{MockAnalytics, MockSensor, reading_set};
    use serde_json::json;

    fn relay(
        sensor: Arc<MockSensor>,
        analytics: Arc<MockAnalytics>,
        connection: ConnectionState,
        interval: Duration,
    ) -> RelayLoop {
        RelayLoop::new(sensor, analytics, connection, interval)
    }

    fn connected() -> ConnectionState {
        let state = ConnectionState::new();
        state.set_connected(true);
        state
    }

    fn dropped(channels: &[&str]) -> IndexSet<ChannelId> {
        channels.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_forwards_complete_readings() {
        let readings = reading_set(json!({"V0":22,"V1":55,"V2":37,"V3":98,"V4":80,"V5":36}));
        let sensor = Arc::new(MockSensor::returning(readings.clone()));
        let analytics = Arc::new(MockAnalytics::new());
        let relay = relay(sensor, analytics.clone(), connected(), Duration::from_secs(1));

        assert_eq!(relay.tick().await, TickOutcome::Forwarded);

        let ingested = analytics.ingested();
        assert_eq!(ingested.len(), 1);
        assert_eq!(ingested[0], readings);
        assert_eq!(
            serde_json::to_value(&ingested[0]).unwrap(),
            json!({"V0":22,"V1":55,"V2":37,"V3":98,"V4":80,"V5":36})
        );
    }

    #[tokio::test]
    async fn test_partial_readings_are_not_forwarded() {
        let sensor = Arc::new(MockSensor::returning(reading_set(
            json!({"V0":22,"V1":0,"V2":37,"V3":98,"V4":80,"V5":0}),
        )));
        let analytics = Arc::new(MockAnalytics::new());
        let relay = relay(sensor, analytics.clone(), connected(), Duration::from_secs(1));

        assert_eq!(
            relay.tick().await,
            TickOutcome::Incomplete(dropped(&["V1", "V5"]))
        );
        assert!(analytics.ingested().is_empty());
    }

    #[tokio::test]
    async fn test_all_zero_readings_after_connect() {
        let connection = ConnectionState::new();
        let sensor = Arc::new(MockSensor::returning(reading_set(
            json!({"V0":0,"V1":0,"V2":0,"V3":0,"V4":0,"V5":0}),
        )));
        let analytics = Arc::new(MockAnalytics::new());
        let relay = relay(
            sensor,
            analytics.clone(),
            connection.clone(),
            Duration::from_secs(1),
        );

        connection.set_connected(true);

        assert_eq!(
            relay.tick().await,
            TickOutcome::Incomplete(dropped(&["V0", "V1", "V2", "V3", "V4", "V5"]))
        );
        assert!(analytics.ingested().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_ticks_do_nothing() {
        let sensor = Arc::new(MockSensor::returning(reading_set(json!({"V0": 22}))));
        let analytics = Arc::new(MockAnalytics::new());
        let relay = relay(
            sensor.clone(),
            analytics.clone(),
            ConnectionState::new(),
            Duration::from_secs(1),
        );

        for _ in 0..10 {
            assert_eq!(relay.tick().await, TickOutcome::Disconnected);
        }
        assert_eq!(sensor.calls(), 0);
        assert!(analytics.ingested().is_empty());
    }

    #[tokio::test]
    async fn test_connection_is_read_every_tick() {
        let connection = ConnectionState::new();
        let sensor = Arc::new(MockSensor::returning(reading_set(json!({"V0": 22}))));
        let analytics = Arc::new(MockAnalytics::new());
        let relay = relay(
            sensor,
            analytics.clone(),
            connection.clone(),
            Duration::from_secs(1),
        );

        assert_eq!(relay.tick().await, TickOutcome::Disconnected);
        connection.set_connected(true);
        assert_eq!(relay.tick().await, TickOutcome::Forwarded);
        connection.set_connected(false);
        assert_eq!(relay.tick().await, TickOutcome::Disconnected);

        assert_eq!(analytics.ingested().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_end_the_tick() {
        let analytics = Arc::new(MockAnalytics::new());
        let relay_fetch = relay(
            Arc::new(MockSensor::failing()),
            analytics.clone(),
            connected(),
            Duration::from_secs(1),
        );
        assert_eq!(relay_fetch.tick().await, TickOutcome::FetchFailed);
        assert!(analytics.ingested().is_empty());

        let relay_forward = relay(
            Arc::new(MockSensor::returning(reading_set(json!({"V0": 22})))),
            Arc::new(MockAnalytics::new().rejecting_ingest()),
            connected(),
            Duration::from_secs(1),
        );
        assert_eq!(relay_forward.tick().await, TickOutcome::ForwardFailed);
        // The next tick tries again
        assert_eq!(relay_forward.tick().await, TickOutcome::ForwardFailed);
    }

    #[tokio::test]
    async fn test_spawned_loop_relays_until_shutdown() {
        let sensor = Arc::new(MockSensor::returning(reading_set(json!({"V0": 22, "V1": 40}))));
        let analytics = Arc::new(MockAnalytics::new());
        let handle = relay(
            sensor,
            analytics.clone(),
            connected(),
            Duration::from_millis(10),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_running());
        let probe = handle.readiness_probe();
        assert!(probe());

        handle.shutdown();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_running());
        assert!(!probe());

        let forwarded = analytics.ingested().len();
        assert!(forwarded >= 2, "expected several forwards, got {forwarded}");

        // Nothing is relayed after shutdown
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(analytics.ingested().len(), forwarded);
    }

    #[tokio::test]
    async fn test_spawned_loop_respects_connection_state() {
        let sensor = Arc::new(MockSensor::returning(reading_set(json!({"V0": 22}))));
        let analytics = Arc::new(MockAnalytics::new());
        let handle = relay(
            sensor.clone(),
            analytics.clone(),
            ConnectionState::new(),
            Duration::from_millis(10),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.shutdown();

        assert_eq!(sensor.calls(), 0);
        assert!(analytics.ingested().is_empty());
    }

    #[tokio::test]
    async fn test_slow_tick_does_not_delay_schedule() {
        let sensor = Arc::new(
            MockSensor::returning(reading_set(json!({"V0": 22})))
                .with_delay(Duration::from_millis(500)),
        );
        let analytics = Arc::new(MockAnalytics::new());
        let handle = relay(
            sensor.clone(),
            analytics,
            connected(),
            Duration::from_millis(20),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown();

        // Each fetch takes 500ms, yet ticks kept starting every 20ms
        assert!(sensor.calls() >= 3, "only {} ticks started", sensor.calls());
    }
}
