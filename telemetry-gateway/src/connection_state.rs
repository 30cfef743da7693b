use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the sensor hardware is reported as connected.
///
/// Cloned handles share one flag. The control endpoint is the only writer; the
/// relay loop reads it at the start of every tick. Starts disconnected.
#[derive(Clone, Debug, Default)]
pub struct ConnectionState {
    connected: Arc<AtomicBool>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
