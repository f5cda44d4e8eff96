use serde_json::Value;
use std::future;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::types::HEARTBEAT_INTERVAL;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(HEARTBEAT_INTERVAL);

/// Recurring keep-alive tick, running only while a connection is open
pub struct HeartbeatManager {
    period: Duration,
    payload: Value,
    interval: Option<Interval>,
}

impl HeartbeatManager {
    pub fn new(payload: Value) -> Self {
        Self {
            period: DEFAULT_HEARTBEAT_INTERVAL,
            payload,
            interval: None,
        }
    }

    pub fn with_interval(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Starts ticking one period from now
    pub fn start(&mut self) {
        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Completes on the next tick; pends forever while stopped
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending().await,
        }
    }
}
