use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Drives the liveness loop for one connection cycle. Armed when HELLO
/// supplies the interval and dropped with the cycle, so a stopped monitor
/// can never fire against a closed handle.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    timer: Interval,
    ack_received: bool,
}

impl HeartbeatMonitor {
    /// Arms the timer. The ack flag is pre-seeded so the first beat fires
    /// immediately instead of waiting a full interval, without tripping a
    /// false timeout on startup.
    pub fn start(interval_ms: u64) -> Self {
        let mut timer = interval(Duration::from_millis(interval_ms));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            timer,
            ack_received: true,
        }
    }

    /// Waits for the next beat. Returns whether the previous beat was
    /// acknowledged; a `false` return is a fatal liveness failure for the
    /// connection. The flag is rearmed so the beat the caller now sends
    /// requires a fresh ack.
    pub async fn beat(&mut self) -> bool {
        self.timer.tick().await;
        let acked = self.ack_received;
        self.ack_received = false;
        acked
    }

    /// Marks the pending heartbeat as acknowledged.
    pub fn acknowledge(&mut self) {
        self.ack_received = true;
    }
}
