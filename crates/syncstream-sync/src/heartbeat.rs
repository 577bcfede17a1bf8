//! Timers polled by the session loop.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Boxed stream of speaking transitions from a running speech monitor.
pub type SpeechStream = Pin<Box<dyn Stream<Item = bool> + Send>>;

/// Heartbeat ticker. The first tick fires one period from now; ticks missed
/// while the loop was busy are skipped rather than bunched up.
pub fn heartbeat_interval(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Next heartbeat tick, or never when there is no heartbeat.
pub async fn next_tick(heartbeat: &mut Option<Interval>) -> Instant {
    match heartbeat {
        Some(interval) => interval.tick().await,
        None => pending().await,
    }
}

/// Next speaking transition. `None` means the monitor finished; without a
/// monitor this never resolves.
pub async fn next_speech(speech: &mut Option<SpeechStream>) -> Option<bool> {
    match speech {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}
