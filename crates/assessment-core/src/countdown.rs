//! OTP expiry countdown.
//!
//! Purely presentational: the service decides whether an OTP has expired
//! when it is verified. The countdown owns a tokio task that ticks once per
//! second and is aborted when the [`Countdown`] is dropped, so it cannot
//! outlive the `otp` phase that created it.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// A cancelable 1 Hz countdown to zero.
#[derive(Debug)]
pub struct Countdown {
    remaining: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Start counting down from `seconds`. Must be called inside a tokio
    /// runtime.
    pub fn start(seconds: u64) -> Self {
        let (tx, rx) = watch::channel(seconds);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut remaining = seconds;
            while remaining > 0 {
                interval.tick().await;
                remaining -= 1;
                if tx.send(remaining).is_err() {
                    break;
                }
            }
        });

        Self {
            remaining: rx,
            task,
        }
    }

    /// Seconds left on the display.
    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// Whether the display has reached zero.
    pub fn is_elapsed(&self) -> bool {
        self.remaining() == 0
    }

    /// A receiver that observes every tick.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Render seconds as `M:SS`.
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
