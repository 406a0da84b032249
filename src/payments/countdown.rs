//! QR payment countdown.

use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

/// Presentational timer counting down a QR session's nominal lifetime.
///
/// Publishes the remaining whole seconds once per second. Reaching zero only
/// tells the customer the code has likely lapsed; the order and gateway session
/// are left alone. Stopping or dropping the countdown aborts its task.
#[derive(Debug)]
pub struct QrCountdown {
    remaining: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl QrCountdown {
    /// Start counting down from `duration`, truncated to whole seconds.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(duration: Duration) -> Self {
        let total = duration.as_secs();
        let (sender, remaining) = watch::channel(total);

        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK, TICK);
            let mut left = total;

            while left > 0 {
                interval.tick().await;
                left -= 1;

                if sender.send(left).is_err() {
                    return;
                }
            }

            debug!(seconds = total, "qr countdown elapsed");
        });

        Self { remaining, task }
    }

    /// Seconds left.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn display(&self) -> String {
        format_remaining(self.remaining())
    }

    /// Whether the countdown has reached zero.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining() == 0
    }

    /// A receiver observing every tick.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    /// Wait until the countdown reaches zero.
    ///
    /// Returns `false` if it was stopped first.
    pub async fn expired(&mut self) -> bool {
        self.remaining.wait_for(|left| *left == 0).await.is_ok()
    }

    /// Stop ticking. The last published value stays readable.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for QrCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Format seconds as `MM:SS`.
#[must_use]
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
