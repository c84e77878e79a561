//! Poll pacing, deadlines and cancellation.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::config::PollSettings;
use crate::error::{DeployError, Result};

/// Adaptive stack poll interval.
///
/// Polls run at the short interval for the first `rapid_polls` attempts after
/// a status transition, then at the long interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Interval right after a transition.
    pub short: Duration,
    /// Interval once the status has settled.
    pub long: Duration,
    /// Number of short polls after each transition.
    pub rapid_polls: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for BackoffPolicy {
    fn from(settings: &PollSettings) -> Self {
        Self {
            short: settings.short_interval(),
            long: settings.long_interval(),
            rapid_polls: settings.rapid_polls,
        }
    }
}

impl BackoffPolicy {
    /// Returns the wait before the next poll.
    #[must_use]
    pub const fn interval(&self, attempts_since_transition: u32) -> Duration {
        if attempts_since_transition < self.rapid_polls {
            self.short
        } else {
            self.long
        }
    }
}

/// What ended a wait.
enum Wake {
    Elapsed,
    Cancelled,
    SignalClosed,
}

/// Sleeps between polls of one polling operation while honoring a deadline
/// and the cancellation signal.
#[derive(Debug)]
pub struct Waiter {
    what: String,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl Waiter {
    /// Starts the clock for one polling operation.
    #[must_use]
    pub fn start(
        what: impl Into<String>,
        timeout: Option<Duration>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Self {
        Self {
            what: what.into(),
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
            cancel,
        }
    }

    /// Waits `interval` unless the deadline has passed or cancellation is
    /// signalled first.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Timeout`] past the deadline and
    /// [`DeployError::Cancelled`] once the signal is set.
    pub async fn wait(&mut self, interval: Duration) -> Result<()> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(self.cancelled());
        }

        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(DeployError::Timeout {
                what: self.what.clone(),
                waited_secs: self.timeout.map_or(0, |t| t.as_secs()),
            }
            .into());
        }

        let wake = match self.cancel.as_mut() {
            None => {
                tokio::time::sleep(interval).await;
                Wake::Elapsed
            }
            Some(rx) => tokio::select! {
                () = tokio::time::sleep(interval) => Wake::Elapsed,
                signal = rx.wait_for(|cancelled| *cancelled) => {
                    if signal.is_ok() { Wake::Cancelled } else { Wake::SignalClosed }
                }
            },
        };

        match wake {
            Wake::Elapsed => Ok(()),
            Wake::Cancelled => Err(self.cancelled()),
            Wake::SignalClosed => {
                debug!("Cancellation signal closed, polling without it");
                self.cancel = None;
                tokio::time::sleep(interval).await;
                Ok(())
            }
        }
    }

    fn cancelled(&self) -> crate::error::StackshiftError {
        DeployError::Cancelled {
            what: self.what.clone(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_short_then_long() {
        let policy = BackoffPolicy::default();

        for attempt in 0..5 {
            assert_eq!(policy.interval(attempt), Duration::from_secs(2));
        }
        assert_eq!(policy.interval(5), Duration::from_secs(5));
        assert_eq!(policy.interval(100), Duration::from_secs(5));
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = PollSettings {
            short_interval_secs: 1,
            long_interval_secs: 30,
            rapid_polls: 2,
            ..PollSettings::default()
        };
        let policy = BackoffPolicy::from(&settings);

        assert_eq!(policy.interval(1), Duration::from_secs(1));
        assert_eq!(policy.interval(2), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_elapses() {
        let mut waiter = Waiter::start("stack", None, None);
        let start = Instant::now();

        waiter.wait(Duration::from_secs(2)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let mut waiter = Waiter::start("stack", Some(Duration::from_secs(3)), None);

        waiter.wait(Duration::from_secs(2)).await.unwrap();
        waiter.wait(Duration::from_secs(2)).await.unwrap();
        let err = waiter.wait(Duration::from_secs(2)).await.unwrap_err();

        assert!(err.to_string().contains("timed out after 3s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cancelled_while_sleeping() {
        let (tx, rx) = watch::channel(false);
        let mut waiter = Waiter::start("change set", None, Some(rx));

        let (result, ()) = tokio::join!(waiter.wait(Duration::from_secs(60)), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(true).unwrap();
        });

        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_already_cancelled() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let mut waiter = Waiter::start("stack", None, Some(rx));

        let err = waiter.wait(Duration::from_secs(2)).await.unwrap_err();
        assert_eq!(err.to_string(), "interrupted while waiting for stack");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_survives_dropped_signal() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let mut waiter = Waiter::start("stack", None, Some(rx));

        waiter.wait(Duration::from_secs(2)).await.unwrap();
        waiter.wait(Duration::from_secs(2)).await.unwrap();
    }
}
